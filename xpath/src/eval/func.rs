use super::error;
use super::eval_expr;
use super::model::{self, AsValue, Context, Value};
use crate::expr::model::{Expr, FunctionCallExpr};
use std::ops::RangeInclusive;
use xml_dom::{AsStringValue, Node, NodeType, XmlNode};

pub type XPathFunc = for<'a> fn(&[Expr], &Context<'a>) -> error::Result<Value<'a>>;

pub struct Entry {
    name: &'static str,
    args: RangeInclusive<usize>,
    call: XPathFunc,
}

impl Entry {
    pub fn name(&self) -> &str {
        self.name
    }

    pub fn min_args(&self) -> usize {
        *self.args.start()
    }

    pub fn max_args(&self) -> usize {
        *self.args.end()
    }
}

const fn entry(name: &'static str, args: RangeInclusive<usize>, call: XPathFunc) -> Entry {
    Entry { name, args, call }
}

const MANY: usize = usize::MAX;

static TABLE: &[Entry] = &[
    entry("last", 0..=0, last),
    entry("position", 0..=0, position),
    entry("count", 1..=1, count),
    entry("id", 1..=1, id),
    entry("local-name", 0..=1, local_name),
    entry("namespace-uri", 0..=1, namespace_uri),
    entry("name", 0..=1, name),
    entry("string", 0..=1, string),
    entry("concat", 2..=MANY, concat),
    entry("starts-with", 2..=2, starts_with),
    entry("ends-with", 2..=2, ends_with),
    entry("contains", 2..=2, contains),
    entry("substring-before", 2..=2, substring_before),
    entry("substring-after", 2..=2, substring_after),
    entry("substring", 2..=3, substring),
    entry("string-length", 0..=1, string_length),
    entry("normalize-space", 0..=1, normalize_space),
    entry("translate", 3..=3, translate),
    entry("boolean", 1..=1, boolean),
    entry("not", 1..=1, not),
    entry("true", 0..=0, ftrue),
    entry("false", 0..=0, ffalse),
    entry("lang", 1..=1, lang),
    entry("number", 0..=1, number),
    entry("sum", 1..=1, sum),
    entry("floor", 1..=1, floor),
    entry("ceiling", 1..=1, ceiling),
    entry("round", 1..=1, round),
    entry("ext-join", 2..=2, ext_join),
    entry("ext-if", 3..=3, ext_if),
    entry("ext-cardinal", 1..=1, ext_cardinal),
    entry("generate-id", 0..=1, generate_id),
];

pub fn table() -> &'static [Entry] {
    TABLE
}

pub fn lookup(name: &str) -> Option<&'static Entry> {
    TABLE.iter().find(|v| v.name == name)
}

/// Calls a library function. An unknown name evaluates to `false`.
pub fn call<'a>(function: &FunctionCallExpr, context: &Context<'a>) -> error::Result<Value<'a>> {
    let entry = match lookup(&function.name) {
        Some(entry) => entry,
        None => {
            log::warn!("unknown function {}(), evaluating to false", function.name);
            return Ok(Value::Boolean(false));
        }
    };

    if !entry.args.contains(&function.args.len()) {
        return Err(error::Error::InvalidArgumentCount(format!(
            "{}() takes {} to {} arguments, got {}",
            entry.name,
            entry.min_args(),
            entry.max_args(),
            function.args.len()
        )));
    }

    (entry.call)(&function.args, context)
}

// -----------------------------------------------------------------------------------------------

/// Argument `index`, or the context node when it was omitted.
fn arg<'a>(args: &[Expr], index: usize, context: &Context<'a>) -> error::Result<Value<'a>> {
    match args.get(index) {
        Some(expr) => eval_expr(expr, &context.exhaustive()),
        None => Ok(context.node().as_value()),
    }
}

fn string_arg(args: &[Expr], index: usize, context: &Context) -> error::Result<String> {
    Ok(String::from(&arg(args, index, context)?))
}

fn number_arg(args: &[Expr], index: usize, context: &Context) -> error::Result<f64> {
    Ok(f64::from(&arg(args, index, context)?))
}

fn bool_arg(args: &[Expr], index: usize, context: &Context) -> error::Result<bool> {
    Ok(bool::from(&arg(args, index, context)?))
}

fn first_node<'a>(args: &[Expr], context: &Context<'a>) -> error::Result<Option<XmlNode<'a>>> {
    Ok(arg(args, 0, context)?.node_set()?.first().copied())
}

/// XPath `round`: halves round up.
fn round_half_up(value: f64) -> f64 {
    if value.is_nan() || value.is_infinite() {
        value
    } else {
        (value + 0.5).floor()
    }
}

// -----------------------------------------------------------------------------------------------

fn last<'a>(_: &[Expr], context: &Context<'a>) -> error::Result<Value<'a>> {
    Ok(context.size().as_value())
}

fn position<'a>(_: &[Expr], context: &Context<'a>) -> error::Result<Value<'a>> {
    Ok((context.position() + 1).as_value())
}

fn count<'a>(args: &[Expr], context: &Context<'a>) -> error::Result<Value<'a>> {
    Ok(arg(args, 0, context)?.node_set()?.len().as_value())
}

fn id<'a>(args: &[Expr], context: &Context<'a>) -> error::Result<Value<'a>> {
    let ids = match arg(args, 0, context)? {
        Value::Node(nodes) => nodes
            .iter()
            .map(|v| v.as_string_value())
            .collect::<Vec<String>>()
            .join(" "),
        v => String::from(&v),
    };

    let document = context.node().document();
    let mut nodes: Vec<XmlNode<'a>> = vec![];
    for id in ids.split_whitespace() {
        if let Some(element) = document.get_element_by_id(id) {
            if !nodes.contains(&element) {
                nodes.push(element);
            }
        }
    }
    Ok(Value::Node(nodes))
}

fn local_name<'a>(args: &[Expr], context: &Context<'a>) -> error::Result<Value<'a>> {
    let name = match first_node(args, context)? {
        Some(node) if is_named(node) => node.local_name(),
        _ => "",
    };
    Ok(name.as_value())
}

fn namespace_uri<'a>(_: &[Expr], _: &Context<'a>) -> error::Result<Value<'a>> {
    Err(error::Error::NotImplemented("namespace-uri()".to_string()))
}

fn name<'a>(args: &[Expr], context: &Context<'a>) -> error::Result<Value<'a>> {
    let name = match first_node(args, context)? {
        Some(node) if is_named(node) => node.node_name(),
        _ => "",
    };
    Ok(name.as_value())
}

fn is_named(node: XmlNode) -> bool {
    matches!(
        node.node_type(),
        NodeType::Element | NodeType::Attribute | NodeType::PI
    )
}

// -----------------------------------------------------------------------------------------------

fn string<'a>(args: &[Expr], context: &Context<'a>) -> error::Result<Value<'a>> {
    Ok(Value::Text(string_arg(args, 0, context)?))
}

fn concat<'a>(args: &[Expr], context: &Context<'a>) -> error::Result<Value<'a>> {
    let mut s = String::new();
    for index in 0..args.len() {
        s.push_str(&string_arg(args, index, context)?);
    }
    Ok(Value::Text(s))
}

fn starts_with<'a>(args: &[Expr], context: &Context<'a>) -> error::Result<Value<'a>> {
    let s1 = string_arg(args, 0, context)?;
    let s2 = string_arg(args, 1, context)?;
    Ok(Value::Boolean(s1.starts_with(&s2)))
}

fn ends_with<'a>(args: &[Expr], context: &Context<'a>) -> error::Result<Value<'a>> {
    let s1 = string_arg(args, 0, context)?;
    let s2 = string_arg(args, 1, context)?;
    Ok(Value::Boolean(s1.ends_with(&s2)))
}

fn contains<'a>(args: &[Expr], context: &Context<'a>) -> error::Result<Value<'a>> {
    let s1 = string_arg(args, 0, context)?;
    let s2 = string_arg(args, 1, context)?;
    Ok(Value::Boolean(s1.contains(&s2)))
}

fn substring_before<'a>(args: &[Expr], context: &Context<'a>) -> error::Result<Value<'a>> {
    let s1 = string_arg(args, 0, context)?;
    let s2 = string_arg(args, 1, context)?;
    let r = s1.split_once(&s2).map(|v| v.0).unwrap_or_default();
    Ok(Value::Text(r.to_string()))
}

fn substring_after<'a>(args: &[Expr], context: &Context<'a>) -> error::Result<Value<'a>> {
    let s1 = string_arg(args, 0, context)?;
    let s2 = string_arg(args, 1, context)?;
    let r = s1.split_once(&s2).map(|v| v.1).unwrap_or_default();
    Ok(Value::Text(r.to_string()))
}

/// Characters at 1-based positions `p` with `round(start) <= p < round(start) + round(length)`.
fn substring<'a>(args: &[Expr], context: &Context<'a>) -> error::Result<Value<'a>> {
    let v = string_arg(args, 0, context)?;
    let start = round_half_up(number_arg(args, 1, context)?);
    let end = if args.len() > 2 {
        start + round_half_up(number_arg(args, 2, context)?)
    } else {
        f64::INFINITY
    };

    let r = v
        .chars()
        .enumerate()
        .filter(|(i, _)| {
            let p = (*i + 1) as f64;
            p >= start && p < end
        })
        .map(|(_, c)| c)
        .collect::<String>();
    Ok(Value::Text(r))
}

fn string_length<'a>(args: &[Expr], context: &Context<'a>) -> error::Result<Value<'a>> {
    Ok(string_arg(args, 0, context)?.chars().count().as_value())
}

fn normalize_space<'a>(args: &[Expr], context: &Context<'a>) -> error::Result<Value<'a>> {
    let r = string_arg(args, 0, context)?;
    let w = r
        .split(|c| matches!(c, ' ' | '\t' | '\r' | '\n'))
        .filter(|v| !v.is_empty())
        .collect::<Vec<&str>>();
    Ok(Value::Text(w.join(" ")))
}

fn translate<'a>(args: &[Expr], context: &Context<'a>) -> error::Result<Value<'a>> {
    let s1 = string_arg(args, 0, context)?;
    let s2 = string_arg(args, 1, context)?;
    let s3 = string_arg(args, 2, context)?;
    let mut r = String::new();
    for ch in s1.chars() {
        if let Some(index) = s2.chars().position(|v| v == ch) {
            if let Some(ch) = s3.chars().nth(index) {
                r.push(ch);
            }
        } else {
            r.push(ch)
        }
    }
    Ok(Value::Text(r))
}

// -----------------------------------------------------------------------------------------------

fn boolean<'a>(args: &[Expr], context: &Context<'a>) -> error::Result<Value<'a>> {
    Ok(Value::Boolean(bool_arg(args, 0, context)?))
}

fn not<'a>(args: &[Expr], context: &Context<'a>) -> error::Result<Value<'a>> {
    Ok(Value::Boolean(!bool_arg(args, 0, context)?))
}

fn ftrue<'a>(_: &[Expr], _: &Context<'a>) -> error::Result<Value<'a>> {
    Ok(Value::Boolean(true))
}

fn ffalse<'a>(_: &[Expr], _: &Context<'a>) -> error::Result<Value<'a>> {
    Ok(Value::Boolean(false))
}

/// The nearest `xml:lang` (or `lang`) decides.
fn lang<'a>(args: &[Expr], context: &Context<'a>) -> error::Result<Value<'a>> {
    let name = string_arg(args, 0, context)?;

    let mut n = Some(context.node());
    while let Some(node) = n {
        if let Some(value) = node
            .get_attribute("xml:lang")
            .or_else(|| node.get_attribute("lang"))
        {
            let matched = value.eq_ignore_ascii_case(&name)
                || value
                    .get(..name.len())
                    .filter(|v| v.eq_ignore_ascii_case(&name))
                    .and_then(|_| value[name.len()..].chars().next())
                    .map(|c| c == '-' || c == '_')
                    .unwrap_or_default();
            return Ok(Value::Boolean(matched));
        }

        n = node.parent_node();
    }

    Ok(Value::Boolean(false))
}

// -----------------------------------------------------------------------------------------------

fn number<'a>(args: &[Expr], context: &Context<'a>) -> error::Result<Value<'a>> {
    Ok(Value::Number(number_arg(args, 0, context)?))
}

fn sum<'a>(args: &[Expr], context: &Context<'a>) -> error::Result<Value<'a>> {
    let s = arg(args, 0, context)?
        .node_set()?
        .iter()
        .map(|v| model::parse_number(&v.as_string_value()))
        .sum::<f64>();
    Ok(Value::Number(s))
}

fn floor<'a>(args: &[Expr], context: &Context<'a>) -> error::Result<Value<'a>> {
    Ok(Value::Number(number_arg(args, 0, context)?.floor()))
}

fn ceiling<'a>(args: &[Expr], context: &Context<'a>) -> error::Result<Value<'a>> {
    Ok(Value::Number(number_arg(args, 0, context)?.ceil()))
}

fn round<'a>(args: &[Expr], context: &Context<'a>) -> error::Result<Value<'a>> {
    Ok(Value::Number(round_half_up(number_arg(args, 0, context)?)))
}

// -----------------------------------------------------------------------------------------------

/// ext-join(node-set, delimiter)
fn ext_join<'a>(args: &[Expr], context: &Context<'a>) -> error::Result<Value<'a>> {
    let nodes = arg(args, 0, context)?.into_node_set()?;
    let delimiter = string_arg(args, 1, context)?;
    let r = nodes
        .iter()
        .map(|v| v.as_string_value())
        .collect::<Vec<String>>()
        .join(&delimiter);
    Ok(Value::Text(r))
}

/// ext-if(condition, then, else), evaluating only the chosen branch.
fn ext_if<'a>(args: &[Expr], context: &Context<'a>) -> error::Result<Value<'a>> {
    if bool_arg(args, 0, context)? {
        arg(args, 1, context)
    } else {
        arg(args, 2, context)
    }
}

/// ext-cardinal(n): the context node `n` times, empty unless `n` is finite and positive.
fn ext_cardinal<'a>(args: &[Expr], context: &Context<'a>) -> error::Result<Value<'a>> {
    let n = number_arg(args, 0, context)?;
    if !n.is_finite() || n < 1f64 {
        return Ok(Value::Node(vec![]));
    }

    let n = n as usize;
    let mut nodes = vec![];
    nodes
        .try_reserve_exact(n)
        .map_err(|e| error::Error::TooLarge(format!("ext-cardinal({}): {}", n, e)))?;
    nodes.resize(n, context.node());
    Ok(Value::Node(nodes))
}

fn generate_id<'a>(_: &[Expr], _: &Context<'a>) -> error::Result<Value<'a>> {
    Err(error::Error::NotImplemented("generate-id()".to_string()))
}

// -----------------------------------------------------------------------------------------------
