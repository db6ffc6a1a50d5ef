use super::error;
use crate::expr;
use nom::character::complete::{char, multispace0};
use nom::combinator::{all_consuming, opt, recognize};
use nom::sequence::{delimited, pair};
use nom::IResult;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::ops;
use std::rc::Rc;
use xml_dom::{AsStringValue, XmlNode};

// -----------------------------------------------------------------------------------------------

/// Evaluation-mode flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Options {
    /// Compare element and attribute names ignoring case.
    pub case_insensitive: bool,
    /// The attribute axis skips attributes whose value is empty.
    pub ignore_attributes_without_value: bool,
    /// Location paths may stop at the first node that survives every step.
    pub return_on_first_match: bool,
    /// `node()` on the descendant axis only selects elements.
    pub ignore_non_element_nodes_for_node_test: bool,
}

#[derive(Debug, Default)]
struct Scope<'a> {
    variables: RefCell<HashMap<String, Value<'a>>>,
    parent: Option<Rc<Scope<'a>>>,
}

impl<'a> Scope<'a> {
    fn lookup(&self, name: &str) -> Option<Value<'a>> {
        match self.variables.borrow().get(name) {
            Some(value) => Some(value.clone()),
            None => self.parent.as_ref().and_then(|v| v.lookup(name)),
        }
    }
}

/// Context node, its 0-based position in the node list, the variables in scope and the flags.
#[derive(Clone, Debug)]
pub struct Context<'a> {
    node: XmlNode<'a>,
    position: usize,
    node_list: Rc<[XmlNode<'a>]>,
    scope: Rc<Scope<'a>>,
    options: Options,
}

impl<'a> Context<'a> {
    pub fn new(node: XmlNode<'a>) -> Self {
        Context::with_options(node, Options::default())
    }

    pub fn with_options(node: XmlNode<'a>, options: Options) -> Self {
        Context {
            node,
            position: 0,
            node_list: Rc::from(vec![node]),
            scope: Rc::default(),
            options,
        }
    }

    /// Context at `position` of `node_list`, `None` when the position is out of range.
    pub fn from_list(
        node_list: Vec<XmlNode<'a>>,
        position: usize,
        options: Options,
    ) -> Option<Self> {
        let node = *node_list.get(position)?;
        Some(Context {
            node,
            position,
            node_list: Rc::from(node_list),
            scope: Rc::default(),
            options,
        })
    }

    /// Context for `node` with a new variable scope nested in this one.
    pub fn child(&self, node: XmlNode<'a>, position: usize, node_list: Rc<[XmlNode<'a>]>) -> Self {
        Context {
            node,
            position,
            node_list,
            scope: Rc::new(Scope {
                variables: RefCell::default(),
                parent: Some(Rc::clone(&self.scope)),
            }),
            options: self.options,
        }
    }

    /// Context for `node` sharing this one's variables.
    pub(crate) fn at(
        &self,
        node: XmlNode<'a>,
        position: usize,
        node_list: Rc<[XmlNode<'a>]>,
    ) -> Self {
        Context {
            node,
            position,
            node_list,
            scope: Rc::clone(&self.scope),
            options: self.options,
        }
    }

    /// This context with the early-exit flag cleared.
    pub(crate) fn exhaustive(&self) -> Self {
        let mut context = self.clone();
        context.options.return_on_first_match = false;
        context
    }

    pub fn node(&self) -> XmlNode<'a> {
        self.node
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn size(&self) -> usize {
        self.node_list.len()
    }

    pub fn node_list(&self) -> &[XmlNode<'a>] {
        &self.node_list
    }

    /// Replaces the node list and moves to its first node.
    pub fn set_node_list(&mut self, node_list: Vec<XmlNode<'a>>) {
        if let Some(first) = node_list.first() {
            self.node = *first;
        }
        self.position = 0;
        self.node_list = Rc::from(node_list);
    }

    pub fn options(&self) -> Options {
        self.options
    }

    pub fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    /// Looks `name` up in this scope and then in the enclosing ones.
    pub fn variable(&self, name: &str) -> Option<Value<'a>> {
        self.scope.lookup(name)
    }

    pub fn set_variable(&mut self, name: &str, value: Value<'a>) {
        self.scope
            .variables
            .borrow_mut()
            .insert(name.to_string(), value);
    }

    /// Binds text the way it reads: `true`/`false` as booleans, numbers as numbers.
    pub fn set_variable_str(&mut self, name: &str, text: &str) {
        let value = match text {
            "true" => Value::Boolean(true),
            "false" => Value::Boolean(false),
            _ => match parse_number(text) {
                n if n.is_nan() => Value::Text(text.to_string()),
                n => Value::Number(n),
            },
        };
        self.set_variable(name, value);
    }
}

// -----------------------------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub enum Value<'a> {
    Boolean(bool),
    Node(Vec<XmlNode<'a>>),
    Number(f64),
    Text(String),
}

impl<'a> Default for Value<'a> {
    fn default() -> Self {
        Value::Node(vec![])
    }
}

/// function: string
impl<'a> From<&Value<'a>> for String {
    fn from(value: &Value<'a>) -> Self {
        match value {
            Value::Boolean(v) => {
                if *v {
                    "true".to_string()
                } else {
                    "false".to_string()
                }
            }
            Value::Node(v) => v.first().map(|n| n.as_string_value()).unwrap_or_default(),
            Value::Number(v) => format_number(*v),
            Value::Text(v) => v.to_string(),
        }
    }
}

/// function: boolean
impl<'a> From<&Value<'a>> for bool {
    fn from(value: &Value<'a>) -> Self {
        match value {
            Value::Boolean(v) => *v,
            Value::Node(v) => !v.is_empty(),
            Value::Number(v) => !(*v == 0f64 || v.is_nan()),
            Value::Text(v) => !v.is_empty(),
        }
    }
}

/// function: number
impl<'a> From<&Value<'a>> for f64 {
    fn from(value: &Value<'a>) -> Self {
        match value {
            Value::Boolean(v) => {
                if *v {
                    1f64
                } else {
                    0f64
                }
            }
            Value::Node(_) => parse_number(&String::from(value)),
            Value::Number(v) => *v,
            Value::Text(v) => parse_number(v),
        }
    }
}

impl<'a> AsStringValue for Value<'a> {
    fn as_string_value(&self) -> String {
        String::from(self)
    }
}

impl<'a> fmt::Display for Value<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Value::Boolean(v) => v.fmt(f),
            Value::Node(v) => {
                for n in v {
                    n.fmt(f)?;
                }
                Ok(())
            }
            Value::Number(v) => write!(f, "{}", format_number(*v)),
            Value::Text(v) => v.fmt(f),
        }
    }
}

impl<'a> ops::Add for Value<'a> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Value::Number(f64::from(&self) + f64::from(&rhs))
    }
}

impl<'a> ops::Sub for Value<'a> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Value::Number(f64::from(&self) - f64::from(&rhs))
    }
}

impl<'a> ops::Mul for Value<'a> {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Value::Number(f64::from(&self) * f64::from(&rhs))
    }
}

impl<'a> ops::Div for Value<'a> {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        Value::Number(f64::from(&self) / f64::from(&rhs))
    }
}

/// Truncating remainder: the sign follows the dividend.
impl<'a> ops::Rem for Value<'a> {
    type Output = Self;

    fn rem(self, rhs: Self) -> Self::Output {
        Value::Number(f64::from(&self) % f64::from(&rhs))
    }
}

impl<'a> ops::Neg for Value<'a> {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Value::Number(-f64::from(&self))
    }
}

impl<'a> Value<'a> {
    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Boolean(_))
    }

    pub fn is_node(&self) -> bool {
        matches!(self, Value::Node(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Value::Text(_))
    }

    /// The nodes of a node-set; any other value is an error.
    pub fn node_set(&self) -> error::Result<&[XmlNode<'a>]> {
        match self {
            Value::Node(v) => Ok(v),
            v => Err(error::Error::NotNodeSet(v.to_string())),
        }
    }

    pub fn into_node_set(self) -> error::Result<Vec<XmlNode<'a>>> {
        match self {
            Value::Node(v) => Ok(v),
            v => Err(error::Error::NotNodeSet(v.to_string())),
        }
    }
}

// -----------------------------------------------------------------------------------------------

pub trait AsValue<'a> {
    fn as_value(&self) -> Value<'a>;
}

impl<'a> AsValue<'a> for bool {
    fn as_value(&self) -> Value<'a> {
        Value::Boolean(*self)
    }
}

impl<'a> AsValue<'a> for XmlNode<'a> {
    fn as_value(&self) -> Value<'a> {
        Value::Node(vec![*self])
    }
}

impl<'a> AsValue<'a> for Vec<XmlNode<'a>> {
    fn as_value(&self) -> Value<'a> {
        Value::Node(self.clone())
    }
}

impl<'a> AsValue<'a> for f64 {
    fn as_value(&self) -> Value<'a> {
        Value::Number(*self)
    }
}

impl<'a> AsValue<'a> for usize {
    fn as_value(&self) -> Value<'a> {
        Value::Number(*self as f64)
    }
}

impl<'a> AsValue<'a> for String {
    fn as_value(&self) -> Value<'a> {
        Value::Text(self.clone())
    }
}

impl<'a> AsValue<'a> for &str {
    fn as_value(&self) -> Value<'a> {
        Value::Text(self.to_string())
    }
}

// -----------------------------------------------------------------------------------------------

pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "Infinity".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if value == 0f64 {
        // -0 as well
        "0".to_string()
    } else {
        value.to_string()
    }
}

/// '-'? Number, surrounded by optional whitespace
fn signed_number(input: &str) -> IResult<&str, &str> {
    delimited(
        multispace0,
        recognize(pair(opt(char('-')), expr::number)),
        multispace0,
    )(input)
}

pub fn parse_number(text: &str) -> f64 {
    all_consuming(signed_number)(text)
        .ok()
        .and_then(|(_, v)| v.parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

// -----------------------------------------------------------------------------------------------
