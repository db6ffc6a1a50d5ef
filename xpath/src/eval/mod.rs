mod axis;
pub mod error;
pub mod func;
pub mod model;

use crate::expr::model::{
    BinaryExpr, BinaryOperator, Expr, FilterExpr, LocationExpr, PathExpr, PredicateExpr, StepExpr,
    UnionExpr,
};
use model::{Context, Value};
use std::collections::HashSet;
use std::rc::Rc;
use xml_dom::{AsStringValue, Node, XmlNode};

pub use axis::test as test_node;

impl Expr {
    /// Evaluates this expression against `context`.
    pub fn evaluate<'a>(&self, context: &Context<'a>) -> error::Result<Value<'a>> {
        eval_expr(self, context)
    }
}

// -----------------------------------------------------------------------------------------------

pub(crate) fn eval_expr<'a>(expr: &Expr, context: &Context<'a>) -> error::Result<Value<'a>> {
    match expr {
        Expr::Location(v) => Ok(Value::Node(eval_location(v, context)?)),
        Expr::FunctionCall(v) => func::call(v, context),
        Expr::Union(v) => eval_union(v, context),
        Expr::Path(v) => eval_path(v, context),
        Expr::Filter(v) => eval_filter(v, context),
        Expr::UnaryMinus(v) => Ok(-eval_expr(v, &context.exhaustive())?),
        Expr::Binary(v) => eval_binary(v, context),
        Expr::Literal(v) => Ok(Value::Text(v.clone())),
        Expr::Number(v) => Ok(Value::Number(*v)),
        Expr::Variable(v) => context
            .variable(v)
            .ok_or_else(|| error::Error::UnknownVariable(v.clone())),
    }
}

// -----------------------------------------------------------------------------------------------

fn eval_location<'a>(
    location: &LocationExpr,
    context: &Context<'a>,
) -> error::Result<Vec<XmlNode<'a>>> {
    let node = if location.absolute {
        context.node().owner_document()
    } else {
        context.node()
    };

    eval_steps(&location.steps, node, context)
}

/// Applies `steps` from `node`. Under `return_on_first_match` the walk stops at the first node
/// that reaches the last step.
fn eval_steps<'a>(
    steps: &[StepExpr],
    node: XmlNode<'a>,
    context: &Context<'a>,
) -> error::Result<Vec<XmlNode<'a>>> {
    let (step, rest) = match steps.split_first() {
        Some(v) => v,
        None => return Ok(vec![node]),
    };

    let first_only = context.options().return_on_first_match;

    if first_only && !step.has_positional_predicate {
        for candidate in axis::select(step, node, context.options())? {
            if !accepts(&step.predicates, candidate, context)? {
                continue;
            }

            let found = eval_steps(rest, candidate, context)?;
            if !found.is_empty() {
                return Ok(found);
            }
        }
        return Ok(vec![]);
    }

    let nodes = eval_step(step, node, context)?;
    if rest.is_empty() {
        return Ok(nodes);
    }

    let mut result = UniqueNodes::default();
    for n in nodes {
        let found = eval_steps(rest, n, context)?;
        if first_only && !found.is_empty() {
            return Ok(found);
        }
        result.extend(found);
    }
    Ok(result.nodes)
}

/// Nodes in first-seen order, each kept once.
#[derive(Default)]
struct UniqueNodes<'a> {
    nodes: Vec<XmlNode<'a>>,
    seen: HashSet<XmlNode<'a>>,
}

impl<'a> UniqueNodes<'a> {
    fn extend(&mut self, other: Vec<XmlNode<'a>>) {
        for node in other {
            if self.seen.insert(node) {
                self.nodes.push(node);
            }
        }
    }
}

impl<'a> From<Vec<XmlNode<'a>>> for UniqueNodes<'a> {
    fn from(nodes: Vec<XmlNode<'a>>) -> Self {
        let seen = nodes.iter().copied().collect();
        UniqueNodes { nodes, seen }
    }
}

fn eval_step<'a>(
    step: &StepExpr,
    node: XmlNode<'a>,
    context: &Context<'a>,
) -> error::Result<Vec<XmlNode<'a>>> {
    let nodes = axis::select(step, node, context.options())?;
    eval_predicates(&step.predicates, nodes, context)
}

/// Filters `nodes` through each predicate in turn, positions counted within the survivors of
/// the previous predicate.
fn eval_predicates<'a>(
    predicates: &[PredicateExpr],
    nodes: Vec<XmlNode<'a>>,
    context: &Context<'a>,
) -> error::Result<Vec<XmlNode<'a>>> {
    let context = context.exhaustive();
    let mut nodes = nodes;

    for predicate in predicates {
        let list: Rc<[XmlNode<'a>]> = Rc::from(nodes);
        nodes = vec![];
        for (position, node) in list.iter().enumerate() {
            let inner = context.at(*node, position, Rc::clone(&list));
            if eval_predicate(predicate, &inner)? {
                nodes.push(*node);
            }
        }
    }

    Ok(nodes)
}

/// Whether `node` alone passes every predicate.
fn accepts<'a>(
    predicates: &[PredicateExpr],
    node: XmlNode<'a>,
    context: &Context<'a>,
) -> error::Result<bool> {
    if predicates.is_empty() {
        return Ok(true);
    }

    let inner = context.exhaustive().at(node, 0, Rc::from(vec![node]));
    for predicate in predicates {
        if !eval_predicate(predicate, &inner)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn eval_predicate(predicate: &PredicateExpr, context: &Context) -> error::Result<bool> {
    match eval_expr(&predicate.expr, context)? {
        Value::Number(n) => Ok(context.position() as f64 == n - 1f64),
        v => Ok(bool::from(&v)),
    }
}

// -----------------------------------------------------------------------------------------------

fn eval_path<'a>(path: &PathExpr, context: &Context<'a>) -> error::Result<Value<'a>> {
    let nodes = eval_expr(&path.filter, &context.exhaustive())?.into_node_set()?;
    let first_only = context.options().return_on_first_match;

    let mut result = UniqueNodes::default();
    for node in nodes {
        let found = eval_location(&path.rel, &context.at(node, 0, Rc::from(vec![node])))?;
        if first_only && !found.is_empty() {
            return Ok(Value::Node(found));
        }
        result.extend(found);
    }
    Ok(Value::Node(result.nodes))
}

fn eval_filter<'a>(filter: &FilterExpr, context: &Context<'a>) -> error::Result<Value<'a>> {
    let nodes = eval_expr(&filter.expr, &context.exhaustive())?.into_node_set()?;
    Ok(Value::Node(eval_predicates(&filter.predicates, nodes, context)?))
}

fn eval_union<'a>(union: &UnionExpr, context: &Context<'a>) -> error::Result<Value<'a>> {
    let mut nodes = UniqueNodes::from(eval_expr(&union.left, context)?.into_node_set()?);
    nodes.extend(eval_expr(&union.right, context)?.into_node_set()?);
    Ok(Value::Node(nodes.nodes))
}

// -----------------------------------------------------------------------------------------------

fn eval_binary<'a>(binary: &BinaryExpr, context: &Context<'a>) -> error::Result<Value<'a>> {
    let context = context.exhaustive();
    // both operands, no short-circuit
    let op1 = eval_expr(&binary.left, &context)?;
    let op2 = eval_expr(&binary.right, &context)?;

    let value = match binary.op {
        BinaryOperator::Or => Value::Boolean(bool::from(&op1) || bool::from(&op2)),
        BinaryOperator::And => Value::Boolean(bool::from(&op1) && bool::from(&op2)),
        BinaryOperator::Add => op1 + op2,
        BinaryOperator::Sub => op1 - op2,
        BinaryOperator::Mul => op1 * op2,
        BinaryOperator::Div => op1 / op2,
        BinaryOperator::Mod => op1 % op2,
        op => Value::Boolean(compare(op, &op1, &op2)),
    };
    Ok(value)
}

/// [3.4 Booleans](https://triple-underscore.github.io/XML/xpath10-ja.html#booleans)
fn compare(op: BinaryOperator, op1: &Value, op2: &Value) -> bool {
    match (op1, op2) {
        (Value::Node(a), Value::Node(b)) => a.iter().any(|x| {
            let x = Value::Text(x.as_string_value());
            b.iter()
                .any(|y| compare_scalar(op, &x, &Value::Text(y.as_string_value())))
        }),
        (Value::Node(a), Value::Boolean(_)) => {
            compare_scalar(op, &Value::Boolean(!a.is_empty()), op2)
        }
        (Value::Boolean(_), Value::Node(b)) => {
            compare_scalar(op, op1, &Value::Boolean(!b.is_empty()))
        }
        (Value::Node(a), _) => a
            .iter()
            .any(|x| compare_scalar(op, &Value::Text(x.as_string_value()), op2)),
        (_, Value::Node(b)) => b
            .iter()
            .any(|y| compare_scalar(op, op1, &Value::Text(y.as_string_value()))),
        _ => compare_scalar(op, op1, op2),
    }
}

fn compare_scalar(op: BinaryOperator, op1: &Value, op2: &Value) -> bool {
    match op {
        BinaryOperator::Equal | BinaryOperator::NotEqual => {
            let equal = if op1.is_bool() || op2.is_bool() {
                bool::from(op1) == bool::from(op2)
            } else if op1.is_number() || op2.is_number() {
                f64::from(op1) == f64::from(op2)
            } else {
                String::from(op1) == String::from(op2)
            };
            equal == (op == BinaryOperator::Equal)
        }
        BinaryOperator::Less => f64::from(op1) < f64::from(op2),
        BinaryOperator::LessOrEqual => f64::from(op1) <= f64::from(op2),
        BinaryOperator::Greater => f64::from(op1) > f64::from(op2),
        BinaryOperator::GreaterOrEqual => f64::from(op1) >= f64::from(op2),
        _ => false,
    }
}

// -----------------------------------------------------------------------------------------------
