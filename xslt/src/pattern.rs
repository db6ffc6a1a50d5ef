use crate::error;
use std::rc::Rc;
use xml_dom::{Node, NodeType};
use xml_xpath::expr::model::{AxisName, NodeTest};
use xml_xpath::{eval, Context, Expr};

/// Tests whether the context node matches the XSLT pattern `pattern`.
pub fn matches(pattern: &str, context: &Context) -> error::Result<bool> {
    let expr = xml_xpath::parse(pattern)?;
    matches_expr(&expr, context)
}

pub fn matches_expr(expr: &Expr, context: &Context) -> error::Result<bool> {
    let node = context.node();

    if let Some(node_test) = single_child_test(expr) {
        log::debug!("matching {} by node test", expr);
        let child = node.parent_node().is_some() && node.node_type() != NodeType::Attribute;
        return Ok(child && eval::test_node(node_test, node, context.options()));
    }

    let mut current = Some(node);
    while let Some(origin) = current {
        let ctx = context.child(origin, 0, Rc::from(vec![origin]));
        if let xml_xpath::Value::Node(nodes) = expr.evaluate(&ctx)? {
            if nodes.contains(&node) {
                return Ok(true);
            }
        }
        current = origin.parent_node();
    }

    Ok(false)
}

fn single_child_test(expr: &Expr) -> Option<&NodeTest> {
    match single_step(expr) {
        Some((AxisName::Child, node_test)) => Some(node_test),
        _ => None,
    }
}

/// The axis and node test of a relative, single-step pattern without predicates.
fn single_step(expr: &Expr) -> Option<(AxisName, &NodeTest)> {
    match expr {
        Expr::Location(v) if !v.absolute => match v.steps.as_slice() {
            [step] if step.predicates.is_empty() => Some((step.axis, &step.node_test)),
            _ => None,
        },
        _ => None,
    }
}

// -----------------------------------------------------------------------------------------------

/// Default priority of a template pattern (XSLT 1.0, 5.5).
pub fn default_priority(expr: &Expr) -> f64 {
    if let Expr::Union(union) = expr {
        return default_priority(&union.left).max(default_priority(&union.right));
    }

    match single_step(expr) {
        Some((AxisName::Child | AxisName::Attribute, node_test)) => match node_test {
            NodeTest::Name(_) => 0.0,
            NodeTest::PI(Some(_)) => 0.0,
            NodeTest::NamespacePrefix(_) => -0.25,
            _ => -0.5,
        },
        _ => 0.5,
    }
}

#[derive(Clone, Debug)]
pub struct Template {
    pub pattern: Rc<Expr>,
    pub priority: f64,
}

impl Template {
    /// A template whose priority is `priority`, or the pattern's default.
    pub fn new(pattern: &str, priority: Option<f64>) -> error::Result<Self> {
        let pattern = xml_xpath::parse(pattern)?;
        let priority = priority.unwrap_or_else(|| default_priority(&pattern));
        Ok(Template { pattern, priority })
    }

    pub fn matches(&self, context: &Context) -> error::Result<bool> {
        matches_expr(&self.pattern, context)
    }
}

/// The matching template of highest priority, the last one winning ties.
pub fn select_template<'t>(
    templates: &'t [Template],
    context: &Context,
) -> error::Result<Option<&'t Template>> {
    let mut selected: Option<&Template> = None;
    for template in templates {
        if !template.matches(context)? {
            continue;
        }

        match selected {
            Some(v) if v.priority > template.priority => {}
            _ => selected = Some(template),
        }
    }
    Ok(selected)
}

// -----------------------------------------------------------------------------------------------
