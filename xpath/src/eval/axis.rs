use super::error;
use super::model::Options;
use crate::expr::model::{AxisName, NodeTest, StepExpr};
use xml_dom::{Node, NodeType, XmlNode};

/// Nodes of the step's axis that pass its node test, in proximity order.
pub fn select<'a>(
    step: &StepExpr,
    node: XmlNode<'a>,
    options: Options,
) -> error::Result<Vec<XmlNode<'a>>> {
    let nodes = match step.axis {
        AxisName::Ancestor => ancestors(node, false),
        AxisName::AncestorOrSelf => ancestors(node, true),
        AxisName::Attribute => return Ok(attributes(&step.node_test, node, options)),
        AxisName::Child => node.child_nodes().iter().collect(),
        AxisName::Descendant | AxisName::DescendantOrSelf => {
            let include_self = step.axis == AxisName::DescendantOrSelf;
            if let Some(nodes) = indexed_descendants(&step.node_test, node, include_self, options) {
                return Ok(nodes);
            }
            descendants(node, include_self)
        }
        AxisName::Following => following(node),
        AxisName::FollowingSibling => following_siblings(node),
        AxisName::Namespace => {
            return Err(error::Error::NotImplemented("namespace axis".to_string()))
        }
        AxisName::Parent => node.parent_node().into_iter().collect(),
        AxisName::Preceding => preceding(node),
        AxisName::PrecedingSibling => preceding_siblings(node),
        AxisName::Current => vec![node],
    };

    Ok(nodes
        .into_iter()
        .filter(|v| test(&step.node_test, *v, options))
        .collect())
}

pub fn test(node_test: &NodeTest, node: XmlNode, options: Options) -> bool {
    let named = matches!(node.node_type(), NodeType::Element | NodeType::Attribute);
    match node_test {
        NodeTest::Any => true,
        NodeTest::ElementOrAttribute => named,
        NodeTest::Text => matches!(node.node_type(), NodeType::Text | NodeType::CData),
        NodeTest::Comment => node.node_type() == NodeType::Comment,
        NodeTest::PI(target) => {
            node.node_type() == NodeType::PI
                && target.as_ref().map(|v| v == node.node_name()).unwrap_or(true)
        }
        NodeTest::NamespacePrefix(prefix) => {
            named
                && node
                    .node_name()
                    .strip_prefix(prefix.as_str())
                    .map(|v| v.starts_with(':'))
                    .unwrap_or_default()
        }
        NodeTest::Name(name) => {
            named
                && if options.case_insensitive {
                    node.node_name().eq_ignore_ascii_case(name)
                } else {
                    node.node_name() == name
                }
        }
    }
}

// -----------------------------------------------------------------------------------------------

fn ancestors(node: XmlNode, include_self: bool) -> Vec<XmlNode> {
    let mut nodes = vec![];
    if include_self {
        nodes.push(node);
    }

    let mut current = node.parent_node();
    while let Some(n) = current {
        nodes.push(n);
        current = n.parent_node();
    }
    nodes
}

fn attributes<'a>(node_test: &NodeTest, node: XmlNode<'a>, options: Options) -> Vec<XmlNode<'a>> {
    let keep = |v: &XmlNode| {
        !options.ignore_attributes_without_value || !v.node_value().unwrap_or_default().is_empty()
    };

    match node_test {
        NodeTest::Name(name) if !options.case_insensitive => node
            .get_attribute_node(name)
            .into_iter()
            .filter(keep)
            .collect(),
        _ => node
            .attributes()
            .iter()
            .filter(keep)
            .filter(|v| test(node_test, *v, options))
            .collect(),
    }
}

/// Element-only descendant collection, `None` when the node test needs the full walk.
fn indexed_descendants<'a>(
    node_test: &NodeTest,
    node: XmlNode<'a>,
    include_self: bool,
    options: Options,
) -> Option<Vec<XmlNode<'a>>> {
    let tag_name = match node_test {
        NodeTest::Name(name) if !options.case_insensitive => name.as_str(),
        NodeTest::ElementOrAttribute => "*",
        NodeTest::Any if options.ignore_non_element_nodes_for_node_test => "*",
        _ => return None,
    };

    let mut nodes = vec![];
    if include_self {
        let matched = match node_test {
            NodeTest::Any => true,
            _ => {
                node.node_type() == NodeType::Element
                    && (tag_name == "*" || node.node_name() == tag_name)
            }
        };
        if matched {
            nodes.push(node);
        }
    }

    nodes.extend(node.get_elements_by_tag_name(tag_name));
    Some(nodes)
}

fn descendants(node: XmlNode, include_self: bool) -> Vec<XmlNode> {
    let mut nodes = vec![];
    if include_self {
        nodes.push(node);
    }
    collect_descendants(node, &mut nodes);
    nodes
}

fn collect_descendants<'a>(node: XmlNode<'a>, nodes: &mut Vec<XmlNode<'a>>) {
    for child in node.child_nodes().iter() {
        nodes.push(child);
        collect_descendants(child, nodes);
    }
}

fn following_siblings(node: XmlNode) -> Vec<XmlNode> {
    let mut nodes = vec![];
    let mut current = node.next_sibling();
    while let Some(n) = current {
        nodes.push(n);
        current = n.next_sibling();
    }
    nodes
}

fn preceding_siblings(node: XmlNode) -> Vec<XmlNode> {
    let mut nodes = vec![];
    let mut current = node.previous_sibling();
    while let Some(n) = current {
        nodes.push(n);
        current = n.previous_sibling();
    }
    nodes
}

/// Document order.
fn following(node: XmlNode) -> Vec<XmlNode> {
    let mut nodes = vec![];
    for n in ancestors(node, true) {
        for sibling in following_siblings(n) {
            nodes.push(sibling);
            collect_descendants(sibling, &mut nodes);
        }
    }
    nodes
}

/// Reverse document order.
fn preceding(node: XmlNode) -> Vec<XmlNode> {
    let mut nodes = vec![];
    for n in ancestors(node, true) {
        for sibling in preceding_siblings(n) {
            collect_reversed(sibling, &mut nodes);
        }
    }
    nodes
}

fn collect_reversed<'a>(node: XmlNode<'a>, nodes: &mut Vec<XmlNode<'a>>) {
    let children = node.child_nodes().iter().collect::<Vec<XmlNode>>();
    for child in children.into_iter().rev() {
        collect_reversed(child, nodes);
    }
    nodes.push(node);
}

// -----------------------------------------------------------------------------------------------
