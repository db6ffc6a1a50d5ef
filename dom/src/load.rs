use crate::{error, NodeId, XmlDocument};

impl XmlDocument {
    /// Builds a document from XML text.
    pub fn parse(text: &str) -> error::Result<Self> {
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        let tree = roxmltree::Document::parse_with_options(text, options)?;

        let mut doc = XmlDocument::new();
        let root = doc.root();
        for child in tree.root().children() {
            doc.load(root, child)?;
        }

        log::debug!("loaded document with {} nodes", doc.slots.len());
        Ok(doc)
    }

    fn load(&mut self, parent: NodeId, node: roxmltree::Node) -> error::Result<()> {
        let id = match node.node_type() {
            roxmltree::NodeType::Element => {
                let id = self.create_element(&qualified_name(
                    node,
                    node.tag_name().namespace(),
                    node.tag_name().name(),
                ));
                for attr in node.attributes() {
                    let name = qualified_name(node, attr.namespace(), attr.name());
                    self.set_attribute(id, &name, attr.value())?;
                }
                id
            }
            roxmltree::NodeType::Text => self.create_text_node(node.text().unwrap_or_default()),
            roxmltree::NodeType::Comment => self.create_comment(node.text().unwrap_or_default()),
            roxmltree::NodeType::PI => match node.pi() {
                Some(pi) => {
                    self.create_processing_instruction(pi.target, pi.value.unwrap_or_default())
                }
                None => return Ok(()),
            },
            roxmltree::NodeType::Root => return Ok(()),
        };

        self.append_child(parent, id)?;

        for child in node.children() {
            self.load(id, child)?;
        }

        Ok(())
    }
}

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

fn qualified_name(node: roxmltree::Node, namespace: Option<&str>, local: &str) -> String {
    if namespace == Some(XML_NAMESPACE) {
        return format!("xml:{}", local);
    }

    match namespace.and_then(|v| node.lookup_prefix(v)) {
        Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, local),
        _ => local.to_string(),
    }
}

// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::*;

    #[test]
    fn test_parse_elements() {
        let doc = XmlDocument::parse("<root a=\"1\"><x>t</x><!--c--><?pi data?></root>").unwrap();
        let root = doc.document_element().unwrap();
        assert_eq!("root", root.node_name());
        assert_eq!(Some("1"), root.get_attribute("a"));
        assert_eq!(3, root.child_nodes().length());
        assert_eq!(NodeType::Comment, root.child_nodes().item(1).unwrap().node_type());
        assert_eq!(
            "<root a=\"1\"><x>t</x><!--c--><?pi data?></root>",
            format!("{}", root)
        );
    }

    #[test]
    fn test_parse_prefixed_name() {
        let doc = XmlDocument::parse(
            "<xsl:stylesheet xmlns:xsl=\"http://www.w3.org/1999/XSL/Transform\" xml:lang=\"en\"/>",
        )
        .unwrap();
        let root = doc.document_element().unwrap();
        assert_eq!("xsl:stylesheet", root.node_name());
        assert_eq!("stylesheet", root.local_name());
        assert_eq!(Some("en"), root.get_attribute("xml:lang"));
    }

    #[test]
    fn test_parse_error() {
        let err = XmlDocument::parse("<root>").err().unwrap();
        assert!(matches!(err, error::Error::Parse(_)));
    }
}
