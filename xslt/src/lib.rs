pub mod error;
pub mod pattern;
pub mod sort;

pub use pattern::{default_priority, matches, select_template, Template};
pub use sort::{sort, DataType, Order, SortSpec};

#[cfg(test)]
mod tests {
    use super::*;
    use xml_dom::{AsStringValue, XmlDocument};
    use xml_xpath::{Context, Options};

    #[test]
    fn test_scenario_sort_items() {
        let doc = XmlDocument::parse(
            "<all><item pos=\"2\">A</item><item pos=\"3\">B</item><item pos=\"1\">C</item></all>",
        )
        .unwrap();
        let root = Context::new(doc.document_node());
        let nodes = xml_xpath::parse("all/item")
            .unwrap()
            .evaluate(&root)
            .unwrap()
            .into_node_set()
            .unwrap();
        let mut context = Context::from_list(nodes, 0, Options::default()).unwrap();

        let spec =
            SortSpec::from_attributes(Some("@pos"), Some("text"), Some("ascending")).unwrap();
        sort(&mut context, &[spec]).unwrap();

        let text = context
            .node_list()
            .iter()
            .map(|v| v.as_string_value())
            .collect::<String>();
        assert_eq!("CAB", text);
    }

    #[test]
    fn test_scenario_match_item_type() {
        let doc =
            XmlDocument::parse("<all><item type=\"X\">1</item><item type=\"Y\">2</item></all>")
                .unwrap();
        let items = doc.document_node().get_elements_by_tag_name("item");

        assert!(matches("item[@type='X']", &Context::new(items[0])).unwrap());
        assert!(!matches("item[@type='X']", &Context::new(items[1])).unwrap());
    }

    #[test]
    fn test_invalid_pattern() {
        let doc = XmlDocument::parse("<all/>").unwrap();
        let context = Context::new(doc.document_node());
        assert!(matches!(
            matches("item[", &context),
            Err(error::Error::XPath(_))
        ));
    }
}
