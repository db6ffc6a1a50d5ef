pub mod error;
pub mod eval;
pub mod expr;

pub use eval::model::{AsValue, Context, Options, Value};
pub use expr::model::Expr;
pub use expr::{parse, parse_with_axis, Parser};

#[cfg(test)]
mod tests {
    use super::*;
    use xml_dom::{AsStringValue, Node, XmlDocument};

    fn select(xml: &str, text: &str) -> String {
        let doc = XmlDocument::parse(xml).unwrap();
        let context = Context::new(doc.document_node());
        let r = parse(text).unwrap().evaluate(&context).unwrap();
        format!("{}", r)
    }

    #[test]
    fn test_eg_location_path_para() {
        assert_eq!("<para></para>", select("<para />", "child::para"));
    }

    #[test]
    fn test_eg_location_path_ns() {
        assert_eq!("<a></a>", select("<a />", "child::*"));
    }

    #[test]
    fn test_eg_location_path_text() {
        let xml = "<root>text1<para />text2</root>";
        assert_eq!("text1text2", select(xml, "root/child::text()"));
    }

    #[test]
    fn test_eg_location_path_node() {
        let xml = "<root>text1<para />text2</root>";
        assert_eq!("text1<para></para>text2", select(xml, "root/child::node()"));
    }

    #[test]
    fn test_eg_location_path_attr() {
        let xml = "<root name='a'></root>";
        assert_eq!("<root name=\"a\"></root>", select(xml, "root[attribute::name]"));
        assert_eq!("<root name=\"a\"></root>", select(xml, "root[attribute::*]"));
        assert_eq!("", select(xml, "root[attribute::other]"));
    }

    #[test]
    fn test_eg_location_path_descendant_para() {
        let xml = "<root>text1<para />text2</root>";
        assert_eq!("<para></para>", select(xml, "descendant::para"));
        assert_eq!("<para></para>", select(xml, "descendant-or-self::para"));
    }

    #[test]
    fn test_eg_location_path_ancestor_div() {
        let xml = "<root><div><para /></div></root>";
        assert_eq!("<div><para></para></div>", select(xml, "//ancestor::div"));
        assert_eq!("<div><para></para></div>", select(xml, "//ancestor-or-self::div"));
    }

    #[test]
    fn test_eg_location_path_self_para() {
        let xml = "<root><para /></root>";
        assert_eq!("<para></para>", select(xml, "root/para/self::para"));
    }

    #[test]
    fn test_eg_location_path_chapter_para() {
        let xml = "<root><chapter><section><para /></section></chapter></root>";
        assert_eq!(
            "<para></para>",
            select(xml, "root/child::chapter/descendant::para")
        );

        let xml = "<root><chapter><para /></chapter></root>";
        assert_eq!("<para></para>", select(xml, "root/child::*/child::para"));
    }

    #[test]
    fn test_eg_location_path_root() {
        assert_eq!("<root></root>", select("<root></root>", "/"));

        let xml = "<root><chapter><para /></chapter></root>";
        assert_eq!("<para></para>", select(xml, "/descendant::para"));

        let xml = "<root><olist><item /></olist></root>";
        assert_eq!("<item></item>", select(xml, "/descendant::olist/child::item"));
    }

    #[test]
    fn test_eg_location_path_position() {
        let xml = "<root><para>1</para><para>2</para></root>";
        assert_eq!("<para>1</para>", select(xml, "root/child::para[position()=1]"));
        assert_eq!(
            "<para>2</para>",
            select(xml, "root/child::para[position()=last()]")
        );
        assert_eq!(
            "<para>1</para>",
            select(xml, "root/child::para[position()=last()-1]")
        );
        assert_eq!("<para>2</para>", select(xml, "root/child::para[position()>1]"));
    }

    #[test]
    fn test_eg_location_path_siblings() {
        let xml = "<root><para /><chapter>1</chapter><chapter>2</chapter></root>";
        assert_eq!(
            "<chapter>1</chapter>",
            select(xml, "root/para/following-sibling::chapter[position()=1]")
        );

        let xml = "<root><chapter>1</chapter><chapter>2</chapter><para /></root>";
        assert_eq!(
            "<chapter>2</chapter>",
            select(xml, "root/para/preceding-sibling::chapter[position()=1]")
        );
        assert_eq!(
            "<chapter>1</chapter>",
            select(xml, "(root/para/preceding-sibling::chapter)[position()=1]")
        );
    }

    #[test]
    fn test_eg_location_path_figure_42() {
        let xml = "<root><figure>1</figure><figure>2</figure></root>";
        assert_eq!("", select(xml, "/descendant::figure[position()=42]"));
    }

    #[test]
    fn test_eg_location_path_chapter_2_section_2() {
        let xml = "<doc><chapter>1</chapter><chapter><section>1</section><section>2</section></chapter></doc>";
        assert_eq!(
            "<section>2</section>",
            select(
                xml,
                "/child::doc/child::chapter[position()=2]/child::section[position()=2]"
            )
        );
    }

    #[test]
    fn test_eg_location_path_para_warning() {
        let xml = "<root><para type='error' /><para type='warning' /><para type='normal' /></root>";
        assert_eq!(
            "<para type=\"warning\"></para>",
            select(xml, "root/child::para[attribute::type=\"warning\"]")
        );
        assert_eq!(
            "<para type=\"warning\"></para>",
            select(xml, "root/para[@type=\"warning\"]")
        );
    }

    #[test]
    fn test_eg_location_path_para_warning_5() {
        let xml = "<root><para type='warning'>1</para><para type='error' /><para type='warning'>2</para><para type='normal' /><para type='warning'>3</para><para type='warning'>4</para><para type='warning'>5</para></root>";
        assert_eq!(
            "<para type=\"warning\">5</para>",
            select(
                xml,
                "root/child::para[attribute::type='warning'][position()=5]"
            )
        );
        assert_eq!(
            "<para type=\"warning\">3</para>",
            select(
                xml,
                "root/child::para[position()=5][attribute::type=\"warning\"]"
            )
        );
        assert_eq!(
            "<para type=\"warning\">5</para>",
            select(xml, "root/para[@type=\"warning\"][5]")
        );
        assert_eq!(
            "<para type=\"warning\">3</para>",
            select(xml, "root/para[5][@type=\"warning\"]")
        );
    }

    #[test]
    fn test_eg_location_path_chapter_title() {
        let xml = "<root><chapter><title>Introduction</title></chapter><chapter><title>Second</title></chapter></root>";
        assert_eq!(
            "<chapter><title>Introduction</title></chapter>",
            select(xml, "root/child::chapter[child::title='Introduction']")
        );
        assert_eq!(
            "<chapter><title>Introduction</title></chapter>",
            select(xml, "root/chapter[title=\"Introduction\"]")
        );

        let xml = "<root><chapter></chapter><chapter><title /></chapter></root>";
        assert_eq!(
            "<chapter><title></title></chapter>",
            select(xml, "root/child::chapter[child::title]")
        );
        assert_eq!(
            "<chapter><title></title></chapter>",
            select(xml, "root/chapter[title]")
        );
    }

    #[test]
    fn test_eg_location_path_chapter_or_appendix() {
        let xml = "<root><chapter /><para><chapter /></para><appendix /><chapter /></root>";
        assert_eq!(
            "<chapter></chapter><appendix></appendix><chapter></chapter>",
            select(xml, "root/child::*[self::chapter or self::appendix]")
        );
        assert_eq!(
            "<chapter></chapter>",
            select(
                xml,
                "root/child::*[self::chapter or self::appendix][position()=last()]"
            )
        );
    }

    #[test]
    fn test_eg_abbreviated() {
        assert_eq!("<para></para>", select("<para></para>", "para"));
        assert_eq!("<para></para>", select("<para></para>", "*"));
        assert_eq!("<para></para>", select("<para></para>", "/para"));
        assert_eq!("a", select("<root>a</root>", "root/text()"));
        assert_eq!("name=\"a\"", select("<root name='a'></root>", "root/@name"));
        assert_eq!("name=\"a\"", select("<root name='a'></root>", "root/@*"));
        assert_eq!("<root></root>", select("<root></root>", "."));
    }

    #[test]
    fn test_eg_abbreviated_para_index() {
        let xml = "<root><para>2</para><para>1</para></root>";
        assert_eq!("<para>2</para>", select(xml, "root/para[1]"));
        assert_eq!("<para>1</para>", select(xml, "root/para[last()]"));
    }

    #[test]
    fn test_eg_abbreviated_chapter_5_section_2() {
        let xml = "<doc><chapter/><chapter/><chapter/><chapter/><chapter><section/><section>section</section><section/></chapter></doc>";
        assert_eq!(
            "<section>section</section>",
            select(xml, "/doc/chapter[5]/section[2]")
        );
    }

    #[test]
    fn test_eg_abbreviated_descendant_para() {
        let xml = "<chapter><para>1</para><a><para>2</para></a><para>3</para></chapter>";
        let expected = "<para>1</para><para>2</para><para>3</para>";
        assert_eq!(expected, select(xml, "chapter//para"));
        assert_eq!(expected, select(xml, "//para"));
        assert_eq!(expected, select(xml, "chapter/.//para"));

        let xml = "<root><para><item>1</item><olist><item>2</item></olist></para><item>3</item></root>";
        assert_eq!("<item>2</item>", select(xml, "//olist/item"));
    }

    #[test]
    fn test_eg_abbreviated_parent() {
        assert_eq!(
            "<root><para></para></root>",
            select("<root><para /></root>", "root/para/..")
        );
        assert_eq!(
            "lang=\"a\"",
            select("<root lang='a'><para /></root>", "//para/../@lang")
        );
    }

    #[test]
    fn test_eg_abbreviated_employee() {
        let xml = "<root><employee secretary='a'/><employee secretary='a' assistant='b' /><employee a='b'/><employee assistant='b'/></root>";
        assert_eq!(
            "<employee secretary=\"a\" assistant=\"b\"></employee>",
            select(xml, "root/employee[@secretary and @assistant]")
        );
    }

    #[test]
    fn test_eg_namespace_axis() {
        let doc = XmlDocument::parse("<root xmlns:a='http://test/a'><e2 /></root>").unwrap();
        let context = Context::new(doc.document_node());
        let r = parse("root/e2/namespace::a").unwrap().evaluate(&context);
        assert!(matches!(r, Err(eval::error::Error::NotImplemented(_))));
    }

    #[test]
    fn test_eg_subtraction() {
        let xml = "<r><foo-bar>1</foo-bar><foo>5</foo><bar>2</bar></r>";
        assert_eq!("<foo-bar>1</foo-bar>", select(xml, "r/foo-bar"));
        assert_eq!("3", select(xml, "r/foo - r/bar"));
        assert_eq!("3", select(xml, "r/foo -r/bar"));
        assert!(parse("foo- bar").is_err());
    }

    #[test]
    fn test_scenario_location_attribute() {
        let doc = XmlDocument::parse(
            "<page><request><q>new york</q></request><location lat=\"100\" lon=\"100\"/></page>",
        )
        .unwrap();
        let context = Context::new(doc.document_element().unwrap());

        let r = parse("//location/@lat").unwrap().evaluate(&context).unwrap();
        let nodes = r.node_set().unwrap();
        assert_eq!(1, nodes.len());
        assert_eq!("lat", nodes[0].node_name());
        assert_eq!("100", nodes[0].as_string_value());
        assert_eq!("100", String::from(&r));
    }

    #[test]
    fn test_scenario_without_document_nodes() {
        let doc = XmlDocument::new();
        let context = Context::new(doc.document_node());

        let cases = [
            ("substring('12345', 0, 3)", Value::Text("12".to_string())),
            ("5 mod -2", Value::Number(1f64)),
            ("-5 mod -2", Value::Number(-1f64)),
            ("5 mod 2", Value::Number(1f64)),
            ("-5 mod 2", Value::Number(-1f64)),
            ("foo-bar()", Value::Boolean(false)),
        ];
        for (text, expected) in cases {
            assert_eq!(expected, parse(text).unwrap().evaluate(&context).unwrap());
        }
    }

    #[test]
    fn test_scenario_parse_cache() {
        let doc = XmlDocument::parse("<r><a>1</a><a>2</a><b>3</b></r>").unwrap();
        let context = Context::new(doc.document_node());

        for text in ["//a", "sum(//a) + count(r/b)", "r/*[2]", "string(//b)"] {
            let first = parse(text).unwrap();
            let second = parse(text).unwrap();
            assert_eq!(
                first.evaluate(&context).unwrap(),
                second.evaluate(&context).unwrap()
            );
        }
    }

    #[test]
    fn test_scenario_union_dedup() {
        let doc = XmlDocument::parse("<r><a/><x><a/></x><a/></r>").unwrap();
        let context = Context::new(doc.document_node());

        let r = parse("(//a | //a)").unwrap().evaluate(&context).unwrap();
        assert_eq!(3, r.node_set().unwrap().len());
    }

    #[test]
    fn test_scenario_predicate_reindex() {
        let xml = "<r><n>A</n><n>B</n><n>C</n><n>D</n></r>";
        assert_eq!("<n>B</n>", select(xml, "r/n[position()=2][position()=1]"));
    }
}
