use crate::error;
use std::cmp::Ordering;
use std::rc::Rc;
use std::str::FromStr;
use xml_dom::XmlNode;
use xml_xpath::{Context, Expr, Value};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DataType {
    #[default]
    Text,
    Number,
}

impl FromStr for DataType {
    type Err = error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(DataType::Text),
            "number" => Ok(DataType::Number),
            _ => Err(error::Error::InvalidDataType(s.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Order {
    #[default]
    Ascending,
    Descending,
}

impl FromStr for Order {
    type Err = error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ascending" => Ok(Order::Ascending),
            "descending" => Ok(Order::Descending),
            _ => Err(error::Error::InvalidOrder(s.to_string())),
        }
    }
}

// -----------------------------------------------------------------------------------------------

/// One `xsl:sort` key.
#[derive(Clone, Debug)]
pub struct SortSpec {
    pub select: Rc<Expr>,
    pub data_type: DataType,
    pub order: Order,
}

impl SortSpec {
    pub fn new(select: &str, data_type: DataType, order: Order) -> error::Result<Self> {
        Ok(SortSpec {
            select: xml_xpath::parse(select)?,
            data_type,
            order,
        })
    }

    /// Builds a key from `xsl:sort` attribute values, `select` defaulting to `.`.
    pub fn from_attributes(
        select: Option<&str>,
        data_type: Option<&str>,
        order: Option<&str>,
    ) -> error::Result<Self> {
        let data_type = data_type.map(DataType::from_str).transpose()?;
        let order = order.map(Order::from_str).transpose()?;
        SortSpec::new(
            select.unwrap_or("."),
            data_type.unwrap_or_default(),
            order.unwrap_or_default(),
        )
    }

    fn key(&self, value: &Value) -> Key {
        match self.data_type {
            DataType::Text => Key::Text(String::from(value)),
            DataType::Number => Key::Number(f64::from(value)),
        }
    }
}

#[derive(Debug)]
enum Key {
    Text(String),
    Number(f64),
}

impl Key {
    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Key::Text(a), Key::Text(b)) => a.cmp(b),
            (Key::Number(a), Key::Number(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        }
    }
}

// -----------------------------------------------------------------------------------------------

/// Reorders the node list of `context` by `specs` and moves it to the first node.
pub fn sort(context: &mut Context, specs: &[SortSpec]) -> error::Result<()> {
    if specs.is_empty() {
        return Ok(());
    }

    let list: Rc<[XmlNode]> = Rc::from(context.node_list());

    let mut rows = Vec::with_capacity(list.len());
    for (index, node) in list.iter().enumerate() {
        let ctx = context.child(*node, index, Rc::clone(&list));
        let mut keys = Vec::with_capacity(specs.len());
        for spec in specs {
            keys.push(spec.key(&spec.select.evaluate(&ctx)?));
        }
        rows.push((index, *node, keys));
    }

    rows.sort_by(|(a_index, _, a), (b_index, _, b)| {
        for (spec, (x, y)) in specs.iter().zip(a.iter().zip(b.iter())) {
            let ordering = match spec.order {
                Order::Ascending => x.compare(y),
                Order::Descending => y.compare(x),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        a_index.cmp(b_index)
    });

    log::debug!("sorted {} nodes by {} keys", rows.len(), specs.len());
    context.set_node_list(rows.into_iter().map(|(_, node, _)| node).collect());
    Ok(())
}

// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use xml_dom::{AsStringValue, XmlDocument};
    use xml_xpath::Options;

    fn items(doc: &XmlDocument) -> Context<'_> {
        let nodes = doc.document_node().get_elements_by_tag_name("item");
        Context::from_list(nodes, 1, Options::default()).unwrap()
    }

    fn text(context: &Context) -> String {
        context
            .node_list()
            .iter()
            .map(|v| v.as_string_value())
            .collect()
    }

    #[test]
    fn test_from_str() {
        assert_eq!(DataType::Number, "number".parse().unwrap());
        assert_eq!(Order::Descending, "descending".parse().unwrap());
        assert!(matches!(
            "qname".parse::<DataType>(),
            Err(error::Error::InvalidDataType(_))
        ));
        assert!(matches!(
            "up".parse::<Order>(),
            Err(error::Error::InvalidOrder(_))
        ));
    }

    #[test]
    fn test_sort_text() {
        let doc = XmlDocument::parse(
            "<all><item pos=\"2\">A</item><item pos=\"3\">B</item><item pos=\"1\">C</item></all>",
        )
        .unwrap();
        let mut context = items(&doc);

        let spec =
            SortSpec::from_attributes(Some("@pos"), Some("text"), Some("ascending")).unwrap();
        sort(&mut context, &[spec]).unwrap();

        assert_eq!("CAB", text(&context));
        assert_eq!(0, context.position());
        assert_eq!("C", context.node().as_string_value());
    }

    #[test]
    fn test_sort_number_and_text() {
        let doc = XmlDocument::parse(
            "<all><item n='10'>A</item><item n='9'>B</item><item n='10'>C</item></all>",
        )
        .unwrap();

        let mut context = items(&doc);
        let spec = SortSpec::new("@n", DataType::Text, Order::Ascending).unwrap();
        sort(&mut context, &[spec]).unwrap();
        assert_eq!("ACB", text(&context));

        let mut context = items(&doc);
        let spec = SortSpec::new("@n", DataType::Number, Order::Ascending).unwrap();
        sort(&mut context, &[spec]).unwrap();
        assert_eq!("BAC", text(&context));

        let mut context = items(&doc);
        let specs = [
            SortSpec::new("@n", DataType::Number, Order::Descending).unwrap(),
            SortSpec::new(".", DataType::Text, Order::Descending).unwrap(),
        ];
        sort(&mut context, &specs).unwrap();
        assert_eq!("CAB", text(&context));
    }

    #[test]
    fn test_sort_stable() {
        let doc =
            XmlDocument::parse("<all><item>B</item><item k='x'>A</item><item>C</item></all>")
                .unwrap();
        let mut context = items(&doc);
        let spec = SortSpec::new("@k", DataType::Number, Order::Descending).unwrap();
        sort(&mut context, &[spec]).unwrap();
        assert_eq!("BAC", text(&context));
    }

    #[test]
    fn test_sort_position() {
        let doc = XmlDocument::parse("<all><item>A</item><item>B</item><item>C</item></all>")
            .unwrap();
        let mut context = items(&doc);
        let spec = SortSpec::new("position()", DataType::Number, Order::Descending).unwrap();
        sort(&mut context, &[spec]).unwrap();
        assert_eq!("CBA", text(&context));
    }

    #[test]
    fn test_sort_empty_specs() {
        let doc = XmlDocument::parse("<all><item>B</item><item>A</item></all>").unwrap();
        let mut context = items(&doc);
        sort(&mut context, &[]).unwrap();
        assert_eq!("BA", text(&context));
        assert_eq!(1, context.position());
    }
}
