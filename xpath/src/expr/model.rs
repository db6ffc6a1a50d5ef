use std::fmt;

// -----------------------------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AxisName {
    Ancestor,
    AncestorOrSelf,
    Attribute,
    Child,
    Descendant,
    DescendantOrSelf,
    Following,
    FollowingSibling,
    Namespace,
    Parent,
    Preceding,
    PrecedingSibling,
    Current, // Self
}

impl From<&str> for AxisName {
    fn from(value: &str) -> Self {
        match value {
            "ancestor" => AxisName::Ancestor,
            "ancestor-or-self" => AxisName::AncestorOrSelf,
            "attribute" => AxisName::Attribute,
            "child" => AxisName::Child,
            "descendant" => AxisName::Descendant,
            "descendant-or-self" => AxisName::DescendantOrSelf,
            "following" => AxisName::Following,
            "following-sibling" => AxisName::FollowingSibling,
            "namespace" => AxisName::Namespace,
            "parent" => AxisName::Parent,
            "preceding" => AxisName::Preceding,
            "preceding-sibling" => AxisName::PrecedingSibling,
            "self" => AxisName::Current,
            _ => unreachable!(),
        }
    }
}

impl AxisName {
    pub fn as_str(&self) -> &'static str {
        match self {
            AxisName::Ancestor => "ancestor",
            AxisName::AncestorOrSelf => "ancestor-or-self",
            AxisName::Attribute => "attribute",
            AxisName::Child => "child",
            AxisName::Descendant => "descendant",
            AxisName::DescendantOrSelf => "descendant-or-self",
            AxisName::Following => "following",
            AxisName::FollowingSibling => "following-sibling",
            AxisName::Namespace => "namespace",
            AxisName::Parent => "parent",
            AxisName::Preceding => "preceding",
            AxisName::PrecedingSibling => "preceding-sibling",
            AxisName::Current => "self",
        }
    }
}

impl fmt::Display for AxisName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// -----------------------------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub enum NodeTest {
    /// `node()`
    Any,
    /// `*`
    ElementOrAttribute,
    /// `text()`
    Text,
    /// `comment()`
    Comment,
    /// `processing-instruction()` with an optional target literal.
    PI(Option<String>),
    /// `prefix:*`
    NamespacePrefix(String),
    Name(String),
}

impl fmt::Display for NodeTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeTest::Any => write!(f, "node()"),
            NodeTest::ElementOrAttribute => write!(f, "*"),
            NodeTest::Text => write!(f, "text()"),
            NodeTest::Comment => write!(f, "comment()"),
            NodeTest::PI(None) => write!(f, "processing-instruction()"),
            NodeTest::PI(Some(target)) => {
                write!(f, "processing-instruction({})", Quoted(target))
            }
            NodeTest::NamespacePrefix(prefix) => write!(f, "{}:*", prefix),
            NodeTest::Name(name) => write!(f, "{}", name),
        }
    }
}

// -----------------------------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct PredicateExpr {
    pub expr: Box<Expr>,
}

impl From<Expr> for PredicateExpr {
    fn from(value: Expr) -> Self {
        PredicateExpr {
            expr: Box::new(value),
        }
    }
}

impl fmt::Display for PredicateExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.expr)
    }
}

// -----------------------------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct StepExpr {
    pub axis: AxisName,
    pub node_test: NodeTest,
    pub predicates: Vec<PredicateExpr>,
    /// Set when some predicate may depend on the context position, which rules out
    /// stopping at the first surviving node.
    pub has_positional_predicate: bool,
}

impl From<(AxisName, NodeTest)> for StepExpr {
    fn from(value: (AxisName, NodeTest)) -> Self {
        let (axis, node_test) = value;
        StepExpr {
            axis,
            node_test,
            predicates: vec![],
            has_positional_predicate: false,
        }
    }
}

impl StepExpr {
    /// `.`, `..` and the `descendant-or-self::node()` step `//` stands for.
    pub fn abbreviated(abbrev: &str) -> Self {
        match abbrev {
            "//" => StepExpr::from((AxisName::DescendantOrSelf, NodeTest::Any)),
            ".." => StepExpr::from((AxisName::Parent, NodeTest::Any)),
            _ => StepExpr::from((AxisName::Current, NodeTest::Any)),
        }
    }

    pub fn append_predicate(&mut self, predicate: PredicateExpr) {
        if !self.has_positional_predicate {
            self.has_positional_predicate = has_positional_selector(&predicate.expr, false);
        }
        self.predicates.push(predicate);
    }
}

impl fmt::Display for StepExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.axis, self.node_test)?;
        for predicate in &self.predicates {
            write!(f, "{}", predicate)?;
        }
        Ok(())
    }
}

fn has_positional_selector(expr: &Expr, nested: bool) -> bool {
    if !nested && returns_number(expr) {
        return true;
    }

    match expr {
        Expr::FunctionCall(v) => {
            matches!(v.name.as_str(), "last" | "position")
                || v.args.iter().any(|arg| has_positional_selector(arg, true))
        }
        Expr::Binary(v) => {
            has_positional_selector(&v.left, true) || has_positional_selector(&v.right, true)
        }
        Expr::UnaryMinus(v) => has_positional_selector(v, true),
        // the predicates of these see their own positions
        Expr::Filter(v) => has_positional_selector(&v.expr, true),
        Expr::Path(v) => has_positional_selector(&v.filter, true),
        // a bound number selects by position as well
        Expr::Variable(_) => !nested,
        _ => false,
    }
}

fn returns_number(expr: &Expr) -> bool {
    match expr {
        Expr::FunctionCall(v) => matches!(
            v.name.as_str(),
            "last"
                | "position"
                | "count"
                | "string-length"
                | "number"
                | "sum"
                | "floor"
                | "ceiling"
                | "round"
        ),
        Expr::UnaryMinus(_) => true,
        Expr::Binary(v) => v.op.is_arithmetic(),
        Expr::Number(_) => true,
        _ => false,
    }
}

// -----------------------------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LocationExpr {
    pub absolute: bool,
    pub steps: Vec<StepExpr>,
}

impl From<StepExpr> for LocationExpr {
    fn from(value: StepExpr) -> Self {
        LocationExpr {
            absolute: false,
            steps: vec![value],
        }
    }
}

impl LocationExpr {
    pub fn append_step(&mut self, mut step: StepExpr) {
        match self.steps.last_mut() {
            Some(last) => match combined_axis(last, &step) {
                Some(axis) => {
                    step.axis = axis;
                    *last = step;
                }
                None => self.steps.push(step),
            },
            None => self.steps.push(step),
        }
    }

    pub fn prepend_step(&mut self, step: StepExpr) {
        match self.steps.first_mut() {
            Some(first) => match combined_axis(&step, first) {
                Some(axis) => first.axis = axis,
                None => self.steps.insert(0, step),
            },
            None => self.steps.push(step),
        }
    }
}

/// `descendant-or-self::node()/self::x` is `descendant-or-self::x` and
/// `descendant::node()/self::x` is `descendant::x`.
fn combined_axis(previous: &StepExpr, next: &StepExpr) -> Option<AxisName> {
    if previous.node_test != NodeTest::Any
        || !previous.predicates.is_empty()
        || next.axis != AxisName::Current
        || next.has_positional_predicate
    {
        return None;
    }

    match previous.axis {
        AxisName::DescendantOrSelf | AxisName::Descendant => Some(previous.axis),
        _ => None,
    }
}

impl fmt::Display for LocationExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.absolute {
            write!(f, "/")?;
        }

        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{}", step)?;
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOperator {
    Or,
    And,
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOperator::Or => "or",
            BinaryOperator::And => "and",
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessOrEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterOrEqual => ">=",
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "div",
            BinaryOperator::Mod => "mod",
        }
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Add
                | BinaryOperator::Sub
                | BinaryOperator::Mul
                | BinaryOperator::Div
                | BinaryOperator::Mod
        )
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BinaryExpr {
    pub op: BinaryOperator,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
}

impl From<(Expr, BinaryOperator, Expr)> for BinaryExpr {
    fn from(value: (Expr, BinaryOperator, Expr)) -> Self {
        let (left, op, right) = value;
        BinaryExpr {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

// -----------------------------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionCallExpr {
    pub name: String,
    pub args: Vec<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FilterExpr {
    pub expr: Box<Expr>,
    pub predicates: Vec<PredicateExpr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PathExpr {
    pub filter: Box<Expr>,
    pub rel: LocationExpr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UnionExpr {
    pub left: Box<Expr>,
    pub right: Box<Expr>,
}

// -----------------------------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Location(LocationExpr),
    FunctionCall(FunctionCallExpr),
    Union(UnionExpr),
    Path(PathExpr),
    Filter(FilterExpr),
    UnaryMinus(Box<Expr>),
    Binary(BinaryExpr),
    Literal(String),
    Number(f64),
    Variable(String),
}

impl Expr {
    fn is_primary(&self) -> bool {
        matches!(
            self,
            Expr::FunctionCall(_) | Expr::Literal(_) | Expr::Number(_) | Expr::Variable(_)
        )
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Location(v) => write!(f, "{}", v),
            Expr::FunctionCall(v) => {
                write!(f, "{}(", v.name)?;
                for (i, arg) in v.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::Union(v) => write!(f, "{} | {}", v.left, v.right),
            Expr::Path(v) => write!(f, "{}/{}", Primary(&v.filter), v.rel),
            Expr::Filter(v) => {
                write!(f, "{}", Primary(&v.expr))?;
                for predicate in &v.predicates {
                    write!(f, "{}", predicate)?;
                }
                Ok(())
            }
            Expr::UnaryMinus(v) => write!(f, "-{}", Operand(v)),
            Expr::Binary(v) => write!(f, "{} {} {}", Operand(&v.left), v.op, Operand(&v.right)),
            Expr::Literal(v) => write!(f, "{}", Quoted(v)),
            Expr::Number(v) => write!(f, "{}", v),
            Expr::Variable(v) => write!(f, "${}", v),
        }
    }
}

/// Parenthesizes anything but a primary expression or a location path.
struct Operand<'a>(&'a Expr);

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Expr::Location(_) => write!(f, "{}", self.0),
            v if v.is_primary() => write!(f, "{}", v),
            v => write!(f, "({})", v),
        }
    }
}

/// Parenthesizes anything but a primary or filter expression.
struct Primary<'a>(&'a Expr);

impl fmt::Display for Primary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            v @ Expr::Filter(_) => write!(f, "{}", v),
            v if v.is_primary() => write!(f, "{}", v),
            v => write!(f, "({})", v),
        }
    }
}

struct Quoted<'a>(&'a str);

impl fmt::Display for Quoted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.contains('\'') {
            write!(f, "\"{}\"", self.0)
        } else {
            write!(f, "'{}'", self.0)
        }
    }
}

// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn step(axis: AxisName, name: &str) -> StepExpr {
        StepExpr::from((axis, NodeTest::Name(name.to_string())))
    }

    #[test]
    fn test_append_step_merges_descendant_or_self() {
        let mut location = LocationExpr::from(StepExpr::abbreviated("//"));
        location.append_step(step(AxisName::Current, "div"));
        assert_eq!(1, location.steps.len());
        assert_eq!(AxisName::DescendantOrSelf, location.steps[0].axis);
        assert_eq!(NodeTest::Name("div".to_string()), location.steps[0].node_test);
    }

    #[test]
    fn test_append_step_merges_descendant() {
        let mut location =
            LocationExpr::from(StepExpr::from((AxisName::Descendant, NodeTest::Any)));
        location.append_step(step(AxisName::Current, "div"));
        assert_eq!("descendant::div", location.to_string());
    }

    #[test]
    fn test_append_step_keeps_child() {
        let mut location = LocationExpr::from(StepExpr::abbreviated("//"));
        location.append_step(step(AxisName::Child, "div"));
        assert_eq!("descendant-or-self::node()/child::div", location.to_string());
    }

    #[test]
    fn test_append_step_keeps_positional_self() {
        let mut next = step(AxisName::Current, "div");
        next.append_predicate(PredicateExpr::from(Expr::Number(1.0)));
        assert!(next.has_positional_predicate);

        let mut location = LocationExpr::from(StepExpr::abbreviated("//"));
        location.append_step(next);
        assert_eq!(2, location.steps.len());
    }

    #[test]
    fn test_prepend_step() {
        let mut location = LocationExpr::from(step(AxisName::Current, "a"));
        location.prepend_step(StepExpr::abbreviated("//"));
        assert_eq!("descendant-or-self::a", location.to_string());

        let mut location = LocationExpr::from(step(AxisName::Child, "a"));
        location.prepend_step(StepExpr::abbreviated("//"));
        assert_eq!("descendant-or-self::node()/child::a", location.to_string());
    }

    #[test]
    fn test_positional_selector() {
        let position = Expr::FunctionCall(FunctionCallExpr {
            name: "position".to_string(),
            args: vec![],
        });
        let attr = Expr::Location(LocationExpr::from(step(AxisName::Attribute, "id")));
        let cases = vec![
            (Expr::Number(2.0), true),
            (position.clone(), true),
            (
                Expr::Binary(BinaryExpr::from((
                    position,
                    BinaryOperator::Equal,
                    Expr::Number(2.0),
                ))),
                true,
            ),
            (
                Expr::Binary(BinaryExpr::from((
                    attr.clone(),
                    BinaryOperator::Equal,
                    Expr::Literal("x".to_string()),
                ))),
                false,
            ),
            (Expr::Variable("n".to_string()), true),
            (attr, false),
        ];

        for (expr, expected) in cases {
            let mut s = step(AxisName::Child, "a");
            s.append_predicate(PredicateExpr::from(expr));
            assert_eq!(expected, s.has_positional_predicate);
        }
    }

    #[test]
    fn test_positional_selector_in_arguments() {
        let cases = [
            ("a[not(position() = 1)]", true),
            ("a[boolean(position() = 2)]", true),
            ("a[string(last()) = '4']", true),
            ("a[-position() = -1]", true),
            ("a[ext-if(true(), last(), 0) = 2]", true),
            ("a[count(b[position() = 1]) = 1]", false),
            ("a[contains(@id, 'x')]", false),
        ];

        for (text, expected) in cases {
            match &*crate::expr::parse(text).unwrap() {
                Expr::Location(v) => {
                    assert_eq!(expected, v.steps[0].has_positional_predicate, "{}", text)
                }
                v => panic!("not a location path: {}", v),
            }
        }
    }

    #[test]
    fn test_display() {
        let expr = Expr::Binary(BinaryExpr::from((
            Expr::Binary(BinaryExpr::from((
                Expr::Number(1.0),
                BinaryOperator::Add,
                Expr::Number(2.5),
            ))),
            BinaryOperator::Mul,
            Expr::Literal("it's".to_string()),
        )));
        assert_eq!("(1 + 2.5) * \"it's\"", expr.to_string());
        assert_eq!("processing-instruction('x')", NodeTest::PI(Some("x".to_string())).to_string());
    }
}
