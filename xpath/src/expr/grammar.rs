use super::model::{
    AxisName, BinaryExpr, BinaryOperator, Expr, FilterExpr, FunctionCallExpr, LocationExpr,
    NodeTest, PathExpr, PredicateExpr, StepExpr, UnionExpr,
};
use super::token::{Token, TokenKind, Tokenizer};
use crate::error::{Error, Result};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt;

// -----------------------------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Symbol {
    Token(TokenKind),
    Expr,
    LocationPath,
    AbsoluteLocationPath,
    RelativeLocationPath,
    Step,
    NodeTest,
    Predicate,
    PrimaryExpr,
    FunctionCall,
    ArgumentRemainder,
    UnionExpr,
    PathExpr,
    FilterExpr,
    Literal,
    Number,
    VariableReference,
}

#[derive(Clone, Copy, Debug)]
enum Element {
    One(Symbol),
    ZeroOrMore(Symbol),
}

impl Element {
    fn symbol(&self) -> Symbol {
        match self {
            Element::One(v) | Element::ZeroOrMore(v) => *v,
        }
    }

    fn bounds(&self) -> (usize, usize) {
        match self {
            Element::One(_) => (1, 1),
            Element::ZeroOrMore(_) => (0, usize::MAX),
        }
    }

    fn is_optional(&self) -> bool {
        matches!(self, Element::ZeroOrMore(_))
    }
}

// -----------------------------------------------------------------------------------------------

/// Value of a stack frame.
#[derive(Clone, Debug)]
pub(crate) enum Item {
    Token(Token),
    Expr(Expr),
    Location(LocationExpr),
    Step(StepExpr),
    NodeTest(NodeTest),
    Predicate(PredicateExpr),
    Many(Vec<Item>),
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Item::Token(v) => write!(f, "{}", v.text),
            Item::Expr(v) => write!(f, "{}", v),
            Item::Location(v) => write!(f, "{}", v),
            Item::Step(v) => write!(f, "{}", v),
            Item::NodeTest(v) => write!(f, "{}", v),
            Item::Predicate(v) => write!(f, "{}", v),
            Item::Many(v) => {
                for (i, item) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
        }
    }
}

fn mismatch(expected: &str, found: &Item) -> Error {
    Error::Grammar(format!("expected {} but found `{}`", expected, found))
}

/// Matched items handed to a rule's factory in pattern order.
pub(crate) struct Args {
    items: std::vec::IntoIter<Item>,
    axis: Option<AxisName>,
}

impl Args {
    fn next(&mut self) -> Result<Item> {
        self.items
            .next()
            .ok_or_else(|| Error::Grammar("missing rule argument".to_string()))
    }

    fn token(&mut self) -> Result<Token> {
        match self.next()? {
            Item::Token(v) => Ok(v),
            v => Err(mismatch("token", &v)),
        }
    }

    fn skip(&mut self) -> Result<()> {
        self.token().map(|_| ())
    }

    fn expr(&mut self) -> Result<Expr> {
        match self.next()? {
            Item::Expr(v) => Ok(v),
            v => Err(mismatch("expression", &v)),
        }
    }

    fn location(&mut self) -> Result<LocationExpr> {
        match self.next()? {
            Item::Location(v) => Ok(v),
            v => Err(mismatch("location path", &v)),
        }
    }

    fn step(&mut self) -> Result<StepExpr> {
        match self.next()? {
            Item::Step(v) => Ok(v),
            v => Err(mismatch("step", &v)),
        }
    }

    fn node_test(&mut self) -> Result<NodeTest> {
        match self.next()? {
            Item::NodeTest(v) => Ok(v),
            v => Err(mismatch("node test", &v)),
        }
    }

    fn predicate(&mut self) -> Result<PredicateExpr> {
        match self.next()? {
            Item::Predicate(v) => Ok(v),
            v => Err(mismatch("predicate", &v)),
        }
    }

    fn many(&mut self) -> Result<Vec<Item>> {
        match self.next()? {
            Item::Many(v) => Ok(v),
            v => Err(mismatch("repetition", &v)),
        }
    }
}

type Factory = fn(&mut Args) -> Result<Item>;

pub(crate) struct Rule {
    target: Symbol,
    pattern: &'static [Element],
    /// `-1` takes the highest precedence of the matched elements.
    precedence: i32,
    factory: Factory,
}

const fn rule(
    target: Symbol,
    pattern: &'static [Element],
    precedence: i32,
    factory: Factory,
) -> Rule {
    Rule {
        target,
        pattern,
        precedence,
        factory,
    }
}

impl Rule {
    /// Symbols whose frame on the stack top may complete this rule.
    fn bin_symbols(&self) -> Vec<Symbol> {
        let mut symbols = vec![];
        let mut elements = self.pattern.iter().rev();
        if let Some(last) = elements.next() {
            symbols.push(last.symbol());
            if last.is_optional() {
                if let Some(previous) = elements.next() {
                    symbols.push(previous.symbol());
                }
            }
        }
        symbols
    }

    /// Frames taken by each pattern element, or `None` when the stack top does not match.
    fn matches(&self, stack: &[Frame]) -> Option<Vec<usize>> {
        let mut depth = stack.len();
        let mut counts = vec![0; self.pattern.len()];
        for (i, element) in self.pattern.iter().enumerate().rev() {
            let (min, max) = element.bounds();
            let mut n = 0;
            while n < max && n < depth && stack[depth - n - 1].symbol == element.symbol() {
                n += 1;
            }
            if n < min {
                return None;
            }
            counts[i] = n;
            depth -= n;
        }
        Some(counts)
    }

    fn precedence(&self, frames: &[Frame]) -> i32 {
        if self.precedence != -1 {
            return self.precedence;
        }

        frames
            .iter()
            .map(|v| if v.precedence == 0 { 2 } else { v.precedence })
            .max()
            .unwrap_or(2)
    }
}

// -----------------------------------------------------------------------------------------------

use super::token::TokenKind as K;
use Element::{One, ZeroOrMore};
use Symbol::Token as Terminal;

static RULES: &[Rule] = &[
    // LocationPath
    rule(Symbol::LocationPath, &[One(Symbol::RelativeLocationPath)], 18, pass),
    rule(Symbol::LocationPath, &[One(Symbol::AbsoluteLocationPath)], 18, pass),
    // AbsoluteLocationPath
    rule(
        Symbol::AbsoluteLocationPath,
        &[One(Terminal(K::Slash)), One(Symbol::RelativeLocationPath)],
        18,
        absolute_location,
    ),
    rule(
        Symbol::AbsoluteLocationPath,
        &[One(Terminal(K::DoubleSlash)), One(Symbol::RelativeLocationPath)],
        18,
        abbreviated_absolute_location,
    ),
    rule(Symbol::AbsoluteLocationPath, &[One(Terminal(K::Slash))], 0, root),
    rule(Symbol::AbsoluteLocationPath, &[One(Terminal(K::DoubleSlash))], 0, root_descendants),
    // RelativeLocationPath
    rule(Symbol::RelativeLocationPath, &[One(Symbol::Step)], 31, relative_location),
    rule(
        Symbol::RelativeLocationPath,
        &[
            One(Symbol::RelativeLocationPath),
            One(Terminal(K::Slash)),
            One(Symbol::Step),
        ],
        31,
        append_step,
    ),
    rule(
        Symbol::RelativeLocationPath,
        &[
            One(Symbol::RelativeLocationPath),
            One(Terminal(K::DoubleSlash)),
            One(Symbol::Step),
        ],
        31,
        append_abbreviated_step,
    ),
    // Step
    rule(Symbol::Step, &[One(Terminal(K::Dot))], 33, abbreviated_step),
    rule(Symbol::Step, &[One(Terminal(K::DoubleDot))], 33, abbreviated_step),
    rule(
        Symbol::Step,
        &[
            One(Terminal(K::AxisName)),
            One(Terminal(K::AxisSeparator)),
            One(Symbol::NodeTest),
        ],
        33,
        axis_step,
    ),
    rule(Symbol::Step, &[One(Terminal(K::At)), One(Symbol::NodeTest)], 33, attribute_step),
    rule(Symbol::Step, &[One(Symbol::NodeTest)], 33, default_step),
    rule(Symbol::Step, &[One(Symbol::Step), One(Symbol::Predicate)], 33, step_predicate),
    // NodeTest
    rule(Symbol::NodeTest, &[One(Terminal(K::Asterisk))], 33, any_name),
    rule(
        Symbol::NodeTest,
        &[One(Terminal(K::NCName)), One(Terminal(K::Colon)), One(Terminal(K::Asterisk))],
        33,
        prefixed_any_name,
    ),
    rule(Symbol::NodeTest, &[One(Terminal(K::QName))], 33, name_test),
    rule(
        Symbol::NodeTest,
        &[One(Terminal(K::NodeType)), One(Terminal(K::ParenClose))],
        33,
        node_type,
    ),
    rule(
        Symbol::NodeTest,
        &[One(Terminal(K::NodeType)), One(Symbol::Expr), One(Terminal(K::ParenClose))],
        33,
        processing_instruction,
    ),
    // Predicate
    rule(
        Symbol::Predicate,
        &[One(Terminal(K::BracketOpen)), One(Symbol::Expr), One(Terminal(K::BracketClose))],
        33,
        predicate,
    ),
    // PrimaryExpr
    rule(Symbol::PrimaryExpr, &[One(Symbol::VariableReference)], 33, pass),
    rule(
        Symbol::PrimaryExpr,
        &[One(Terminal(K::ParenOpen)), One(Symbol::Expr), One(Terminal(K::ParenClose))],
        33,
        parenthesized,
    ),
    rule(Symbol::PrimaryExpr, &[One(Symbol::Literal)], 30, pass),
    rule(Symbol::PrimaryExpr, &[One(Symbol::Number)], 30, pass),
    rule(Symbol::PrimaryExpr, &[One(Symbol::FunctionCall)], 31, pass),
    // FunctionCall
    rule(
        Symbol::FunctionCall,
        &[One(Terminal(K::QName)), One(Terminal(K::ParenOpen)), One(Terminal(K::ParenClose))],
        -1,
        function_call,
    ),
    rule(
        Symbol::FunctionCall,
        &[
            One(Terminal(K::QName)),
            One(Terminal(K::ParenOpen)),
            One(Symbol::Expr),
            ZeroOrMore(Symbol::ArgumentRemainder),
            One(Terminal(K::ParenClose)),
        ],
        -1,
        function_call_with_args,
    ),
    rule(
        Symbol::ArgumentRemainder,
        &[One(Terminal(K::Comma)), One(Symbol::Expr)],
        -1,
        argument_remainder,
    ),
    // UnionExpr
    rule(Symbol::UnionExpr, &[One(Symbol::PathExpr)], 20, pass),
    rule(
        Symbol::UnionExpr,
        &[One(Symbol::UnionExpr), One(Terminal(K::Pipe)), One(Symbol::PathExpr)],
        20,
        union,
    ),
    // PathExpr
    rule(Symbol::PathExpr, &[One(Symbol::LocationPath)], 20, location_path),
    rule(Symbol::PathExpr, &[One(Symbol::FilterExpr)], 19, pass),
    rule(
        Symbol::PathExpr,
        &[
            One(Symbol::FilterExpr),
            One(Terminal(K::Slash)),
            One(Symbol::RelativeLocationPath),
        ],
        19,
        path,
    ),
    rule(
        Symbol::PathExpr,
        &[
            One(Symbol::FilterExpr),
            One(Terminal(K::DoubleSlash)),
            One(Symbol::RelativeLocationPath),
        ],
        19,
        abbreviated_path,
    ),
    // FilterExpr
    rule(
        Symbol::FilterExpr,
        &[One(Symbol::PrimaryExpr), ZeroOrMore(Symbol::Predicate)],
        31,
        filter,
    ),
    // Expr
    rule(Symbol::Expr, &[One(Symbol::PrimaryExpr)], 16, pass),
    rule(Symbol::Expr, &[One(Symbol::UnionExpr)], 16, pass),
    rule(Symbol::Expr, &[One(Terminal(K::Minus)), One(Symbol::Expr)], 16, unary_minus),
    binary(K::Or),
    binary(K::And),
    binary(K::Equal),
    binary(K::NotEqual),
    binary(K::Less),
    binary(K::LessOrEqual),
    binary(K::Greater),
    binary(K::GreaterOrEqual),
    binary(K::Plus),
    binary(K::Minus),
    binary(K::Multiply),
    binary(K::Div),
    binary(K::Mod),
    // Literal, Number, VariableReference
    rule(Symbol::Literal, &[One(Terminal(K::Literal))], -1, literal),
    rule(Symbol::Number, &[One(Terminal(K::Number))], -1, number),
    rule(
        Symbol::VariableReference,
        &[One(Terminal(K::Dollar)), One(Terminal(K::QName))],
        200,
        variable_reference,
    ),
];

const fn binary(op: TokenKind) -> Rule {
    let pattern: &'static [Element] = match op {
        K::Or => &[One(Symbol::Expr), One(Terminal(K::Or)), One(Symbol::Expr)],
        K::And => &[One(Symbol::Expr), One(Terminal(K::And)), One(Symbol::Expr)],
        K::Equal => &[One(Symbol::Expr), One(Terminal(K::Equal)), One(Symbol::Expr)],
        K::NotEqual => &[One(Symbol::Expr), One(Terminal(K::NotEqual)), One(Symbol::Expr)],
        K::Less => &[One(Symbol::Expr), One(Terminal(K::Less)), One(Symbol::Expr)],
        K::LessOrEqual => &[One(Symbol::Expr), One(Terminal(K::LessOrEqual)), One(Symbol::Expr)],
        K::Greater => &[One(Symbol::Expr), One(Terminal(K::Greater)), One(Symbol::Expr)],
        K::GreaterOrEqual => &[
            One(Symbol::Expr),
            One(Terminal(K::GreaterOrEqual)),
            One(Symbol::Expr),
        ],
        K::Plus => &[One(Symbol::Expr), One(Terminal(K::Plus)), One(Symbol::Expr)],
        K::Minus => &[One(Symbol::Expr), One(Terminal(K::Minus)), One(Symbol::Expr)],
        K::Multiply => &[One(Symbol::Expr), One(Terminal(K::Multiply)), One(Symbol::Expr)],
        K::Div => &[One(Symbol::Expr), One(Terminal(K::Div)), One(Symbol::Expr)],
        _ => &[One(Symbol::Expr), One(Terminal(K::Mod)), One(Symbol::Expr)],
    };
    rule(Symbol::Expr, pattern, -1, binary_expr)
}

// -----------------------------------------------------------------------------------------------

fn pass(args: &mut Args) -> Result<Item> {
    args.next()
}

fn absolute_location(args: &mut Args) -> Result<Item> {
    args.skip()?;
    let mut location = args.location()?;
    location.absolute = true;
    Ok(Item::Location(location))
}

fn abbreviated_absolute_location(args: &mut Args) -> Result<Item> {
    args.skip()?;
    let mut location = args.location()?;
    location.prepend_step(StepExpr::abbreviated("//"));
    location.absolute = true;
    Ok(Item::Location(location))
}

fn root(args: &mut Args) -> Result<Item> {
    args.skip()?;
    Ok(Item::Location(LocationExpr {
        absolute: true,
        steps: vec![StepExpr::abbreviated(".")],
    }))
}

fn root_descendants(args: &mut Args) -> Result<Item> {
    args.skip()?;
    Ok(Item::Location(LocationExpr {
        absolute: true,
        steps: vec![StepExpr::abbreviated("//")],
    }))
}

fn relative_location(args: &mut Args) -> Result<Item> {
    Ok(Item::Location(LocationExpr::from(args.step()?)))
}

fn append_step(args: &mut Args) -> Result<Item> {
    let mut location = args.location()?;
    args.skip()?;
    location.append_step(args.step()?);
    Ok(Item::Location(location))
}

fn append_abbreviated_step(args: &mut Args) -> Result<Item> {
    let mut location = args.location()?;
    args.skip()?;
    location.append_step(StepExpr::abbreviated("//"));
    location.append_step(args.step()?);
    Ok(Item::Location(location))
}

fn abbreviated_step(args: &mut Args) -> Result<Item> {
    let token = args.token()?;
    Ok(Item::Step(StepExpr::abbreviated(&token.text)))
}

fn axis_step(args: &mut Args) -> Result<Item> {
    let axis = AxisName::from(args.token()?.text.as_str());
    args.skip()?;
    let node_test = args.node_test()?;
    Ok(Item::Step(StepExpr::from((axis, node_test))))
}

fn attribute_step(args: &mut Args) -> Result<Item> {
    args.skip()?;
    let node_test = args.node_test()?;
    Ok(Item::Step(StepExpr::from((AxisName::Attribute, node_test))))
}

fn default_step(args: &mut Args) -> Result<Item> {
    let axis = args.axis.unwrap_or(AxisName::Child);
    let node_test = args.node_test()?;
    Ok(Item::Step(StepExpr::from((axis, node_test))))
}

fn step_predicate(args: &mut Args) -> Result<Item> {
    let mut step = args.step()?;
    step.append_predicate(args.predicate()?);
    Ok(Item::Step(step))
}

fn any_name(args: &mut Args) -> Result<Item> {
    args.skip()?;
    Ok(Item::NodeTest(NodeTest::ElementOrAttribute))
}

fn prefixed_any_name(args: &mut Args) -> Result<Item> {
    let prefix = args.token()?.text;
    Ok(Item::NodeTest(NodeTest::NamespacePrefix(prefix)))
}

fn name_test(args: &mut Args) -> Result<Item> {
    Ok(Item::NodeTest(NodeTest::Name(args.token()?.text)))
}

fn node_type_name(token: &Token) -> &str {
    token.text.trim_end_matches('(').trim_end()
}

fn node_type(args: &mut Args) -> Result<Item> {
    let token = args.token()?;
    let node_test = match node_type_name(&token) {
        "comment" => NodeTest::Comment,
        "text" => NodeTest::Text,
        "processing-instruction" => NodeTest::PI(None),
        _ => NodeTest::Any,
    };
    Ok(Item::NodeTest(node_test))
}

fn processing_instruction(args: &mut Args) -> Result<Item> {
    let token = args.token()?;
    let name = node_type_name(&token);
    match args.expr()? {
        Expr::Literal(target) if name == "processing-instruction" => {
            Ok(Item::NodeTest(NodeTest::PI(Some(target))))
        }
        expr => Err(Error::Grammar(format!(
            "unexpected argument `{}` to {}()",
            expr, name
        ))),
    }
}

fn predicate(args: &mut Args) -> Result<Item> {
    args.skip()?;
    Ok(Item::Predicate(PredicateExpr::from(args.expr()?)))
}

fn parenthesized(args: &mut Args) -> Result<Item> {
    args.skip()?;
    Ok(Item::Expr(args.expr()?))
}

fn function_call(args: &mut Args) -> Result<Item> {
    let name = args.token()?.text;
    Ok(Item::Expr(Expr::FunctionCall(FunctionCallExpr {
        name,
        args: vec![],
    })))
}

fn function_call_with_args(args: &mut Args) -> Result<Item> {
    let name = args.token()?.text;
    args.skip()?;

    let mut exprs = vec![args.expr()?];
    for item in args.many()? {
        match item {
            Item::Expr(v) => exprs.push(v),
            v => return Err(mismatch("argument", &v)),
        }
    }

    Ok(Item::Expr(Expr::FunctionCall(FunctionCallExpr {
        name,
        args: exprs,
    })))
}

fn argument_remainder(args: &mut Args) -> Result<Item> {
    args.skip()?;
    Ok(Item::Expr(args.expr()?))
}

fn union(args: &mut Args) -> Result<Item> {
    let left = args.expr()?;
    args.skip()?;
    let right = args.expr()?;
    Ok(Item::Expr(Expr::Union(UnionExpr {
        left: Box::new(left),
        right: Box::new(right),
    })))
}

fn location_path(args: &mut Args) -> Result<Item> {
    Ok(Item::Expr(Expr::Location(args.location()?)))
}

fn path(args: &mut Args) -> Result<Item> {
    let filter = args.expr()?;
    args.skip()?;
    let rel = args.location()?;
    Ok(Item::Expr(Expr::Path(PathExpr {
        filter: Box::new(filter),
        rel,
    })))
}

fn abbreviated_path(args: &mut Args) -> Result<Item> {
    let filter = args.expr()?;
    args.skip()?;
    let mut rel = args.location()?;
    rel.prepend_step(StepExpr::abbreviated("//"));
    Ok(Item::Expr(Expr::Path(PathExpr {
        filter: Box::new(filter),
        rel,
    })))
}

fn filter(args: &mut Args) -> Result<Item> {
    let expr = args.expr()?;
    let mut predicates = vec![];
    for item in args.many()? {
        match item {
            Item::Predicate(v) => predicates.push(v),
            v => return Err(mismatch("predicate", &v)),
        }
    }

    if predicates.is_empty() {
        return Ok(Item::Expr(expr));
    }

    Ok(Item::Expr(Expr::Filter(FilterExpr {
        expr: Box::new(expr),
        predicates,
    })))
}

fn unary_minus(args: &mut Args) -> Result<Item> {
    args.skip()?;
    Ok(Item::Expr(Expr::UnaryMinus(Box::new(args.expr()?))))
}

fn binary_expr(args: &mut Args) -> Result<Item> {
    let left = args.expr()?;
    let op = match args.token()?.kind {
        K::Or => BinaryOperator::Or,
        K::And => BinaryOperator::And,
        K::Equal => BinaryOperator::Equal,
        K::NotEqual => BinaryOperator::NotEqual,
        K::Less => BinaryOperator::Less,
        K::LessOrEqual => BinaryOperator::LessOrEqual,
        K::Greater => BinaryOperator::Greater,
        K::GreaterOrEqual => BinaryOperator::GreaterOrEqual,
        K::Plus => BinaryOperator::Add,
        K::Minus => BinaryOperator::Sub,
        K::Multiply => BinaryOperator::Mul,
        K::Div => BinaryOperator::Div,
        K::Mod => BinaryOperator::Mod,
        kind => {
            return Err(Error::Grammar(format!(
                "`{}` is not a binary operator",
                kind.label()
            )))
        }
    };
    let right = args.expr()?;
    Ok(Item::Expr(Expr::Binary(BinaryExpr::from((left, op, right)))))
}

fn literal(args: &mut Args) -> Result<Item> {
    let token = args.token()?;
    let text = token.text.as_str();
    let value = text.get(1..text.len().saturating_sub(1)).unwrap_or_default();
    Ok(Item::Expr(Expr::Literal(value.to_string())))
}

fn number(args: &mut Args) -> Result<Item> {
    let token = args.token()?;
    let value = token
        .text
        .parse::<f64>()
        .map_err(|_| Error::Grammar(format!("invalid number `{}`", token.text)))?;
    Ok(Item::Expr(Expr::Number(value)))
}

fn variable_reference(args: &mut Args) -> Result<Item> {
    args.skip()?;
    Ok(Item::Expr(Expr::Variable(args.token()?.text)))
}

// -----------------------------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct Frame {
    symbol: Symbol,
    precedence: i32,
    item: Item,
}

impl From<Token> for Frame {
    fn from(value: Token) -> Self {
        Frame {
            symbol: Symbol::Token(value.kind),
            precedence: value.precedence(),
            item: Item::Token(value),
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.symbol {
            Symbol::Token(_) => write!(f, "{}", self.item),
            symbol => write!(f, "{:?}({})", symbol, self.item),
        }
    }
}

fn render(stack: &[Frame]) -> String {
    stack
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<String>>()
        .join(" ")
}

// -----------------------------------------------------------------------------------------------

/// Operator precedence grammar: rules binned by the symbol that completes them, longest
/// patterns first within a bin.
pub(crate) struct Grammar {
    bins: HashMap<Symbol, Vec<&'static Rule>>,
}

impl Default for Grammar {
    fn default() -> Self {
        Grammar::new()
    }
}

impl Grammar {
    pub fn new() -> Self {
        let mut rules = RULES.iter().collect::<Vec<&Rule>>();
        rules.sort_by_key(|v| Reverse(v.pattern.len()));

        let mut bins: HashMap<Symbol, Vec<&'static Rule>> = HashMap::new();
        for rule in rules {
            for symbol in rule.bin_symbols() {
                bins.entry(symbol).or_default().push(rule);
            }
        }

        Grammar { bins }
    }

    fn candidate(&self, stack: &[Frame]) -> Option<(&'static Rule, Vec<usize>)> {
        let top = stack.last()?;
        self.bins
            .get(&top.symbol)?
            .iter()
            .find_map(|rule| rule.matches(stack).map(|counts| (*rule, counts)))
    }

    pub fn parse(&self, text: &str, axis: Option<AxisName>) -> Result<Expr> {
        let mut tokens = Tokenizer::new(text);
        let mut stack: Vec<Frame> = vec![];
        let mut ahead = tokens.next();
        let mut shifts = 0;
        let mut reductions = 0;

        loop {
            while let Some((rule, counts)) = self.candidate(&stack) {
                let taken = counts.iter().sum::<usize>();
                let frames = stack.split_off(stack.len() - taken);
                let precedence = rule.precedence(&frames);

                if let Some(token) = &ahead {
                    let reduce = precedence > token.precedence()
                        || (token.kind.is_left_associative() && precedence >= token.precedence());
                    if !reduce {
                        log::trace!(
                            "shift {} over {:?} ({} <= {})",
                            token.kind.label(),
                            rule.target,
                            precedence,
                            token.precedence()
                        );
                        stack.extend(frames);
                        break;
                    }
                }

                let frame = self.reduce(rule, counts, frames, axis)?;
                log::trace!("reduce {} ({})", frame, precedence);
                reductions += 1;
                stack.push(frame);
            }

            match ahead.take() {
                Some(token) => {
                    shifts += 1;
                    stack.push(Frame::from(token));
                    ahead = tokens.next();
                }
                None => break,
            }
        }

        log::debug!(
            "parsed `{}`: {} tokens, {} rule attempts, {} reductions",
            text,
            shifts,
            tokens.attempts(),
            reductions
        );

        if !tokens.rest().is_empty() || stack.len() != 1 || stack[0].symbol != Symbol::Expr {
            let mut unreduced = render(&stack);
            if !tokens.rest().is_empty() {
                unreduced.push_str(&format!(" <{}>", tokens.rest()));
            }
            return Err(Error::Parse {
                expr: text.to_string(),
                stack: unreduced,
            });
        }

        match stack.pop().map(|v| v.item) {
            Some(Item::Expr(expr)) => Ok(expr),
            _ => Err(Error::Grammar(format!("no expression in `{}`", text))),
        }
    }

    fn reduce(
        &self,
        rule: &Rule,
        counts: Vec<usize>,
        frames: Vec<Frame>,
        axis: Option<AxisName>,
    ) -> Result<Frame> {
        let mut frames = frames.into_iter();
        let mut items = vec![];
        for (element, count) in rule.pattern.iter().zip(counts) {
            match element {
                Element::One(_) => {
                    if let Some(frame) = frames.next() {
                        items.push(frame.item);
                    }
                }
                _ => {
                    let many = frames.by_ref().take(count).map(|v| v.item).collect();
                    items.push(Item::Many(many));
                }
            }
        }

        let mut args = Args {
            items: items.into_iter(),
            axis,
        };
        let item = (rule.factory)(&mut args)?;

        Ok(Frame {
            symbol: rule.target,
            precedence: 0,
            item,
        })
    }
}

// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Expr {
        Grammar::new().parse(text, None).unwrap()
    }

    #[test]
    fn test_bins() {
        let grammar = Grammar::new();
        let predicates = grammar.bins.get(&Symbol::Predicate).unwrap();
        assert!(predicates.iter().any(|v| v.target == Symbol::FilterExpr));
        assert!(predicates.iter().any(|v| v.target == Symbol::Step));

        let primaries = grammar.bins.get(&Symbol::PrimaryExpr).unwrap();
        assert_eq!(Symbol::FilterExpr, primaries[0].target);

        let closers = grammar.bins.get(&Symbol::Token(K::ParenClose)).unwrap();
        assert_eq!(5, closers[0].pattern.len());
    }

    #[test]
    fn test_location_path() {
        assert_eq!("child::para", parse("para").to_string());
        assert_eq!("/child::doc/child::chapter", parse("/doc/chapter").to_string());
        assert_eq!(
            "/descendant-or-self::node()/child::para",
            parse("//para").to_string()
        );
        assert_eq!("/descendant-or-self::para", parse("//self::para").to_string());
        assert_eq!(
            "child::a/descendant-or-self::node()/child::b",
            parse("a//b").to_string()
        );
        assert_eq!("/self::node()", parse("/").to_string());
        assert_eq!("parent::node()/attribute::lang", parse("../@lang").to_string());
        assert_eq!(
            "child::chapter[5]/child::section[position() = 2]",
            parse("chapter[5]/section[position()=2]").to_string()
        );
        assert_eq!("child::xsl:*", parse("xsl:*").to_string());
        assert_eq!(
            "following-sibling::chapter[1]",
            parse("following-sibling :: chapter[1]").to_string()
        );
        assert_eq!("child::text()", parse("text()").to_string());
    }

    #[test]
    fn test_axis_override() {
        let expr = Grammar::new()
            .parse("a/b", Some(AxisName::DescendantOrSelf))
            .unwrap();
        assert_eq!(
            "descendant-or-self::a/descendant-or-self::b",
            expr.to_string()
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!("1 + (2 * 3)", parse("1 + 2 * 3").to_string());
        assert_eq!("(1 - 2) - 3", parse("1 - 2 - 3").to_string());
        assert_eq!("(1 div 2) mod 3", parse("1 div 2 mod 3").to_string());
        assert_eq!(
            "(child::a = 1) or ((child::b < 2) and child::c)",
            parse("a = 1 or b < 2 and c").to_string()
        );
        assert_eq!("(1 = 2) = 3", parse("1 = 2 = 3").to_string());
        assert_eq!("5 mod (-2)", parse("5 mod -2").to_string());
        assert_eq!("(-5) mod (-2)", parse("-5 mod -2").to_string());
        assert_eq!("(2 * child::a) * child::b", parse("2 * a * b").to_string());
    }

    #[test]
    fn test_function_call() {
        assert_eq!("count(/self::node())", parse("count(/)").to_string());
        assert_eq!(
            "concat('a', 'b', \"c'd\")",
            parse("concat('a', 'b', \"c'd\")").to_string()
        );
        assert_eq!("true()", parse("true()").to_string());
    }

    #[test]
    fn test_filter_and_path() {
        assert_eq!("$x[1][2]", parse("$x[1][2]").to_string());
        assert_eq!("$x/child::a", parse("$x/a").to_string());
        assert_eq!(
            "id('a')/descendant-or-self::node()/child::b",
            parse("id('a')//b").to_string()
        );
        assert_eq!("child::a | child::b | child::c", parse("a | b | c").to_string());
    }

    #[test]
    fn test_filter_and_path_of_location() {
        let cases = [
            ("(//a)[last()]", "(/descendant-or-self::node()/child::a)[last()]"),
            ("(a | b)/c", "(child::a | child::b)/child::c"),
            ("(a)/b", "(child::a)/child::b"),
            (
                "(../a)[1]//b",
                "(parent::node()/child::a)[1]/descendant-or-self::node()/child::b",
            ),
        ];
        for (text, expected) in cases {
            let rendered = parse(text).to_string();
            assert_eq!(expected, rendered, "{}", text);
            assert_eq!(rendered, parse(&rendered).to_string());
        }
    }

    #[test]
    fn test_processing_instruction() {
        assert_eq!(
            Expr::Location(LocationExpr::from(StepExpr::from((
                AxisName::Child,
                NodeTest::PI(Some("xml-stylesheet".to_string()))
            )))),
            parse("processing-instruction('xml-stylesheet')")
        );

        assert!(matches!(
            Grammar::new().parse("processing-instruction(1)", None),
            Err(Error::Grammar(_))
        ));
        assert!(matches!(
            Grammar::new().parse("text('a')", None),
            Err(Error::Grammar(_))
        ));
    }

    #[test]
    fn test_parse_error() {
        for text in ["a +", "a # b", "[1]", "()", ""] {
            match Grammar::new().parse(text, None) {
                Err(Error::Parse { expr, .. }) => assert_eq!(text, expr),
                v => panic!("unexpected {:?} for `{}`", v, text),
            }
        }
    }
}
