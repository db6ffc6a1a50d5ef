use nom::branch::alt;
use nom::bytes::complete::{tag, take_till};
use nom::character::complete::{char, digit0, digit1, multispace0, satisfy};
use nom::combinator::{not, opt, peek, recognize};
use nom::sequence::{delimited, terminated, tuple};
use nom::IResult;
use xml_nom::xmlchar::is_name_char;
use xml_nom::{ncname, qname};

// -----------------------------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    DoubleSlash,
    Slash,
    DoubleDot,
    Dot,
    AxisSeparator,
    Colon,
    AxisName,
    NodeType,
    ParenOpen,
    ParenClose,
    BracketOpen,
    BracketClose,
    At,
    Comma,
    Or,
    And,
    NotEqual,
    Equal,
    GreaterOrEqual,
    Greater,
    LessOrEqual,
    Less,
    Plus,
    Minus,
    /// `*` as a name test.
    Asterisk,
    /// `*` as the multiplication operator.
    Multiply,
    Pipe,
    Mod,
    Div,
    Literal,
    Number,
    NCName,
    QName,
    Dollar,
}

impl TokenKind {
    pub fn label(&self) -> &'static str {
        match self {
            TokenKind::DoubleSlash => "//",
            TokenKind::Slash => "/",
            TokenKind::DoubleDot => "..",
            TokenKind::Dot => ".",
            TokenKind::AxisSeparator => "::",
            TokenKind::Colon => ":",
            TokenKind::AxisName => "[axis]",
            TokenKind::NodeType => "[nodetest-start]",
            TokenKind::ParenOpen => "(",
            TokenKind::ParenClose => ")",
            TokenKind::BracketOpen => "[",
            TokenKind::BracketClose => "]",
            TokenKind::At => "@",
            TokenKind::Comma => ",",
            TokenKind::Or => "or",
            TokenKind::And => "and",
            TokenKind::NotEqual => "!=",
            TokenKind::Equal => "=",
            TokenKind::GreaterOrEqual => ">=",
            TokenKind::Greater => ">",
            TokenKind::LessOrEqual => "<=",
            TokenKind::Less => "<",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Asterisk => "*",
            TokenKind::Multiply => "[mul]",
            TokenKind::Pipe => "|",
            TokenKind::Mod => "mod",
            TokenKind::Div => "div",
            TokenKind::Literal => "[literal]",
            TokenKind::Number => "[number]",
            TokenKind::NCName => "[ncname]",
            TokenKind::QName => "[qname]",
            TokenKind::Dollar => "$",
        }
    }

    pub fn precedence(&self) -> i32 {
        match self {
            TokenKind::Colon => 1000,
            TokenKind::Number => 35,
            TokenKind::ParenOpen | TokenKind::DoubleDot | TokenKind::Dot | TokenKind::At => 34,
            TokenKind::BracketOpen => 32,
            TokenKind::Slash => 30,
            TokenKind::AxisSeparator | TokenKind::Literal => 20,
            TokenKind::DoubleSlash => 19,
            TokenKind::Pipe => 17,
            TokenKind::Asterisk | TokenKind::Multiply | TokenKind::Div | TokenKind::Mod => 15,
            TokenKind::Plus | TokenKind::Minus => 14,
            TokenKind::GreaterOrEqual
            | TokenKind::Greater
            | TokenKind::LessOrEqual
            | TokenKind::Less => 13,
            TokenKind::Equal | TokenKind::NotEqual => 12,
            TokenKind::And => 11,
            TokenKind::Or => 10,
            // closers let a pending bare `/` or `//` reduce
            TokenKind::ParenClose | TokenKind::BracketClose | TokenKind::Comma => -1,
            TokenKind::AxisName
            | TokenKind::NodeType
            | TokenKind::NCName
            | TokenKind::QName
            | TokenKind::Dollar => 0,
        }
    }

    pub fn is_left_associative(&self) -> bool {
        matches!(
            self,
            TokenKind::Or
                | TokenKind::And
                | TokenKind::NotEqual
                | TokenKind::Equal
                | TokenKind::GreaterOrEqual
                | TokenKind::Greater
                | TokenKind::LessOrEqual
                | TokenKind::Less
                | TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Asterisk
                | TokenKind::Multiply
                | TokenKind::Mod
                | TokenKind::Div
        )
    }

    /// After one of these an operator is expected rather than a name.
    fn closes_operand(&self) -> bool {
        matches!(
            self,
            TokenKind::ParenClose
                | TokenKind::BracketClose
                | TokenKind::QName
                | TokenKind::Asterisk
                | TokenKind::Dot
                | TokenKind::DoubleDot
                | TokenKind::Literal
                | TokenKind::Number
        )
    }
}

// -----------------------------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    pub fn precedence(&self) -> i32 {
        self.kind.precedence()
    }
}

// -----------------------------------------------------------------------------------------------

enum Pattern {
    Symbol(&'static str),
    Keyword(&'static str),
    Parser(fn(&str) -> IResult<&str, &str>),
}

struct Rule {
    kind: TokenKind,
    pattern: Pattern,
}

const fn rule(kind: TokenKind, pattern: Pattern) -> Rule {
    Rule { kind, pattern }
}

impl Rule {
    fn matches<'a>(&self, input: &'a str) -> Option<&'a str> {
        let result = match self.pattern {
            Pattern::Symbol(v) => tag(v)(input),
            Pattern::Keyword(v) => keyword(v)(input),
            Pattern::Parser(f) => f(input),
        };
        result.ok().map(|(_, matched)| matched)
    }
}

/// Tried in order; the longest match wins and ties go to the earlier rule.
static RULES: &[Rule] = &[
    rule(TokenKind::DoubleSlash, Pattern::Symbol("//")),
    rule(TokenKind::Slash, Pattern::Symbol("/")),
    rule(TokenKind::DoubleDot, Pattern::Symbol("..")),
    rule(TokenKind::Dot, Pattern::Symbol(".")),
    rule(TokenKind::AxisSeparator, Pattern::Symbol("::")),
    rule(TokenKind::Colon, Pattern::Symbol(":")),
    rule(TokenKind::AxisName, Pattern::Parser(axis_name)),
    rule(TokenKind::NodeType, Pattern::Parser(node_type)),
    rule(TokenKind::ParenOpen, Pattern::Symbol("(")),
    rule(TokenKind::ParenClose, Pattern::Symbol(")")),
    rule(TokenKind::BracketOpen, Pattern::Symbol("[")),
    rule(TokenKind::BracketClose, Pattern::Symbol("]")),
    rule(TokenKind::At, Pattern::Symbol("@")),
    rule(TokenKind::Comma, Pattern::Symbol(",")),
    rule(TokenKind::Or, Pattern::Keyword("or")),
    rule(TokenKind::And, Pattern::Keyword("and")),
    rule(TokenKind::NotEqual, Pattern::Symbol("!=")),
    rule(TokenKind::Equal, Pattern::Symbol("=")),
    rule(TokenKind::GreaterOrEqual, Pattern::Symbol(">=")),
    rule(TokenKind::Greater, Pattern::Symbol(">")),
    rule(TokenKind::LessOrEqual, Pattern::Symbol("<=")),
    rule(TokenKind::Less, Pattern::Symbol("<")),
    rule(TokenKind::Plus, Pattern::Symbol("+")),
    rule(TokenKind::Minus, Pattern::Symbol("-")),
    rule(TokenKind::Asterisk, Pattern::Symbol("*")),
    rule(TokenKind::Pipe, Pattern::Symbol("|")),
    rule(TokenKind::Mod, Pattern::Keyword("mod")),
    rule(TokenKind::Div, Pattern::Keyword("div")),
    rule(TokenKind::Literal, Pattern::Parser(literal)),
    rule(TokenKind::Number, Pattern::Parser(number)),
    rule(TokenKind::NCName, Pattern::Parser(prefix_wildcard)),
    rule(TokenKind::QName, Pattern::Parser(qualified_name)),
    rule(TokenKind::Dollar, Pattern::Symbol("$")),
];

// -----------------------------------------------------------------------------------------------

pub struct Tokenizer<'a> {
    input: &'a str,
    previous: Option<TokenKind>,
    attempts: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Tokenizer {
            input,
            previous: None,
            attempts: 0,
        }
    }

    /// Input left after the last token.
    pub fn rest(&self) -> &'a str {
        self.input
    }

    /// Number of rule matches tried so far.
    pub fn attempts(&self) -> usize {
        self.attempts
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        self.input = self.input.trim_start();

        let mut best: Option<(&Rule, &'a str)> = None;
        for rule in RULES {
            self.attempts += 1;
            if let Some(matched) = rule.matches(self.input) {
                if best.map(|(_, v)| matched.len() > v.len()).unwrap_or(true) {
                    best = Some((rule, matched));
                }
            }
        }

        let (rule, matched) = best?;
        self.input = &self.input[matched.len()..];

        let kind = disambiguate(rule.kind, self.previous);
        self.previous = Some(kind);
        log::trace!("token {} {:?}", kind.label(), matched);

        Some(Token {
            kind,
            text: matched.to_string(),
        })
    }
}

/// `and`, `or`, `div`, `mod` and `*` are operators only where an operator may follow;
/// elsewhere (after `@`, `::`, `/`, `//`, `$`, ...) they name nodes.
fn disambiguate(kind: TokenKind, previous: Option<TokenKind>) -> TokenKind {
    let operator_expected = previous.map(|v| v.closes_operand()).unwrap_or_default();
    match kind {
        TokenKind::Or | TokenKind::And | TokenKind::Div | TokenKind::Mod if !operator_expected => {
            TokenKind::QName
        }
        TokenKind::Asterisk if operator_expected => TokenKind::Multiply,
        _ => kind,
    }
}

// -----------------------------------------------------------------------------------------------

fn keyword(word: &'static str) -> impl FnMut(&str) -> IResult<&str, &str> {
    move |input: &str| terminated(tag(word), not(peek(satisfy(is_name_char))))(input)
}

/// AxisName '::'
///
/// [\[6\] AxisName](https://triple-underscore.github.io/XML/xpath10-ja.html#NT-AxisName)
fn axis_name(input: &str) -> IResult<&str, &str> {
    terminated(
        alt((
            tag("ancestor-or-self"),
            tag("ancestor"),
            tag("attribute"),
            tag("child"),
            tag("descendant-or-self"),
            tag("descendant"),
            tag("following-sibling"),
            tag("following"),
            tag("namespace"),
            tag("parent"),
            tag("preceding-sibling"),
            tag("preceding"),
            tag("self"),
        )),
        peek(tuple((multispace0, tag("::")))),
    )(input)
}

/// NodeType '('
///
/// [\[38\] NodeType](https://triple-underscore.github.io/XML/xpath10-ja.html#NT-NodeType)
fn node_type(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        alt((
            tag("processing-instruction"),
            tag("comment"),
            tag("text"),
            tag("node"),
        )),
        multispace0,
        char('('),
    )))(input)
}

/// '"' [^"]* '"' | "'" [^']* "'"
///
/// [\[29\] Literal](https://triple-underscore.github.io/XML/xpath10-ja.html#NT-Literal)
fn literal(input: &str) -> IResult<&str, &str> {
    alt((
        recognize(delimited(char('"'), take_till(|c| c == '"'), char('"'))),
        recognize(delimited(char('\''), take_till(|c| c == '\''), char('\''))),
    ))(input)
}

/// Digits ('.' Digits?)? | '.' Digits
///
/// [\[30\] Number](https://triple-underscore.github.io/XML/xpath10-ja.html#NT-Number)
pub(crate) fn number(input: &str) -> IResult<&str, &str> {
    alt((
        recognize(tuple((digit1, opt(tuple((char('.'), digit0)))))),
        recognize(tuple((char('.'), digit1))),
    ))(input)
}

/// The NCName of `NCName ':' '*'`.
fn prefix_wildcard(input: &str) -> IResult<&str, &str> {
    terminated(ncname, peek(tag(":*")))(input)
}

fn qualified_name(input: &str) -> IResult<&str, &str> {
    recognize(qname)(input)
}

// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<(TokenKind, String)> {
        Tokenizer::new(input).map(|v| (v.kind, v.text)).collect()
    }

    fn token(kind: TokenKind, text: &str) -> (TokenKind, String) {
        (kind, text.to_string())
    }

    #[test]
    fn test_longest_match() {
        assert_eq!(
            vec![
                token(TokenKind::DoubleSlash, "//"),
                token(TokenKind::QName, "para"),
                token(TokenKind::Slash, "/"),
                token(TokenKind::DoubleDot, ".."),
            ],
            kinds("//para/..")
        );

        assert_eq!(
            vec![
                token(TokenKind::QName, "order"),
                token(TokenKind::Or, "or"),
                token(TokenKind::QName, "android"),
            ],
            kinds("order or android")
        );

        assert_eq!(vec![token(TokenKind::Number, ".5")], kinds(".5"));
        assert_eq!(vec![token(TokenKind::Number, "12.")], kinds("12."));
    }

    #[test]
    fn test_axis_name() {
        assert_eq!(
            vec![
                token(TokenKind::AxisName, "child"),
                token(TokenKind::AxisSeparator, "::"),
                token(TokenKind::QName, "para"),
            ],
            kinds("child :: para")
        );

        assert_eq!(
            vec![
                token(TokenKind::QName, "parent"),
                token(TokenKind::Slash, "/"),
                token(TokenKind::QName, "parental"),
            ],
            kinds("parent/parental")
        );
    }

    #[test]
    fn test_node_type() {
        assert_eq!(
            vec![
                token(TokenKind::NodeType, "text("),
                token(TokenKind::ParenClose, ")"),
            ],
            kinds("text()")
        );
        assert_eq!(vec![token(TokenKind::QName, "text")], kinds("text"));
    }

    #[test]
    fn test_prefix_wildcard() {
        assert_eq!(
            vec![
                token(TokenKind::NCName, "xsl"),
                token(TokenKind::Colon, ":"),
                token(TokenKind::Asterisk, "*"),
            ],
            kinds("xsl:*")
        );
        assert_eq!(vec![token(TokenKind::QName, "xsl:template")], kinds("xsl:template"));
    }

    #[test]
    fn test_operator_names() {
        assert_eq!(
            vec![
                token(TokenKind::At, "@"),
                token(TokenKind::QName, "div"),
                token(TokenKind::Div, "div"),
                token(TokenKind::Dollar, "$"),
                token(TokenKind::QName, "mod"),
            ],
            kinds("@div div $mod")
        );

        assert_eq!(
            vec![
                token(TokenKind::Slash, "/"),
                token(TokenKind::QName, "and"),
                token(TokenKind::And, "and"),
                token(TokenKind::AxisName, "child"),
                token(TokenKind::AxisSeparator, "::"),
                token(TokenKind::QName, "or"),
            ],
            kinds("/and and child::or")
        );
    }

    #[test]
    fn test_asterisk() {
        assert_eq!(
            vec![
                token(TokenKind::Number, "2"),
                token(TokenKind::Multiply, "*"),
                token(TokenKind::Asterisk, "*"),
            ],
            kinds("2 * *")
        );
        assert_eq!(
            vec![token(TokenKind::At, "@"), token(TokenKind::Asterisk, "*")],
            kinds("@*")
        );
    }

    #[test]
    fn test_literal() {
        assert_eq!(
            vec![
                token(TokenKind::Literal, "'a\"b'"),
                token(TokenKind::Literal, "\"c'd\""),
            ],
            kinds("'a\"b' \"c'd\"")
        );
    }

    #[test]
    fn test_stops_at_unknown_input() {
        let mut tokenizer = Tokenizer::new("a # b");
        assert_eq!(TokenKind::QName, tokenizer.next().unwrap().kind);
        assert_eq!(None, tokenizer.next());
        assert_eq!("# b", tokenizer.rest());
    }
}
