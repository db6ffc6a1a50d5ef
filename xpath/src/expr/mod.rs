mod grammar;
pub mod model;
mod token;

pub(crate) use token::number;

use crate::error::Result;
use grammar::Grammar;
use model::{AxisName, Expr, LocationExpr, NodeTest, StepExpr};
use nom::bytes::complete::take_while1;
use nom::character::complete::{char, one_of};
use nom::combinator::{all_consuming, opt};
use nom::multi::separated_list1;
use nom::sequence::pair;
use nom::IResult;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

// -----------------------------------------------------------------------------------------------

thread_local! {
    static PARSER: Parser = Parser::new();
}

/// Parses `text` through the parser of the current thread, reusing earlier results.
pub fn parse(text: &str) -> Result<Rc<Expr>> {
    PARSER.with(|v| v.parse(text))
}

/// Like [`parse`], with `axis` standing in for the implicit `child` axis of abbreviated steps.
pub fn parse_with_axis(text: &str, axis: AxisName) -> Result<Rc<Expr>> {
    PARSER.with(|v| v.parse_with_axis(text, axis))
}

// -----------------------------------------------------------------------------------------------

/// Expression parser owning its cache of parsed expressions.
#[derive(Default)]
pub struct Parser {
    grammar: Grammar,
    cache: RefCell<HashMap<String, Rc<Expr>>>,
}

impl Parser {
    pub fn new() -> Self {
        Parser::default()
    }

    pub fn parse(&self, text: &str) -> Result<Rc<Expr>> {
        self.parse_cached(text, None)
    }

    pub fn parse_with_axis(&self, text: &str, axis: AxisName) -> Result<Rc<Expr>> {
        self.parse_cached(text, Some(axis))
    }

    /// Number of cached expressions.
    pub fn cached(&self) -> usize {
        self.cache.borrow().len()
    }

    fn parse_cached(&self, text: &str, axis: Option<AxisName>) -> Result<Rc<Expr>> {
        let key = match axis {
            Some(axis) => format!("{}@{}", text, axis),
            None => text.to_string(),
        };

        if let Some(expr) = self.cache.borrow().get(&key) {
            return Ok(Rc::clone(expr));
        }

        let expr = match shortcut(text, axis) {
            Some(expr) => {
                log::debug!("parsed `{}` without grammar", text);
                expr
            }
            None => self.grammar.parse(text, axis)?,
        };

        let expr = Rc::new(expr);
        self.cache.borrow_mut().insert(key, Rc::clone(&expr));
        Ok(expr)
    }
}

// -----------------------------------------------------------------------------------------------

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_ncname(text: &str) -> bool {
    all_consuming(xml_nom::ncname)(text).is_ok()
}

/// ('$' | '@')? Word
fn sigil_word(input: &str) -> IResult<&str, (Option<char>, &str)> {
    pair(opt(one_of("$@")), take_while1(is_word_char))(input)
}

/// Word ('/' Word)*
fn word_path(input: &str) -> IResult<&str, Vec<&str>> {
    separated_list1(char('/'), take_while1(is_word_char))(input)
}

fn name_step(axis: AxisName, name: &str) -> StepExpr {
    StepExpr::from((axis, NodeTest::Name(name.to_string())))
}

/// Builds the trees of the most common short expressions directly: a variable, an attribute,
/// a number, or a chain of child steps.
fn shortcut(text: &str, axis: Option<AxisName>) -> Option<Expr> {
    let child = axis.unwrap_or(AxisName::Child);

    if let Ok((_, (sigil, word))) = all_consuming(sigil_word)(text) {
        return match sigil {
            Some('$') => is_ncname(word).then(|| Expr::Variable(word.to_string())),
            Some(_) => is_ncname(word).then(|| {
                Expr::Location(LocationExpr::from(name_step(AxisName::Attribute, word)))
            }),
            None if word.bytes().all(|v| v.is_ascii_digit()) => {
                word.parse().ok().map(Expr::Number)
            }
            None => is_ncname(word)
                .then(|| Expr::Location(LocationExpr::from(name_step(child, word)))),
        };
    }

    if let Ok((_, words)) = all_consuming(word_path)(text) {
        if words.iter().all(|v| is_ncname(v)) {
            return Some(Expr::Location(LocationExpr {
                absolute: false,
                steps: words.iter().map(|v| name_step(child, v)).collect(),
            }));
        }
    }

    None
}

// -----------------------------------------------------------------------------------------------
