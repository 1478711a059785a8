//! Fallback expression parser
//!
//! PEST grammar for the token shapes plus a Pratt parser for precedence.
//! Produces the `Expr` AST that `executor::expressions` evaluates.
//!
//! Precedence, loosest to tightest:
//!
//! | level | operators                 |
//! |-------|---------------------------|
//! | 1     | `\|\|`                    |
//! | 2     | `&&`                      |
//! | 3     | `==` `!=` `===` `!==`     |
//! | 4     | `<` `<=` `>` `>=`         |
//! | 5     | `+` `-`                   |
//! | 6     | `*` `/` `%`               |
//! | 7     | prefix `!` `-`            |
//! | 8     | postfix `.name` `[expr]`  |

use std::sync::LazyLock;

use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest::Parser;
use pest_derive::Parser;

use crate::executor::splitter::max_nesting_depth;
use crate::executor::types::{BinaryOp, Expr, UnaryOp, Val};


/* ===================== PEST Parser ===================== */

#[derive(Parser)]
#[grammar = "parser/expr.pest"]
struct ExprParser;

/// Deepest bracket nesting accepted, checked before the grammar runs
pub const MAX_NESTING: usize = 64;

/// Longest run of prefix operators (`!!!x`) accepted
pub const MAX_PREFIX_RUN: usize = 64;

/// Most syntax nodes one expression may produce
pub const MAX_NODES: usize = 4096;

static PRATT: LazyLock<PrattParser<Rule>> = LazyLock::new(|| {
    PrattParser::new()
        .op(Op::infix(Rule::or, Assoc::Left))
        .op(Op::infix(Rule::and, Assoc::Left))
        .op(Op::infix(Rule::strict_eq, Assoc::Left)
            | Op::infix(Rule::strict_ne, Assoc::Left)
            | Op::infix(Rule::eq, Assoc::Left)
            | Op::infix(Rule::ne, Assoc::Left))
        .op(Op::infix(Rule::lt, Assoc::Left)
            | Op::infix(Rule::le, Assoc::Left)
            | Op::infix(Rule::gt, Assoc::Left)
            | Op::infix(Rule::ge, Assoc::Left))
        .op(Op::infix(Rule::add, Assoc::Left) | Op::infix(Rule::sub, Assoc::Left))
        .op(Op::infix(Rule::mul, Assoc::Left)
            | Op::infix(Rule::div, Assoc::Left)
            | Op::infix(Rule::rem, Assoc::Left))
        .op(Op::prefix(Rule::not) | Op::prefix(Rule::neg))
        .op(Op::postfix(Rule::member) | Op::postfix(Rule::index))
});

/* ===================== Error Types ===================== */

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    PestError(String),
    BuildError(String),
    LimitExceeded(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::PestError(msg) => write!(f, "{}", msg),
            ParseError::BuildError(msg) => write!(f, "{}", msg),
            ParseError::LimitExceeded(msg) => write!(f, "Expression too complex: {}", msg),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        ParseError::PestError(err.to_string())
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/* ===================== Public API ===================== */

/// Parse a complete expression
///
/// The whole input must be consumed; trailing tokens are an error. Inputs past
/// `MAX_NESTING`, `MAX_PREFIX_RUN` or `MAX_NODES` are rejected before any
/// recursive step runs.
pub fn parse_expression(source: &str) -> ParseResult<Expr> {
    let nesting = max_nesting_depth(source);
    if nesting > MAX_NESTING {
        return Err(ParseError::LimitExceeded(format!(
            "nesting depth {} exceeds {}",
            nesting, MAX_NESTING
        )));
    }

    let mut pairs = ExprParser::parse(Rule::program, source)?;

    // program = { SOI ~ expr ~ EOI }
    let expr = pairs
        .next()
        .and_then(|program| program.into_inner().next())
        .ok_or_else(|| ParseError::BuildError("Empty expression".to_string()))?;

    check_size(&expr)?;
    build_expr(expr.into_inner())
}

/// Bound the tree the Pratt builder would produce
///
/// Left-associative chains build iteratively, but each node still costs a
/// frame when the tree is dropped, and prefix runs recurse while building.
fn check_size(expr: &Pair<Rule>) -> ParseResult<()> {
    let mut nodes = 0;
    let mut prefix_run = 0;

    for pair in expr.clone().into_inner().flatten() {
        nodes += 1;
        if nodes > MAX_NODES {
            return Err(ParseError::LimitExceeded(format!(
                "more than {} nodes",
                MAX_NODES
            )));
        }

        if matches!(pair.as_rule(), Rule::not | Rule::neg) {
            prefix_run += 1;
            if prefix_run > MAX_PREFIX_RUN {
                return Err(ParseError::LimitExceeded(format!(
                    "more than {} consecutive prefix operators",
                    MAX_PREFIX_RUN
                )));
            }
        } else {
            prefix_run = 0;
        }
    }
    Ok(())
}

/* ===================== AST Builder ===================== */

fn build_expr(pairs: Pairs<Rule>) -> ParseResult<Expr> {
    PRATT
        .map_primary(build_primary)
        .map_prefix(|op, operand| {
            let op = match op.as_rule() {
                Rule::not => UnaryOp::Not,
                Rule::neg => UnaryOp::Neg,
                rule => return Err(unexpected(rule)),
            };
            Ok(Expr::Unary {
                op,
                operand: Box::new(operand?),
            })
        })
        .map_postfix(|object, op| {
            let object = Box::new(object?);
            match op.as_rule() {
                Rule::member => Ok(Expr::Member {
                    object,
                    property: first_inner(op)?.as_str().to_string(),
                }),
                Rule::index => Ok(Expr::Index {
                    object,
                    index: Box::new(build_expr(first_inner(op)?.into_inner())?),
                }),
                rule => Err(unexpected(rule)),
            }
        })
        .map_infix(|left, op, right| {
            let op = match op.as_rule() {
                Rule::or => BinaryOp::Or,
                Rule::and => BinaryOp::And,
                Rule::strict_eq => BinaryOp::StrictEq,
                Rule::strict_ne => BinaryOp::StrictNe,
                Rule::eq => BinaryOp::Eq,
                Rule::ne => BinaryOp::Ne,
                Rule::lt => BinaryOp::Lt,
                Rule::le => BinaryOp::Le,
                Rule::gt => BinaryOp::Gt,
                Rule::ge => BinaryOp::Ge,
                Rule::add => BinaryOp::Add,
                Rule::sub => BinaryOp::Sub,
                Rule::mul => BinaryOp::Mul,
                Rule::div => BinaryOp::Div,
                Rule::rem => BinaryOp::Rem,
                rule => return Err(unexpected(rule)),
            };
            Ok(Expr::Binary {
                op,
                left: Box::new(left?),
                right: Box::new(right?),
            })
        })
        .parse(pairs)
}

fn build_primary(pair: Pair<Rule>) -> ParseResult<Expr> {
    match pair.as_rule() {
        Rule::keyword => Ok(match pair.as_str() {
            "true" => Expr::LitBool { v: true },
            "false" => Expr::LitBool { v: false },
            "null" => Expr::LitNull,
            _ => Expr::LitUndefined,
        }),

        Rule::number => Ok(Expr::LitNum {
            v: parse_number(&pair)?,
        }),

        Rule::string => Ok(Expr::LitStr {
            v: first_inner(pair)?.as_str().to_string(),
        }),

        Rule::ident => Ok(Expr::Ident {
            name: pair.as_str().to_string(),
        }),

        // Parenthesised sub-expression
        Rule::expr => build_expr(pair.into_inner()),

        Rule::object => {
            let mut props = Vec::new();
            for property in pair.into_inner() {
                // property = { (ident | string | number) ~ ":" ~ expr }
                let mut inner = property.into_inner();
                let key = inner
                    .next()
                    .ok_or_else(|| ParseError::BuildError("Missing property key".to_string()))?;
                let key = match key.as_rule() {
                    Rule::string => first_inner(key)?.as_str().to_string(),
                    // `{1: x}` is keyed "1"
                    Rule::number => Val::Num(parse_number(&key)?).to_display_string(),
                    _ => key.as_str().to_string(),
                };
                let value = inner
                    .next()
                    .ok_or_else(|| ParseError::BuildError("Missing property value".to_string()))?;
                props.push((key, build_expr(value.into_inner())?));
            }
            Ok(Expr::Object { props })
        }

        Rule::array => {
            let items = pair
                .into_inner()
                .map(|item| build_expr(item.into_inner()))
                .collect::<ParseResult<Vec<_>>>()?;
            Ok(Expr::Array { items })
        }

        rule => Err(unexpected(rule)),
    }
}

/* ===================== Helpers ===================== */

fn first_inner(pair: Pair<Rule>) -> ParseResult<Pair<Rule>> {
    let rule = pair.as_rule();
    pair.into_inner()
        .next()
        .ok_or_else(|| ParseError::BuildError(format!("Empty {:?} node", rule)))
}

fn parse_number(pair: &Pair<Rule>) -> ParseResult<f64> {
    pair.as_str()
        .parse::<f64>()
        .map_err(|e| ParseError::BuildError(format!("Invalid number '{}': {}", pair.as_str(), e)))
}

fn unexpected(rule: Rule) -> ParseError {
    ParseError::BuildError(format!("Unexpected rule: {:?}", rule))
}
