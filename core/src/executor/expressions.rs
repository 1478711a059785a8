//! Expression evaluation
//!
//! `evaluate` resolves statement text to a value. The common shapes (literals,
//! variable lookup, `obj.field`) are recognised directly; everything else goes
//! through the fallback parser and `eval_expr`. A failed fallback evaluation is
//! not an error for the statement: it yields `undefined`.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::env::Environment;
use super::errors::EvalError;
use super::types::{BinaryOp, Expr, UnaryOp, Val};
use crate::parser;

static NUMBER_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("valid number pattern"));

static PROPERTY_PROJECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w+)\.(\w+)$").expect("valid projection pattern"));

/* ===================== Public API ===================== */

/// Evaluate expression text against the environment
///
/// Resolution order, first match wins:
/// 1. `true` / `false` / `null` / `undefined`
/// 2. numeric literal
/// 3. quoted string (`"..."` or `'...'` spanning the whole text)
/// 4. bound variable name
/// 5. `name.field` projection (undefined when `name` is unbound or nullish)
/// 6. fallback parser; failures become undefined
pub fn evaluate(text: &str, env: &Environment) -> Val {
    let text = text.trim();

    match text {
        "true" => return Val::Bool(true),
        "false" => return Val::Bool(false),
        "null" => return Val::Null,
        "undefined" => return Val::Undefined,
        _ => {}
    }

    if NUMBER_LITERAL.is_match(text) {
        if let Ok(n) = text.parse::<f64>() {
            return Val::Num(n);
        }
    }

    if let Some(s) = quoted_literal(text) {
        return Val::Str(s.to_string());
    }

    if let Some(value) = env.get(text) {
        return value.clone();
    }

    if let Some(caps) = PROPERTY_PROJECTION.captures(text) {
        return env
            .get(&caps[1])
            .and_then(|base| read_property(base, &caps[2]).ok())
            .unwrap_or_default();
    }

    match evaluate_fallback(text, env) {
        Ok(value) => value,
        Err(e) => {
            debug!(expression = text, error = %e, "Fallback evaluation failed, using undefined");
            Val::Undefined
        }
    }
}

/// Parse and evaluate with the fallback grammar, reporting failures
pub fn evaluate_fallback(text: &str, env: &Environment) -> Result<Val, EvalError> {
    let expr = parser::parse_expression(text).map_err(|e| EvalError::Parse(e.to_string()))?;
    eval_expr(&expr, env)
}

/// Text wrapped in a single pair of matching `"` or `'` quotes
///
/// `"a" + "b"` is not a literal: the delimiter occurs inside.
fn quoted_literal(text: &str) -> Option<&str> {
    ['"', '\''].into_iter().find_map(|quote| {
        let inner = text.strip_prefix(quote)?.strip_suffix(quote)?;
        (!inner.contains(quote)).then_some(inner)
    })
}

/* ===================== AST Evaluation ===================== */

/// Deepest AST recursion `eval_expr` follows before giving up
///
/// Left-associative operator chains do not count against it.
pub const MAX_EVAL_DEPTH: usize = 200;

/// Evaluate a fallback AST node
pub fn eval_expr(expr: &Expr, env: &Environment) -> Result<Val, EvalError> {
    eval_at(expr, env, 0)
}

fn eval_at(expr: &Expr, env: &Environment, depth: usize) -> Result<Val, EvalError> {
    if depth > MAX_EVAL_DEPTH {
        return Err(EvalError::TooDeep {
            limit: MAX_EVAL_DEPTH,
        });
    }
    let next = depth + 1;

    match expr {
        Expr::LitUndefined => Ok(Val::Undefined),

        Expr::LitNull => Ok(Val::Null),

        Expr::LitBool { v } => Ok(Val::Bool(*v)),

        Expr::LitNum { v } => Ok(Val::Num(*v)),

        Expr::LitStr { v } => Ok(Val::Str(v.clone())),

        Expr::Ident { name } => env
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UndefinedVariable { name: name.clone() }),

        Expr::Member { object, property } => {
            let object = eval_at(object, env, next)?;
            read_property(&object, property)
        }

        Expr::Index { object, index } => {
            let object = eval_at(object, env, next)?;
            let index = eval_at(index, env, next)?;
            match (&object, &index) {
                (Val::List(items), Val::Num(n)) => Ok(list_index(*n)
                    .and_then(|i| items.get(i))
                    .cloned()
                    .unwrap_or_default()),
                _ => read_property(&object, &index.to_display_string()),
            }
        }

        Expr::Object { props } => {
            let mut map = indexmap::IndexMap::with_capacity(props.len());
            for (key, value) in props {
                map.insert(key.clone(), eval_at(value, env, next)?);
            }
            Ok(Val::Obj(map))
        }

        Expr::Array { items } => items
            .iter()
            .map(|item| eval_at(item, env, next))
            .collect::<Result<Vec<_>, _>>()
            .map(Val::List),

        Expr::Unary { op, operand } => {
            let value = eval_at(operand, env, next)?;
            Ok(match op {
                UnaryOp::Not => Val::Bool(!value.is_truthy()),
                UnaryOp::Neg => Val::Num(-value.to_number()),
            })
        }

        Expr::Binary { .. } => eval_binary_chain(expr, env, next),
    }
}

/// Evaluate a binary node and the binary nodes down its left spine
///
/// `1 + 2 + 3` nests to the left, so the spine is collected into a list and
/// folded bottom-up instead of recursing once per operator.
fn eval_binary_chain(expr: &Expr, env: &Environment, depth: usize) -> Result<Val, EvalError> {
    let mut spine = Vec::new();
    let mut node = expr;
    while let Expr::Binary { op, left, right } = node {
        spine.push((*op, right.as_ref()));
        node = left.as_ref();
    }

    let mut acc = eval_at(node, env, depth)?;
    for (op, right) in spine.into_iter().rev() {
        // Short-circuit: && and || return an operand, not a boolean
        acc = match op {
            BinaryOp::And if !acc.is_truthy() => acc,
            BinaryOp::Or if acc.is_truthy() => acc,
            BinaryOp::And | BinaryOp::Or => eval_at(right, env, depth)?,
            _ => {
                let right = eval_at(right, env, depth)?;
                apply_binary(op, &acc, &right)
            }
        };
    }
    Ok(acc)
}

/// Property read with JavaScript semantics
///
/// Nullish bases fail; other non-objects (and missing fields) read as undefined.
pub fn read_property(object: &Val, property: &str) -> Result<Val, EvalError> {
    match object {
        Val::Undefined | Val::Null => Err(EvalError::NullishAccess {
            property: property.to_string(),
            base: object.type_name(),
        }),
        Val::Obj(map) => Ok(map.get(property).cloned().unwrap_or_default()),
        Val::List(items) => Ok(match property {
            "length" => Val::Num(items.len() as f64),
            _ => property
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get(i))
                .cloned()
                .unwrap_or_default(),
        }),
        _ => Ok(Val::Undefined),
    }
}

fn list_index(n: f64) -> Option<usize> {
    (n >= 0.0 && n == n.trunc()).then_some(n as usize)
}

/* ===================== Operators ===================== */

fn apply_binary(op: BinaryOp, left: &Val, right: &Val) -> Val {
    match op {
        BinaryOp::Add => {
            let concat = matches!(left, Val::Str(_))
                || matches!(right, Val::Str(_))
                || left.is_structured()
                || right.is_structured();
            if concat {
                Val::Str(left.to_display_string() + &right.to_display_string())
            } else {
                Val::Num(left.to_number() + right.to_number())
            }
        }
        BinaryOp::Sub => Val::Num(left.to_number() - right.to_number()),
        BinaryOp::Mul => Val::Num(left.to_number() * right.to_number()),
        BinaryOp::Div => Val::Num(left.to_number() / right.to_number()),
        BinaryOp::Rem => Val::Num(left.to_number() % right.to_number()),

        BinaryOp::Lt => Val::Bool(compare(left, right, |o| o.is_lt())),
        BinaryOp::Le => Val::Bool(compare(left, right, |o| o.is_le())),
        BinaryOp::Gt => Val::Bool(compare(left, right, |o| o.is_gt())),
        BinaryOp::Ge => Val::Bool(compare(left, right, |o| o.is_ge())),

        BinaryOp::Eq => Val::Bool(loose_eq(left, right)),
        BinaryOp::Ne => Val::Bool(!loose_eq(left, right)),
        BinaryOp::StrictEq => Val::Bool(strict_eq(left, right)),
        BinaryOp::StrictNe => Val::Bool(!strict_eq(left, right)),

        // Handled with short-circuiting in eval_expr
        BinaryOp::And | BinaryOp::Or => Val::Undefined,
    }
}

/// Relational comparison: strings lexicographically, everything else numerically
fn compare(left: &Val, right: &Val, test: impl Fn(std::cmp::Ordering) -> bool) -> bool {
    match (left, right) {
        (Val::Str(a), Val::Str(b)) => test(a.cmp(b)),
        _ => left
            .to_number()
            .partial_cmp(&right.to_number())
            .is_some_and(test),
    }
}

fn loose_eq(left: &Val, right: &Val) -> bool {
    match (left, right) {
        (a, b) if a.is_nullish() || b.is_nullish() => a.is_nullish() && b.is_nullish(),
        (Val::Str(a), Val::Str(b)) => a == b,
        (a, b) if a.is_structured() || b.is_structured() => a == b,
        _ => left.to_number() == right.to_number(),
    }
}

fn strict_eq(left: &Val, right: &Val) -> bool {
    std::mem::discriminant(left) == std::mem::discriminant(right) && left == right
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env_from(json: serde_json::Value) -> Environment {
        let mut env = Environment::new();
        if let Val::Obj(map) = Val::from(json) {
            for (k, v) in map {
                env.set(k, v);
            }
        }
        env
    }

    #[test]
    fn test_keywords() {
        let env = Environment::new();
        assert_eq!(evaluate("true", &env), Val::Bool(true));
        assert_eq!(evaluate(" false ", &env), Val::Bool(false));
        assert_eq!(evaluate("null", &env), Val::Null);
        assert_eq!(evaluate("undefined", &env), Val::Undefined);
    }

    #[test]
    fn test_number_literals() {
        let env = Environment::new();
        assert_eq!(evaluate("42", &env), Val::Num(42.0));
        assert_eq!(evaluate("-7.5", &env), Val::Num(-7.5));
    }

    #[test]
    fn test_quoted_literals_have_no_escape_processing() {
        let env = Environment::new();
        assert_eq!(evaluate(r#""hello""#, &env), Val::Str("hello".into()));
        assert_eq!(evaluate("'a\\nb'", &env), Val::Str("a\\nb".into()));
    }

    #[test]
    fn test_concatenated_strings_are_not_one_literal() {
        let env = Environment::new();
        assert_eq!(evaluate(r#""a" + "b""#, &env), Val::Str("ab".into()));
    }

    #[test]
    fn test_variable_lookup() {
        let env = env_from(json!({"x": 5, "name": "n"}));
        assert_eq!(evaluate("x", &env), Val::Num(5.0));
        assert_eq!(evaluate("name", &env), Val::Str("n".into()));
    }

    #[test]
    fn test_property_projection() {
        let env = env_from(json!({"resp": {"id": 7}, "n": 3, "items": [1, 2], "gone": null}));
        assert_eq!(evaluate("resp.id", &env), Val::Num(7.0));
        assert_eq!(evaluate("items.length", &env), Val::Num(2.0));
        assert_eq!(evaluate("gone.id", &env), Val::Undefined);
        assert_eq!(evaluate("resp.missing", &env), Val::Undefined);
        assert_eq!(evaluate("n.id", &env), Val::Undefined);
        assert_eq!(evaluate("nope.id", &env), Val::Undefined);
    }

    #[test]
    fn test_fallback_arithmetic() {
        let env = env_from(json!({"x": 5, "a": {"count": 2}}));
        assert_eq!(evaluate("x * 2", &env), Val::Num(10.0));
        assert_eq!(evaluate("x * 2 + 1", &env), Val::Num(11.0));
        assert_eq!(evaluate("a.count + 1", &env), Val::Num(3.0));
        assert_eq!(evaluate("(x - 1) % 3", &env), Val::Num(1.0));
        assert_eq!(evaluate("7 / 2", &env), Val::Num(3.5));
    }

    #[test]
    fn test_fallback_string_concatenation() {
        let env = env_from(json!({"name": "ada", "n": 2}));
        assert_eq!(
            evaluate("'hi ' + name + n", &env),
            Val::Str("hi ada2".into())
        );
    }

    #[test]
    fn test_fallback_comparisons() {
        let env = env_from(json!({"x": 5, "s": "5"}));
        assert_eq!(evaluate("x > 3", &env), Val::Bool(true));
        assert_eq!(evaluate("x <= 4", &env), Val::Bool(false));
        assert_eq!(evaluate("x == s", &env), Val::Bool(true));
        assert_eq!(evaluate("x === s", &env), Val::Bool(false));
        assert_eq!(evaluate("null == undefined", &env), Val::Bool(true));
        assert_eq!(evaluate("null === undefined", &env), Val::Bool(false));
        assert_eq!(evaluate("'b' > 'a'", &env), Val::Bool(true));
    }

    #[test]
    fn test_logical_operators_return_operands() {
        let env = env_from(json!({"x": 0, "y": "fallback"}));
        assert_eq!(evaluate("x || y", &env), Val::Str("fallback".into()));
        assert_eq!(evaluate("x && y", &env), Val::Num(0.0));
        assert_eq!(evaluate("!x", &env), Val::Bool(true));
    }

    #[test]
    fn test_short_circuit_skips_failing_operand() {
        let env = env_from(json!({"x": 0}));
        assert_eq!(evaluate("x && missing.field", &env), Val::Num(0.0));
    }

    #[test]
    fn test_object_and_array_literals() {
        let env = env_from(json!({"x": 1}));
        assert_eq!(
            evaluate("{count: x + 1, tags: ['a']}", &env),
            Val::from(json!({"count": 2, "tags": ["a"]}))
        );
        assert_eq!(evaluate("[10, 20][1]", &env), Val::Num(20.0));
        assert_eq!(evaluate("[10, 20].length", &env), Val::Num(2.0));
    }

    #[test]
    fn test_fallback_failures_yield_undefined() {
        let env = env_from(json!({"x": 1}));
        for source in ["missing + 1", "x +", "foo(1)", "x.y.z", "a = = b"] {
            assert_eq!(evaluate(source, &env), Val::Undefined, "source: {}", source);
        }
    }

    #[test]
    fn test_division_by_zero_follows_ieee() {
        let env = Environment::new();
        assert_eq!(evaluate("1 / 0", &env), Val::Num(f64::INFINITY));
        let Val::Num(n) = evaluate("0 / 0", &env) else {
            unreachable!("Expected number");
        };
        assert!(n.is_nan());
    }

    #[test]
    fn test_evaluate_fallback_reports_error() {
        let env = Environment::new();
        assert_eq!(
            evaluate_fallback("ghost", &env),
            Err(EvalError::UndefinedVariable {
                name: "ghost".to_string()
            })
        );
        assert!(matches!(
            evaluate_fallback("1 +", &env),
            Err(EvalError::Parse(_))
        ));
    }

    #[test]
    fn test_long_left_chains_evaluate() {
        let env = env_from(json!({"x": 1}));
        let sum = format!("x{}", " + 1".repeat(1000));
        assert_eq!(evaluate(&sum, &env), Val::Num(1001.0));

        let mixed = format!("10{}", " - 1 * 2".repeat(500));
        assert_eq!(evaluate(&mixed, &env), Val::Num(-990.0));

        let ands = format!("x{} && 'last'", " && x".repeat(800));
        assert_eq!(evaluate(&ands, &env), Val::Str("last".into()));
    }

    #[test]
    fn test_chain_short_circuits_inside_spine() {
        let env = env_from(json!({"a": 0}));
        // `ghost` would fail if evaluated
        assert_eq!(evaluate("a && ghost && ghost", &env), Val::Num(0.0));
        assert_eq!(evaluate("1 || ghost || ghost", &env), Val::Num(1.0));
    }

    #[test]
    fn test_oversized_expression_is_undefined() {
        let env = Environment::new();
        let source = format!("1{}", " + 1".repeat(10_000));
        assert_eq!(evaluate(&source, &env), Val::Undefined);
        assert!(matches!(
            evaluate_fallback(&source, &env),
            Err(EvalError::Parse(_))
        ));
    }

    #[test]
    fn test_deep_tree_fails_instead_of_recursing() {
        let mut expr = Expr::LitNum { v: 1.0 };
        for _ in 0..=MAX_EVAL_DEPTH {
            expr = Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(expr),
            };
        }
        assert_eq!(
            eval_expr(&expr, &Environment::new()),
            Err(EvalError::TooDeep {
                limit: MAX_EVAL_DEPTH
            })
        );
    }

    #[test]
    fn test_long_member_chain_is_undefined() {
        let env = env_from(json!({"o": {}}));
        let source = format!("o{}", ".next".repeat(MAX_EVAL_DEPTH + 10));
        assert_eq!(evaluate(&source, &env), Val::Undefined);
    }
}
