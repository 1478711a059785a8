//! Statement classification and execution
//!
//! Statements are matched against a handful of textual shapes. The exec loop
//! checks for a suspend point (`fetch(` anywhere in the text) before anything
//! else; `classify` then tries, in order:
//!
//! 1. `const|let|var name = expr`         declaration
//! 2. `name = expr`                       assignment
//! 3. `name.field = expr`                 field assignment
//! 4. `throw ...`                         script error
//! 5. anything else                       expression statement

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

use super::env::Environment;
use super::errors::{EvalError, VmError, DEFAULT_THROW_MESSAGE};
use super::expressions::evaluate;
use super::splitter::split_top_level;
use super::types::Val;
use crate::config::EngineConfig;

// `=` must not be followed by another `=` so `x == 1` stays an expression
static DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^(?:const|let|var)\s+(\w+)\s*=([^=].*)$").expect("valid declaration pattern")
});

static ASSIGNMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^(\w+)\s*=([^=].*)$").expect("valid assignment pattern"));

static FIELD_ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^(\w+)\.(\w+)\s*=([^=].*)$").expect("valid field assignment pattern")
});

static THROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^throw\b").expect("valid throw pattern"));

static ERROR_MESSAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"Error\s*\(\s*['"`]([^'"`]+)"#).expect("valid error message pattern")
});

static BINDING_TARGET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:const|let|var)\s+(\w+)\s*=").expect("valid binding pattern")
});

/* ===================== Suspend Points ===================== */

/// Recognises calls to the configured suspend function
#[derive(Debug, Clone)]
pub struct SuspendMatcher {
    /// `fetch(`, for the containment check
    call_marker: String,
    /// Greedy capture of the call's argument text
    argument: Regex,
}

impl SuspendMatcher {
    pub fn new(config: &EngineConfig) -> Self {
        let name = regex::escape(&config.suspend_function);
        let argument = Regex::new(&format!(r"(?s){}\s*\(\s*(.+)\s*\)\s*;?$", name))
            .expect("escaped identifier forms a valid pattern");

        Self {
            call_marker: format!("{}(", config.suspend_function),
            argument,
        }
    }

    /// Textual containment check; `fetch (` with a space does not count
    pub fn is_suspend_point(&self, stmt: &str) -> bool {
        stmt.contains(&self.call_marker)
    }

    /// Resolve the requested URL
    ///
    /// Only the first top-level argument is evaluated; request options after it
    /// are ignored. A quoted argument keeps its value even when empty. Otherwise
    /// a missing argument or a falsy result becomes `"unknown"`.
    pub fn extract_url(&self, stmt: &str, env: &Environment) -> String {
        let Some(caps) = self.argument.captures(stmt) else {
            return UNKNOWN_URL.to_string();
        };
        let args = caps.get(1).map_or("", |m| m.as_str());
        let first = split_top_level(args, ',')
            .into_iter()
            .next()
            .map_or("", str::trim);
        let quoted = first.starts_with(['"', '\'', '`']);

        match evaluate(first, env) {
            Val::Undefined => UNKNOWN_URL.to_string(),
            Val::Str(s) if quoted || !s.is_empty() => s,
            value if quoted || value.is_truthy() => value.to_display_string(),
            _ => UNKNOWN_URL.to_string(),
        }
    }
}

pub const UNKNOWN_URL: &str = "unknown";

/// Variable that receives the resume value, for `const x = fetch(...)` forms
pub fn extract_binding_target(stmt: &str) -> Option<String> {
    BINDING_TARGET.captures(stmt).map(|caps| caps[1].to_string())
}

/* ===================== Classification ===================== */

/// Shape of a statement, borrowed from its text
#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind<'a> {
    Declare { name: &'a str, expr: &'a str },
    Assign { name: &'a str, expr: &'a str },
    AssignField { object: &'a str, field: &'a str, expr: &'a str },
    Throw { message: String },
    Expression { expr: &'a str },
}

/// Classify a statement that is not a suspend point
pub fn classify(stmt: &str) -> StatementKind<'_> {
    if let Some(caps) = DECLARATION.captures(stmt) {
        return StatementKind::Declare {
            name: group(&caps, 1),
            expr: group(&caps, 2),
        };
    }

    if let Some(caps) = ASSIGNMENT.captures(stmt) {
        return StatementKind::Assign {
            name: group(&caps, 1),
            expr: group(&caps, 2),
        };
    }

    if let Some(caps) = FIELD_ASSIGNMENT.captures(stmt) {
        return StatementKind::AssignField {
            object: group(&caps, 1),
            field: group(&caps, 2),
            expr: group(&caps, 3),
        };
    }

    if THROW.is_match(stmt) {
        let message = ERROR_MESSAGE
            .captures(stmt)
            .map(|caps| caps[1].to_string())
            .unwrap_or_else(|| DEFAULT_THROW_MESSAGE.to_string());
        return StatementKind::Throw { message };
    }

    StatementKind::Expression { expr: stmt }
}

fn group<'a>(caps: &regex::Captures<'a>, i: usize) -> &'a str {
    caps.get(i).map_or("", |m| m.as_str())
}

/* ===================== Statement Handlers ===================== */

/// Result of executing one non-suspending statement
#[derive(Debug, Clone, PartialEq)]
pub enum StatementResult {
    /// Binding statement ran; nothing to record
    Continue,
    /// Expression statement produced a value
    Value(Val),
}

/// Execute a classified statement
///
/// Only an explicit `throw` fails. Evaluation problems inside other statements
/// are absorbed and execution moves on.
pub fn execute_statement(
    kind: StatementKind<'_>,
    env: &mut Environment,
) -> Result<StatementResult, VmError> {
    match kind {
        StatementKind::Declare { name, expr } | StatementKind::Assign { name, expr } => {
            let value = evaluate(expr, env);
            trace!(variable = name, value = ?value, "Binding variable");
            env.set(name, value);
            Ok(StatementResult::Continue)
        }

        StatementKind::AssignField {
            object,
            field,
            expr,
        } => {
            let value = evaluate(expr, env);
            if let Err(e) = assign_field(env, object, field, value) {
                debug!(error = %e, "Field assignment skipped");
            }
            Ok(StatementResult::Continue)
        }

        StatementKind::Throw { message } => Err(VmError::Script { message }),

        StatementKind::Expression { expr } => Ok(StatementResult::Value(evaluate(expr, env))),
    }
}

/// Write `value` into `object.field`
///
/// Writing onto a primitive is silently ignored (as in JavaScript); a missing or
/// nullish target is an error.
fn assign_field(
    env: &mut Environment,
    object: &str,
    field: &str,
    value: Val,
) -> Result<(), EvalError> {
    match env.get_mut(object) {
        None => Err(EvalError::UndefinedVariable {
            name: object.to_string(),
        }),
        Some(Val::Obj(map)) => {
            map.insert(field.to_string(), value);
            Ok(())
        }
        Some(target) if target.is_nullish() => Err(EvalError::InvalidAssignmentTarget {
            property: field.to_string(),
            base: target.type_name().to_string(),
        }),
        Some(_) => Ok(()),
    }
}
