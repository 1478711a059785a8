//! Statement, continuation and slot types

use super::super::env::Environment;
use super::values::Val;
use serde::{Deserialize, Serialize};
use std::fmt;

/* ===================== Statement ===================== */

/// One statement of source text
///
/// Statements are never compiled; they are re-parsed every time they execute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Statement(String);

impl Statement {
    pub fn new(text: impl Into<String>) -> Self {
        Statement(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/* ===================== Continuation ===================== */

/// Everything needed to resume a suspended run
///
/// Plain data so a host can persist it between `run` and `resume`
/// (see `VM::from_continuation`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Continuation {
    /// Also the id of the fetch request handed to the caller
    pub id: u64,

    /// Variable that receives the resume value (`const x = fetch(...)`)
    pub pending_binding: Option<String>,

    /// Environment as it was when execution suspended
    pub env_snapshot: Environment,

    /// Unexecuted statements, in source order
    pub remaining: Vec<Statement>,

    /// Value of the latest expression statement before the suspend
    pub last_value: Val,
}

/// The at-most-one live continuation of a VM
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum ContinuationSlot {
    #[default]
    Empty,
    Live(Continuation),
}

impl ContinuationSlot {
    pub fn live_id(&self) -> Option<u64> {
        match self {
            ContinuationSlot::Empty => None,
            ContinuationSlot::Live(c) => Some(c.id),
        }
    }
}
