//! Test helpers for executor tests
//!
//! Common utilities for running scripts and unpacking outcomes

use crate::executor::{FetchRequest, Outcome, Val, VM};
use serde_json::Value as JsonValue;

/// Run `source` on a fresh VM and return the VM with its outcome
///
/// Panics on a script error; use `VM::run` directly when testing failures.
pub fn run_script(source: &str) -> (VM, Outcome) {
    let mut vm = VM::new();
    let outcome = vm.run(source).expect("Script failed");
    (vm, outcome)
}

/// Unwrap a `Completed` outcome into its value
pub fn expect_completed(outcome: Outcome) -> Val {
    match outcome {
        Outcome::Completed { value } => value,
        other => panic!("Expected Completed, got {:?}", other),
    }
}

/// Unwrap a `Suspended` outcome into its continuation id and request
pub fn expect_suspended(outcome: Outcome) -> (u64, FetchRequest) {
    match outcome {
        Outcome::Suspended {
            continuation_id,
            fetch_request,
        } => (continuation_id, fetch_request),
        other => panic!("Expected Suspended, got {:?}", other),
    }
}

/// Run a script that must complete and return its value
pub fn completed_value(source: &str) -> Val {
    let (_, outcome) = run_script(source);
    expect_completed(outcome)
}

/// Build a resume value from JSON
pub fn val(json: JsonValue) -> Val {
    Val::from(json)
}
