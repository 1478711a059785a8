//! Core execution loop
//!
//! Runs statements in order until one suspends, one throws, or none are left.
//! Both `VM::run` and `VM::resume` end up here; resume simply passes the
//! statements recorded in the consumed continuation.

use tracing::{debug, trace};

use super::errors::VmError;
use super::statements::{classify, execute_statement, extract_binding_target, StatementResult};
use super::types::{Continuation, ContinuationSlot, FetchRequest, Outcome, Statement};
use super::vm::{VmStatus, VM};

/// Execute `statements` against the VM's environment
///
/// On a suspend point the remaining statements (everything after the suspending
/// one) are captured in a new live continuation and `Outcome::Suspended` is
/// returned. An explicit `throw` aborts with `VmError::Script`.
pub fn run_statements(vm: &mut VM, statements: Vec<Statement>) -> Result<Outcome, VmError> {
    vm.status = VmStatus::Running;

    let mut pending = statements.into_iter();
    while let Some(stmt) = pending.next() {
        let text = stmt.as_str();

        if vm.matcher.is_suspend_point(text) {
            let outcome = suspend(vm, text, pending.collect());
            vm.status = VmStatus::Suspended;
            return Ok(outcome);
        }

        trace!(statement = text, "Executing statement");
        match execute_statement(classify(text), &mut vm.env) {
            Ok(StatementResult::Continue) => {}
            Ok(StatementResult::Value(v)) => vm.last_value = v,
            Err(e) => {
                debug!(error = %e, "Script threw");
                vm.status = VmStatus::Failed;
                return Err(e);
            }
        }
    }

    vm.status = VmStatus::Completed;
    Ok(Outcome::Completed {
        value: vm.last_value.clone(),
    })
}

/// Capture a continuation for the suspending statement `text`
fn suspend(vm: &mut VM, text: &str, remaining: Vec<Statement>) -> Outcome {
    let id = vm.allocate_continuation_id();
    let url = vm.matcher.extract_url(text, &vm.env);
    let pending_binding = extract_binding_target(text);

    debug!(
        continuation_id = id,
        url = %url,
        binding = ?pending_binding,
        remaining = remaining.len(),
        "Suspending at external call"
    );

    vm.continuation = ContinuationSlot::Live(Continuation {
        id,
        pending_binding,
        env_snapshot: vm.env.snapshot(),
        remaining,
        last_value: vm.last_value.clone(),
    });

    Outcome::Suspended {
        continuation_id: id,
        fetch_request: FetchRequest::new(id, url),
    }
}
