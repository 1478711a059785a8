//! Virtual Machine state
//!
//! The VM holds all execution state:
//! - env: Variables, shared by every run on this instance
//! - continuation: The live continuation while suspended
//! - last_value: Result of the latest expression statement
//!
//! A VM is not re-entrant: while a continuation is live, only `resume` and
//! `dispose` are accepted.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::env::Environment;
use super::errors::VmError;
use super::exec_loop::run_statements;
use super::splitter::split_statements;
use super::statements::SuspendMatcher;
use super::types::{Continuation, ContinuationSlot, Outcome, Val};
use crate::config::EngineConfig;

/* ===================== Status ===================== */

/// Lifecycle state of a VM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VmStatus {
    /// Fresh or disposed
    Idle,
    /// Inside `run` or `resume`
    Running,
    /// Waiting for `resume`
    Suspended,
    /// Last run finished without suspending
    Completed,
    /// Last run ended in a `throw`
    Failed,
}

/* ===================== VM ===================== */

#[derive(Debug, Clone)]
pub struct VM {
    pub(super) env: Environment,
    pub(super) continuation: ContinuationSlot,
    pub(super) last_value: Val,
    pub(super) status: VmStatus,
    pub(super) matcher: SuspendMatcher,
    next_continuation_id: u64,
}

impl VM {
    /// Create a VM with the default configuration (suspends on `fetch`)
    pub fn new() -> Self {
        Self::with_config(&EngineConfig::default())
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        VM {
            env: Environment::new(),
            continuation: ContinuationSlot::Empty,
            last_value: Val::Undefined,
            status: VmStatus::Idle,
            matcher: SuspendMatcher::new(config),
            next_continuation_id: config.first_continuation_id,
        }
    }

    /// Rebuild a suspended VM from a captured continuation
    ///
    /// The environment comes from the snapshot, and new continuation ids continue
    /// after the restored one.
    pub fn from_continuation(config: &EngineConfig, continuation: Continuation) -> Self {
        let mut vm = Self::with_config(config);
        vm.env = continuation.env_snapshot.clone();
        vm.last_value = continuation.last_value.clone();
        vm.next_continuation_id = vm
            .next_continuation_id
            .max(continuation.id.saturating_add(1));
        vm.continuation = ContinuationSlot::Live(continuation);
        vm.status = VmStatus::Suspended;
        vm
    }

    /// Start a fresh script
    ///
    /// The environment is kept from earlier runs; the last value is reset.
    pub fn run(&mut self, source: &str) -> Result<Outcome, VmError> {
        if let Some(id) = self.continuation.live_id() {
            return Err(VmError::AlreadySuspended { id });
        }

        let statements = split_statements(source);
        debug!(statements = statements.len(), "Running script");

        self.last_value = Val::Undefined;
        run_statements(self, statements)
    }

    /// Continue a suspended run with the result of its external call
    ///
    /// `value` is bound to the variable the suspending statement declared (if
    /// any), then the remaining statements run. A wrong id changes nothing.
    pub fn resume(&mut self, continuation_id: u64, value: Val) -> Result<Outcome, VmError> {
        let continuation = match std::mem::take(&mut self.continuation) {
            ContinuationSlot::Live(c) if c.id == continuation_id => c,
            other => {
                let err = match &other {
                    ContinuationSlot::Empty => VmError::NoLiveContinuation {
                        id: continuation_id,
                    },
                    ContinuationSlot::Live(c) => VmError::ContinuationMismatch {
                        expected: c.id,
                        got: continuation_id,
                    },
                };
                // Leave the live continuation in place
                self.continuation = other;
                return Err(err);
            }
        };

        debug!(
            continuation_id,
            remaining = continuation.remaining.len(),
            "Resuming"
        );

        self.last_value = continuation.last_value;
        if let Some(name) = continuation.pending_binding {
            self.env.set(name, value);
        }

        run_statements(self, continuation.remaining)
    }

    /// Drop all state; safe to call repeatedly
    ///
    /// Continuation ids are not reset, so an id is never handed out twice by
    /// the same instance.
    pub fn dispose(&mut self) {
        self.env.clear();
        self.continuation = ContinuationSlot::Empty;
        self.last_value = Val::Undefined;
        self.status = VmStatus::Idle;
    }

    pub fn status(&self) -> VmStatus {
        self.status
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// The live continuation, for hosts that persist suspended scripts
    pub fn continuation(&self) -> Option<&Continuation> {
        match &self.continuation {
            ContinuationSlot::Empty => None,
            ContinuationSlot::Live(c) => Some(c),
        }
    }

    pub(super) fn allocate_continuation_id(&mut self) -> u64 {
        let id = self.next_continuation_id;
        self.next_continuation_id += 1;
        id
    }
}

impl Default for VM {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `source` once on a throwaway VM
///
/// A `Suspended` outcome is informational only: the VM is disposed before
/// returning, so it cannot be resumed.
pub fn execute_code(source: &str) -> Result<Outcome, VmError> {
    let mut vm = VM::new();
    let result = vm.run(source);
    vm.dispose();
    result
}
