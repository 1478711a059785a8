//! # Executor - Suspendable Statement Interpreter
//!
//! Runs a script statement by statement. Reaching a call to the suspend
//! function (`fetch` by default) stops execution and hands the caller a
//! `FetchRequest`; the caller performs the I/O and calls `resume` with the
//! result.
//!
//! ## Core Principles
//!
//! 1. **Caller owns I/O**: The executor never performs a request, it only describes one
//! 2. **Statement-level suspension**: A suspend point pauses between statements, never inside one
//! 3. **Explicit continuation**: All resume state lives in a plain, serializable `Continuation`
//! 4. **Re-parse, don't compile**: Statements stay text and are classified each time they run
//!
//! ```
//! use fetchflow_core::executor::{Outcome, Val, VM};
//!
//! let mut vm = VM::new();
//! let outcome = vm.run(r#"const user = fetch("/users/1"); user.name"#).unwrap();
//! let Outcome::Suspended { continuation_id, fetch_request } = outcome else {
//!     panic!("expected a suspend");
//! };
//! assert_eq!(fetch_request.url, "/users/1");
//!
//! let response = Val::from(serde_json::json!({"name": "Ada"}));
//! let outcome = vm.resume(continuation_id, response).unwrap();
//! assert_eq!(outcome, Outcome::Completed { value: Val::Str("Ada".into()) });
//! ```

pub mod env;
pub mod errors;
pub mod exec_loop;
pub mod expressions;
pub mod splitter;
pub mod statements;
pub mod types;
pub mod vm;

#[cfg(test)]
mod tests;

// Re-export commonly used items
pub use env::Environment;
pub use errors::{EvalError, VmError};
pub use expressions::evaluate;
pub use splitter::split_statements;
pub use types::{Continuation, FetchRequest, Outcome, Statement, Val};
pub use vm::{execute_code, VmStatus, VM};
