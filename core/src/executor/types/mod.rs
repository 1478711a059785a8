//! Type definitions for the executor
//!
//! - Fallback expression AST (Expr)
//! - Runtime values (Val)
//! - Statements and continuations (Statement, Continuation, ContinuationSlot)
//! - Outcomes handed back to callers (Outcome, FetchRequest)

pub mod ast;
pub mod continuation;
pub mod outcome;
pub mod values;

pub use ast::{BinaryOp, Expr, UnaryOp};
pub use continuation::{Continuation, ContinuationSlot, Statement};
pub use outcome::{FetchRequest, Outcome};
pub use values::Val;
