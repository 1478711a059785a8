pub mod cli;
pub mod config;
pub mod executor;
pub mod parser;

// Re-export main types
pub use executor::{execute_code, Outcome, Val, VmError, VmStatus, VM};

// Re-export config API for convenience
pub use config::{Config, EngineConfig};
