pub mod cli;
pub mod config;
pub mod interpreter;

pub use config::Config;
pub use interpreter::{execute_code, execute_code_with, truncate_trace, ExecutionResult, Limits};
