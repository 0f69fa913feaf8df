//! Tracing JavaScript interpreter
//!
//! [`execute_code`] parses a program, runs it to completion, drains the
//! simulated event loop and returns every recorded [`TraceStep`]. Failures
//! never escape as panics or `Err`: they end the trace with an `error` step
//! and populate [`ExecutionResult::error`].

pub mod calls;
pub mod describe;
pub mod env;
pub mod event_loop;
pub mod expressions;
pub mod heap;
pub mod parser;
pub mod promises;
pub mod statements;
pub mod stdlib;
pub mod tracer;
pub mod types;
pub mod vm;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use parser::{parse_program, ParseError};
pub use tracer::{StepType, TraceStep};
pub use types::RuntimeError;
pub use vm::{Limits, VM};

/// The complete outcome of one run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub steps: Vec<TraceStep>,
    pub error: Option<String>,
}

impl ExecutionResult {
    /// Console lines in the order they were printed, taken from the last step
    pub fn console_lines(&self) -> Vec<String> {
        self.steps
            .last()
            .map(|step| step.console_output.iter().map(|e| e.text.clone()).collect())
            .unwrap_or_default()
    }
}

/// Run `source` with the default limits (2000 steps, call depth 100)
pub fn execute_code(source: &str) -> ExecutionResult {
    execute_code_with(source, Limits::default())
}

pub fn execute_code_with(source: &str, limits: Limits) -> ExecutionResult {
    if source.trim().is_empty() {
        return ExecutionResult::default();
    }

    let program = match parse_program(source) {
        Ok(program) => program,
        Err(e) => {
            debug!(error = %e, "parse failed");
            return ExecutionResult {
                steps: Vec::new(),
                error: Some(e.to_string()),
            };
        }
    };

    let mut vm = VM::new(limits);
    if let Err(err) = run_program(&mut vm, &program) {
        if err.is_catchable() {
            debug!(error = %err, "uncaught exception");
        } else {
            warn!(error = %err, "run aborted");
        }
        let line = err.line().unwrap_or(0);
        tracer::record_here(&mut vm, line, StepType::Error, err.to_string());
    }

    let steps = vm.steps;
    let error = steps
        .last()
        .filter(|step| step.step_type == StepType::Error)
        .map(|step| step.description.clone());
    info!(steps = steps.len(), failed = error.is_some(), "execution finished");
    ExecutionResult { steps, error }
}

fn run_program(vm: &mut VM, program: &types::Program) -> types::ExecResult<()> {
    let global = vm.global_env;
    vm.current_env = global;
    statements::hoist_function_scope(vm, global, &program.body);
    event_loop::start(vm);
    statements::exec_statements(vm, global, &program.body)?;
    event_loop::run(vm)
}

/// Keep the first `max` steps and append a warning naming how many were dropped
pub fn truncate_trace(mut result: ExecutionResult, max: usize) -> ExecutionResult {
    if result.steps.len() <= max {
        return result;
    }
    let dropped = result.steps.len() - max;
    result.steps.truncate(max);

    let mut warning = match result.steps.last() {
        Some(last) => last.clone(),
        None => return result,
    };
    warning.step_type = StepType::Warning;
    warning.description = format!(
        "Trace truncated: {} further step{} not shown",
        dropped,
        if dropped == 1 { "" } else { "s" }
    );
    result.steps.push(warning);
    result
}
