//! Test helpers for interpreter tests
//!
//! Common utilities for running programs and pulling facts out of traces

use std::collections::HashMap;

use crate::interpreter::{execute_code, execute_code_with, ExecutionResult, Limits, StepType, TraceStep};

/// Run a program that is expected to finish without an error
pub fn run_ok(source: &str) -> ExecutionResult {
    let result = execute_code(source);
    assert!(
        result.error.is_none(),
        "Program failed: {:?}\nsource:\n{}",
        result.error,
        source
    );
    result
}

/// Run a program that is expected to fail, returning the error text
pub fn run_err(source: &str) -> (ExecutionResult, String) {
    let result = execute_code(source);
    let error = result
        .error
        .clone()
        .unwrap_or_else(|| panic!("Program unexpectedly succeeded:\n{}", source));
    (result, error)
}

/// Console lines printed by a program that must succeed
pub fn console(source: &str) -> Vec<String> {
    run_ok(source).console_lines()
}

/// Run with a custom step ceiling
pub fn run_limited(source: &str, max_steps: usize) -> ExecutionResult {
    execute_code_with(
        source,
        Limits {
            max_steps,
            ..Limits::default()
        },
    )
}

pub fn steps_of(result: &ExecutionResult, step_type: StepType) -> Vec<&TraceStep> {
    result
        .steps
        .iter()
        .filter(|s| s.step_type == step_type)
        .collect()
}

/// Global variables (name -> rendered value) as seen by a step
pub fn globals(step: &TraceStep) -> HashMap<String, String> {
    step.scopes
        .iter()
        .find(|scope| scope.kind == "global")
        .map(|scope| {
            scope
                .variables
                .iter()
                .map(|v| (v.name.clone(), v.value.clone()))
                .collect()
        })
        .unwrap_or_default()
}
