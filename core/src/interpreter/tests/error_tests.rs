//! Tests for failure modes: every failure ends the trace, none panic

use super::helpers::{console, run_err, run_limited};
use crate::interpreter::{execute_code, StepType};

#[test]
fn test_reference_error_ends_trace() {
    let (result, error) = run_err("let a = 1\nconsole.log(b)");
    assert_eq!(error, "ReferenceError: b is not defined");

    let last = result.steps.last().unwrap();
    assert_eq!(last.step_type, StepType::Error);
    assert_eq!(last.line, 2);
    // The declaration before the failure is still inspectable.
    assert_eq!(result.steps[1].step_type, StepType::Declaration);
}

#[test]
fn test_calling_non_function() {
    let (_, error) = run_err("const user = { name: 'x' }\nuser.name()");
    assert_eq!(error, "TypeError: user.name is not a function");

    let (_, error) = run_err("let n = 5\nn()");
    assert_eq!(error, "TypeError: n is not a function");
}

#[test]
fn test_reading_property_of_undefined() {
    let (_, error) = run_err("let cfg\nconsole.log(cfg.port)");
    assert_eq!(
        error,
        "TypeError: Cannot read properties of undefined (reading 'port')"
    );
}

#[test]
fn test_uncaught_throw() {
    let (result, error) = run_err("function fail() { throw new Error('boom') }\nfail()");
    assert_eq!(error, "Uncaught Error: boom");
    assert!(result
        .steps
        .iter()
        .any(|s| s.step_type == StepType::Throw && s.description == "throw Error: boom"));
}

#[test]
fn test_uncaught_primitive_throw() {
    let (_, error) = run_err("throw 'plain'");
    assert_eq!(error, "Uncaught plain");
}

#[test]
fn test_step_ceiling_stops_infinite_loop() {
    let (result, error) = run_err("while (true) {}");
    assert!(error.contains("2000"), "{}", error);
    assert_eq!(
        error,
        "Execution exceeded 2000 steps (possible infinite loop)"
    );
    assert_eq!(result.steps.last().unwrap().step_type, StepType::Error);
}

#[test]
fn test_step_ceiling_is_configurable() {
    let result = run_limited("for (;;) {}", 50);
    let error = result.error.expect("ceiling should trip");
    assert_eq!(error, "Execution exceeded 50 steps (possible infinite loop)");
}

#[test]
fn test_step_ceiling_inside_event_loop() {
    let source = r#"
        function again() { Promise.resolve().then(again) }
        again()
    "#;
    let (result, error) = run_err(source);
    assert!(error.starts_with("Execution exceeded"), "{}", error);
    assert_eq!(result.steps.last().unwrap().step_type, StepType::Error);
}

#[test]
fn test_step_ceiling_is_not_catchable() {
    let source = r#"
        try {
            while (true) {}
        } catch (e) {
            console.log("should not run")
        } finally {
            console.log("nor this")
        }
    "#;
    let (result, _) = run_err(source);
    assert!(result.console_lines().is_empty());
}

#[test]
fn test_runaway_recursion() {
    let (result, error) = run_err("function down(n) { return down(n + 1) }\ndown(0)");
    assert_eq!(error, "RangeError: Maximum call stack size exceeded");
    // The terminal snapshot shows the stack at the point of failure.
    let last = result.steps.last().unwrap();
    assert_eq!(last.call_stack.len(), 100);
}

#[test]
fn test_parse_error_produces_no_steps() {
    let result = execute_code("console.log('ok')\nlet = ;");
    assert!(result.steps.is_empty());
    let error = result.error.unwrap();
    assert!(error.starts_with("SyntaxError"), "{}", error);
    assert!(error.contains("line 2"), "{}", error);
}

#[test]
fn test_json_parse_error_is_catchable() {
    let source = r#"
        try {
            JSON.parse("{bad json")
        } catch (e) {
            console.log(e.name)
        }
    "#;
    assert_eq!(console(source), vec!["SyntaxError"]);
}

#[test]
fn test_const_destructuring_reassignment() {
    let (_, error) = run_err("const { a } = { a: 1 }\na++");
    assert_eq!(error, "TypeError: Assignment to constant variable.");
}

#[test]
fn test_error_in_timer_callback_keeps_earlier_output() {
    let source = r#"
        console.log("before")
        setTimeout(() => missing(), 0)
    "#;
    let (result, error) = run_err(source);
    assert_eq!(error, "ReferenceError: missing is not defined");
    assert_eq!(result.console_lines(), vec!["before"]);
}

#[test]
fn test_new_on_non_constructor() {
    let (_, error) = run_err("const f = () => 1\nnew f()");
    assert_eq!(error, "TypeError: f is not a constructor");
}
