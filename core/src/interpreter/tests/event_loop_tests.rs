//! Tests for the simulated event loop and promises

use super::helpers::{console, run_ok, steps_of};
use crate::interpreter::tracer::EventLoopPhase;
use crate::interpreter::StepType;

#[test]
fn test_sync_before_micro_before_macro() {
    let source = r#"
        console.log(1);
        setTimeout(() => console.log(2), 0);
        Promise.resolve().then(() => console.log(3));
        console.log(4);
    "#;
    assert_eq!(console(source), vec!["1", "4", "3", "2"]);
}

#[test]
fn test_chained_then_runs_inside_microtask_drain() {
    let source = r#"
        Promise.resolve().then(() => console.log("a")).then(() => console.log("b"));
        console.log("c");
    "#;
    assert_eq!(console(source), vec!["c", "a", "b"]);
}

#[test]
fn test_timers_fire_in_registration_order() {
    // Declared delays are not used for ordering.
    let source = r#"
        setTimeout(() => console.log("slow"), 100)
        setTimeout(() => console.log("fast"), 0)
    "#;
    assert_eq!(console(source), vec!["slow", "fast"]);
}

#[test]
fn test_microtasks_drain_between_macrotasks() {
    let source = r#"
        setTimeout(() => {
            console.log("t1")
            Promise.resolve().then(() => console.log("m-from-t1"))
        }, 0)
        setTimeout(() => console.log("t2"), 0)
    "#;
    assert_eq!(console(source), vec!["t1", "m-from-t1", "t2"]);
}

#[test]
fn test_timer_registered_by_macrotask_still_fires() {
    let source = r#"
        setTimeout(() => {
            console.log("outer")
            setTimeout(() => console.log("inner"), 0)
        }, 0)
    "#;
    assert_eq!(console(source), vec!["outer", "inner"]);
}

#[test]
fn test_executor_runs_synchronously_and_timer_resolves() {
    let source = r#"
        const p = new Promise((resolve) => {
            console.log("executor")
            setTimeout(() => resolve("done"), 0)
        })
        p.then(v => console.log(v))
        console.log("sync")
    "#;
    assert_eq!(console(source), vec!["executor", "sync", "done"]);
}

#[test]
fn test_handler_returning_promise_is_adopted() {
    let source = r#"
        Promise.resolve(1)
            .then(v => Promise.resolve(v + 1))
            .then(v => console.log(v))
    "#;
    assert_eq!(console(source), vec!["2"]);
}

#[test]
fn test_catch_and_finally() {
    let source = r#"
        Promise.reject(new Error("bad"))
            .catch(e => console.log(e.message))
            .finally(() => console.log("cleanup"))
    "#;
    assert_eq!(console(source), vec!["bad", "cleanup"]);
}

#[test]
fn test_throw_in_then_rejects_derived_promise() {
    let source = r#"
        Promise.resolve()
            .then(() => { throw new Error("x") })
            .then(() => console.log("skipped"))
            .catch(e => console.log("caught " + e.message))
    "#;
    assert_eq!(console(source), vec!["caught x"]);
}

#[test]
fn test_executor_throw_rejects() {
    let source = r#"
        new Promise(() => { throw "nope" }).catch(r => console.log("rejected: " + r))
    "#;
    assert_eq!(console(source), vec!["rejected: nope"]);
}

#[test]
fn test_queue_microtask() {
    let source = r#"
        setTimeout(() => console.log("timeout"))
        queueMicrotask(() => console.log("micro"))
        console.log("sync")
    "#;
    assert_eq!(console(source), vec!["sync", "micro", "timeout"]);
}

#[test]
fn test_clear_timeout_is_not_simulated() {
    let source = r#"
        const id = setTimeout(() => console.log("still runs"), 0)
        clearTimeout(id)
    "#;
    assert_eq!(console(source), vec!["still runs"]);
}

#[test]
fn test_set_interval_fires_once() {
    assert_eq!(console("setInterval(() => console.log('tick'), 10)"), vec!["tick"]);
}

#[test]
fn test_phases_are_recorded_and_end_idle() {
    let result = run_ok(
        r#"
        setTimeout(() => console.log("t"), 0)
        Promise.resolve().then(() => console.log("m"))
        "#,
    );
    let phases: Vec<EventLoopPhase> = steps_of(&result, StepType::EventLoop)
        .iter()
        .map(|s| s.event_loop_phase)
        .collect();
    assert!(phases.contains(&EventLoopPhase::Microtasks));
    assert!(phases.contains(&EventLoopPhase::Macrotasks));

    let last = result.steps.last().unwrap();
    assert_eq!(last.step_type, StepType::EventLoop);
    assert_eq!(last.event_loop_phase, EventLoopPhase::Idle);
    assert!(last.web_apis.is_empty());
    assert!(last.callback_queue.is_empty());
    assert!(last.microtask_queue.is_empty());
}

#[test]
fn test_timer_waits_in_web_apis() {
    let result = run_ok("setTimeout(function later() {}, 100)");
    let registered = steps_of(&result, StepType::Timer)[0];
    assert_eq!(registered.web_apis.len(), 1);
    assert_eq!(registered.web_apis[0].kind, "timer");
    assert_eq!(registered.web_apis[0].delay_ms, 100.0);
    assert!(registered.web_apis[0].label.contains("later"));
    assert!(registered.callback_queue.is_empty());

    // Once elapsed, the callback sits in the callback queue until picked.
    let moved = steps_of(&result, StepType::Timer)[1];
    assert!(moved.web_apis.is_empty());
    assert_eq!(moved.callback_queue.len(), 1);
}

#[test]
fn test_synchronous_steps_are_in_executing_phase() {
    let result = run_ok("let a = 1\nconsole.log(a)");
    assert!(result.steps[..2]
        .iter()
        .all(|s| s.event_loop_phase == EventLoopPhase::Executing));
}

#[test]
fn test_trace_opens_with_executing_transition() {
    let result = run_ok("function f() {}\nlet a = 1");
    let first = &result.steps[0];
    assert_eq!(first.step_type, StepType::EventLoop);
    assert_eq!(first.event_loop_phase, EventLoopPhase::Executing);
    assert_eq!(first.line, 0);
    // Hoisted declarations are already visible when the script starts.
    assert_eq!(first.scopes[0].variables[0].name, "f");

    let transitions: Vec<EventLoopPhase> = steps_of(&result, StepType::EventLoop)
        .iter()
        .map(|s| s.event_loop_phase)
        .collect();
    assert_eq!(transitions, vec![EventLoopPhase::Executing, EventLoopPhase::Idle]);
}
