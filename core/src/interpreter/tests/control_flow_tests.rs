//! Tests for statements and control-flow signals

use super::helpers::{console, run_ok, steps_of};
use crate::interpreter::StepType;

#[test]
fn test_if_else_chain() {
    let source = r#"
        function grade(n) {
            if (n >= 90) return "A"
            else if (n >= 80) return "B"
            else return "C"
        }
        console.log(grade(95), grade(85), grade(10))
    "#;
    assert_eq!(console(source), vec!["A B C"]);
}

#[test]
fn test_while_with_break_and_continue() {
    let source = r#"
        let i = 0
        let sum = 0
        while (true) {
            i++
            if (i > 5) break
            if (i % 2 === 0) continue
            sum += i
        }
        console.log(sum)
    "#;
    assert_eq!(console(source), vec!["9"]);
}

#[test]
fn test_do_while_runs_at_least_once() {
    let source = r#"
        let n = 10
        do {
            console.log(n)
            n++
        } while (n < 5)
    "#;
    assert_eq!(console(source), vec!["10"]);
}

#[test]
fn test_for_in_and_for_of() {
    let source = r#"
        const obj = { a: 1, b: 2 }
        for (const key in obj) console.log(key)
        for (const ch of "xy") console.log(ch)
        for (const [k, v] of Object.entries(obj)) console.log(k + "=" + v)
    "#;
    assert_eq!(console(source), vec!["a", "b", "x", "y", "a=1", "b=2"]);
}

#[test]
fn test_labeled_break_and_continue() {
    let source = r#"
        outer: for (let i = 0; i < 3; i++) {
            for (let j = 0; j < 3; j++) {
                if (j === 1) continue outer
                if (i === 2) break outer
                console.log(i + "," + j)
            }
        }
    "#;
    assert_eq!(console(source), vec!["0,0", "1,0"]);
}

#[test]
fn test_switch_fallthrough_and_default() {
    let source = r#"
        function kind(x) {
            let out = ""
            switch (x) {
                case 1:
                    out += "one "
                case 2:
                    out += "two"
                    break
                default:
                    out = "other"
            }
            return out
        }
        console.log(kind(1))
        console.log(kind(2))
        console.log(kind(7))
    "#;
    assert_eq!(console(source), vec!["one two", "two", "other"]);
}

#[test]
fn test_switch_records_condition_step() {
    let result = run_ok("switch (3) { case 1: break; case 3: break }");
    let conditions = steps_of(&result, StepType::Condition);
    assert_eq!(conditions.len(), 1);
    assert!(conditions[0].description.contains("matched case 3"));
}

#[test]
fn test_try_catch_finally_order() {
    let source = r#"
        try {
            console.log("try")
            throw new Error("boom")
            console.log("unreachable")
        } catch (e) {
            console.log("catch " + e.message)
        } finally {
            console.log("finally")
        }
        console.log("after")
    "#;
    assert_eq!(console(source), vec!["try", "catch boom", "finally", "after"]);
}

#[test]
fn test_finally_runs_on_return() {
    let source = r#"
        function f() {
            try {
                return "from try"
            } finally {
                console.log("cleanup")
            }
        }
        console.log(f())
    "#;
    assert_eq!(console(source), vec!["cleanup", "from try"]);
}

#[test]
fn test_finally_return_overrides() {
    let source = r#"
        function f() {
            try { throw "x" } finally { return "finally wins" }
        }
        console.log(f())
    "#;
    assert_eq!(console(source), vec!["finally wins"]);
}

#[test]
fn test_rethrow_propagates_after_finally() {
    let source = r#"
        try {
            try {
                throw new TypeError("inner")
            } finally {
                console.log("inner finally")
            }
        } catch (e) {
            console.log(e.name + ": " + e.message)
        }
    "#;
    assert_eq!(console(source), vec!["inner finally", "TypeError: inner"]);
}

#[test]
fn test_catch_without_binding_and_thrown_primitives() {
    let source = r#"
        try { throw 42 } catch { console.log("caught") }
        try { throw { code: 7 } } catch ({ code }) { console.log(code) }
    "#;
    assert_eq!(console(source), vec!["caught", "7"]);
}

#[test]
fn test_catch_scope_holds_parameter() {
    let result = run_ok("try { throw 'bad' } catch (err) { console.log(err) }");
    let console_step = steps_of(&result, StepType::Console)[0];
    let catch_scope = console_step
        .scopes
        .iter()
        .find(|s| s.kind == "catch")
        .expect("catch scope");
    assert_eq!(catch_scope.variables[0].name, "err");
    assert_eq!(catch_scope.variables[0].value, "\"bad\"");
}

#[test]
fn test_trycatch_steps_recorded() {
    let result = run_ok("try { throw 1 } catch (e) {} finally {}");
    let descriptions: Vec<&str> = steps_of(&result, StepType::TryCatch)
        .iter()
        .map(|s| s.description.as_str())
        .collect();
    assert_eq!(descriptions.len(), 3);
    assert_eq!(descriptions[0], "Enter try block");
    assert!(descriptions[1].starts_with("Caught"));
    assert_eq!(descriptions[2], "Run finally block");
}

#[test]
fn test_loop_steps_record_each_test() {
    let result = run_ok("for (let i = 0; i < 2; i++) {}");
    let loops = steps_of(&result, StepType::Loop);
    assert_eq!(loops.len(), 3);
    assert!(loops[0].description.ends_with("is true"));
    assert!(loops[2].description.ends_with("is false"));
}

#[test]
fn test_ternary_and_logical_short_circuit() {
    let source = r#"
        let calls = 0
        function touch() { calls++; return true }
        false && touch()
        true || touch()
        null ?? touch()
        console.log(calls, calls > 0 ? "yes" : "no")
    "#;
    assert_eq!(console(source), vec!["1 yes"]);
}
