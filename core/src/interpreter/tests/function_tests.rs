//! Tests for function definition, invocation and `this`

use super::helpers::{console, run_ok, steps_of};
use crate::interpreter::StepType;

#[test]
fn test_default_and_rest_parameters() {
    let source = r#"
        function greet(name = "stranger", ...titles) {
            return titles.length ? `${titles.join(" ")} ${name}` : `hi ${name}`
        }
        console.log(greet())
        console.log(greet("Ada", "Dr.", "Prof."))
        console.log(greet(undefined))
    "#;
    assert_eq!(console(source), vec!["hi stranger", "Dr. Prof. Ada", "hi stranger"]);
}

#[test]
fn test_default_can_refer_to_earlier_parameter() {
    let source = r#"
        const area = (w, h = w) => w * h
        console.log(area(3), area(3, 4))
    "#;
    assert_eq!(console(source), vec!["9 12"]);
}

#[test]
fn test_destructured_parameters() {
    let source = r#"
        function show({ name, age = 0 }, [first]) {
            return name + ":" + age + ":" + first
        }
        console.log(show({ name: "x" }, [9]))
    "#;
    assert_eq!(console(source), vec!["x:0:9"]);
}

#[test]
fn test_recursion() {
    let source = r#"
        function fib(n) {
            if (n < 2) return n
            return fib(n - 1) + fib(n - 2)
        }
        console.log(fib(10))
    "#;
    assert_eq!(console(source), vec!["55"]);
}

#[test]
fn test_named_function_expression_refers_to_itself() {
    let source = r#"
        const fact = function inner(n) { return n <= 1 ? 1 : n * inner(n - 1) }
        console.log(fact(5), fact.name)
    "#;
    assert_eq!(console(source), vec!["120 inner"]);
}

#[test]
fn test_function_name_is_inferred_from_binding() {
    let source = r#"
        const arrow = () => {}
        const anon = function () {}
        console.log(arrow.name, anon.name, arrow)
    "#;
    assert_eq!(console(source), vec!["arrow anon [Function: arrow]"]);
}

#[test]
fn test_call_apply_bind() {
    let source = r#"
        function describe(greeting, punct) {
            return greeting + ", " + this.name + punct
        }
        const ada = { name: "Ada" }
        console.log(describe.call(ada, "Hi", "!"))
        console.log(describe.apply(ada, ["Hello", "?"]))
        const bound = describe.bind(ada, "Hey")
        console.log(bound("."), bound)
    "#;
    assert_eq!(
        console(source),
        vec!["Hi, Ada!", "Hello, Ada?", "Hey, Ada. [Function: bound describe]"]
    );
}

#[test]
fn test_arrow_functions_capture_this_lexically() {
    let source = r#"
        const timer = {
            label: "T",
            start() {
                const report = () => this.label
                return report()
            },
        }
        console.log(timer.start())
    "#;
    assert_eq!(console(source), vec!["T"]);
}

#[test]
fn test_new_with_user_constructor() {
    let source = r#"
        function Point(x, y) {
            this.x = x
            this.y = y
        }
        const p = new Point(1, 2)
        console.log(p, p instanceof Point, p.x + p.y)
    "#;
    assert_eq!(console(source), vec!["Point { x: 1, y: 2 } true 3"]);
}

#[test]
fn test_constructor_returning_object_wins() {
    let source = r#"
        function Factory() {
            this.ignored = true
            return { made: "here" }
        }
        console.log(new Factory())
    "#;
    assert_eq!(console(source), vec![r#"{ made: "here" }"#]);
}

#[test]
fn test_higher_order_functions() {
    let source = r#"
        const compose = (f, g) => x => f(g(x))
        const inc = n => n + 1
        const double = n => n * 2
        console.log(compose(inc, double)(5), compose(double, inc)(5))
    "#;
    assert_eq!(console(source), vec!["11 12"]);
}

#[test]
fn test_host_method_read_as_value() {
    let source = r#"
        const xs = [3, 1, 2]
        const push = xs.push
        const upper = "abc".toUpperCase
        console.log(upper(), xs.map(String))
    "#;
    assert_eq!(console(source), vec![r#"ABC [ "3", "1", "2" ]"#]);
}

#[test]
fn test_call_and_return_steps() {
    let result = run_ok("function add(a, b) { return a + b }\nconst sum = add(2, 3)");
    let calls = steps_of(&result, StepType::FunctionCall);
    let returns = steps_of(&result, StepType::FunctionReturn);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].description, "Call add(2, 3)");
    assert_eq!(calls[0].call_stack.len(), 1);
    assert_eq!(calls[0].call_stack[0].function_name, "add");
    assert_eq!(calls[0].call_stack[0].line, 2);
    assert_eq!(returns[0].description, "add returned 5");
    assert!(returns[0].call_stack.is_empty());
}

#[test]
fn test_callbacks_from_natives_are_traced() {
    let result = run_ok("[1, 2].forEach(function visit(n) {})");
    let calls = steps_of(&result, StepType::FunctionCall);
    assert_eq!(calls.len(), 2);
    assert!(calls[0].description.starts_with("Call visit(1, 0, "));
}

#[test]
fn test_anonymous_function_frame_name() {
    let result = run_ok("(function () { return 1 })()");
    let call = steps_of(&result, StepType::FunctionCall)[0];
    assert_eq!(call.call_stack[0].function_name, "(anonymous)");
}
