//! Tests for native built-ins and expression forms

use super::helpers::{console, run_err};

#[test]
fn test_array_mutators() {
    let source = r#"
        const xs = [1, 2, 3]
        xs.push(4, 5)
        const last = xs.pop()
        const first = xs.shift()
        xs.unshift(0)
        const removed = xs.splice(1, 2, "a", "b", "c")
        console.log(xs, last, first, removed)
    "#;
    assert_eq!(
        console(source),
        vec![r#"[ 0, "a", "b", "c", 4 ] 5 1 [ 2, 3 ]"#]
    );
}

#[test]
fn test_array_higher_order_methods() {
    let source = r#"
        const nums = [1, 2, 3, 4, 5]
        console.log(nums.map(n => n * 2).join(","))
        console.log(nums.filter(n => n % 2 === 1).length)
        console.log(nums.reduce((acc, n) => acc + n, 0))
        console.log(nums.find(n => n > 3), nums.findIndex(n => n > 3))
        console.log(nums.some(n => n > 4), nums.every(n => n > 0))
    "#;
    assert_eq!(console(source), vec!["2,4,6,8,10", "3", "15", "4 3", "true true"]);
}

#[test]
fn test_array_sort_default_and_comparator() {
    let source = r#"
        console.log([10, 9, 1, 2].sort().join(" "))
        console.log([10, 9, 1, 2].sort((a, b) => a - b).join(" "))
    "#;
    assert_eq!(console(source), vec!["1 10 2 9", "1 2 9 10"]);
}

#[test]
fn test_array_lookup_and_copy_methods() {
    let source = r#"
        const xs = ["a", "b", "c", "b"]
        console.log(xs.indexOf("b"), xs.lastIndexOf("b"), xs.includes("z"))
        console.log(xs.slice(1, 3), xs.at(-1))
        console.log([1, [2, [3]]].flat(), new Array(3).fill(0))
        console.log([1].concat([2, 3], 4))
    "#;
    assert_eq!(
        console(source),
        vec![
            "1 3 false",
            r#"[ "b", "c" ] b"#,
            "[ 1, 2, [ 3 ] ] [ 0, 0, 0 ]",
            "[ 1, 2, 3, 4 ]",
        ]
    );
}

#[test]
fn test_array_statics() {
    let source = r#"
        console.log(Array.isArray([]), Array.isArray("no"))
        console.log(Array.from("abc"), Array.of(7, 8))
        console.log(Array.from({ length: 3 }, (_, i) => i * i))
    "#;
    assert_eq!(
        console(source),
        vec![
            "true false",
            r#"[ "a", "b", "c" ] [ 7, 8 ]"#,
            "[ 0, 1, 4 ]",
        ]
    );
}

#[test]
fn test_string_methods() {
    let source = r#"
        const s = "  Hello, World  "
        console.log(s.trim().toUpperCase())
        console.log("a-b-c".split("-"), "abc".split(""))
        console.log("banana".indexOf("an"), "banana".replace("an", "AN"), "banana".replaceAll("an", "_"))
        console.log("abc".startsWith("ab"), "abc".endsWith("bc"), "abc".includes("d"))
        console.log("5".padStart(3, "0"), "ab".repeat(3), "hello".slice(-3), "hello".charAt(1))
        console.log("hello".length, "hello"[0])
    "#;
    assert_eq!(
        console(source),
        vec![
            "HELLO, WORLD",
            r#"[ "a", "b", "c" ] [ "a", "b", "c" ]"#,
            "1 bANana b__a",
            "true true false",
            "005 ababab llo e",
            "5 h",
        ]
    );
}

#[test]
fn test_repeat_with_negative_count_is_catchable() {
    let source = r#"
        try {
            "x".repeat(-1)
        } catch (e) {
            console.log(e.name)
        }
    "#;
    assert_eq!(console(source), vec!["RangeError"]);
}

#[test]
fn test_math_and_numbers() {
    let source = r#"
        console.log(Math.max(1, 7, 3), Math.min(), Math.abs(-2), Math.floor(2.7), Math.round(2.5))
        console.log(Math.pow(2, 10), 2 ** 10, Math.sqrt(16))
        console.log((3.14159).toFixed(2), (255).toString(16))
        console.log(parseInt("42px"), parseFloat("3.5kg"), Number("  12 "), Number("x"))
        console.log(Number.isInteger(5), isNaN("abc"), 7 / 0, -7 % 3)
    "#;
    assert_eq!(
        console(source),
        vec![
            "7 Infinity 2 2 3",
            "1024 1024 4",
            "3.14 ff",
            "42 3.5 12 NaN",
            "true true Infinity -1",
        ]
    );
}

#[test]
fn test_math_random_is_seeded() {
    let source = "console.log(Math.random() === Math.random())";
    assert_eq!(console(source), vec!["false"]);
    let a = console("console.log(Math.random())");
    let b = console("console.log(Math.random())");
    assert_eq!(a, b);
}

#[test]
fn test_json_round_trip() {
    let source = r#"
        const text = JSON.stringify({ name: "Ada", tags: [1, 2], skip: undefined })
        console.log(text)
        const back = JSON.parse(text)
        console.log(back.tags[1], back.name)
        console.log(JSON.stringify([1, { a: null }], null, 2))
    "#;
    assert_eq!(
        console(source),
        vec![
            r#"{"name":"Ada","tags":[1,2]}"#,
            "2 Ada",
            "[\n  1,\n  {\n    \"a\": null\n  }\n]",
        ]
    );
}

#[test]
fn test_object_statics() {
    let source = r#"
        const obj = { b: 2, a: 1, 10: "ten", 2: "two" }
        console.log(Object.keys(obj))
        console.log(Object.values({ x: 1, y: [2] }))
        const merged = Object.assign({}, { a: 1 }, { b: 2 })
        console.log(merged, merged.hasOwnProperty("b"))
        const frozen = Object.freeze({ v: 1 })
        frozen.v = 2
        console.log(frozen.v)
    "#;
    assert_eq!(
        console(source),
        vec![
            r#"[ "2", "10", "b", "a" ]"#,
            "[ 1, [ 2 ] ]",
            "{ a: 1, b: 2 } true",
            "1",
        ]
    );
}

#[test]
fn test_destructuring_and_spread() {
    let source = r#"
        const [first, , third = "def", ...others] = [1, 2, undefined, 4, 5]
        console.log(first, third, others)
        const { name, info: { age }, missing = "none", ...rest } = { name: "Ada", info: { age: 36 }, x: 1, y: 2 }
        console.log(name, age, missing, rest)
        const merged = { ...rest, z: 3 }
        console.log([...others, ..."ab"], merged)
        let a = 1, b = 2;
        [a, b] = [b, a]
        console.log(a, b)
    "#;
    assert_eq!(
        console(source),
        vec![
            "1 def [ 4, 5 ]",
            "Ada 36 none { x: 1, y: 2 }",
            r#"[ 4, 5, "a", "b" ] { x: 1, y: 2, z: 3 }"#,
            "2 1",
        ]
    );
}

#[test]
fn test_template_literals() {
    let source = r#"
        const user = { name: "Ada", langs: ["js", "rs"] }
        console.log(`${user.name} knows ${user.langs.length} languages: ${user.langs}`)
    "#;
    assert_eq!(console(source), vec!["Ada knows 2 languages: js,rs"]);
}

#[test]
fn test_typeof_and_operators() {
    let source = r#"
        console.log(typeof 1, typeof "s", typeof undefined, typeof null, typeof {}, typeof (() => 1), typeof notDeclared)
        console.log(1 == "1", 1 === "1", null == undefined, NaN === NaN)
        console.log("b" in { b: 1 }, [] instanceof Array, new TypeError("x") instanceof Error)
        console.log("3" * "4", "3" + 4, [1, 2] + "", !!"", -"5")
    "#;
    assert_eq!(
        console(source),
        vec![
            "number string undefined object object function undefined",
            "true false true false",
            "true true true",
            "12 34 1,2 false -5",
        ]
    );
}

#[test]
fn test_optional_chaining_and_nullish() {
    let source = r#"
        const cfg = { db: { port: 0 } }
        console.log(cfg.db?.port ?? 5432, cfg.cache?.port ?? 6379)
        console.log(cfg.missing?.fn(), cfg.db.nope?.())
        let level = null
        level ??= "info"
        let count = 0
        count ||= 10
        console.log(level, count)
    "#;
    assert_eq!(console(source), vec!["0 6379", "undefined undefined", "info 10"]);
}

#[test]
fn test_update_and_compound_assignment_on_members() {
    let source = r#"
        const counter = { hits: 0 }
        counter.hits++
        counter["hits"] += 5
        const arr = [1]
        arr[0] *= 10
        arr[2] = 3
        console.log(counter.hits, arr, arr.length)
        arr.length = 1
        console.log(arr)
    "#;
    assert_eq!(console(source), vec!["6 [ 10, undefined, 3 ] 3", "[ 10 ]"]);
}

#[test]
fn test_error_objects_render() {
    let source = r#"
        const err = new RangeError("out of range")
        console.log(err.name, err.message)
        console.log(String(err))
        console.log(err)
    "#;
    assert_eq!(
        console(source),
        vec![
            "RangeError out of range",
            "RangeError: out of range",
            "RangeError: out of range",
        ]
    );
}

#[test]
fn test_console_methods_are_recorded() {
    let result = super::helpers::run_ok(
        r#"
        console.info("i")
        console.warn("w")
        console.error("e")
        "#,
    );
    let last = result.steps.last().unwrap();
    let methods: Vec<&str> = last.console_output.iter().map(|e| e.method.as_str()).collect();
    assert_eq!(methods, vec!["info", "warn", "error"]);
}

#[test]
fn test_frozen_array_mutation_fails() {
    let (_, error) = run_err("const xs = Object.freeze([1])\nxs.push(2)");
    assert_eq!(error, "TypeError: Cannot call push() on a frozen array");
}

#[test]
fn test_oversized_arrays_throw_range_error() {
    let source = r#"
        const attempts = [
            () => { const a = []; a[4000000000] = 1 },
            () => new Array(4000000000),
            () => new Array(-1),
            () => { const a = [1]; a.length = 4000000000 },
            () => Array.from({ length: 4000000000 }),
        ]
        for (const attempt of attempts) {
            try {
                attempt()
                console.log("allocated")
            } catch (e) {
                console.log(e.name + ": " + e.message)
            }
        }
    "#;
    assert_eq!(console(source), vec!["RangeError: Invalid array length"; 5]);
}

#[test]
fn test_oversized_strings_throw_range_error() {
    let source = r#"
        const attempts = [
            () => "x".repeat(1e10),
            () => "x".padStart(1e10),
            () => "x".padEnd(Infinity),
        ]
        for (const attempt of attempts) {
            try {
                attempt()
            } catch (e) {
                console.log(e.name + ": " + e.message)
            }
        }
    "#;
    assert_eq!(console(source), vec!["RangeError: Invalid string length"; 3]);
}

#[test]
fn test_doubling_stops_at_collection_ceiling() {
    let source = r#"
        let s = "x"
        let xs = [0]
        try { while (true) s += s } catch (e) { console.log(e.message, s.length) }
        try { while (true) xs = xs.concat(xs) } catch (e) { console.log(e.message, xs.length) }
        try { while (true) xs.push(...xs) } catch (e) { console.log(e.message) }
    "#;
    assert_eq!(
        console(source),
        vec![
            "Invalid string length 1048576",
            "Invalid array length 1048576",
            "Invalid array length",
        ]
    );
}

#[test]
fn test_shared_structure_serialization_is_bounded() {
    let source = r#"
        let a = [0]
        for (let i = 0; i < 30; i++) a = [a, a]
        for (const render of [() => JSON.stringify(a), () => String(a), () => a.flat(Infinity)]) {
            try {
                render()
            } catch (e) {
                console.log(e.name)
            }
        }
    "#;
    assert_eq!(console(source), vec!["RangeError"; 3]);
}

#[test]
fn test_cyclic_array_to_string() {
    let source = r#"
        const xs = [1, 2]
        xs.push(xs)
        console.log(String(xs), xs.join("-"))
    "#;
    assert_eq!(console(source), vec!["1,2, 1-2-"]);
}
