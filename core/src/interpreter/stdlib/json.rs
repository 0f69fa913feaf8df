//! `JSON.stringify` / `JSON.parse` bridged through `serde_json`

use serde::Serialize;
use serde_json::{Map, Number, Value as JsonValue};

use super::{arg, ErrorKind};
use crate::interpreter::heap::ObjectKind;
use crate::interpreter::types::{ExecResult, ObjId, Props, RuntimeError, Val};
use crate::interpreter::vm::VM;

/// Largest integer an f64 holds exactly
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/* ===================== Stringify ===================== */

/// `JSON.stringify(value, replacer?, indent?)`; the replacer is ignored
pub fn stringify(vm: &mut VM, args: &[Val], line: usize) -> ExecResult<Val> {
    let mut walk = Walk {
        seen: Vec::new(),
        size: 0,
        limit: vm.limits.max_collection_length,
    };
    let json = match to_json(vm, arg(args, 0), &mut walk) {
        Ok(Some(json)) => json,
        Ok(None) => return Ok(Val::Undefined),
        Err((kind, message)) => return Err(vm.throw_error(kind, message, line)),
    };

    let indent = match arg(args, 2) {
        Val::Num(n) if *n >= 1.0 => " ".repeat(n.min(10.0) as usize),
        Val::Str(s) => s.chars().take(10).collect(),
        _ => String::new(),
    };
    let text = if indent.is_empty() {
        serde_json::to_string(&json)
    } else {
        write_pretty(&json, &indent)
    };
    let text = text.map_err(|e| RuntimeError::type_misuse(e.to_string(), line))?;
    vm.check_string_length(text.len(), line)?;
    Ok(Val::Str(text))
}

fn write_pretty(json: &JsonValue, indent: &str) -> serde_json::Result<String> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    json.serialize(&mut ser)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Traversal state: the ancestor chain and a running estimate of output size
struct Walk {
    seen: Vec<ObjId>,
    size: usize,
    limit: usize,
}

type JsonFailure = (ErrorKind, &'static str);

/// Convert a value; `None` means "omit" (undefined and functions)
fn to_json(vm: &VM, val: &Val, walk: &mut Walk) -> Result<Option<JsonValue>, JsonFailure> {
    walk.size += match val {
        Val::Str(s) => s.len() + 2,
        _ => 1,
    };
    if walk.size > walk.limit {
        return Err((ErrorKind::RangeError, "Invalid string length"));
    }
    let json = match val {
        Val::Undefined | Val::Native(_) => return Ok(None),
        Val::Builtin(b) if b.is_callable() => return Ok(None),
        Val::Null => JsonValue::Null,
        Val::Bool(b) => JsonValue::Bool(*b),
        Val::Num(n) => number(*n),
        Val::Str(s) => JsonValue::String(s.clone()),
        Val::Builtin(_) | Val::GlobalThis => JsonValue::Object(Map::new()),
        Val::Object(id) => {
            if walk.seen.contains(id) {
                return Err((ErrorKind::TypeError, "Converting circular structure to JSON"));
            }
            walk.seen.push(*id);
            let out = match &vm.heap.get(*id).kind {
                ObjectKind::Array(items) => {
                    let mut list = Vec::with_capacity(items.len());
                    for item in items {
                        list.push(to_json(vm, item, walk)?.unwrap_or(JsonValue::Null));
                    }
                    Some(JsonValue::Array(list))
                }
                ObjectKind::Object(props) => {
                    let mut map = Map::new();
                    for (k, v) in props.iter() {
                        if let Some(json) = to_json(vm, v, walk)? {
                            walk.size += k.len() + 3;
                            map.insert(k.clone(), json);
                        }
                    }
                    Some(JsonValue::Object(map))
                }
                ObjectKind::Promise(_) => Some(JsonValue::Object(Map::new())),
                _ => None,
            };
            walk.seen.pop();
            return Ok(out);
        }
    };
    Ok(Some(json))
}

fn number(n: f64) -> JsonValue {
    if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return JsonValue::Number(Number::from(n as i64));
    }
    Number::from_f64(n).map_or(JsonValue::Null, JsonValue::Number)
}

/* ===================== Parse ===================== */

/// `JSON.parse(text)`; malformed input throws a catchable `SyntaxError`
pub fn parse(vm: &mut VM, args: &[Val], line: usize) -> ExecResult<Val> {
    let text = vm.to_js_string(arg(args, 0));
    match serde_json::from_str::<JsonValue>(&text) {
        Ok(json) => Ok(from_json(vm, json)),
        Err(e) => {
            let message = format!("Unexpected token in JSON ({})", e);
            Err(vm.throw_error(ErrorKind::SyntaxError, &message, line))
        }
    }
}

fn from_json(vm: &mut VM, json: JsonValue) -> Val {
    match json {
        JsonValue::Null => Val::Null,
        JsonValue::Bool(b) => Val::Bool(b),
        JsonValue::Number(n) => Val::Num(n.as_f64().unwrap_or(f64::NAN)),
        JsonValue::String(s) => Val::Str(s),
        JsonValue::Array(items) => {
            let items = items.into_iter().map(|j| from_json(vm, j)).collect();
            vm.alloc_array(items)
        }
        JsonValue::Object(map) => {
            let props: Props = map
                .into_iter()
                .map(|(k, j)| (k, from_json(vm, j)))
                .collect();
            vm.alloc_object(props)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::vm::Limits;

    #[test]
    fn test_stringify_object() {
        let mut vm = VM::new(Limits::default());
        let arr = vm.alloc_array(vec![Val::Num(1.0), Val::Num(2.5), Val::Undefined]);
        let props: Props = vec![
            ("name".to_string(), Val::str("Ada")),
            ("skip".to_string(), Val::Undefined),
            ("list".to_string(), arr),
        ]
        .into_iter()
        .collect();
        let obj = vm.alloc_object(props);

        let out = stringify(&mut vm, &[obj], 1).unwrap();
        assert_eq!(out, Val::str(r#"{"name":"Ada","list":[1,2.5,null]}"#));
    }

    #[test]
    fn test_stringify_indent() {
        let mut vm = VM::new(Limits::default());
        let obj = vm.alloc_object(vec![("a".to_string(), Val::Num(1.0))].into_iter().collect());
        let out = stringify(&mut vm, &[obj, Val::Null, Val::Num(2.0)], 1).unwrap();
        assert_eq!(out, Val::str("{\n  \"a\": 1\n}"));
    }

    #[test]
    fn test_parse_round_values() {
        let mut vm = VM::new(Limits::default());
        let val = parse(&mut vm, &[Val::str(r#"{"b": [true, null], "a": 3}"#)], 1).unwrap();
        assert_eq!(vm.heap.inspect(&val), "{ b: [ true, null ], a: 3 }");
    }

    #[test]
    fn test_parse_error_is_catchable() {
        let mut vm = VM::new(Limits::default());
        let err = parse(&mut vm, &[Val::str("{oops")], 7).unwrap_err();
        assert!(err.is_catchable());
        assert_eq!(err.line(), Some(7));
        assert!(err.to_string().starts_with("Uncaught SyntaxError: Unexpected token in JSON"));
    }
}
