//! Array methods
//!
//! Callback-taking methods call back into the interpreter through
//! [`calls::call_function`], so user callbacks push frames and emit steps
//! like any other call.

use std::cmp::Ordering;

use super::arg;
use crate::interpreter::calls;
use crate::interpreter::heap::ObjectKind;
use crate::interpreter::types::{ExecResult, ObjId, RuntimeError, Val};
use crate::interpreter::vm::{same_value_zero, strict_equals, VM};

const METHODS: &[&str] = &[
    "push", "pop", "shift", "unshift", "slice", "splice", "concat", "join", "indexOf",
    "lastIndexOf", "includes", "reverse", "map", "filter", "forEach", "reduce", "find",
    "findIndex", "some", "every", "sort", "flat", "fill", "at", "toString",
];

pub fn is_method(name: &str) -> bool {
    METHODS.contains(&name)
}

/* ===================== Helpers ===================== */

fn items(vm: &VM, id: ObjId) -> Vec<Val> {
    match &vm.heap.get(id).kind {
        ObjectKind::Array(items) => items.clone(),
        _ => Vec::new(),
    }
}

/// Mutable access to an array's elements; frozen arrays refuse
fn items_mut<'a>(vm: &'a mut VM, id: ObjId, name: &str, line: usize) -> ExecResult<&'a mut Vec<Val>> {
    let obj = vm.heap.get_mut(id);
    if obj.frozen {
        return Err(RuntimeError::type_misuse(
            format!("Cannot call {}() on a frozen array", name),
            line,
        ));
    }
    match &mut obj.kind {
        ObjectKind::Array(items) => Ok(items),
        _ => Err(RuntimeError::type_misuse(format!("{} is not a function", name), line)),
    }
}

/// Clamp a relative index (negative counts from the end) into `0..=len`
fn relative(vm: &VM, val: &Val, len: usize, default: usize) -> usize {
    if *val == Val::Undefined {
        return default;
    }
    let n = vm.to_number(val);
    if n.is_nan() {
        return 0;
    }
    let n = n.trunc();
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        n.min(len as f64) as usize
    }
}

fn callback(vm: &VM, args: &[Val], name: &str, line: usize) -> ExecResult<Val> {
    let func = arg(args, 0).clone();
    if !vm.is_callable(&func) {
        return Err(RuntimeError::type_misuse(
            format!("{} is not a function (in Array.{})", vm.heap.inspect(&func), name),
            line,
        ));
    }
    Ok(func)
}

fn invoke(vm: &mut VM, func: &Val, item: &Val, idx: usize, array: ObjId, line: usize) -> ExecResult<Val> {
    let args = vec![item.clone(), Val::Num(idx as f64), Val::Object(array)];
    calls::call_function(vm, func, Val::Undefined, args, line)
}

/* ===================== Static ===================== */

/// `Array.from(iterable | { length }, mapFn?)`
pub fn from(vm: &mut VM, args: &[Val], line: usize) -> ExecResult<Val> {
    let source = arg(args, 0);
    let values = match source {
        Val::Object(id) => {
            // Array-likes: `{ length: n }` with optional index keys
            let length = match &vm.heap.get(*id).kind {
                ObjectKind::Object(props) => props.get("length").map(|v| {
                    let n = vm.to_number(v);
                    if n.is_finite() && n > 0.0 {
                        n as usize
                    } else {
                        0
                    }
                }),
                _ => None,
            };
            if let Some(len) = length {
                vm.check_array_length(len, line)?;
            }
            match &vm.heap.get(*id).kind {
                ObjectKind::Array(items) => items.clone(),
                ObjectKind::Object(props) => (0..length.unwrap_or(0))
                    .map(|i| props.get(&i.to_string()).cloned().unwrap_or(Val::Undefined))
                    .collect(),
                _ => Vec::new(),
            }
        }
        Val::Str(_) => vm.iterate(source, line)?,
        _ => Vec::new(),
    };

    let Some(map_fn) = args.get(1).filter(|f| vm.is_callable(f)).cloned() else {
        return Ok(vm.alloc_array(values));
    };
    let mut out = Vec::with_capacity(values.len());
    for (i, v) in values.into_iter().enumerate() {
        let mapped = calls::call_function(vm, &map_fn, Val::Undefined, vec![v, Val::Num(i as f64)], line)?;
        out.push(mapped);
    }
    Ok(vm.alloc_array(out))
}

/* ===================== Methods ===================== */

pub fn call(vm: &mut VM, id: ObjId, name: &str, args: Vec<Val>, line: usize) -> ExecResult<Val> {
    let current = items(vm, id);
    let len = current.len();

    match name {
        /* ---- mutators ---- */
        "push" => {
            vm.check_array_length(len + args.len(), line)?;
            let list = items_mut(vm, id, name, line)?;
            list.extend(args);
            Ok(Val::Num(list.len() as f64))
        }
        "pop" => Ok(items_mut(vm, id, name, line)?.pop().unwrap_or(Val::Undefined)),
        "shift" => {
            let list = items_mut(vm, id, name, line)?;
            if list.is_empty() {
                Ok(Val::Undefined)
            } else {
                Ok(list.remove(0))
            }
        }
        "unshift" => {
            vm.check_array_length(len + args.len(), line)?;
            let list = items_mut(vm, id, name, line)?;
            list.splice(0..0, args);
            Ok(Val::Num(list.len() as f64))
        }
        "splice" => {
            let start = relative(vm, arg(&args, 0), len, 0);
            let delete = match args.get(1) {
                None => len - start,
                Some(v) => (vm.to_number(v).max(0.0) as usize).min(len - start),
            };
            let inserted: Vec<Val> = args.into_iter().skip(2).collect();
            vm.check_array_length(len - delete + inserted.len(), line)?;
            let removed: Vec<Val> = items_mut(vm, id, name, line)?
                .splice(start..start + delete, inserted)
                .collect();
            Ok(vm.alloc_array(removed))
        }
        "reverse" => {
            items_mut(vm, id, name, line)?.reverse();
            Ok(Val::Object(id))
        }
        "fill" => {
            let start = relative(vm, arg(&args, 1), len, 0);
            let end = relative(vm, arg(&args, 2), len, len);
            let value = arg(&args, 0).clone();
            let list = items_mut(vm, id, name, line)?;
            for slot in list.iter_mut().take(end).skip(start) {
                *slot = value.clone();
            }
            Ok(Val::Object(id))
        }
        "sort" => {
            let sorted = sort(vm, current, arg(&args, 0).clone(), line)?;
            *items_mut(vm, id, name, line)? = sorted;
            Ok(Val::Object(id))
        }

        /* ---- accessors ---- */
        "slice" => {
            let start = relative(vm, arg(&args, 0), len, 0);
            let end = relative(vm, arg(&args, 1), len, len);
            let part = current.get(start..end.max(start)).unwrap_or_default().to_vec();
            Ok(vm.alloc_array(part))
        }
        "concat" => {
            let mut out = current;
            for extra in &args {
                match vm.array_items(extra) {
                    Some(list) => {
                        vm.check_array_length(out.len() + list.len(), line)?;
                        out.extend(list);
                    }
                    None => out.push(extra.clone()),
                }
            }
            vm.check_array_length(out.len(), line)?;
            Ok(vm.alloc_array(out))
        }
        "join" | "toString" => {
            let sep = match (name, arg(&args, 0)) {
                ("join", Val::Undefined) | ("toString", _) => ",".to_string(),
                (_, other) => vm.to_js_string(other),
            };
            let mut out = String::new();
            for (i, v) in current.iter().enumerate() {
                if i > 0 {
                    out.push_str(&sep);
                }
                match v {
                    Val::Undefined | Val::Null => {}
                    Val::Object(inner) if *inner == id => {}
                    _ => out.push_str(&vm.to_js_string(v)),
                }
                vm.check_string_length(out.len(), line)?;
            }
            Ok(Val::Str(out))
        }
        "indexOf" => {
            let from = relative(vm, arg(&args, 1), len, 0);
            let found = current
                .iter()
                .enumerate()
                .skip(from)
                .find(|(_, v)| strict_equals(v, arg(&args, 0)));
            Ok(Val::Num(found.map_or(-1.0, |(i, _)| i as f64)))
        }
        "lastIndexOf" => {
            let found = current.iter().rposition(|v| strict_equals(v, arg(&args, 0)));
            Ok(Val::Num(found.map_or(-1.0, |i| i as f64)))
        }
        "includes" => Ok(Val::Bool(
            current.iter().any(|v| same_value_zero(v, arg(&args, 0))),
        )),
        "at" => {
            let n = vm.to_number(arg(&args, 0));
            let n = if n.is_nan() { 0.0 } else { n.trunc() };
            let idx = if n < 0.0 { len as f64 + n } else { n };
            if idx < 0.0 {
                return Ok(Val::Undefined);
            }
            Ok(current.get(idx as usize).cloned().unwrap_or(Val::Undefined))
        }
        "flat" => {
            let depth = match arg(&args, 0) {
                Val::Undefined => 1.0,
                other => vm.to_number(other),
            };
            let mut out = Vec::new();
            flatten(vm, current, depth, &mut out);
            vm.check_array_length(out.len(), line)?;
            Ok(vm.alloc_array(out))
        }

        /* ---- iteration ---- */
        "forEach" => {
            let func = callback(vm, &args, name, line)?;
            for (i, v) in current.iter().enumerate() {
                invoke(vm, &func, v, i, id, line)?;
            }
            Ok(Val::Undefined)
        }
        "map" => {
            let func = callback(vm, &args, name, line)?;
            let mut out = Vec::with_capacity(len);
            for (i, v) in current.iter().enumerate() {
                out.push(invoke(vm, &func, v, i, id, line)?);
            }
            Ok(vm.alloc_array(out))
        }
        "filter" => {
            let func = callback(vm, &args, name, line)?;
            let mut out = Vec::new();
            for (i, v) in current.iter().enumerate() {
                if invoke(vm, &func, v, i, id, line)?.is_truthy() {
                    out.push(v.clone());
                }
            }
            Ok(vm.alloc_array(out))
        }
        "find" | "findIndex" => {
            let func = callback(vm, &args, name, line)?;
            for (i, v) in current.iter().enumerate() {
                if invoke(vm, &func, v, i, id, line)?.is_truthy() {
                    return Ok(if name == "find" {
                        v.clone()
                    } else {
                        Val::Num(i as f64)
                    });
                }
            }
            Ok(if name == "find" {
                Val::Undefined
            } else {
                Val::Num(-1.0)
            })
        }
        "some" => {
            let func = callback(vm, &args, name, line)?;
            for (i, v) in current.iter().enumerate() {
                if invoke(vm, &func, v, i, id, line)?.is_truthy() {
                    return Ok(Val::Bool(true));
                }
            }
            Ok(Val::Bool(false))
        }
        "every" => {
            let func = callback(vm, &args, name, line)?;
            for (i, v) in current.iter().enumerate() {
                if !invoke(vm, &func, v, i, id, line)?.is_truthy() {
                    return Ok(Val::Bool(false));
                }
            }
            Ok(Val::Bool(true))
        }
        "reduce" => {
            let func = callback(vm, &args, name, line)?;
            let mut iter = current.into_iter().enumerate();
            let mut acc = match args.get(1) {
                Some(init) => init.clone(),
                None => match iter.next() {
                    Some((_, first)) => first,
                    None => {
                        return Err(RuntimeError::type_misuse(
                            "Reduce of empty array with no initial value",
                            line,
                        ))
                    }
                },
            };
            for (i, v) in iter {
                let call_args = vec![acc, v, Val::Num(i as f64), Val::Object(id)];
                acc = calls::call_function(vm, &func, Val::Undefined, call_args, line)?;
            }
            Ok(acc)
        }
        _ => Err(RuntimeError::type_misuse(
            format!("array.{} is not a function", name),
            line,
        )),
    }
}

/// Flatten into `out`, stopping early once it passes the collection ceiling
fn flatten(vm: &VM, list: Vec<Val>, depth: f64, out: &mut Vec<Val>) {
    for v in list {
        if out.len() > vm.limits.max_collection_length {
            return;
        }
        match vm.array_items(&v) {
            Some(inner) if depth >= 1.0 => flatten(vm, inner, depth - 1.0, out),
            _ => out.push(v),
        }
    }
}

/// Stable insertion sort; the comparator may be user code
fn sort(vm: &mut VM, mut list: Vec<Val>, comparator: Val, line: usize) -> ExecResult<Vec<Val>> {
    let custom = vm.is_callable(&comparator);
    if !custom && comparator != Val::Undefined {
        return Err(RuntimeError::type_misuse(
            "The comparison function must be either a function or undefined",
            line,
        ));
    }
    for i in 1..list.len() {
        let mut j = i;
        while j > 0 {
            let order = compare(vm, &list[j - 1], &list[j], &comparator, custom, line)?;
            if order != Ordering::Greater {
                break;
            }
            list.swap(j - 1, j);
            j -= 1;
        }
    }
    Ok(list)
}

fn compare(vm: &mut VM, a: &Val, b: &Val, comparator: &Val, custom: bool, line: usize) -> ExecResult<Ordering> {
    // undefined always sorts last and is never passed to the comparator
    match (a, b) {
        (Val::Undefined, Val::Undefined) => return Ok(Ordering::Equal),
        (Val::Undefined, _) => return Ok(Ordering::Greater),
        (_, Val::Undefined) => return Ok(Ordering::Less),
        _ => {}
    }
    if custom {
        let result = calls::call_function(vm, comparator, Val::Undefined, vec![a.clone(), b.clone()], line)?;
        let n = vm.to_number(&result);
        return Ok(n.partial_cmp(&0.0).unwrap_or(Ordering::Equal));
    }
    Ok(vm.to_js_string(a).cmp(&vm.to_js_string(b)))
}
