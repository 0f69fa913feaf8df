//! String methods. Indices count `char`s.

use super::{arg, ErrorKind};
use crate::interpreter::calls;
use crate::interpreter::types::{ExecResult, RuntimeError, Val};
use crate::interpreter::vm::VM;

const METHODS: &[&str] = &[
    "toUpperCase", "toLowerCase", "trim", "trimStart", "trimEnd", "split", "includes",
    "indexOf", "lastIndexOf", "startsWith", "endsWith", "slice", "substring", "charAt",
    "charCodeAt", "at", "replace", "replaceAll", "repeat", "padStart", "padEnd", "concat",
    "toString",
];

pub fn is_method(name: &str) -> bool {
    METHODS.contains(&name)
}

fn char_index(s: &str, byte_idx: usize) -> f64 {
    s[..byte_idx].chars().count() as f64
}

fn byte_offset(s: &str, char_idx: usize) -> usize {
    s.char_indices().nth(char_idx).map_or(s.len(), |(b, _)| b)
}

fn substr(chars: &[char], start: usize, end: usize) -> String {
    chars.get(start..end.max(start)).unwrap_or_default().iter().collect()
}

/// Relative index for `slice`/`at`: negative counts from the end
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

/// Clamped index for `substring`: negatives become zero
fn clamped(vm: &VM, val: &Val, len: usize, default: usize) -> usize {
    if *val == Val::Undefined {
        return default;
    }
    let n = vm.to_number(val);
    if n.is_nan() || n < 0.0 {
        0
    } else {
        n.min(len as f64) as usize
    }
}

pub fn call(vm: &mut VM, s: String, name: &str, args: Vec<Val>, line: usize) -> ExecResult<Val> {
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len();
    let text = |vm: &VM, idx: usize| match arg(&args, idx) {
        Val::Undefined => "undefined".to_string(),
        other => vm.to_js_string(other),
    };

    let out = match name {
        "toUpperCase" => Val::Str(s.to_uppercase()),
        "toLowerCase" => Val::Str(s.to_lowercase()),
        "trim" => Val::str(s.trim()),
        "trimStart" => Val::str(s.trim_start()),
        "trimEnd" => Val::str(s.trim_end()),
        "toString" => Val::Str(s),
        "concat" => {
            let mut out = s;
            for a in &args {
                out.push_str(&vm.to_js_string(a));
                vm.check_string_length(out.len(), line)?;
            }
            Val::Str(out)
        }
        "includes" => Val::Bool(s.contains(text(vm, 0).as_str())),
        "startsWith" => {
            let from = clamped(vm, arg(&args, 1), len, 0);
            Val::Bool(substr(&chars, from, len).starts_with(text(vm, 0).as_str()))
        }
        "endsWith" => {
            let end = clamped(vm, arg(&args, 1), len, len);
            Val::Bool(substr(&chars, 0, end).ends_with(text(vm, 0).as_str()))
        }
        "indexOf" => {
            let needle = text(vm, 0);
            let from = byte_offset(&s, clamped(vm, arg(&args, 1), len, 0));
            Val::Num(s[from..].find(&needle).map_or(-1.0, |b| char_index(&s, from + b)))
        }
        "lastIndexOf" => {
            let needle = text(vm, 0);
            Val::Num(s.rfind(&needle).map_or(-1.0, |b| char_index(&s, b)))
        }
        "slice" => {
            let start = relative(vm, arg(&args, 0), len, 0);
            let end = relative(vm, arg(&args, 1), len, len);
            Val::Str(substr(&chars, start, end))
        }
        "substring" => {
            let a = clamped(vm, arg(&args, 0), len, 0);
            let b = clamped(vm, arg(&args, 1), len, len);
            Val::Str(substr(&chars, a.min(b), a.max(b)))
        }
        "charAt" => {
            let idx = clamped(vm, arg(&args, 0), len, 0);
            Val::Str(chars.get(idx).map(|c| c.to_string()).unwrap_or_default())
        }
        "charCodeAt" => {
            let idx = clamped(vm, arg(&args, 0), len, 0);
            Val::Num(chars.get(idx).map_or(f64::NAN, |c| f64::from(u32::from(*c))))
        }
        "at" => {
            let n = vm.to_number(arg(&args, 0));
            let n = if n.is_nan() { 0.0 } else { n.trunc() };
            let idx = if n < 0.0 { len as f64 + n } else { n };
            match chars.get(idx as usize) {
                Some(c) if idx >= 0.0 => Val::Str(c.to_string()),
                _ => Val::Undefined,
            }
        }
        "split" => {
            let parts: Vec<Val> = match arg(&args, 0) {
                Val::Undefined => vec![Val::Str(s.clone())],
                sep => {
                    let sep = vm.to_js_string(sep);
                    if sep.is_empty() {
                        chars.iter().map(|c| Val::Str(c.to_string())).collect()
                    } else {
                        s.split(sep.as_str()).map(Val::str).collect()
                    }
                }
            };
            let parts = match arg(&args, 1) {
                Val::Undefined => parts,
                limit => parts.into_iter().take(vm.to_number(limit).max(0.0) as usize).collect(),
            };
            vm.alloc_array(parts)
        }
        "repeat" => {
            let count = vm.to_number(arg(&args, 0));
            let count = if count.is_nan() { 0.0 } else { count };
            if count < 0.0 || count.is_infinite() {
                let message = format!("Invalid count value: {}", vm.to_js_string(arg(&args, 0)));
                return Err(vm.throw_error(ErrorKind::RangeError, &message, line));
            }
            if s.len() as f64 * count.trunc() > vm.limits.max_collection_length as f64 {
                return Err(vm.throw_error(ErrorKind::RangeError, "Invalid string length", line));
            }
            Val::Str(s.repeat(count as usize))
        }
        "padStart" | "padEnd" => {
            let target = vm.to_number(arg(&args, 0));
            let target = if target.is_nan() { 0 } else { target.max(0.0) as usize };
            let fill: Vec<char> = match arg(&args, 1) {
                Val::Undefined => vec![' '],
                other => vm.to_js_string(other).chars().collect(),
            };
            if target <= len || fill.is_empty() {
                return Ok(Val::Str(s));
            }
            vm.check_string_length(target, line)?;
            let pad: String = fill.iter().cycle().take(target - len).collect();
            Val::Str(if name == "padStart" {
                pad + &s
            } else {
                s + &pad
            })
        }
        "replace" | "replaceAll" => replace(vm, &s, name == "replaceAll", &args, line)?,
        _ => {
            return Err(RuntimeError::type_misuse(
                format!("string.{} is not a function", name),
                line,
            ))
        }
    };
    Ok(out)
}

/// `replace`/`replaceAll` with a string pattern; the replacement may be a
/// function called with `(match, offset, whole)`
fn replace(vm: &mut VM, s: &str, all: bool, args: &[Val], line: usize) -> ExecResult<Val> {
    let pattern = vm.to_js_string(arg(args, 0));
    let replacement = arg(args, 1).clone();

    let mut matches: Vec<usize> = if pattern.is_empty() {
        vec![0]
    } else {
        s.match_indices(pattern.as_str()).map(|(b, _)| b).collect()
    };
    if !all {
        matches.truncate(1);
    }

    let mut out = String::with_capacity(s.len());
    let mut last = 0;
    for b in matches {
        out.push_str(&s[last..b]);
        let piece = if vm.is_callable(&replacement) {
            let call_args = vec![Val::str(&pattern), Val::Num(char_index(s, b)), Val::str(s)];
            let result = calls::call_function(vm, &replacement, Val::Undefined, call_args, line)?;
            vm.to_js_string(&result)
        } else {
            vm.to_js_string(&replacement)
        };
        vm.check_string_length(out.len() + piece.len(), line)?;
        out.push_str(&piece);
        last = b + pattern.len();
    }
    out.push_str(&s[last..]);
    Ok(Val::Str(out))
}
