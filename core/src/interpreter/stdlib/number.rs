use super::{arg, ErrorKind};
use crate::interpreter::types::{format_number, ExecResult, Val};
use crate::interpreter::vm::VM;

pub fn constant(key: &str) -> Option<f64> {
    match key {
        "MAX_SAFE_INTEGER" => Some(9_007_199_254_740_991.0),
        "MIN_SAFE_INTEGER" => Some(-9_007_199_254_740_991.0),
        "EPSILON" => Some(f64::EPSILON),
        "MAX_VALUE" => Some(f64::MAX),
        "MIN_VALUE" => Some(5e-324),
        "POSITIVE_INFINITY" => Some(f64::INFINITY),
        "NEGATIVE_INFINITY" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        _ => None,
    }
}

/* ===================== Global Parsers ===================== */

/// `parseInt(text, radix?)`
pub fn parse_int(vm: &mut VM, args: &[Val]) -> Val {
    let text = vm.to_js_string(arg(args, 0));
    let mut radix = match arg(args, 1) {
        Val::Undefined => 0,
        other => vm.to_number(other) as u32,
    };
    let mut rest = text.trim_start();

    let negative = rest.starts_with('-');
    if negative || rest.starts_with('+') {
        rest = &rest[1..];
    }
    if (radix == 0 || radix == 16) && (rest.starts_with("0x") || rest.starts_with("0X")) {
        rest = &rest[2..];
        radix = 16;
    }
    if radix == 0 {
        radix = 10;
    }
    if !(2..=36).contains(&radix) {
        return Val::Num(f64::NAN);
    }

    let digits: Vec<u32> = rest.chars().map_while(|c| c.to_digit(radix)).collect();
    if digits.is_empty() {
        return Val::Num(f64::NAN);
    }
    let value = digits
        .iter()
        .fold(0.0, |acc, d| acc * f64::from(radix) + f64::from(*d));
    Val::Num(if negative { -value } else { value })
}

/// `parseFloat(text)`: the longest numeric prefix
pub fn parse_float(vm: &mut VM, args: &[Val]) -> Val {
    let text = vm.to_js_string(arg(args, 0));
    let trimmed = text.trim_start();
    let unsigned = trimmed.trim_start_matches(['+', '-']);
    if unsigned.starts_with("Infinity") {
        let negative = trimmed.starts_with('-');
        return Val::Num(if negative { f64::NEG_INFINITY } else { f64::INFINITY });
    }

    let bytes = trimmed.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    if end == digits_start || &trimmed[digits_start..end] == "." {
        return Val::Num(f64::NAN);
    }
    // Exponent only counts when digits follow it.
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }
    Val::Num(trimmed[..end].parse().unwrap_or(f64::NAN))
}

/* ===================== Number Methods ===================== */

pub fn is_method(name: &str) -> bool {
    matches!(name, "toFixed" | "toString")
}

pub fn call(vm: &mut VM, n: f64, name: &str, args: &[Val], line: usize) -> ExecResult<Val> {
    match name {
        "toFixed" => {
            let digits = match arg(args, 0) {
                Val::Undefined => 0.0,
                other => vm.to_number(other).trunc(),
            };
            if !(0.0..=100.0).contains(&digits) {
                return Err(vm.throw_error(
                    ErrorKind::RangeError,
                    "toFixed() digits argument must be between 0 and 100",
                    line,
                ));
            }
            if !n.is_finite() || n.abs() >= 1e21 {
                return Ok(Val::Str(format_number(n)));
            }
            Ok(Val::Str(format!("{:.*}", digits as usize, n)))
        }
        "toString" => {
            let radix = match arg(args, 0) {
                Val::Undefined => 10.0,
                other => vm.to_number(other),
            };
            if !(2.0..=36.0).contains(&radix) {
                return Err(vm.throw_error(
                    ErrorKind::RangeError,
                    "toString() radix must be between 2 and 36",
                    line,
                ));
            }
            Ok(Val::Str(to_radix(n, radix as u32)))
        }
        _ => Ok(Val::Undefined),
    }
}

fn to_radix(n: f64, radix: u32) -> String {
    if radix == 10 || !n.is_finite() {
        return format_number(n);
    }
    let negative = n < 0.0;
    let n = n.abs();
    let mut int = n.trunc();
    let mut frac = n.fract();

    let mut digits = Vec::new();
    loop {
        let d = (int % f64::from(radix)) as u32;
        digits.push(std::char::from_digit(d, radix).unwrap_or('0'));
        int = (int / f64::from(radix)).trunc();
        if int < 1.0 {
            break;
        }
    }
    let mut out: String = digits.into_iter().rev().collect();

    if frac > 0.0 {
        out.push('.');
        for _ in 0..20 {
            frac *= f64::from(radix);
            let d = frac.trunc() as u32;
            out.push(std::char::from_digit(d, radix).unwrap_or('0'));
            frac = frac.fract();
            if frac == 0.0 {
                break;
            }
        }
    }
    if negative {
        out.insert(0, '-');
    }
    out
}
