//! Runtime value types

use crate::interpreter::stdlib::{Builtin, NativeFunc};

/// Index into the heap arena
pub type ObjId = usize;

/// Index into the environment arena
pub type EnvId = usize;

/// Runtime value
///
/// Primitives are held inline. Objects, arrays, closures and promises live in
/// the heap and are referenced by id, so copying a `Val` never copies an
/// object.
#[derive(Debug, Clone, PartialEq)]
pub enum Val {
    Undefined,
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    /// Heap reference
    Object(ObjId),
    /// Host function (`Math.max`, `setTimeout`, ...)
    Native(NativeFunc),
    /// Host namespace or constructor (`Math`, `Promise`, ...)
    Builtin(Builtin),
    /// Receiver-less `this`, a view over the global bindings
    GlobalThis,
}

impl Val {
    /// Check if value is truthy (for conditionals)
    pub fn is_truthy(&self) -> bool {
        match self {
            Val::Undefined | Val::Null => false,
            Val::Bool(b) => *b,
            Val::Num(n) => !(*n == 0.0 || n.is_nan()),
            Val::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Val::Undefined | Val::Null)
    }

    pub fn as_object(&self) -> Option<ObjId> {
        match self {
            Val::Object(id) => Some(*id),
            _ => None,
        }
    }

    pub fn str(s: impl Into<String>) -> Val {
        Val::Str(s.into())
    }
}

/* ===================== Properties ===================== */

/// Insertion-ordered property map
///
/// Integer-like keys sort ahead of string keys in ascending order, the way
/// JavaScript enumerates own properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props {
    entries: Vec<(String, Val)>,
}

impl Props {
    pub fn new() -> Self {
        Props::default()
    }

    pub fn get(&self, key: &str) -> Option<&Val> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Val) {
        let key = key.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
            return;
        }
        match array_index(&key) {
            Some(idx) => {
                let pos = self
                    .entries
                    .iter()
                    .position(|(k, _)| array_index(k).map_or(true, |other| other > idx))
                    .unwrap_or(self.entries.len());
                self.entries.insert(pos, (key, value));
            }
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Val> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Val)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Val)> for Props {
    fn from_iter<I: IntoIterator<Item = (String, Val)>>(iter: I) -> Self {
        let mut props = Props::new();
        for (k, v) in iter {
            props.set(k, v);
        }
        props
    }
}

/// Parse a canonical array index ("0", "17", never "01")
pub fn array_index(key: &str) -> Option<usize> {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    if !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse().ok()
}

/* ===================== Number Formatting ===================== */

/// Format a number the way `String(n)` does
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    let abs = n.abs();
    if abs >= 1e21 || abs < 1e-6 {
        // Rust renders `1e21` and `1.5e-7`; JavaScript wants an explicit sign.
        let exp = format!("{:e}", n);
        return match exp.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => {
                format!("{}e+{}", mantissa, power)
            }
            _ => exp,
        };
    }
    format!("{}", n)
}

/// `Number(string)` conversion
pub fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    let lower = trimmed.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        return i64::from_str_radix(hex, 16).map_or(f64::NAN, |n| n as f64);
    }
    if let Some(bin) = lower.strip_prefix("0b") {
        return i64::from_str_radix(bin, 2).map_or(f64::NAN, |n| n as f64);
    }
    match trimmed {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        // Rust accepts "inf" and "nan"; JavaScript does not.
        _ if lower.contains("inf") || lower.contains("nan") => f64::NAN,
        _ => trimmed.parse().unwrap_or(f64::NAN),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(1.5e-7), "1.5e-7");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_string_to_number() {
        assert_eq!(string_to_number("  42 "), 42.0);
        assert_eq!(string_to_number(""), 0.0);
        assert_eq!(string_to_number("0x1f"), 31.0);
        assert!(string_to_number("12px").is_nan());
        assert!(string_to_number("inf").is_nan());
    }

    #[test]
    fn test_props_order() {
        let mut props = Props::new();
        props.set("b", Val::Num(1.0));
        props.set("2", Val::Num(2.0));
        props.set("a", Val::Num(3.0));
        props.set("1", Val::Num(4.0));
        let keys: Vec<&String> = props.keys().collect();
        assert_eq!(keys, vec!["1", "2", "b", "a"]);
    }

    #[test]
    fn test_truthiness() {
        assert!(!Val::Num(f64::NAN).is_truthy());
        assert!(!Val::Str(String::new()).is_truthy());
        assert!(Val::Object(0).is_truthy());
        assert!(Val::Str("0".into()).is_truthy());
    }
}
