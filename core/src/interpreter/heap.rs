//! Heap arena
//!
//! Every object, array, closure and promise is allocated here and referenced
//! by a monotonic [`ObjId`]. Records are never freed during a run.

use std::rc::Rc;

use super::promises::{PromiseRecord, PromiseState};
use super::stdlib::Builtin;
use super::types::ast::FunctionDef;
use super::types::{format_number, EnvId, ObjId, Props, Val};

/// Nesting below this depth renders as `[Array]` / `[Object]`
const INSPECT_DEPTH: usize = 2;
/// Array elements shown before `... N more items`
const INSPECT_ARRAY_ITEMS: usize = 100;
/// String characters shown before `... N more characters`
const INSPECT_STRING_CHARS: usize = 10_000;

/* ===================== Heap Objects ===================== */

/// User function paired with its defining environment
#[derive(Debug, Clone)]
pub struct Closure {
    pub name: String,
    pub def: Rc<FunctionDef>,
    pub env: EnvId,
}

#[derive(Debug, Clone)]
pub enum ObjectKind {
    Object(Props),
    Array(Vec<Val>),
    Closure(Closure),
    /// Result of `fn.bind(this, ...args)`
    Bound {
        target: Val,
        this: Val,
        args: Vec<Val>,
    },
    /// Host method read off a value without calling it (`const f = arr.push`)
    Method { receiver: Val, name: String },
    Promise(PromiseRecord),
    /// `resolve`/`reject` handed to a promise executor
    Resolver { promise: ObjId, reject: bool },
}

#[derive(Debug, Clone)]
pub struct HeapObject {
    pub kind: ObjectKind,
    /// Name of the first binding that received this object
    pub label: Option<String>,
    /// Constructor name for `new F()` instances and error objects
    pub class: Option<String>,
    pub frozen: bool,
}

impl HeapObject {
    /// Only plain objects and arrays appear in heap snapshots
    pub fn is_data(&self) -> bool {
        matches!(self.kind, ObjectKind::Object(_) | ObjectKind::Array(_))
    }

    pub fn kind_label(&self) -> &'static str {
        match self.kind {
            ObjectKind::Array(_) => "array",
            ObjectKind::Closure(_) | ObjectKind::Bound { .. } | ObjectKind::Method { .. } => {
                "function"
            }
            ObjectKind::Resolver { .. } => "function",
            ObjectKind::Promise(_) => "promise",
            ObjectKind::Object(_) => "object",
        }
    }
}

/* ===================== Heap ===================== */

#[derive(Debug, Clone, Default)]
pub struct Heap {
    objects: Vec<HeapObject>,
}

impl Heap {
    pub fn new() -> Self {
        Heap::default()
    }

    pub fn alloc(&mut self, kind: ObjectKind) -> ObjId {
        self.objects.push(HeapObject {
            kind,
            label: None,
            class: None,
            frozen: false,
        });
        self.objects.len() - 1
    }

    /// Ids are only minted by `alloc`, so every id in a `Val` is live.
    pub fn get(&self, id: ObjId) -> &HeapObject {
        &self.objects[id]
    }

    pub fn get_mut(&mut self, id: ObjId) -> &mut HeapObject {
        &mut self.objects[id]
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjId, &HeapObject)> {
        self.objects.iter().enumerate()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Attach a binding name to an unlabeled data object
    pub fn label(&mut self, val: &Val, name: &str) {
        if let Val::Object(id) = val {
            let obj = &mut self.objects[*id];
            if obj.label.is_none() && obj.is_data() {
                obj.label = Some(name.to_string());
            }
        }
    }

    /* ===================== Rendering ===================== */

    /// Render a value the way `console.log` prints it
    pub fn display(&self, val: &Val) -> String {
        match val {
            Val::Str(s) => s.clone(),
            _ => self.inspect(val),
        }
    }

    /// Render a value with strings quoted (`{ name: "Ada", tags: [ 1, 2 ] }`)
    pub fn inspect(&self, val: &Val) -> String {
        let mut seen = Vec::new();
        self.inspect_inner(val, &mut seen)
    }

    fn inspect_inner(&self, val: &Val, seen: &mut Vec<ObjId>) -> String {
        match val {
            Val::Undefined => "undefined".to_string(),
            Val::Null => "null".to_string(),
            Val::Bool(b) => b.to_string(),
            Val::Num(n) => format_number(*n),
            Val::Str(s) => quote_truncated(s),
            Val::Native(f) => format!("[Function: {}]", f.name()),
            Val::Builtin(b) if b.is_callable() => format!("[Function: {}]", b.name()),
            Val::Builtin(b) => match b {
                Builtin::Console => "Object [console]".to_string(),
                _ => format!("Object [{}]", b.name()),
            },
            Val::GlobalThis => "Object [global]".to_string(),
            Val::Object(id) => {
                if seen.contains(id) {
                    return "[Circular]".to_string();
                }
                if seen.len() > INSPECT_DEPTH {
                    if let Some(short) = self.collapsed(*id) {
                        return short;
                    }
                }
                seen.push(*id);
                let out = self.inspect_object(*id, seen);
                seen.pop();
                out
            }
        }
    }

    fn inspect_object(&self, id: ObjId, seen: &mut Vec<ObjId>) -> String {
        let obj = &self.objects[id];
        match &obj.kind {
            ObjectKind::Object(props) => {
                if let Some(class) = &obj.class {
                    if is_error_class(class) {
                        let message = match props.get("message") {
                            Some(Val::Str(m)) if !m.is_empty() => format!(": {}", m),
                            _ => String::new(),
                        };
                        let name = match props.get("name") {
                            Some(Val::Str(n)) => n.clone(),
                            _ => class.clone(),
                        };
                        return format!("{}{}", name, message);
                    }
                }
                let prefix = obj
                    .class
                    .as_ref()
                    .map(|c| format!("{} ", c))
                    .unwrap_or_default();
                if props.is_empty() {
                    return format!("{}{{}}", prefix);
                }
                let body: Vec<String> = props
                    .iter()
                    .map(|(k, v)| format!("{}: {}", format_key(k), self.inspect_inner(v, seen)))
                    .collect();
                format!("{}{{ {} }}", prefix, body.join(", "))
            }
            ObjectKind::Array(items) => {
                if items.is_empty() {
                    return "[]".to_string();
                }
                let mut body: Vec<String> = items
                    .iter()
                    .take(INSPECT_ARRAY_ITEMS)
                    .map(|v| self.inspect_inner(v, seen))
                    .collect();
                if items.len() > INSPECT_ARRAY_ITEMS {
                    let rest = items.len() - INSPECT_ARRAY_ITEMS;
                    body.push(format!("... {} more item{}", rest, plural(rest)));
                }
                format!("[ {} ]", body.join(", "))
            }
            ObjectKind::Closure(closure) => function_label(&closure.name),
            ObjectKind::Bound { target, .. } => {
                let inner = match target {
                    Val::Object(t) => match &self.objects[*t].kind {
                        ObjectKind::Closure(c) => c.name.clone(),
                        _ => String::new(),
                    },
                    Val::Native(f) => f.name().to_string(),
                    _ => String::new(),
                };
                format!("[Function: bound {}]", inner)
            }
            ObjectKind::Method { name, .. } => format!("[Function: {}]", name),
            ObjectKind::Resolver { reject, .. } => {
                format!("[Function: {}]", if *reject { "reject" } else { "resolve" })
            }
            ObjectKind::Promise(record) => match &record.state {
                PromiseState::Pending => "Promise { <pending> }".to_string(),
                PromiseState::Fulfilled(v) => {
                    format!("Promise {{ {} }}", self.inspect_inner(v, seen))
                }
                PromiseState::Rejected(v) => {
                    format!("Promise {{ <rejected> {} }}", self.inspect_inner(v, seen))
                }
            },
        }
    }
}

impl Heap {
    /// Placeholder for a non-empty object or array nested past the depth cutoff
    fn collapsed(&self, id: ObjId) -> Option<String> {
        let obj = &self.objects[id];
        match &obj.kind {
            ObjectKind::Array(items) if !items.is_empty() => Some("[Array]".to_string()),
            ObjectKind::Object(props) if !props.is_empty() => match &obj.class {
                Some(class) if is_error_class(class) => None,
                Some(class) => Some(format!("[{}]", class)),
                None => Some("[Object]".to_string()),
            },
            _ => None,
        }
    }
}

pub fn is_error_class(class: &str) -> bool {
    matches!(class, "Error" | "TypeError" | "RangeError" | "SyntaxError")
}

fn function_label(name: &str) -> String {
    if name.is_empty() {
        "[Function (anonymous)]".to_string()
    } else {
        format!("[Function: {}]", name)
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n"))
}

fn quote_truncated(s: &str) -> String {
    match s.char_indices().nth(INSPECT_STRING_CHARS) {
        Some((cut, _)) => {
            let rest = s[cut..].chars().count();
            format!("{}... {} more character{}", quote(&s[..cut]), rest, plural(rest))
        }
        None => quote(s),
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

fn format_key(key: &str) -> String {
    let mut chars = key.chars();
    let plain = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        }
        Some(_) => key.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    };
    if plain {
        key.to_string()
    } else {
        quote(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(entries: Vec<(&str, Val)>) -> Props {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[test]
    fn test_inspect_nested() {
        let mut heap = Heap::new();
        let arr = heap.alloc(ObjectKind::Array(vec![Val::Num(1.0), Val::Num(2.0)]));
        let obj = heap.alloc(ObjectKind::Object(props(vec![
            ("name", Val::str("Ada")),
            ("tags", Val::Object(arr)),
            ("my-key", Val::Null),
        ])));
        assert_eq!(
            heap.inspect(&Val::Object(obj)),
            r#"{ name: "Ada", tags: [ 1, 2 ], "my-key": null }"#
        );
        assert_eq!(heap.display(&Val::str("plain")), "plain");
    }

    #[test]
    fn test_inspect_circular() {
        let mut heap = Heap::new();
        let obj = heap.alloc(ObjectKind::Object(Props::new()));
        if let ObjectKind::Object(p) = &mut heap.get_mut(obj).kind {
            p.set("me", Val::Object(obj));
        }
        assert_eq!(heap.inspect(&Val::Object(obj)), "{ me: [Circular] }");
    }

    #[test]
    fn test_inspect_collapses_past_depth_two() {
        let mut heap = Heap::new();
        let leaf = heap.alloc(ObjectKind::Object(props(vec![("d", Val::Num(1.0))])));
        let c = heap.alloc(ObjectKind::Object(props(vec![("c", Val::Object(leaf))])));
        let list = heap.alloc(ObjectKind::Array(vec![Val::Num(1.0)]));
        let b = heap.alloc(ObjectKind::Object(props(vec![
            ("b", Val::Object(c)),
            ("list", Val::Object(list)),
        ])));
        let a = heap.alloc(ObjectKind::Object(props(vec![("a", Val::Object(b))])));
        assert_eq!(
            heap.inspect(&Val::Object(a)),
            "{ a: { b: { c: [Object] }, list: [ 1 ] } }"
        );
    }

    #[test]
    fn test_inspect_shared_structure_stays_small() {
        let mut heap = Heap::new();
        let mut top = heap.alloc(ObjectKind::Array(vec![Val::Num(0.0)]));
        for _ in 0..40 {
            top = heap.alloc(ObjectKind::Array(vec![Val::Object(top), Val::Object(top)]));
        }
        assert_eq!(
            heap.inspect(&Val::Object(top)),
            "[ [ [ [Array], [Array] ], [ [Array], [Array] ] ], [ [ [Array], [Array] ], [ [Array], [Array] ] ] ]"
        );
    }

    #[test]
    fn test_inspect_caps_long_arrays_and_strings() {
        let mut heap = Heap::new();
        let items = (0..103).map(|i| Val::Num(f64::from(i))).collect();
        let arr = heap.alloc(ObjectKind::Array(items));
        assert!(heap.inspect(&Val::Object(arr)).ends_with("99, ... 3 more items ]"));

        let long = Val::str("x".repeat(10_001));
        assert!(heap.inspect(&long).ends_with("\"... 1 more character"));
        assert_eq!(heap.display(&long).len(), 10_001);
    }

    #[test]
    fn test_label_only_once() {
        let mut heap = Heap::new();
        let obj = heap.alloc(ObjectKind::Array(vec![]));
        heap.label(&Val::Object(obj), "first");
        heap.label(&Val::Object(obj), "second");
        assert_eq!(heap.get(obj).label.as_deref(), Some("first"));
    }
}
