//! Virtual Machine state
//!
//! The VM is the run context threaded through every evaluation call. It owns:
//! - the environment and heap arenas
//! - the simulated call stack, console buffer, Web-API set and task queues
//! - the step counter and the recorded trace
//!
//! A fresh VM is built for every run, so runs never share state.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::env::{Environment, ScopeKind};
use super::event_loop::{Task, WebApiEntry};
use super::heap::{Heap, ObjectKind};
use super::stdlib::ErrorKind;
use super::tracer::{CallFrame, ConsoleEntry, EventLoopPhase, TraceStep};
use super::types::values::string_to_number;
use super::types::{format_number, EnvId, ExecResult, ObjId, Props, RuntimeError, Val};

/* ===================== Limits ===================== */

/// Resource ceilings for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    pub max_steps: usize,
    pub max_call_depth: usize,
    /// Longest array or string a program may build
    pub max_collection_length: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_steps: 2000,
            max_call_depth: 100,
            max_collection_length: 1 << 20,
        }
    }
}

/* ===================== VM ===================== */

#[derive(Debug)]
pub struct VM {
    pub envs: Vec<Environment>,
    pub heap: Heap,
    pub global_env: EnvId,

    pub call_stack: Vec<CallFrame>,
    pub console: Vec<ConsoleEntry>,
    pub web_apis: Vec<WebApiEntry>,
    pub callback_queue: VecDeque<Task>,
    pub microtask_queue: VecDeque<Task>,
    pub phase: EventLoopPhase,

    pub steps: Vec<TraceStep>,
    /// Scope of the statement being executed
    pub current_env: EnvId,

    pub step_count: usize,
    pub limits: Limits,

    pub next_timer_id: usize,
    rng_state: u64,
}

impl VM {
    pub fn new(limits: Limits) -> Self {
        let global = Environment {
            parent: None,
            kind: ScopeKind::Global,
            bindings: Vec::new(),
            this_val: None,
        };
        VM {
            envs: vec![global],
            heap: Heap::new(),
            global_env: 0,
            call_stack: Vec::new(),
            console: Vec::new(),
            web_apis: Vec::new(),
            callback_queue: VecDeque::new(),
            microtask_queue: VecDeque::new(),
            phase: EventLoopPhase::Executing,
            steps: Vec::new(),
            current_env: 0,
            step_count: 0,
            limits,
            next_timer_id: 1,
            rng_state: 0x2545_f491_4f6c_dd1d,
        }
    }

    /// Count one unit of work against the step ceiling
    pub fn tick(&mut self) -> ExecResult<()> {
        self.step_count += 1;
        if self.step_count > self.limits.max_steps {
            return Err(RuntimeError::StepLimitExceeded {
                limit: self.limits.max_steps,
            });
        }
        Ok(())
    }

    pub fn push_frame(&mut self, function_name: &str, line: usize) -> ExecResult<()> {
        if self.call_stack.len() >= self.limits.max_call_depth {
            return Err(RuntimeError::CallDepthExceeded {
                limit: self.limits.max_call_depth,
            });
        }
        self.call_stack.push(CallFrame {
            function_name: function_name.to_string(),
            line,
        });
        Ok(())
    }

    pub fn pop_frame(&mut self) {
        self.call_stack.pop();
    }

    /// Deterministic xorshift64* stream, identical for every run
    pub fn next_random(&mut self) -> f64 {
        let mut x = self.rng_state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.rng_state = x;
        let bits = x.wrapping_mul(0x2545_f491_4f6c_dd1d) >> 11;
        bits as f64 / (1u64 << 53) as f64
    }

    /* ===================== Allocation ===================== */

    pub fn alloc(&mut self, kind: ObjectKind) -> Val {
        Val::Object(self.heap.alloc(kind))
    }

    pub fn alloc_array(&mut self, items: Vec<Val>) -> Val {
        self.alloc(ObjectKind::Array(items))
    }

    pub fn alloc_object(&mut self, props: Props) -> Val {
        self.alloc(ObjectKind::Object(props))
    }

    pub fn alloc_error(&mut self, kind: ErrorKind, message: &str) -> Val {
        let mut props = Props::new();
        props.set("name", Val::str(kind.name()));
        props.set("message", Val::str(message));
        let id = self.heap.alloc(ObjectKind::Object(props));
        self.heap.get_mut(id).class = Some(kind.name().to_string());
        Val::Object(id)
    }

    /// Wrap a value thrown by interpreted code
    pub fn throw_value(&self, value: Val, line: usize) -> RuntimeError {
        RuntimeError::UserThrow {
            message: self.heap.display(&value),
            value,
            line,
        }
    }

    /// Throw a fresh error object (catchable by interpreted `try`)
    pub fn throw_error(&mut self, kind: ErrorKind, message: &str, line: usize) -> RuntimeError {
        let value = self.alloc_error(kind, message);
        self.throw_value(value, line)
    }

    /// Array lengths past the collection ceiling throw a catchable `RangeError`
    pub fn check_array_length(&mut self, len: usize, line: usize) -> ExecResult<()> {
        if len > self.limits.max_collection_length {
            return Err(self.throw_error(ErrorKind::RangeError, "Invalid array length", line));
        }
        Ok(())
    }

    pub fn check_string_length(&mut self, len: usize, line: usize) -> ExecResult<()> {
        if len > self.limits.max_collection_length {
            return Err(self.throw_error(ErrorKind::RangeError, "Invalid string length", line));
        }
        Ok(())
    }

    /// `String(value)` for results a program keeps, bounded by the collection ceiling
    pub fn to_js_string_checked(&mut self, val: &Val, line: usize) -> ExecResult<String> {
        let text = self.to_js_string(val);
        self.check_string_length(text.len(), line)?;
        Ok(text)
    }

    /* ===================== Conversions ===================== */

    pub fn is_callable(&self, val: &Val) -> bool {
        match val {
            Val::Native(_) => true,
            Val::Builtin(b) => b.is_callable(),
            Val::Object(id) => matches!(
                self.heap.get(*id).kind,
                ObjectKind::Closure(_)
                    | ObjectKind::Bound { .. }
                    | ObjectKind::Method { .. }
                    | ObjectKind::Resolver { .. }
            ),
            _ => false,
        }
    }

    pub fn type_of(&self, val: &Val) -> &'static str {
        match val {
            Val::Undefined => "undefined",
            Val::Null => "object",
            Val::Bool(_) => "boolean",
            Val::Num(_) => "number",
            Val::Str(_) => "string",
            _ if self.is_callable(val) => "function",
            _ => "object",
        }
    }

    pub fn to_number(&self, val: &Val) -> f64 {
        match val {
            Val::Undefined => f64::NAN,
            Val::Null => 0.0,
            Val::Bool(b) => f64::from(u8::from(*b)),
            Val::Num(n) => *n,
            Val::Str(s) => string_to_number(s),
            Val::Object(id) => match self.heap.get(*id).kind {
                ObjectKind::Array(_) => string_to_number(&self.to_js_string(val)),
                _ => f64::NAN,
            },
            _ => f64::NAN,
        }
    }

    /// `String(value)`
    pub fn to_js_string(&self, val: &Val) -> String {
        match val {
            Val::Undefined => "undefined".to_string(),
            Val::Null => "null".to_string(),
            Val::Bool(b) => b.to_string(),
            Val::Num(n) => format_number(*n),
            Val::Str(s) => s.clone(),
            Val::Native(f) => format!("function {}() {{ [native code] }}", f.name()),
            Val::Builtin(b) if b.is_callable() => {
                format!("function {}() {{ [native code] }}", b.name())
            }
            Val::Builtin(b) => format!("[object {}]", b.name()),
            Val::GlobalThis => "[object global]".to_string(),
            Val::Object(id) => {
                let obj = self.heap.get(*id);
                match &obj.kind {
                    ObjectKind::Array(_) => {
                        let mut out = String::new();
                        self.join_array(*id, &mut Vec::new(), &mut out);
                        out
                    }
                    ObjectKind::Object(_) => match &obj.class {
                        Some(class) if super::heap::is_error_class(class) => self.heap.display(val),
                        _ => "[object Object]".to_string(),
                    },
                    ObjectKind::Closure(c) => format!("function {}() {{ ... }}", c.name),
                    ObjectKind::Promise(_) => "[object Promise]".to_string(),
                    _ => "function () { [native code] }".to_string(),
                }
            }
        }
    }

    /// Comma-join an array into `out` the way `Array.prototype.toString` does
    ///
    /// A cyclic element joins as the empty string. Output past the
    /// collection ceiling is cut short; callers keeping the result check it.
    fn join_array(&self, id: ObjId, seen: &mut Vec<ObjId>, out: &mut String) {
        let ObjectKind::Array(items) = &self.heap.get(id).kind else {
            return;
        };
        seen.push(id);
        for (i, v) in items.iter().enumerate() {
            if out.len() > self.limits.max_collection_length {
                break;
            }
            if i > 0 {
                out.push(',');
            }
            match v {
                Val::Undefined | Val::Null => {}
                Val::Object(inner) if seen.contains(inner) => {}
                Val::Object(inner) if matches!(self.heap.get(*inner).kind, ObjectKind::Array(_)) => {
                    self.join_array(*inner, seen, out)
                }
                _ => out.push_str(&self.to_js_string(v)),
            }
        }
        seen.pop();
    }

    /// Elements of an array value, `None` for non-arrays
    pub fn array_items(&self, val: &Val) -> Option<Vec<Val>> {
        match val {
            Val::Object(id) => match &self.heap.get(*id).kind {
                ObjectKind::Array(items) => Some(items.clone()),
                _ => None,
            },
            _ => None,
        }
    }

    /// Values produced by iterating `val` (`for...of`, spread, destructuring)
    pub fn iterate(&self, val: &Val, line: usize) -> ExecResult<Vec<Val>> {
        if let Some(items) = self.array_items(val) {
            return Ok(items);
        }
        match val {
            Val::Str(s) => Ok(s.chars().map(|c| Val::Str(c.to_string())).collect()),
            _ => Err(RuntimeError::type_misuse(
                format!("{} is not iterable", self.heap.inspect(val)),
                line,
            )),
        }
    }

    /* ===================== Equality ===================== */

    pub fn loose_equals(&self, a: &Val, b: &Val) -> bool {
        match (a, b) {
            (Val::Undefined | Val::Null, Val::Undefined | Val::Null) => true,
            (Val::Undefined | Val::Null, _) | (_, Val::Undefined | Val::Null) => false,
            (Val::Num(_), Val::Str(_)) | (Val::Str(_), Val::Num(_)) => {
                self.to_number(a) == self.to_number(b)
            }
            (Val::Bool(_), _) => self.loose_equals(&Val::Num(self.to_number(a)), b),
            (_, Val::Bool(_)) => self.loose_equals(a, &Val::Num(self.to_number(b))),
            (Val::Object(_), Val::Num(_) | Val::Str(_)) => {
                self.loose_equals(&Val::Str(self.to_js_string(a)), b)
            }
            (Val::Num(_) | Val::Str(_), Val::Object(_)) => {
                self.loose_equals(a, &Val::Str(self.to_js_string(b)))
            }
            _ => strict_equals(a, b),
        }
    }
}

pub fn strict_equals(a: &Val, b: &Val) -> bool {
    match (a, b) {
        (Val::Num(x), Val::Num(y)) => x == y,
        _ => a == b,
    }
}

/// SameValueZero, used by `includes`
pub fn same_value_zero(a: &Val, b: &Val) -> bool {
    match (a, b) {
        (Val::Num(x), Val::Num(y)) if x.is_nan() && y.is_nan() => true,
        _ => strict_equals(a, b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_ceiling() {
        let mut vm = VM::new(Limits {
            max_steps: 3,
            max_call_depth: 10,
            ..Limits::default()
        });
        for _ in 0..3 {
            vm.tick().unwrap();
        }
        assert_eq!(
            vm.tick(),
            Err(RuntimeError::StepLimitExceeded { limit: 3 })
        );
    }

    #[test]
    fn test_call_depth() {
        let mut vm = VM::new(Limits {
            max_steps: 100,
            max_call_depth: 1,
            ..Limits::default()
        });
        vm.push_frame("a", 1).unwrap();
        assert!(matches!(
            vm.push_frame("b", 2),
            Err(RuntimeError::CallDepthExceeded { limit: 1 })
        ));
    }

    #[test]
    fn test_collection_ceiling_throws_catchable_range_error() {
        let mut vm = VM::new(Limits {
            max_collection_length: 4,
            ..Limits::default()
        });
        assert!(vm.check_array_length(4, 1).is_ok());
        let err = vm.check_array_length(5, 2).unwrap_err();
        assert!(err.is_catchable());
        assert_eq!(err.to_string(), "Uncaught RangeError: Invalid array length");
        let err = vm.check_string_length(5, 3).unwrap_err();
        assert_eq!(err.to_string(), "Uncaught RangeError: Invalid string length");
    }

    #[test]
    fn test_array_to_string_is_bounded() {
        let mut vm = VM::new(Limits {
            max_collection_length: 8,
            ..Limits::default()
        });
        let mut top = vm.alloc_array(vec![Val::Num(1.0)]);
        for _ in 0..40 {
            top = vm.alloc_array(vec![top.clone(), top]);
        }
        assert!(vm.to_js_string(&top).len() <= 10);
        assert!(vm.to_js_string_checked(&top, 1).is_err());
    }

    #[test]
    fn test_random_is_deterministic() {
        let mut a = VM::new(Limits::default());
        let mut b = VM::new(Limits::default());
        let xs: Vec<f64> = (0..5).map(|_| a.next_random()).collect();
        let ys: Vec<f64> = (0..5).map(|_| b.next_random()).collect();
        assert_eq!(xs, ys);
        assert!(xs.iter().all(|x| (0.0..1.0).contains(x)));
    }

    #[test]
    fn test_loose_equality() {
        let vm = VM::new(Limits::default());
        assert!(vm.loose_equals(&Val::Null, &Val::Undefined));
        assert!(vm.loose_equals(&Val::Num(1.0), &Val::str("1")));
        assert!(vm.loose_equals(&Val::Bool(true), &Val::Num(1.0)));
        assert!(!vm.loose_equals(&Val::Null, &Val::Num(0.0)));
        assert!(!strict_equals(&Val::Num(f64::NAN), &Val::Num(f64::NAN)));
    }
}
