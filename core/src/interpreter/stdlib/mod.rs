//! Standard library function implementations
//!
//! Host functions are plain enum tags stored inside `Val`, resolved through a
//! single dispatcher. Methods on primitives, arrays and functions are never
//! materialized as objects; the call classifier routes them straight to
//! [`call_method`].

pub mod array;
pub mod console;
pub mod json;
pub mod math;
pub mod number;
pub mod object;
pub mod string;

use super::event_loop;
use super::expressions;
use super::heap::ObjectKind;
use super::promises;
use super::types::{ExecResult, RuntimeError, Val};
use super::vm::VM;

pub use console::ConsoleMethod;
pub use math::MathFunc;

/* ===================== Standard Library Function Types ===================== */

/// Host function identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeFunc {
    Console(ConsoleMethod),
    Math(MathFunc),
    JsonStringify,
    JsonParse,
    ObjectKeys,
    ObjectValues,
    ObjectEntries,
    ObjectAssign,
    ObjectFreeze,
    ArrayIsArray,
    ArrayFrom,
    ArrayOf,
    NumberIsInteger,
    NumberIsFinite,
    NumberIsNaN,
    ParseInt,
    ParseFloat,
    IsNaN,
    IsFinite,
    SetTimeout,
    SetInterval,
    ClearTimeout,
    ClearInterval,
    QueueMicrotask,
    PromiseResolve,
    PromiseReject,
}

impl NativeFunc {
    pub fn name(&self) -> &'static str {
        match self {
            NativeFunc::Console(m) => m.name(),
            NativeFunc::Math(f) => f.name(),
            NativeFunc::JsonStringify => "stringify",
            NativeFunc::JsonParse => "parse",
            NativeFunc::ObjectKeys => "keys",
            NativeFunc::ObjectValues => "values",
            NativeFunc::ObjectEntries => "entries",
            NativeFunc::ObjectAssign => "assign",
            NativeFunc::ObjectFreeze => "freeze",
            NativeFunc::ArrayIsArray => "isArray",
            NativeFunc::ArrayFrom => "from",
            NativeFunc::ArrayOf => "of",
            NativeFunc::NumberIsInteger => "isInteger",
            NativeFunc::NumberIsFinite | NativeFunc::IsFinite => "isFinite",
            NativeFunc::NumberIsNaN | NativeFunc::IsNaN => "isNaN",
            NativeFunc::ParseInt => "parseInt",
            NativeFunc::ParseFloat => "parseFloat",
            NativeFunc::SetTimeout => "setTimeout",
            NativeFunc::SetInterval => "setInterval",
            NativeFunc::ClearTimeout => "clearTimeout",
            NativeFunc::ClearInterval => "clearInterval",
            NativeFunc::QueueMicrotask => "queueMicrotask",
            NativeFunc::PromiseResolve => "resolve",
            NativeFunc::PromiseReject => "reject",
        }
    }
}

/// Host namespaces and constructors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Console,
    Math,
    Json,
    Object,
    Array,
    Number,
    String,
    Boolean,
    Promise,
    Error(ErrorKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Error,
    TypeError,
    RangeError,
    SyntaxError,
}

impl ErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::SyntaxError => "SyntaxError",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Error" => Some(ErrorKind::Error),
            "TypeError" => Some(ErrorKind::TypeError),
            "RangeError" => Some(ErrorKind::RangeError),
            "SyntaxError" => Some(ErrorKind::SyntaxError),
            _ => None,
        }
    }
}

impl Builtin {
    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Console => "console",
            Builtin::Math => "Math",
            Builtin::Json => "JSON",
            Builtin::Object => "Object",
            Builtin::Array => "Array",
            Builtin::Number => "Number",
            Builtin::String => "String",
            Builtin::Boolean => "Boolean",
            Builtin::Promise => "Promise",
            Builtin::Error(kind) => kind.name(),
        }
    }

    /// Namespaces are plain objects; everything else is a constructor
    pub fn is_callable(&self) -> bool {
        !matches!(self, Builtin::Console | Builtin::Math | Builtin::Json)
    }
}

/* ===================== Globals ===================== */

/// Interpreter-supplied globals, consulted after the scope chain misses
pub fn global(name: &str) -> Option<Val> {
    let val = match name {
        "undefined" => Val::Undefined,
        "NaN" => Val::Num(f64::NAN),
        "Infinity" => Val::Num(f64::INFINITY),
        "globalThis" => Val::GlobalThis,
        "console" => Val::Builtin(Builtin::Console),
        "Math" => Val::Builtin(Builtin::Math),
        "JSON" => Val::Builtin(Builtin::Json),
        "Object" => Val::Builtin(Builtin::Object),
        "Array" => Val::Builtin(Builtin::Array),
        "Number" => Val::Builtin(Builtin::Number),
        "String" => Val::Builtin(Builtin::String),
        "Boolean" => Val::Builtin(Builtin::Boolean),
        "Promise" => Val::Builtin(Builtin::Promise),
        "parseInt" => Val::Native(NativeFunc::ParseInt),
        "parseFloat" => Val::Native(NativeFunc::ParseFloat),
        "isNaN" => Val::Native(NativeFunc::IsNaN),
        "isFinite" => Val::Native(NativeFunc::IsFinite),
        "setTimeout" => Val::Native(NativeFunc::SetTimeout),
        "setInterval" => Val::Native(NativeFunc::SetInterval),
        "clearTimeout" => Val::Native(NativeFunc::ClearTimeout),
        "clearInterval" => Val::Native(NativeFunc::ClearInterval),
        "queueMicrotask" => Val::Native(NativeFunc::QueueMicrotask),
        _ => return ErrorKind::from_name(name).map(|k| Val::Builtin(Builtin::Error(k))),
    };
    Some(val)
}

/// Static member of a namespace or constructor (`Math.PI`, `Object.keys`)
pub fn builtin_member(builtin: Builtin, key: &str) -> Val {
    let func = match (builtin, key) {
        (Builtin::Console, _) => ConsoleMethod::from_name(key).map(NativeFunc::Console),
        (Builtin::Math, _) => {
            if let Some(constant) = math::constant(key) {
                return Val::Num(constant);
            }
            MathFunc::from_name(key).map(NativeFunc::Math)
        }
        (Builtin::Json, "stringify") => Some(NativeFunc::JsonStringify),
        (Builtin::Json, "parse") => Some(NativeFunc::JsonParse),
        (Builtin::Object, "keys") => Some(NativeFunc::ObjectKeys),
        (Builtin::Object, "values") => Some(NativeFunc::ObjectValues),
        (Builtin::Object, "entries") => Some(NativeFunc::ObjectEntries),
        (Builtin::Object, "assign") => Some(NativeFunc::ObjectAssign),
        (Builtin::Object, "freeze") => Some(NativeFunc::ObjectFreeze),
        (Builtin::Array, "isArray") => Some(NativeFunc::ArrayIsArray),
        (Builtin::Array, "from") => Some(NativeFunc::ArrayFrom),
        (Builtin::Array, "of") => Some(NativeFunc::ArrayOf),
        (Builtin::Number, "isInteger") => Some(NativeFunc::NumberIsInteger),
        (Builtin::Number, "isFinite") => Some(NativeFunc::NumberIsFinite),
        (Builtin::Number, "isNaN") => Some(NativeFunc::NumberIsNaN),
        (Builtin::Number, "parseInt") => Some(NativeFunc::ParseInt),
        (Builtin::Number, "parseFloat") => Some(NativeFunc::ParseFloat),
        (Builtin::Number, _) => return number::constant(key).map_or(Val::Undefined, Val::Num),
        (Builtin::Promise, "resolve") => Some(NativeFunc::PromiseResolve),
        (Builtin::Promise, "reject") => Some(NativeFunc::PromiseReject),
        (_, "name") => return Val::str(builtin.name()),
        _ => None,
    };
    func.map_or(Val::Undefined, Val::Native)
}

/* ===================== Stdlib Dispatcher ===================== */

/// Call a host function with arguments
pub fn call_native(vm: &mut VM, func: NativeFunc, args: Vec<Val>, line: usize) -> ExecResult<Val> {
    match func {
        NativeFunc::Console(method) => console::call(vm, method, &args, line),
        NativeFunc::Math(f) => Ok(math::call(vm, f, &args)),
        NativeFunc::JsonStringify => json::stringify(vm, &args, line),
        NativeFunc::JsonParse => json::parse(vm, &args, line),
        NativeFunc::ObjectKeys => object::keys(vm, &args, line),
        NativeFunc::ObjectValues => object::values(vm, &args, line),
        NativeFunc::ObjectEntries => object::entries(vm, &args, line),
        NativeFunc::ObjectAssign => object::assign(vm, &args, line),
        NativeFunc::ObjectFreeze => Ok(object::freeze(vm, &args)),
        NativeFunc::ArrayIsArray => Ok(Val::Bool(matches!(
            args.first().and_then(Val::as_object).map(|id| &vm.heap.get(id).kind),
            Some(ObjectKind::Array(_))
        ))),
        NativeFunc::ArrayFrom => array::from(vm, &args, line),
        NativeFunc::ArrayOf => Ok(vm.alloc_array(args)),
        NativeFunc::NumberIsInteger => Ok(Val::Bool(
            matches!(args.first(), Some(Val::Num(n)) if n.is_finite() && n.fract() == 0.0),
        )),
        NativeFunc::NumberIsFinite => Ok(Val::Bool(
            matches!(args.first(), Some(Val::Num(n)) if n.is_finite()),
        )),
        NativeFunc::NumberIsNaN => Ok(Val::Bool(
            matches!(args.first(), Some(Val::Num(n)) if n.is_nan()),
        )),
        NativeFunc::ParseInt => Ok(number::parse_int(vm, &args)),
        NativeFunc::ParseFloat => Ok(number::parse_float(vm, &args)),
        NativeFunc::IsNaN => Ok(Val::Bool(vm.to_number(arg(&args, 0)).is_nan())),
        NativeFunc::IsFinite => Ok(Val::Bool(vm.to_number(arg(&args, 0)).is_finite())),
        NativeFunc::SetTimeout | NativeFunc::SetInterval => {
            event_loop::schedule_timer(vm, func, args, line)
        }
        NativeFunc::ClearTimeout | NativeFunc::ClearInterval => {
            event_loop::clear_timer(vm, func, &args, line)
        }
        NativeFunc::QueueMicrotask => event_loop::queue_microtask(vm, args, line),
        NativeFunc::PromiseResolve => promises::promise_resolve(vm, arg(&args, 0).clone(), line),
        NativeFunc::PromiseReject => promises::promise_reject(vm, arg(&args, 0).clone(), line),
    }
}

/// Call a namespace-less constructor as a function (`Number("4")`)
pub fn call_builtin(vm: &mut VM, builtin: Builtin, args: Vec<Val>, line: usize) -> ExecResult<Val> {
    match builtin {
        Builtin::Number => Ok(Val::Num(args.first().map_or(0.0, |v| vm.to_number(v)))),
        Builtin::String => match args.first() {
            Some(v) => Ok(Val::Str(vm.to_js_string_checked(v, line)?)),
            None => Ok(Val::str("")),
        },
        Builtin::Boolean => Ok(Val::Bool(args.first().map_or(false, Val::is_truthy))),
        Builtin::Array | Builtin::Object | Builtin::Error(_) => construct(vm, builtin, args, line),
        Builtin::Promise => Err(RuntimeError::type_misuse(
            "Promise constructor cannot be invoked without 'new'",
            line,
        )),
        Builtin::Console | Builtin::Math | Builtin::Json => Err(RuntimeError::type_misuse(
            format!("{} is not a function", builtin.name()),
            line,
        )),
    }
}

/// `new Builtin(...)`
pub fn construct(vm: &mut VM, builtin: Builtin, args: Vec<Val>, line: usize) -> ExecResult<Val> {
    match builtin {
        Builtin::Promise => promises::construct(vm, arg(&args, 0).clone(), line),
        Builtin::Error(kind) => {
            let message = match args.first() {
                None | Some(Val::Undefined) => String::new(),
                Some(v) => vm.to_js_string(v),
            };
            Ok(vm.alloc_error(kind, &message))
        }
        Builtin::Array => match args.as_slice() {
            [len @ Val::Num(_)] => {
                let len = expressions::array_length(vm, len, line)?;
                Ok(vm.alloc_array(vec![Val::Undefined; len]))
            }
            _ => Ok(vm.alloc_array(args)),
        },
        Builtin::Object => match args.into_iter().next() {
            Some(v @ Val::Object(_)) => Ok(v),
            _ => Ok(vm.alloc_object(Default::default())),
        },
        Builtin::Number | Builtin::String | Builtin::Boolean => call_builtin(vm, builtin, args, line),
        Builtin::Console | Builtin::Math | Builtin::Json => Err(RuntimeError::type_misuse(
            format!("{} is not a constructor", builtin.name()),
            line,
        )),
    }
}

/* ===================== Methods ===================== */

/// Whether `receiver.name(...)` resolves to a host method
pub fn has_method(vm: &VM, receiver: &Val, name: &str) -> bool {
    match receiver {
        Val::Str(_) => string::is_method(name),
        Val::Num(_) => number::is_method(name),
        Val::Object(id) => match &vm.heap.get(*id).kind {
            ObjectKind::Array(_) => array::is_method(name),
            ObjectKind::Object(props) => !props.contains(name) && object::is_method(name),
            ObjectKind::Promise(_) => matches!(name, "then" | "catch" | "finally"),
            _ => vm.is_callable(receiver) && matches!(name, "call" | "apply" | "bind"),
        },
        Val::Native(_) | Val::Builtin(_) => matches!(name, "call" | "apply" | "bind"),
        _ => false,
    }
}

/// Invoke a host method on a receiver
pub fn call_method(
    vm: &mut VM,
    receiver: Val,
    name: &str,
    args: Vec<Val>,
    line: usize,
) -> ExecResult<Val> {
    match &receiver {
        Val::Str(s) => string::call(vm, s.clone(), name, args, line),
        Val::Num(n) => number::call(vm, *n, name, &args, line),
        Val::Object(id) => {
            let id = *id;
            match &vm.heap.get(id).kind {
                ObjectKind::Array(_) => array::call(vm, id, name, args, line),
                ObjectKind::Object(_) => object::call(vm, id, name, &args),
                ObjectKind::Promise(_) => promises::register(vm, id, name, args, line),
                _ => call_function_method(vm, receiver, name, args, line),
            }
        }
        Val::Native(_) | Val::Builtin(_) => call_function_method(vm, receiver, name, args, line),
        _ => Err(RuntimeError::type_misuse(
            format!("{} is not a function", name),
            line,
        )),
    }
}

/// `Function.prototype.call/apply/bind`
fn call_function_method(
    vm: &mut VM,
    target: Val,
    name: &str,
    mut args: Vec<Val>,
    line: usize,
) -> ExecResult<Val> {
    let this = if args.is_empty() {
        Val::Undefined
    } else {
        args.remove(0)
    };
    match name {
        "call" => super::calls::call_function(vm, &target, this, args, line),
        "apply" => {
            let spread = match args.first() {
                Some(list @ Val::Object(_)) => vm.array_items(list).unwrap_or_default(),
                _ => Vec::new(),
            };
            super::calls::call_function(vm, &target, this, spread, line)
        }
        "bind" => Ok(vm.alloc(ObjectKind::Bound {
            target,
            this,
            args,
        })),
        _ => Err(RuntimeError::type_misuse(
            format!("{} is not a function", name),
            line,
        )),
    }
}

/* ===================== Helpers ===================== */

const UNDEFINED: Val = Val::Undefined;

/// Positional argument, `undefined` when missing
pub fn arg(args: &[Val], idx: usize) -> &Val {
    args.get(idx).unwrap_or(&UNDEFINED)
}

