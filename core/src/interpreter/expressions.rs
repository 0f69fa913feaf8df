//! Expression evaluation
//!
//! Evaluates expressions to values against an environment. Side effects
//! (allocation, binding updates, calls) happen here; step recording is left
//! to the statement layer and to the call machinery.

use std::rc::Rc;

use super::calls;
use super::describe::expr_text;
use super::env::{self, BindingKind};
use super::heap::{Closure, ObjectKind};
use super::stdlib::{self, array, number, object, string, Builtin, ErrorKind};
use super::types::ast::{
    AssignOp, BinaryOp, Element, FunctionDef, LogicalOp, MemberProp, ObjectProp, PatternElem,
    PropKey, UnaryOp, UpdateOp,
};
use super::types::values::array_index;
use super::types::{EnvId, ExecResult, Expr, ExprKind, ObjId, Pattern, Props, RuntimeError, Val};
use super::vm::{strict_equals, VM};

/* ===================== Expression Evaluation ===================== */

/// Evaluate an expression to a value
pub fn eval_expr(vm: &mut VM, env: EnvId, expr: &Expr) -> ExecResult<Val> {
    let line = expr.loc.line;
    match &expr.kind {
        ExprKind::Num(n) => Ok(Val::Num(*n)),
        ExprKind::Str(s) => Ok(Val::Str(s.clone())),
        ExprKind::Bool(b) => Ok(Val::Bool(*b)),
        ExprKind::Null => Ok(Val::Null),

        ExprKind::Template { quasis, exprs } => {
            let mut out = String::new();
            for (i, quasi) in quasis.iter().enumerate() {
                out.push_str(quasi);
                if let Some(e) = exprs.get(i) {
                    let v = eval_expr(vm, env, e)?;
                    out.push_str(&vm.to_js_string(&v));
                    vm.check_string_length(out.len(), line)?;
                }
            }
            Ok(Val::Str(out))
        }

        ExprKind::Ident(name) => env::get(vm, env, name, line),
        ExprKind::This => Ok(env::this_value(vm, env)),

        ExprKind::Array(elements) => {
            let items = eval_args(vm, env, elements)?;
            Ok(vm.alloc_array(items))
        }
        ExprKind::Object(props) => eval_object(vm, env, props),
        ExprKind::Function(def) => Ok(make_closure(vm, env, def, "")),

        ExprKind::Unary { op, arg } => eval_unary(vm, env, *op, arg, line),
        ExprKind::Update { op, prefix, target } => {
            let reference = resolve_ref(vm, env, target)?;
            let current = read_ref(vm, env, &reference, line)?;
            let old = vm.to_number(&current);
            let new = match op {
                UpdateOp::Inc => old + 1.0,
                UpdateOp::Dec => old - 1.0,
            };
            write_ref(vm, env, reference, Val::Num(new), line)?;
            Ok(Val::Num(if *prefix { new } else { old }))
        }

        ExprKind::Binary { op, left, right } => {
            let l = eval_expr(vm, env, left)?;
            let r = eval_expr(vm, env, right)?;
            binary_op(vm, *op, &l, &r, line)
        }
        ExprKind::Logical { op, left, right } => {
            let l = eval_expr(vm, env, left)?;
            if short_circuits(*op, &l) {
                return Ok(l);
            }
            eval_expr(vm, env, right)
        }
        ExprKind::Assign { op, target, value } => eval_assign(vm, env, *op, target, value, line),
        ExprKind::Conditional {
            test,
            consequent,
            alternate,
        } => {
            if eval_expr(vm, env, test)?.is_truthy() {
                eval_expr(vm, env, consequent)
            } else {
                eval_expr(vm, env, alternate)
            }
        }

        ExprKind::Call {
            callee,
            args,
            optional,
        } => calls::eval_call(vm, env, callee, args, *optional, line),
        ExprKind::New { callee, args } => calls::eval_new(vm, env, callee, args, line),

        ExprKind::Member {
            object,
            property,
            optional,
        } => {
            let receiver = eval_expr(vm, env, object)?;
            if *optional && receiver.is_nullish() {
                return Ok(Val::Undefined);
            }
            let key = member_key(vm, env, property)?;
            get_member(vm, &receiver, &key, line)
        }

        ExprKind::Sequence(items) => {
            let mut last = Val::Undefined;
            for item in items {
                last = eval_expr(vm, env, item)?;
            }
            Ok(last)
        }
    }
}

/// Evaluate an initializer, naming anonymous functions after their binding
pub fn eval_named(vm: &mut VM, env: EnvId, expr: &Expr, name: &str) -> ExecResult<Val> {
    match &expr.kind {
        ExprKind::Function(def) if def.name.is_none() => Ok(make_closure(vm, env, def, name)),
        _ => eval_expr(vm, env, expr),
    }
}

/// Allocate a closure over `env`
pub fn make_closure(vm: &mut VM, env: EnvId, def: &Rc<FunctionDef>, inferred: &str) -> Val {
    let name = def.name.clone().unwrap_or_else(|| inferred.to_string());
    vm.alloc(ObjectKind::Closure(Closure {
        name,
        def: Rc::clone(def),
        env,
    }))
}

/// Evaluate call arguments or array elements, expanding spreads
pub fn eval_args(vm: &mut VM, env: EnvId, elements: &[Element]) -> ExecResult<Vec<Val>> {
    let mut out = Vec::with_capacity(elements.len());
    for element in elements {
        match element {
            Element::Expr(e) => out.push(eval_expr(vm, env, e)?),
            Element::Spread(e) => {
                let v = eval_expr(vm, env, e)?;
                let items = vm.iterate(&v, e.loc.line)?;
                vm.check_array_length(out.len() + items.len(), e.loc.line)?;
                out.extend(items);
            }
        }
    }
    Ok(out)
}

fn eval_object(vm: &mut VM, env: EnvId, props: &[ObjectProp]) -> ExecResult<Val> {
    let mut out = Props::new();
    for prop in props {
        match prop {
            ObjectProp::KeyValue(key, value) => {
                let key = prop_key(vm, env, key)?;
                let value = eval_named(vm, env, value, &key)?;
                out.set(key, value);
            }
            ObjectProp::Spread(source) => {
                let source = eval_expr(vm, env, source)?;
                for (k, v) in own_entries(vm, &source) {
                    out.set(k, v);
                }
            }
        }
    }
    Ok(vm.alloc_object(out))
}

/// Enumerable own `[key, value]` pairs of a value (spread, `Object.keys`)
pub fn own_entries(vm: &VM, val: &Val) -> Vec<(String, Val)> {
    match val {
        Val::Object(id) => match &vm.heap.get(*id).kind {
            ObjectKind::Object(props) => props.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            ObjectKind::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v.clone()))
                .collect(),
            _ => Vec::new(),
        },
        Val::Str(s) => s
            .chars()
            .enumerate()
            .map(|(i, c)| (i.to_string(), Val::Str(c.to_string())))
            .collect(),
        _ => Vec::new(),
    }
}

fn prop_key(vm: &mut VM, env: EnvId, key: &PropKey) -> ExecResult<String> {
    match key {
        PropKey::Static(name) => Ok(name.clone()),
        PropKey::Computed(e) => {
            let v = eval_expr(vm, env, e)?;
            Ok(vm.to_js_string(&v))
        }
    }
}

fn member_key(vm: &mut VM, env: EnvId, property: &MemberProp) -> ExecResult<String> {
    match property {
        MemberProp::Static(name) => Ok(name.clone()),
        MemberProp::Computed(e) => {
            let v = eval_expr(vm, env, e)?;
            Ok(vm.to_js_string(&v))
        }
    }
}

/* ===================== Operators ===================== */

fn short_circuits(op: LogicalOp, left: &Val) -> bool {
    match op {
        LogicalOp::And => !left.is_truthy(),
        LogicalOp::Or => left.is_truthy(),
        LogicalOp::Nullish => !left.is_nullish(),
    }
}

fn eval_unary(vm: &mut VM, env: EnvId, op: UnaryOp, arg: &Expr, line: usize) -> ExecResult<Val> {
    match op {
        UnaryOp::Typeof => {
            if let ExprKind::Ident(name) = &arg.kind {
                if !env::has(vm, env, name) {
                    return Ok(Val::str("undefined"));
                }
            }
            let v = eval_expr(vm, env, arg)?;
            Ok(Val::str(vm.type_of(&v)))
        }
        UnaryOp::Delete => match &arg.kind {
            ExprKind::Member { .. } => {
                if let Reference::Property(target, key) = resolve_ref(vm, env, arg)? {
                    delete_member(vm, &target, &key);
                }
                Ok(Val::Bool(true))
            }
            ExprKind::Ident(_) => Ok(Val::Bool(false)),
            _ => {
                eval_expr(vm, env, arg)?;
                Ok(Val::Bool(true))
            }
        },
        _ => {
            let v = eval_expr(vm, env, arg)?;
            Ok(match op {
                UnaryOp::Not => Val::Bool(!v.is_truthy()),
                UnaryOp::Neg => Val::Num(-vm.to_number(&v)),
                UnaryOp::Plus => Val::Num(vm.to_number(&v)),
                UnaryOp::BitNot => Val::Num(f64::from(!to_int32(vm.to_number(&v)))),
                UnaryOp::Void => Val::Undefined,
                UnaryOp::Typeof | UnaryOp::Delete => {
                    return Err(RuntimeError::type_misuse("invalid unary operator", line))
                }
            })
        }
    }
}

fn to_int32(n: f64) -> i32 {
    if !n.is_finite() {
        return 0;
    }
    let wrapped = n.trunc().rem_euclid(4_294_967_296.0);
    wrapped as u64 as u32 as i32
}

/// Apply a binary operator to two evaluated operands
pub fn binary_op(vm: &mut VM, op: BinaryOp, l: &Val, r: &Val, line: usize) -> ExecResult<Val> {
    let (a, b) = (vm.to_number(l), vm.to_number(r));
    let val = match op {
        BinaryOp::Add => {
            if concatenates(l) || concatenates(r) {
                let (x, y) = (vm.to_js_string(l), vm.to_js_string(r));
                vm.check_string_length(x.len() + y.len(), line)?;
                Val::Str(x + &y)
            } else {
                Val::Num(a + b)
            }
        }
        BinaryOp::Sub => Val::Num(a - b),
        BinaryOp::Mul => Val::Num(a * b),
        BinaryOp::Div => Val::Num(a / b),
        BinaryOp::Rem => Val::Num(a % b),
        BinaryOp::Exp if b.is_nan() => Val::Num(f64::NAN),
        BinaryOp::Exp => Val::Num(a.powf(b)),
        BinaryOp::StrictEq => Val::Bool(strict_equals(l, r)),
        BinaryOp::StrictNe => Val::Bool(!strict_equals(l, r)),
        BinaryOp::LooseEq => Val::Bool(vm.loose_equals(l, r)),
        BinaryOp::LooseNe => Val::Bool(!vm.loose_equals(l, r)),
        BinaryOp::Lt => Val::Bool(compare(vm, l, r).map_or(false, |o| o.is_lt())),
        BinaryOp::Gt => Val::Bool(compare(vm, l, r).map_or(false, |o| o.is_gt())),
        BinaryOp::Le => Val::Bool(compare(vm, l, r).map_or(false, |o| o.is_le())),
        BinaryOp::Ge => Val::Bool(compare(vm, l, r).map_or(false, |o| o.is_ge())),
        BinaryOp::Instanceof => Val::Bool(instance_of(vm, l, r, line)?),
        BinaryOp::In => Val::Bool(has_property(vm, l, r, line)?),
    };
    Ok(val)
}

/// `+` switches to concatenation for strings and non-primitive values
fn concatenates(v: &Val) -> bool {
    matches!(
        v,
        Val::Str(_) | Val::Object(_) | Val::Native(_) | Val::Builtin(_) | Val::GlobalThis
    )
}

fn compare(vm: &VM, l: &Val, r: &Val) -> Option<std::cmp::Ordering> {
    match (l, r) {
        (Val::Str(a), Val::Str(b)) => Some(a.cmp(b)),
        _ => vm.to_number(l).partial_cmp(&vm.to_number(r)),
    }
}

fn instance_of(vm: &VM, l: &Val, r: &Val, line: usize) -> ExecResult<bool> {
    if !vm.is_callable(r) {
        return Err(RuntimeError::type_misuse(
            "Right-hand side of 'instanceof' is not callable",
            line,
        ));
    }
    let Val::Object(id) = l else {
        return Ok(false);
    };
    let obj = vm.heap.get(*id);
    let matched = match r {
        Val::Builtin(Builtin::Object) => true,
        Val::Builtin(Builtin::Array) => matches!(obj.kind, ObjectKind::Array(_)),
        Val::Builtin(Builtin::Promise) => matches!(obj.kind, ObjectKind::Promise(_)),
        Val::Builtin(Builtin::Error(ErrorKind::Error)) => obj
            .class
            .as_deref()
            .map_or(false, super::heap::is_error_class),
        Val::Builtin(Builtin::Error(kind)) => obj.class.as_deref() == Some(kind.name()),
        Val::Object(ctor) => match &vm.heap.get(*ctor).kind {
            ObjectKind::Closure(c) => !c.name.is_empty() && obj.class.as_deref() == Some(c.name.as_str()),
            _ => false,
        },
        _ => false,
    };
    Ok(matched)
}

fn has_property(vm: &VM, l: &Val, r: &Val, line: usize) -> ExecResult<bool> {
    let key = vm.to_js_string(l);
    match r {
        Val::Object(id) => Ok(match &vm.heap.get(*id).kind {
            ObjectKind::Object(props) => props.contains(&key),
            ObjectKind::Array(items) => {
                key == "length" || array_index(&key).map_or(false, |i| i < items.len())
            }
            _ => false,
        }),
        Val::GlobalThis => Ok(env::has(vm, vm.global_env, &key)),
        Val::Builtin(b) => Ok(stdlib::builtin_member(*b, &key) != Val::Undefined),
        _ => Err(RuntimeError::type_misuse(
            format!(
                "Cannot use 'in' operator to search for '{}' in {}",
                key,
                vm.heap.inspect(r)
            ),
            line,
        )),
    }
}

/* ===================== Assignment ===================== */

/// Resolved assignment target
enum Reference {
    Binding(String),
    Property(Val, String),
}

fn resolve_ref(vm: &mut VM, env: EnvId, target: &Expr) -> ExecResult<Reference> {
    match &target.kind {
        ExprKind::Ident(name) => Ok(Reference::Binding(name.clone())),
        ExprKind::Member {
            object, property, ..
        } => {
            let receiver = eval_expr(vm, env, object)?;
            let key = member_key(vm, env, property)?;
            Ok(Reference::Property(receiver, key))
        }
        _ => Err(RuntimeError::type_misuse(
            format!("Invalid assignment target: {}", expr_text(target)),
            target.loc.line,
        )),
    }
}

fn pattern_ref(vm: &mut VM, env: EnvId, target: &Pattern, line: usize) -> ExecResult<Reference> {
    match target {
        Pattern::Ident(name) => Ok(Reference::Binding(name.clone())),
        Pattern::Member(expr) => resolve_ref(vm, env, expr),
        _ => Err(RuntimeError::type_misuse(
            "Invalid left-hand side in compound assignment",
            line,
        )),
    }
}

fn read_ref(vm: &mut VM, env: EnvId, reference: &Reference, line: usize) -> ExecResult<Val> {
    match reference {
        Reference::Binding(name) => env::get(vm, env, name, line),
        Reference::Property(receiver, key) => get_member(vm, receiver, key, line),
    }
}

fn write_ref(vm: &mut VM, env: EnvId, reference: Reference, value: Val, line: usize) -> ExecResult<()> {
    match reference {
        Reference::Binding(name) => env::set(vm, env, &name, value, line),
        Reference::Property(receiver, key) => set_member(vm, &receiver, &key, value, line),
    }
}

fn eval_assign(
    vm: &mut VM,
    env: EnvId,
    op: AssignOp,
    target: &Pattern,
    value: &Expr,
    line: usize,
) -> ExecResult<Val> {
    match op {
        AssignOp::Assign => {
            let v = match target {
                Pattern::Ident(name) => eval_named(vm, env, value, name)?,
                _ => eval_expr(vm, env, value)?,
            };
            bind_pattern(vm, env, target, v.clone(), BindMode::Assign, line)?;
            Ok(v)
        }
        AssignOp::Compound(bop) => {
            let reference = pattern_ref(vm, env, target, line)?;
            let current = read_ref(vm, env, &reference, line)?;
            let rhs = eval_expr(vm, env, value)?;
            let result = binary_op(vm, bop, &current, &rhs, line)?;
            write_ref(vm, env, reference, result.clone(), line)?;
            Ok(result)
        }
        AssignOp::Logical(lop) => {
            let reference = pattern_ref(vm, env, target, line)?;
            let current = read_ref(vm, env, &reference, line)?;
            if short_circuits(lop, &current) {
                return Ok(current);
            }
            let v = eval_expr(vm, env, value)?;
            write_ref(vm, env, reference, v.clone(), line)?;
            Ok(v)
        }
    }
}

/* ===================== Patterns ===================== */

/// How a pattern writes its names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindMode {
    /// Create bindings in the given scope
    Declare(BindingKind),
    /// Update existing bindings (or properties) through the scope chain
    Assign,
}

/// Bind `value` to `pattern`, destructuring arrays and objects
pub fn bind_pattern(
    vm: &mut VM,
    env: EnvId,
    pattern: &Pattern,
    value: Val,
    mode: BindMode,
    line: usize,
) -> ExecResult<()> {
    match pattern {
        Pattern::Ident(name) => match mode {
            BindMode::Declare(kind) => {
                env::define(vm, env, name, value, kind);
                Ok(())
            }
            BindMode::Assign => env::set(vm, env, name, value, line),
        },
        Pattern::Member(expr) => {
            let reference = resolve_ref(vm, env, expr)?;
            write_ref(vm, env, reference, value, line)
        }
        Pattern::Array { elements, rest } => {
            let items = vm.iterate(&value, line)?;
            for (i, elem) in elements.iter().enumerate() {
                if let Some(elem) = elem {
                    let item = items.get(i).cloned().unwrap_or(Val::Undefined);
                    bind_elem(vm, env, elem, item, mode, line)?;
                }
            }
            if let Some(rest) = rest {
                let remaining = items.get(elements.len()..).unwrap_or_default().to_vec();
                let rest_val = vm.alloc_array(remaining);
                bind_pattern(vm, env, rest, rest_val, mode, line)?;
            }
            Ok(())
        }
        Pattern::Object { props, rest } => {
            if value.is_nullish() {
                return Err(RuntimeError::type_misuse(
                    format!(
                        "Cannot destructure '{}' as it is {}.",
                        vm.heap.inspect(&value),
                        vm.heap.inspect(&value)
                    ),
                    line,
                ));
            }
            let mut used = Vec::with_capacity(props.len());
            for (key, elem) in props {
                let key = prop_key(vm, env, key)?;
                let item = get_member(vm, &value, &key, line)?;
                bind_elem(vm, env, elem, item, mode, line)?;
                used.push(key);
            }
            if let Some(rest) = rest {
                let remaining: Props = own_entries(vm, &value)
                    .into_iter()
                    .filter(|(k, _)| !used.contains(k))
                    .collect();
                let rest_val = vm.alloc_object(remaining);
                bind_pattern(vm, env, rest, rest_val, mode, line)?;
            }
            Ok(())
        }
    }
}

fn bind_elem(
    vm: &mut VM,
    env: EnvId,
    elem: &PatternElem,
    value: Val,
    mode: BindMode,
    line: usize,
) -> ExecResult<()> {
    let value = match (&value, &elem.default) {
        (Val::Undefined, Some(default)) => match &elem.target {
            Pattern::Ident(name) => eval_named(vm, env, default, name)?,
            _ => eval_expr(vm, env, default)?,
        },
        _ => value,
    };
    bind_pattern(vm, env, &elem.target, value, mode, line)
}

/* ===================== Member Access ===================== */

fn method_value(vm: &mut VM, receiver: &Val, name: &str) -> Val {
    vm.alloc(ObjectKind::Method {
        receiver: receiver.clone(),
        name: name.to_string(),
    })
}

/// Read `receiver[key]`
pub fn get_member(vm: &mut VM, receiver: &Val, key: &str, line: usize) -> ExecResult<Val> {
    match receiver {
        Val::Undefined | Val::Null => Err(RuntimeError::type_misuse(
            format!(
                "Cannot read properties of {} (reading '{}')",
                vm.heap.inspect(receiver),
                key
            ),
            line,
        )),
        Val::Str(s) => {
            if key == "length" {
                return Ok(Val::Num(s.chars().count() as f64));
            }
            if let Some(idx) = array_index(key) {
                return Ok(s
                    .chars()
                    .nth(idx)
                    .map_or(Val::Undefined, |c| Val::Str(c.to_string())));
            }
            if string::is_method(key) {
                return Ok(method_value(vm, receiver, key));
            }
            Ok(Val::Undefined)
        }
        Val::Num(_) if number::is_method(key) => Ok(method_value(vm, receiver, key)),
        Val::Num(_) | Val::Bool(_) => Ok(Val::Undefined),
        Val::Builtin(b) => Ok(stdlib::builtin_member(*b, key)),
        Val::Native(f) => match key {
            "name" => Ok(Val::str(f.name())),
            "call" | "apply" | "bind" => Ok(method_value(vm, receiver, key)),
            _ => Ok(Val::Undefined),
        },
        Val::GlobalThis => Ok(env::lookup(vm, vm.global_env, key)
            .or_else(|| stdlib::global(key))
            .unwrap_or(Val::Undefined)),
        Val::Object(id) => {
            let found = match &vm.heap.get(*id).kind {
                ObjectKind::Object(props) => match props.get(key) {
                    Some(v) => Some(v.clone()),
                    None if object::is_method(key) => None,
                    None => Some(Val::Undefined),
                },
                ObjectKind::Array(items) => {
                    if key == "length" {
                        Some(Val::Num(items.len() as f64))
                    } else if let Some(idx) = array_index(key) {
                        Some(items.get(idx).cloned().unwrap_or(Val::Undefined))
                    } else if array::is_method(key) {
                        None
                    } else {
                        Some(Val::Undefined)
                    }
                }
                ObjectKind::Closure(c) => match key {
                    "name" => Some(Val::str(c.name.clone())),
                    "length" => Some(Val::Num(c.def.params.len() as f64)),
                    "call" | "apply" | "bind" => None,
                    _ => Some(Val::Undefined),
                },
                ObjectKind::Promise(_) => match key {
                    "then" | "catch" | "finally" => None,
                    _ => Some(Val::Undefined),
                },
                _ => match key {
                    "name" => Some(Val::str(calls::function_name(vm, receiver))),
                    "call" | "apply" | "bind" => None,
                    _ => Some(Val::Undefined),
                },
            };
            Ok(match found {
                Some(v) => v,
                None => method_value(vm, receiver, key),
            })
        }
    }
}

/// Write `receiver[key] = value`
pub fn set_member(vm: &mut VM, receiver: &Val, key: &str, value: Val, line: usize) -> ExecResult<()> {
    match receiver {
        Val::Undefined | Val::Null => Err(RuntimeError::type_misuse(
            format!(
                "Cannot set properties of {} (setting '{}')",
                vm.heap.inspect(receiver),
                key
            ),
            line,
        )),
        Val::GlobalThis => {
            let global = vm.global_env;
            env::set(vm, global, key, value, line)
        }
        Val::Object(id) => {
            let obj = vm.heap.get(*id);
            if obj.frozen {
                return Ok(());
            }
            if matches!(obj.kind, ObjectKind::Array(_)) {
                return set_array_slot(vm, *id, key, value, line);
            }
            if let ObjectKind::Object(props) = &mut vm.heap.get_mut(*id).kind {
                props.set(key, value);
            }
            Ok(())
        }
        // Writes to primitives and host objects are silently dropped.
        _ => Ok(()),
    }
}

/// `arr.length = n` or `arr[i] = v`; growth pads with `undefined`
fn set_array_slot(vm: &mut VM, id: ObjId, key: &str, value: Val, line: usize) -> ExecResult<()> {
    let (new_len, slot) = if key == "length" {
        (array_length(vm, &value, line)?, None)
    } else if let Some(idx) = array_index(key) {
        let len = idx.saturating_add(1);
        vm.check_array_length(len, line)?;
        (len, Some(idx))
    } else {
        return Ok(());
    };

    if let ObjectKind::Array(items) = &mut vm.heap.get_mut(id).kind {
        match slot {
            None => items.resize(new_len, Val::Undefined),
            Some(idx) => {
                if idx >= items.len() {
                    items.resize(new_len, Val::Undefined);
                }
                items[idx] = value;
            }
        }
    }
    Ok(())
}

/// Validate a length given to `arr.length = n` or `new Array(n)`
pub fn array_length(vm: &mut VM, value: &Val, line: usize) -> ExecResult<usize> {
    match value {
        Val::Num(n) if *n >= 0.0 && n.fract() == 0.0 && *n <= f64::from(u32::MAX) => {
            let len = *n as usize;
            vm.check_array_length(len, line)?;
            Ok(len)
        }
        _ => Err(vm.throw_error(ErrorKind::RangeError, "Invalid array length", line)),
    }
}

fn delete_member(vm: &mut VM, receiver: &Val, key: &str) {
    if let Val::Object(id) = receiver {
        let obj = vm.heap.get_mut(*id);
        if obj.frozen {
            return;
        }
        match &mut obj.kind {
            ObjectKind::Object(props) => {
                props.remove(key);
            }
            ObjectKind::Array(items) => {
                if let Some(slot) = array_index(key).and_then(|i| items.get_mut(i)) {
                    *slot = Val::Undefined;
                }
            }
            _ => {}
        }
    }
}
