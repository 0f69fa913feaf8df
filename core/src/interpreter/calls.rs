//! Function calls
//!
//! Each call node is classified once into a closed set of call forms. The
//! form decides how the call is dispatched and traced; user closures push a
//! call frame and get a fresh environment parented at their definition site.

use super::describe::expr_text;
use super::env::{self, BindingKind, ScopeKind};
use super::expressions::{self, bind_pattern, eval_args, eval_expr, BindMode};
use super::heap::ObjectKind;
use super::promises;
use super::statements;
use super::stdlib::{self, ConsoleMethod, NativeFunc};
use super::tracer::{record, StepType};
use super::types::ast::{Element, Expr, ExprKind, FunctionBody, FunctionDef, MemberProp};
use super::types::{Control, EnvId, ExecResult, ObjId, Props, RuntimeError, Val};
use super::vm::VM;

/* ===================== Call Classification ===================== */

/// How a call expression is dispatched
#[derive(Debug, Clone)]
pub enum CallKind {
    /// `console.log(...)` and friends
    ConsoleCall(ConsoleMethod),
    /// `setTimeout`, `setInterval`, `clearTimeout`, `queueMicrotask`
    TimerSchedule(NativeFunc),
    /// `.then` / `.catch` / `.finally` on a promise
    PromiseThen { promise: ObjId, method: String },
    /// `Promise.resolve` / `Promise.reject`
    PromiseStatic(NativeFunc),
    /// Host method on a primitive, array, plain object or function
    HostMethod { receiver: Val, method: String },
    PlainCall { func: Val, this: Val },
}

fn classify_value(func: Val, this: Val) -> CallKind {
    match func {
        Val::Native(NativeFunc::Console(method)) => CallKind::ConsoleCall(method),
        Val::Native(
            f @ (NativeFunc::SetTimeout
            | NativeFunc::SetInterval
            | NativeFunc::ClearTimeout
            | NativeFunc::ClearInterval
            | NativeFunc::QueueMicrotask),
        ) => CallKind::TimerSchedule(f),
        Val::Native(f @ (NativeFunc::PromiseResolve | NativeFunc::PromiseReject)) => {
            CallKind::PromiseStatic(f)
        }
        func => CallKind::PlainCall { func, this },
    }
}

/// Resolve a callee expression into its call form
///
/// Returns `None` when an optional member chain (`a?.b()`) short-circuits.
pub fn classify(vm: &mut VM, env: EnvId, callee: &Expr) -> ExecResult<Option<CallKind>> {
    let line = callee.loc.line;
    let ExprKind::Member {
        object,
        property,
        optional,
    } = &callee.kind
    else {
        let func = eval_expr(vm, env, callee)?;
        return Ok(Some(classify_value(func, Val::Undefined)));
    };

    let receiver = eval_expr(vm, env, object)?;
    if *optional && receiver.is_nullish() {
        return Ok(None);
    }
    let key = match property {
        MemberProp::Static(name) => name.clone(),
        MemberProp::Computed(index) => {
            let key = eval_expr(vm, env, index)?;
            vm.to_js_string(&key)
        }
    };

    if let Val::Object(id) = receiver {
        if promises::is_promise(vm, &receiver) && matches!(key.as_str(), "then" | "catch" | "finally") {
            return Ok(Some(CallKind::PromiseThen {
                promise: id,
                method: key,
            }));
        }
    }
    if stdlib::has_method(vm, &receiver, &key) {
        return Ok(Some(CallKind::HostMethod {
            receiver,
            method: key,
        }));
    }

    let func = expressions::get_member(vm, &receiver, &key, line)?;
    Ok(Some(classify_value(func, receiver)))
}

/// Evaluate `callee(args)`
pub fn eval_call(
    vm: &mut VM,
    env: EnvId,
    callee: &Expr,
    args: &[Element],
    optional: bool,
    line: usize,
) -> ExecResult<Val> {
    let Some(kind) = classify(vm, env, callee)? else {
        return Ok(Val::Undefined);
    };
    if optional {
        if let CallKind::PlainCall { func, .. } = &kind {
            if func.is_nullish() {
                return Ok(Val::Undefined);
            }
        }
    }
    let args = eval_args(vm, env, args)?;

    match kind {
        CallKind::ConsoleCall(method) => stdlib::console::call(vm, method, &args, line),
        CallKind::TimerSchedule(f) | CallKind::PromiseStatic(f) => {
            stdlib::call_native(vm, f, args, line)
        }
        CallKind::PromiseThen { promise, method } => {
            promises::register(vm, promise, &method, args, line)
        }
        CallKind::HostMethod { receiver, method } => {
            stdlib::call_method(vm, receiver, &method, args, line)
        }
        CallKind::PlainCall { func, this } => {
            if !vm.is_callable(&func) {
                return Err(RuntimeError::type_misuse(
                    format!("{} is not a function", expr_text(callee)),
                    line,
                ));
            }
            call_function(vm, &func, this, args, line)
        }
    }
}

/* ===================== Invocation ===================== */

/// Call any callable value
pub fn call_function(vm: &mut VM, func: &Val, this: Val, args: Vec<Val>, line: usize) -> ExecResult<Val> {
    match func {
        Val::Native(f) => stdlib::call_native(vm, *f, args, line),
        Val::Builtin(b) => stdlib::call_builtin(vm, *b, args, line),
        Val::Object(id) => match &vm.heap.get(*id).kind {
            ObjectKind::Closure(_) => invoke_closure(vm, *id, this, args, line),
            ObjectKind::Bound {
                target,
                this: bound_this,
                args: bound_args,
            } => {
                let target = target.clone();
                let bound_this = bound_this.clone();
                let mut all = bound_args.clone();
                all.extend(args);
                call_function(vm, &target, bound_this, all, line)
            }
            ObjectKind::Method { receiver, name } => {
                let (receiver, name) = (receiver.clone(), name.clone());
                stdlib::call_method(vm, receiver, &name, args, line)
            }
            ObjectKind::Resolver { promise, reject } => {
                let (promise, reject) = (*promise, *reject);
                let value = args.into_iter().next().unwrap_or(Val::Undefined);
                Ok(promises::call_resolver(vm, promise, reject, value, line))
            }
            _ => Err(not_a_function(vm, func, line)),
        },
        _ => Err(not_a_function(vm, func, line)),
    }
}

fn not_a_function(vm: &VM, func: &Val, line: usize) -> RuntimeError {
    RuntimeError::type_misuse(format!("{} is not a function", vm.heap.inspect(func)), line)
}

/// Run a user closure: push frame, bind parameters, execute, pop frame
pub fn invoke_closure(vm: &mut VM, id: ObjId, this: Val, args: Vec<Val>, line: usize) -> ExecResult<Val> {
    let closure = match &vm.heap.get(id).kind {
        ObjectKind::Closure(c) => c.clone(),
        _ => return Err(not_a_function(vm, &Val::Object(id), line)),
    };
    vm.tick()?;
    let def = closure.def.clone();
    let name = display_name(&closure.name);
    let args_text = args
        .iter()
        .map(|a| vm.heap.inspect(a))
        .collect::<Vec<_>>()
        .join(", ");

    vm.push_frame(&name, line)?;

    let this_val = if def.is_arrow {
        None
    } else {
        Some(match this {
            Val::Undefined | Val::Null => Val::GlobalThis,
            other => other,
        })
    };
    let fn_env = env::create(
        vm,
        Some(closure.env),
        ScopeKind::Function(closure.name.clone()),
        this_val,
    );
    let caller_env = vm.current_env;
    vm.current_env = fn_env;

    // Named function expressions can refer to themselves.
    if !def.is_arrow && !closure.name.is_empty() && env::lookup(vm, closure.env, &closure.name).is_none() {
        env::define(vm, fn_env, &closure.name, Val::Object(id), BindingKind::Function);
    }

    let bound = bind_params(vm, fn_env, &def, args);
    record(
        vm,
        fn_env,
        line,
        StepType::FunctionCall,
        format!("Call {}({})", name, args_text),
    );
    let result = bound.and_then(|_| run_body(vm, fn_env, &def));

    match result {
        Ok(value) => {
            vm.pop_frame();
            vm.current_env = caller_env;
            let description = format!("{} returned {}", name, vm.heap.inspect(&value));
            record(vm, caller_env, line, StepType::FunctionReturn, description);
            Ok(value)
        }
        Err(err @ RuntimeError::UserThrow { .. }) => {
            vm.pop_frame();
            vm.current_env = caller_env;
            if let RuntimeError::UserThrow { message, .. } = &err {
                let description = format!("{} threw {}", name, message);
                record(vm, caller_env, line, StepType::FunctionReturn, description);
            }
            Err(err)
        }
        // Fatal errors leave the stack as it was for the terminal snapshot.
        Err(err) => Err(err),
    }
}

fn bind_params(vm: &mut VM, env: EnvId, def: &FunctionDef, args: Vec<Val>) -> ExecResult<()> {
    let line = def.loc.line;
    let mut args = args.into_iter();
    for param in &def.params {
        let mut value = args.next().unwrap_or(Val::Undefined);
        if value == Val::Undefined {
            if let Some(default) = &param.default {
                value = eval_expr(vm, env, default)?;
            }
        }
        bind_pattern(vm, env, &param.target, value, BindMode::Declare(BindingKind::Var), line)?;
    }
    if let Some(rest) = &def.rest {
        let remaining: Vec<Val> = args.collect();
        let value = vm.alloc_array(remaining);
        bind_pattern(vm, env, rest, value, BindMode::Declare(BindingKind::Var), line)?;
    }
    Ok(())
}

fn run_body(vm: &mut VM, env: EnvId, def: &FunctionDef) -> ExecResult<Val> {
    match &def.body {
        FunctionBody::Block(body) => {
            statements::hoist_function_scope(vm, env, body);
            match statements::exec_statements(vm, env, body)? {
                Control::Return(value) => Ok(value),
                _ => Ok(Val::Undefined),
            }
        }
        FunctionBody::Expr(expr) => eval_expr(vm, env, expr),
    }
}

/* ===================== Construction ===================== */

/// Evaluate `new callee(args)`
pub fn eval_new(vm: &mut VM, env: EnvId, callee: &Expr, args: &[Element], line: usize) -> ExecResult<Val> {
    let ctor = eval_expr(vm, env, callee)?;
    let args = eval_args(vm, env, args)?;

    match &ctor {
        Val::Builtin(builtin) => stdlib::construct(vm, *builtin, args, line),
        Val::Object(id) => {
            let class = match &vm.heap.get(*id).kind {
                ObjectKind::Closure(c) if !c.def.is_arrow => c.name.clone(),
                _ => return Err(not_a_constructor(callee, line)),
            };
            let instance = vm.heap.alloc(ObjectKind::Object(Props::new()));
            if !class.is_empty() {
                vm.heap.get_mut(instance).class = Some(class);
            }
            let result = invoke_closure(vm, *id, Val::Object(instance), args, line)?;
            match result {
                Val::Object(rid) if vm.heap.get(rid).is_data() => Ok(result),
                _ => Ok(Val::Object(instance)),
            }
        }
        _ => Err(not_a_constructor(callee, line)),
    }
}

fn not_a_constructor(callee: &Expr, line: usize) -> RuntimeError {
    RuntimeError::type_misuse(format!("{} is not a constructor", expr_text(callee)), line)
}

/* ===================== Naming ===================== */

fn display_name(name: &str) -> String {
    if name.is_empty() {
        "(anonymous)".to_string()
    } else {
        name.to_string()
    }
}

/// Short name of a callable for queue labels and descriptions
pub fn function_name(vm: &VM, func: &Val) -> String {
    match func {
        Val::Native(f) => f.name().to_string(),
        Val::Builtin(b) => b.name().to_string(),
        Val::Object(id) => match &vm.heap.get(*id).kind {
            ObjectKind::Closure(c) if !c.name.is_empty() => c.name.clone(),
            ObjectKind::Bound { target, .. } => format!("bound {}", function_name(vm, target)),
            ObjectKind::Method { name, .. } => name.clone(),
            ObjectKind::Resolver { reject, .. } => {
                if *reject { "reject" } else { "resolve" }.to_string()
            }
            _ => "anonymous".to_string(),
        },
        _ => "anonymous".to_string(),
    }
}
