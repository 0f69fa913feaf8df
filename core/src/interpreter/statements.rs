//! Statement execution
//!
//! Every statement returns a [`Control`] signal that its caller checks.
//! Thrown values ride the `Err` side, so `?` unwinds them to the nearest
//! `try`. The step counter is charged once per statement and once per loop
//! iteration.

use super::describe::{expr_text, pattern_text};
use super::env::{self, BindingKind, ScopeKind};
use super::expressions::{bind_pattern, eval_expr, eval_named, make_closure, own_entries, BindMode};
use super::tracer::{record, StepType};
use super::types::ast::{
    AssignOp, CatchClause, DeclKind, Declarator, ForEachMode, ForInit, SwitchCase, UpdateOp,
};
use super::types::{Control, EnvId, ExecResult, Expr, ExprKind, Pattern, RuntimeError, Stmt, StmtKind, Val};
use super::vm::{strict_equals, VM};

/* ===================== Hoisting ===================== */

/// Pre-bind a function body (or the program): every `var` reachable without
/// crossing a function boundary, then the top-level function declarations
pub fn hoist_function_scope(vm: &mut VM, env: EnvId, body: &[Stmt]) {
    let mut names = Vec::new();
    collect_vars(body, &mut names);
    for name in names {
        if !env::has_own(vm, env, &name) {
            env::define(vm, env, &name, Val::Undefined, BindingKind::Var);
        }
    }
    hoist_block(vm, env, body);
}

/// Pre-bind the function declarations at the top level of a block
pub fn hoist_block(vm: &mut VM, env: EnvId, body: &[Stmt]) {
    for stmt in body {
        if let StmtKind::FunctionDecl(def) = &stmt.kind {
            let closure = make_closure(vm, env, def, "");
            let name = def.name.clone().unwrap_or_default();
            env::define(vm, env, &name, closure, BindingKind::Function);
        }
    }
}

fn collect_vars(body: &[Stmt], out: &mut Vec<String>) {
    for stmt in body {
        collect_stmt_vars(stmt, out);
    }
}

fn push_names(pattern: &Pattern, out: &mut Vec<String>) {
    for name in pattern.bound_names() {
        if !out.contains(&name) {
            out.push(name);
        }
    }
}

fn push_decls(declarations: &[Declarator], out: &mut Vec<String>) {
    for decl in declarations {
        push_names(&decl.target, out);
    }
}

fn collect_stmt_vars(stmt: &Stmt, out: &mut Vec<String>) {
    match &stmt.kind {
        StmtKind::VarDecl {
            kind: DeclKind::Var,
            declarations,
        } => push_decls(declarations, out),
        StmtKind::If {
            consequent,
            alternate,
            ..
        } => {
            collect_stmt_vars(consequent, out);
            if let Some(alt) = alternate {
                collect_stmt_vars(alt, out);
            }
        }
        StmtKind::For { init, body, .. } => {
            if let Some(ForInit::Decl {
                kind: DeclKind::Var,
                declarations,
            }) = init
            {
                push_decls(declarations, out);
            }
            collect_stmt_vars(body, out);
        }
        StmtKind::ForEach {
            decl, target, body, ..
        } => {
            if *decl == Some(DeclKind::Var) {
                push_names(target, out);
            }
            collect_stmt_vars(body, out);
        }
        StmtKind::While { body, .. }
        | StmtKind::DoWhile { body, .. }
        | StmtKind::Labeled { body, .. } => collect_stmt_vars(body, out),
        StmtKind::Try {
            block,
            handler,
            finalizer,
        } => {
            collect_vars(block, out);
            if let Some(handler) = handler {
                collect_vars(&handler.body, out);
            }
            if let Some(finalizer) = finalizer {
                collect_vars(finalizer, out);
            }
        }
        StmtKind::Switch { cases, .. } => {
            for case in cases {
                collect_vars(&case.body, out);
            }
        }
        StmtKind::Block { body } => collect_vars(body, out),
        _ => {}
    }
}

/* ===================== Statement Dispatch ===================== */

/// Execute statements in order, stopping at the first abrupt completion
pub fn exec_statements(vm: &mut VM, env: EnvId, body: &[Stmt]) -> ExecResult<Control> {
    for stmt in body {
        let control = exec_stmt(vm, env, stmt)?;
        if control.is_abrupt() {
            return Ok(control);
        }
    }
    Ok(Control::normal())
}

pub fn exec_stmt(vm: &mut VM, env: EnvId, stmt: &Stmt) -> ExecResult<Control> {
    exec_labeled(vm, env, stmt, None)
}

fn exec_labeled(vm: &mut VM, env: EnvId, stmt: &Stmt, label: Option<&str>) -> ExecResult<Control> {
    vm.tick()?;
    vm.current_env = env;
    let line = stmt.loc.line;

    match &stmt.kind {
        StmtKind::VarDecl { kind, declarations } => {
            for decl in declarations {
                execute_declarator(vm, env, *kind, decl, line)?;
            }
            Ok(Control::normal())
        }
        StmtKind::FunctionDecl(def) => {
            let name = def.name.clone().unwrap_or_default();
            record(
                vm,
                env,
                line,
                StepType::Declaration,
                format!("function {} declared (hoisted)", name),
            );
            Ok(Control::normal())
        }
        StmtKind::Return { value } => {
            let value = match value {
                Some(e) => eval_expr(vm, env, e)?,
                None => Val::Undefined,
            };
            let description = format!("return {}", vm.heap.inspect(&value));
            record(vm, env, line, StepType::Return, description);
            Ok(Control::Return(value))
        }
        StmtKind::If {
            test,
            consequent,
            alternate,
        } => {
            let passed = eval_expr(vm, env, test)?.is_truthy();
            record(
                vm,
                env,
                line,
                StepType::Condition,
                format!("if ({}) is {}", expr_text(test), passed),
            );
            if passed {
                exec_stmt(vm, env, consequent)
            } else if let Some(alt) = alternate {
                exec_stmt(vm, env, alt)
            } else {
                Ok(Control::normal())
            }
        }
        StmtKind::For {
            init,
            test,
            update,
            body,
        } => execute_for(vm, env, init.as_ref(), test.as_ref(), update.as_ref(), body, label),
        StmtKind::ForEach {
            mode,
            decl,
            target,
            iterable,
            body,
        } => execute_for_each(vm, env, *mode, *decl, target, iterable, body, label),
        StmtKind::While { test, body } => {
            loop {
                vm.tick()?;
                let passed = eval_expr(vm, env, test)?.is_truthy();
                record(
                    vm,
                    env,
                    line,
                    StepType::Loop,
                    format!("while ({}) is {}", expr_text(test), passed),
                );
                if !passed {
                    break;
                }
                match loop_flow(exec_stmt(vm, env, body)?, label) {
                    Flow::Next => {}
                    Flow::Break => break,
                    Flow::Exit(control) => return Ok(control),
                }
            }
            Ok(Control::normal())
        }
        StmtKind::DoWhile { body, test } => {
            loop {
                vm.tick()?;
                match loop_flow(exec_stmt(vm, env, body)?, label) {
                    Flow::Next => {}
                    Flow::Break => break,
                    Flow::Exit(control) => return Ok(control),
                }
                let passed = eval_expr(vm, env, test)?.is_truthy();
                record(
                    vm,
                    env,
                    line,
                    StepType::Loop,
                    format!("do...while ({}) is {}", expr_text(test), passed),
                );
                if !passed {
                    break;
                }
            }
            Ok(Control::normal())
        }
        StmtKind::Break { label: target } => {
            let description = match target {
                Some(l) => format!("break {}", l),
                None => "break".to_string(),
            };
            record(vm, env, line, StepType::Break, description);
            Ok(Control::Break(target.clone()))
        }
        StmtKind::Continue { label: target } => {
            let description = match target {
                Some(l) => format!("continue {}", l),
                None => "continue".to_string(),
            };
            record(vm, env, line, StepType::Continue, description);
            Ok(Control::Continue(target.clone()))
        }
        StmtKind::Throw { value } => {
            let value = eval_expr(vm, env, value)?;
            let description = format!("throw {}", vm.heap.inspect(&value));
            record(vm, env, line, StepType::Throw, description);
            Err(vm.throw_value(value, line))
        }
        StmtKind::Try {
            block,
            handler,
            finalizer,
        } => execute_try(vm, env, block, handler.as_ref(), finalizer.as_deref(), line),
        StmtKind::Switch {
            discriminant,
            cases,
        } => execute_switch(vm, env, discriminant, cases, line),
        StmtKind::Labeled { label: name, body } => {
            match exec_labeled(vm, env, body, Some(name))? {
                Control::Break(Some(l)) if &l == name => Ok(Control::normal()),
                control => Ok(control),
            }
        }
        StmtKind::Block { body } => execute_block(vm, env, body, ScopeKind::Block),
        StmtKind::Expr { expr } => execute_expression(vm, env, stmt, expr),
        StmtKind::Empty => Ok(Control::normal()),
    }
}

/* ===================== Declarations & Expressions ===================== */

fn execute_declarator(
    vm: &mut VM,
    env: EnvId,
    kind: DeclKind,
    decl: &Declarator,
    line: usize,
) -> ExecResult<()> {
    let target = pattern_text(&decl.target);
    let value = match (&decl.init, &decl.target) {
        (Some(init), Pattern::Ident(name)) => eval_named(vm, env, init, name)?,
        (Some(init), _) => eval_expr(vm, env, init)?,
        // `var x;` keeps whatever the hoisted binding holds
        (None, _) if kind == DeclKind::Var => {
            record(vm, env, line, StepType::Declaration, format!("var {}", target));
            return Ok(());
        }
        (None, _) => Val::Undefined,
    };

    let mode = match kind {
        DeclKind::Var => BindMode::Assign,
        DeclKind::Let => BindMode::Declare(BindingKind::Let),
        DeclKind::Const => BindMode::Declare(BindingKind::Const),
    };
    let description = match &decl.init {
        Some(_) => format!("{} {} = {}", kind.as_str(), target, vm.heap.inspect(&value)),
        None => format!("{} {}", kind.as_str(), target),
    };
    bind_pattern(vm, env, &decl.target, value, mode, line)?;
    record(vm, env, line, StepType::Declaration, description);
    Ok(())
}

fn execute_expression(vm: &mut VM, env: EnvId, stmt: &Stmt, expr: &Expr) -> ExecResult<Control> {
    let line = stmt.loc.line;
    let before = vm.steps.len();
    let value = eval_expr(vm, env, expr)?;

    match &expr.kind {
        ExprKind::Assign {
            op: AssignOp::Assign,
            target,
            ..
        } => {
            let description = format!("{} = {}", pattern_text(target), vm.heap.inspect(&value));
            record(vm, env, line, StepType::Assignment, description);
        }
        ExprKind::Assign { target, .. } => {
            let description = format!(
                "{} ({} is now {})",
                expr_text(expr),
                pattern_text(target),
                vm.heap.inspect(&value)
            );
            record(vm, env, line, StepType::Assignment, description);
        }
        ExprKind::Update { op, prefix, target } => {
            let now = match (value.clone(), prefix, op) {
                (Val::Num(n), false, UpdateOp::Inc) => Val::Num(n + 1.0),
                (Val::Num(n), false, UpdateOp::Dec) => Val::Num(n - 1.0),
                (v, _, _) => v,
            };
            let description = format!(
                "{} ({} is now {})",
                expr_text(expr),
                expr_text(target),
                vm.heap.inspect(&now)
            );
            record(vm, env, line, StepType::Assignment, description);
        }
        // Calls already traced themselves through console/call/return steps.
        _ if vm.steps.len() > before => {}
        _ => {
            let description = stmt.source.clone();
            record(vm, env, line, StepType::Expression, description);
        }
    }
    Ok(Control::Normal(value))
}

/* ===================== Blocks ===================== */

fn execute_block(vm: &mut VM, env: EnvId, body: &[Stmt], kind: ScopeKind) -> ExecResult<Control> {
    let block_env = env::create(vm, Some(env), kind, None);
    hoist_block(vm, block_env, body);
    exec_statements(vm, block_env, body)
}

/* ===================== Loops ===================== */

enum Flow {
    Next,
    Break,
    Exit(Control),
}

/// Decide what a loop does with its body's completion
fn loop_flow(control: Control, label: Option<&str>) -> Flow {
    match control {
        Control::Normal(_) | Control::Continue(None) => Flow::Next,
        Control::Break(None) => Flow::Break,
        Control::Continue(Some(l)) if Some(l.as_str()) == label => Flow::Next,
        Control::Break(Some(l)) if Some(l.as_str()) == label => Flow::Break,
        other => Flow::Exit(other),
    }
}

fn execute_for(
    vm: &mut VM,
    env: EnvId,
    init: Option<&ForInit>,
    test: Option<&Expr>,
    update: Option<&Expr>,
    body: &Stmt,
    label: Option<&str>,
) -> ExecResult<Control> {
    let loop_env = env::create(vm, Some(env), ScopeKind::Loop, None);
    let mut per_iteration = false;

    match init {
        Some(ForInit::Decl { kind, declarations }) => {
            per_iteration = *kind != DeclKind::Var;
            for decl in declarations {
                execute_declarator(vm, loop_env, *kind, decl, body.loc.line)?;
            }
        }
        Some(ForInit::Expr(e)) => {
            eval_expr(vm, loop_env, e)?;
        }
        None => {}
    }

    // `let` loops get a fresh copy of the loop scope for every iteration so
    // closures created in the body keep their own binding.
    let mut iter_env = if per_iteration {
        env::copy(vm, loop_env)
    } else {
        loop_env
    };

    loop {
        vm.tick()?;
        vm.current_env = iter_env;
        if let Some(test) = test {
            let passed = eval_expr(vm, iter_env, test)?.is_truthy();
            record(
                vm,
                iter_env,
                test.loc.line,
                StepType::Loop,
                format!("for: {} is {}", expr_text(test), passed),
            );
            if !passed {
                break;
            }
        }

        match loop_flow(exec_stmt(vm, iter_env, body)?, label) {
            Flow::Next => {}
            Flow::Break => break,
            Flow::Exit(control) => return Ok(control),
        }

        if per_iteration {
            iter_env = env::copy(vm, iter_env);
        }
        if let Some(update) = update {
            vm.current_env = iter_env;
            eval_expr(vm, iter_env, update)?;
        }
    }
    Ok(Control::normal())
}

#[allow(clippy::too_many_arguments)]
fn execute_for_each(
    vm: &mut VM,
    env: EnvId,
    mode: ForEachMode,
    decl: Option<DeclKind>,
    target: &Pattern,
    iterable: &Expr,
    body: &Stmt,
    label: Option<&str>,
) -> ExecResult<Control> {
    let line = iterable.loc.line;
    let source = eval_expr(vm, env, iterable)?;
    let items: Vec<Val> = match mode {
        ForEachMode::Of => vm.iterate(&source, line)?,
        ForEachMode::In => own_entries(vm, &source)
            .into_iter()
            .map(|(k, _)| Val::Str(k))
            .collect(),
    };
    let keyword = match mode {
        ForEachMode::Of => "of",
        ForEachMode::In => "in",
    };

    for item in items {
        vm.tick()?;
        let (iter_env, bind) = match decl {
            Some(DeclKind::Let) => (
                env::create(vm, Some(env), ScopeKind::Loop, None),
                BindMode::Declare(BindingKind::Let),
            ),
            Some(DeclKind::Const) => (
                env::create(vm, Some(env), ScopeKind::Loop, None),
                BindMode::Declare(BindingKind::Const),
            ),
            Some(DeclKind::Var) | None => (env, BindMode::Assign),
        };
        vm.current_env = iter_env;
        let description = format!(
            "for...{}: {} = {}",
            keyword,
            pattern_text(target),
            vm.heap.inspect(&item)
        );
        bind_pattern(vm, iter_env, target, item, bind, line)?;
        record(vm, iter_env, line, StepType::Loop, description);

        match loop_flow(exec_stmt(vm, iter_env, body)?, label) {
            Flow::Next => {}
            Flow::Break => break,
            Flow::Exit(control) => return Ok(control),
        }
    }
    Ok(Control::normal())
}

/* ===================== Try / Switch ===================== */

fn execute_try(
    vm: &mut VM,
    env: EnvId,
    block: &[Stmt],
    handler: Option<&CatchClause>,
    finalizer: Option<&[Stmt]>,
    line: usize,
) -> ExecResult<Control> {
    record(vm, env, line, StepType::TryCatch, "Enter try block");
    let mut result = execute_block(vm, env, block, ScopeKind::Block);

    let caught = match (&result, handler) {
        (Err(RuntimeError::UserThrow { value, message, .. }), Some(handler)) => {
            Some((value.clone(), message.clone(), handler))
        }
        _ => None,
    };
    if let Some((value, message, handler)) = caught {
        let catch_env = env::create(vm, Some(env), ScopeKind::Catch, None);
        if let Some(param) = &handler.param {
            bind_pattern(
                vm,
                catch_env,
                param,
                value,
                BindMode::Declare(BindingKind::Let),
                line,
            )?;
        }
        record(
            vm,
            catch_env,
            line,
            StepType::TryCatch,
            format!("Caught {}", message),
        );
        hoist_block(vm, catch_env, &handler.body);
        result = exec_statements(vm, catch_env, &handler.body);
    }

    let Some(finalizer) = finalizer else {
        return result;
    };
    // Fatal errors end the run without unwinding through `finally`.
    if let Err(err) = &result {
        if !err.is_catchable() {
            return result;
        }
    }
    vm.current_env = env;
    record(vm, env, line, StepType::TryCatch, "Run finally block");
    match execute_block(vm, env, finalizer, ScopeKind::Block)? {
        Control::Normal(_) => result,
        abrupt => Ok(abrupt),
    }
}

fn execute_switch(
    vm: &mut VM,
    env: EnvId,
    discriminant: &Expr,
    cases: &[SwitchCase],
    line: usize,
) -> ExecResult<Control> {
    let value = eval_expr(vm, env, discriminant)?;
    let switch_env = env::create(vm, Some(env), ScopeKind::Block, None);
    for case in cases {
        hoist_block(vm, switch_env, &case.body);
    }

    let mut start = None;
    for (i, case) in cases.iter().enumerate() {
        if let Some(test) = &case.test {
            let candidate = eval_expr(vm, switch_env, test)?;
            if strict_equals(&value, &candidate) {
                start = Some(i);
                break;
            }
        }
    }
    let start = start.or_else(|| cases.iter().position(|c| c.test.is_none()));

    let description = match (start, start.and_then(|i| cases[i].test.as_ref())) {
        (Some(_), Some(test)) => format!(
            "switch ({}) matched case {}",
            expr_text(discriminant),
            expr_text(test)
        ),
        (Some(_), None) => format!("switch ({}) fell to default", expr_text(discriminant)),
        (None, _) => format!("switch ({}) matched no case", expr_text(discriminant)),
    };
    record(vm, switch_env, line, StepType::Condition, description);

    let Some(start) = start else {
        return Ok(Control::normal());
    };
    for case in &cases[start..] {
        match exec_statements(vm, switch_env, &case.body)? {
            Control::Normal(_) => {}
            Control::Break(None) => return Ok(Control::normal()),
            abrupt => return Ok(abrupt),
        }
    }
    Ok(Control::normal())
}
