//! Lexical environments
//!
//! Environments live in an arena on the VM and point at their parent by id.
//! Closures hold an [`EnvId`], so a captured scope stays reachable for as
//! long as the run lasts without any reference cycles.

use super::stdlib;
use super::types::{EnvId, ExecResult, RuntimeError, Val};
use super::vm::VM;

/* ===================== Types ===================== */

#[derive(Debug, Clone, PartialEq)]
pub enum ScopeKind {
    Global,
    Function(String),
    Block,
    Catch,
    Loop,
}

impl ScopeKind {
    pub fn label(&self) -> &'static str {
        match self {
            ScopeKind::Global => "global",
            ScopeKind::Function(_) => "function",
            ScopeKind::Block => "block",
            ScopeKind::Catch => "catch",
            ScopeKind::Loop => "loop",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Var,
    Let,
    Const,
    Function,
}

impl BindingKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BindingKind::Var => "var",
            BindingKind::Let => "let",
            BindingKind::Const => "const",
            BindingKind::Function => "function",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub value: Val,
    pub kind: BindingKind,
}

#[derive(Debug, Clone)]
pub struct Environment {
    pub parent: Option<EnvId>,
    pub kind: ScopeKind,
    /// Declaration order is kept for snapshots
    pub bindings: Vec<(String, Binding)>,
    /// `this` for function scopes; `None` defers to the parent (arrows, blocks)
    pub this_val: Option<Val>,
}

impl Environment {
    fn find(&self, name: &str) -> Option<&Binding> {
        self.bindings.iter().find(|(n, _)| n == name).map(|(_, b)| b)
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut Binding> {
        self.bindings
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, b)| b)
    }
}

/* ===================== Scope Management ===================== */

pub fn create(vm: &mut VM, parent: Option<EnvId>, kind: ScopeKind, this_val: Option<Val>) -> EnvId {
    vm.envs.push(Environment {
        parent,
        kind,
        bindings: Vec::new(),
        this_val,
    });
    vm.envs.len() - 1
}

/// Fresh scope holding a copy of `env`'s bindings (per-iteration loop scope)
pub fn copy(vm: &mut VM, env: EnvId) -> EnvId {
    let source = vm.envs[env].clone();
    vm.envs.push(source);
    vm.envs.len() - 1
}

/// Walk from `env` to the root, innermost first
pub fn chain(vm: &VM, env: EnvId) -> Vec<EnvId> {
    let mut out = vec![env];
    let mut cur = env;
    while let Some(parent) = vm.envs[cur].parent {
        out.push(parent);
        cur = parent;
    }
    out
}

/* ===================== Bindings ===================== */

/// Create (or overwrite) a binding in `env` itself
pub fn define(vm: &mut VM, env: EnvId, name: &str, value: Val, kind: BindingKind) {
    vm.heap.label(&value, name);
    let scope = &mut vm.envs[env];
    match scope.find_mut(name) {
        Some(binding) => {
            binding.value = value;
            binding.kind = kind;
        }
        None => scope
            .bindings
            .push((name.to_string(), Binding { value, kind })),
    }
}

/// Assign to the nearest existing binding, creating a global one if none
pub fn set(vm: &mut VM, env: EnvId, name: &str, value: Val, line: usize) -> ExecResult<()> {
    let mut cur = Some(env);
    while let Some(id) = cur {
        if let Some(binding) = vm.envs[id].find(name) {
            if binding.kind == BindingKind::Const {
                return Err(RuntimeError::type_misuse(
                    "Assignment to constant variable.",
                    line,
                ));
            }
            vm.heap.label(&value, name);
            if let Some(binding) = vm.envs[id].find_mut(name) {
                binding.value = value;
            }
            return Ok(());
        }
        cur = vm.envs[id].parent;
    }

    // Non-strict leak into the global scope
    let global = vm.global_env;
    define(vm, global, name, value, BindingKind::Var);
    Ok(())
}

pub fn lookup(vm: &VM, env: EnvId, name: &str) -> Option<Val> {
    let mut cur = Some(env);
    while let Some(id) = cur {
        if let Some(binding) = vm.envs[id].find(name) {
            return Some(binding.value.clone());
        }
        cur = vm.envs[id].parent;
    }
    None
}

pub fn get(vm: &VM, env: EnvId, name: &str, line: usize) -> ExecResult<Val> {
    lookup(vm, env, name)
        .or_else(|| stdlib::global(name))
        .ok_or_else(|| RuntimeError::ReferenceNotFound {
            name: name.to_string(),
            line,
        })
}

pub fn has(vm: &VM, env: EnvId, name: &str) -> bool {
    lookup(vm, env, name).is_some() || stdlib::global(name).is_some()
}

/// Whether `name` is bound by user code (shadowing a global counts)
pub fn is_user_bound(vm: &VM, env: EnvId, name: &str) -> bool {
    lookup(vm, env, name).is_some()
}

pub fn has_own(vm: &VM, env: EnvId, name: &str) -> bool {
    vm.envs[env].find(name).is_some()
}

/// Resolve `this`, skipping scopes that do not bind it
pub fn this_value(vm: &VM, env: EnvId) -> Val {
    let mut cur = Some(env);
    while let Some(id) = cur {
        if let Some(this) = &vm.envs[id].this_val {
            return this.clone();
        }
        cur = vm.envs[id].parent;
    }
    Val::GlobalThis
}
