//! Trace recorder
//!
//! Every step is a structural copy of the runtime state at one instant.
//! Nothing in a [`TraceStep`] refers back into the VM, so recorded history
//! cannot change when execution moves on.

use serde::{Deserialize, Serialize};

use super::env::{self, ScopeKind};
use super::types::{EnvId, Val};
use super::vm::VM;

/* ===================== Step Schema ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepType {
    Declaration,
    Assignment,
    Expression,
    FunctionCall,
    FunctionReturn,
    Console,
    Condition,
    Loop,
    Return,
    Break,
    Continue,
    Throw,
    #[serde(rename = "trycatch")]
    TryCatch,
    Timer,
    Promise,
    Microtask,
    Macrotask,
    EventLoop,
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLoopPhase {
    Executing,
    Microtasks,
    Macrotasks,
    Idle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFrame {
    pub function_name: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleEntry {
    pub method: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableSnapshot {
    pub name: String,
    pub value: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub heap_ref: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeSnapshot {
    pub name: String,
    pub kind: String,
    pub variables: Vec<VariableSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebApiSnapshot {
    pub id: usize,
    pub kind: String,
    pub label: String,
    pub delay_ms: f64,
    pub registration_order: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItemSnapshot {
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeapEntry {
    pub id: usize,
    pub label: String,
    pub kind: String,
    pub value: String,
}

/// One immutable snapshot of the runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceStep {
    pub line: usize,
    #[serde(rename = "type")]
    pub step_type: StepType,
    pub description: String,
    pub call_stack: Vec<CallFrame>,
    pub scopes: Vec<ScopeSnapshot>,
    pub console_output: Vec<ConsoleEntry>,
    pub web_apis: Vec<WebApiSnapshot>,
    pub callback_queue: Vec<QueueItemSnapshot>,
    pub microtask_queue: Vec<QueueItemSnapshot>,
    pub heap_snapshot: Vec<HeapEntry>,
    pub event_loop_phase: EventLoopPhase,
}

/* ===================== Recording ===================== */

/// Append a step describing the state visible from `env`
pub fn record(vm: &mut VM, env: EnvId, line: usize, step_type: StepType, description: impl Into<String>) {
    let step = TraceStep {
        line,
        step_type,
        description: description.into(),
        call_stack: vm.call_stack.clone(),
        scopes: snapshot_scopes(vm, env),
        console_output: vm.console.clone(),
        web_apis: vm
            .web_apis
            .iter()
            .map(|entry| WebApiSnapshot {
                id: entry.id,
                kind: "timer".to_string(),
                label: entry.label.clone(),
                delay_ms: entry.delay_ms,
                registration_order: entry.registration_order,
            })
            .collect(),
        callback_queue: vm
            .callback_queue
            .iter()
            .map(|task| QueueItemSnapshot {
                label: task.label.clone(),
            })
            .collect(),
        microtask_queue: vm
            .microtask_queue
            .iter()
            .map(|task| QueueItemSnapshot {
                label: task.label.clone(),
            })
            .collect(),
        heap_snapshot: snapshot_heap(vm),
        event_loop_phase: vm.phase,
    };
    vm.steps.push(step);
}

/// Append a step for the scope of the statement currently executing
pub fn record_here(vm: &mut VM, line: usize, step_type: StepType, description: impl Into<String>) {
    let env = vm.current_env;
    record(vm, env, line, step_type, description);
}

fn snapshot_scopes(vm: &VM, env: EnvId) -> Vec<ScopeSnapshot> {
    env::chain(vm, env)
        .into_iter()
        .filter_map(|id| {
            let scope = &vm.envs[id];
            // Empty block-like scopes are noise in the scope pane.
            if scope.bindings.is_empty()
                && matches!(scope.kind, ScopeKind::Block | ScopeKind::Loop | ScopeKind::Catch)
            {
                return None;
            }
            let name = match &scope.kind {
                ScopeKind::Global => "Global".to_string(),
                ScopeKind::Function(name) if name.is_empty() => "(anonymous)".to_string(),
                ScopeKind::Function(name) => name.clone(),
                ScopeKind::Block => "Block".to_string(),
                ScopeKind::Catch => "Catch".to_string(),
                ScopeKind::Loop => "Loop".to_string(),
            };
            let variables = scope
                .bindings
                .iter()
                .map(|(name, binding)| VariableSnapshot {
                    name: name.clone(),
                    value: vm.heap.inspect(&binding.value),
                    kind: binding.kind.as_str().to_string(),
                    heap_ref: match &binding.value {
                        Val::Object(id) if vm.heap.get(*id).is_data() => Some(*id),
                        _ => None,
                    },
                })
                .collect();
            Some(ScopeSnapshot {
                name,
                kind: scope.kind.label().to_string(),
                variables,
            })
        })
        .collect()
}

fn snapshot_heap(vm: &VM) -> Vec<HeapEntry> {
    vm.heap
        .iter()
        .filter(|(_, obj)| obj.is_data())
        .map(|(id, obj)| HeapEntry {
            id,
            label: obj.label.clone().unwrap_or_default(),
            kind: obj.kind_label().to_string(),
            value: vm.heap.inspect(&Val::Object(id)),
        })
        .collect()
}
