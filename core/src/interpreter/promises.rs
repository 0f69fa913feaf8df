//! Promise records and reactions
//!
//! A promise is a plain heap record. `resolve`/`reject` only mutate it; the
//! scheduling happens when a reaction meets a settled promise, at which point
//! the reaction is queued as a microtask.

use super::calls;
use super::event_loop::{Job, Task};
use super::heap::ObjectKind;
use super::tracer::{record_here, StepType};
use super::types::{ExecResult, ObjId, RuntimeError, Val};
use super::vm::VM;

/* ===================== Types ===================== */

#[derive(Debug, Clone, PartialEq)]
pub enum PromiseState {
    Pending,
    Fulfilled(Val),
    Rejected(Val),
}

#[derive(Debug, Clone)]
pub struct PromiseRecord {
    pub state: PromiseState,
    /// Reactions registered while pending
    pub reactions: Vec<Reaction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionKind {
    Then,
    Catch,
    Finally,
    /// Internal: mirror another promise's outcome into `derived`
    Adopt,
}

impl ReactionKind {
    pub fn name(self) -> &'static str {
        match self {
            ReactionKind::Then => "then",
            ReactionKind::Catch => "catch",
            ReactionKind::Finally => "finally",
            ReactionKind::Adopt => "resolve",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Reaction {
    pub kind: ReactionKind,
    pub on_fulfilled: Option<Val>,
    pub on_rejected: Option<Val>,
    /// Promise returned by the registration call
    pub derived: ObjId,
    pub line: usize,
}

/* ===================== Records ===================== */

fn new_promise(vm: &mut VM) -> ObjId {
    vm.heap.alloc(ObjectKind::Promise(PromiseRecord {
        state: PromiseState::Pending,
        reactions: Vec::new(),
    }))
}

fn record_mut(vm: &mut VM, id: ObjId) -> Option<&mut PromiseRecord> {
    match &mut vm.heap.get_mut(id).kind {
        ObjectKind::Promise(record) => Some(record),
        _ => None,
    }
}

fn state(vm: &VM, id: ObjId) -> Option<PromiseState> {
    match &vm.heap.get(id).kind {
        ObjectKind::Promise(record) => Some(record.state.clone()),
        _ => None,
    }
}

pub fn is_promise(vm: &VM, val: &Val) -> bool {
    match val {
        Val::Object(id) => matches!(vm.heap.get(*id).kind, ObjectKind::Promise(_)),
        _ => false,
    }
}

/* ===================== Construction ===================== */

/// `new Promise(executor)`: the executor runs synchronously
pub fn construct(vm: &mut VM, executor: Val, line: usize) -> ExecResult<Val> {
    if !vm.is_callable(&executor) {
        return Err(RuntimeError::type_misuse(
            format!("Promise resolver {} is not a function", vm.heap.inspect(&executor)),
            line,
        ));
    }

    let id = new_promise(vm);
    record_here(vm, line, StepType::Promise, "new Promise created (pending)");

    let resolve = vm.alloc(ObjectKind::Resolver {
        promise: id,
        reject: false,
    });
    let reject = vm.alloc(ObjectKind::Resolver {
        promise: id,
        reject: true,
    });

    match calls::call_function(vm, &executor, Val::Undefined, vec![resolve, reject], line) {
        Ok(_) => {}
        Err(RuntimeError::UserThrow { value, .. }) => reject_promise(vm, id, value, line),
        Err(e) => return Err(e),
    }
    Ok(Val::Object(id))
}

/// `Promise.resolve(value)`
pub fn promise_resolve(vm: &mut VM, value: Val, line: usize) -> ExecResult<Val> {
    if is_promise(vm, &value) {
        return Ok(value);
    }
    let id = new_promise(vm);
    settle(vm, id, PromiseState::Fulfilled(value), line);
    Ok(Val::Object(id))
}

/// `Promise.reject(reason)`
pub fn promise_reject(vm: &mut VM, reason: Val, line: usize) -> ExecResult<Val> {
    let id = new_promise(vm);
    settle(vm, id, PromiseState::Rejected(reason), line);
    Ok(Val::Object(id))
}

/// Invoke an executor's `resolve`/`reject`; later calls are ignored
pub fn call_resolver(vm: &mut VM, promise: ObjId, reject: bool, value: Val, line: usize) -> Val {
    if state(vm, promise) == Some(PromiseState::Pending) {
        if reject {
            reject_promise(vm, promise, value, line);
        } else {
            resolve_promise(vm, promise, value, line);
        }
    }
    Val::Undefined
}

/* ===================== Settlement ===================== */

/// Fulfill `id` with `value`, adopting `value` if it is itself a promise
pub fn resolve_promise(vm: &mut VM, id: ObjId, value: Val, line: usize) {
    match value {
        Val::Object(other) if other != id && is_promise(vm, &value) => {
            add_reaction(
                vm,
                other,
                Reaction {
                    kind: ReactionKind::Adopt,
                    on_fulfilled: None,
                    on_rejected: None,
                    derived: id,
                    line,
                },
            );
            record_here(vm, line, StepType::Promise, "Promise follows the returned promise");
        }
        _ => settle(vm, id, PromiseState::Fulfilled(value), line),
    }
}

pub fn reject_promise(vm: &mut VM, id: ObjId, reason: Val, line: usize) {
    settle(vm, id, PromiseState::Rejected(reason), line);
}

fn settle(vm: &mut VM, id: ObjId, outcome: PromiseState, line: usize) {
    let Some(record) = record_mut(vm, id) else {
        return;
    };
    if record.state != PromiseState::Pending {
        return;
    }
    record.state = outcome.clone();
    let reactions = std::mem::take(&mut record.reactions);

    for reaction in reactions {
        enqueue(vm, reaction, outcome.clone());
    }

    let description = match &outcome {
        PromiseState::Fulfilled(v) => format!("Promise fulfilled with {}", vm.heap.inspect(v)),
        PromiseState::Rejected(v) => format!("Promise rejected with {}", vm.heap.inspect(v)),
        PromiseState::Pending => return,
    };
    record_here(vm, line, StepType::Promise, description);
}

/* ===================== Reactions ===================== */

/// `.then` / `.catch` / `.finally` on a promise receiver
pub fn register(vm: &mut VM, id: ObjId, method: &str, args: Vec<Val>, line: usize) -> ExecResult<Val> {
    let callable = |vm: &VM, idx: usize| args.get(idx).filter(|f| vm.is_callable(f)).cloned();
    let (kind, on_fulfilled, on_rejected) = match method {
        "then" => (ReactionKind::Then, callable(vm, 0), callable(vm, 1)),
        "catch" => (ReactionKind::Catch, None, callable(vm, 0)),
        "finally" => (ReactionKind::Finally, callable(vm, 0), callable(vm, 0)),
        _ => {
            return Err(RuntimeError::type_misuse(
                format!("promise.{} is not a function", method),
                line,
            ))
        }
    };

    let derived = new_promise(vm);
    let reaction = Reaction {
        kind,
        on_fulfilled,
        on_rejected,
        derived,
        line,
    };
    let queued = add_reaction(vm, id, reaction);

    let description = if queued {
        format!(".{}() callback queued as a microtask (promise already settled)", method)
    } else {
        format!(".{}() callback registered on pending promise", method)
    };
    record_here(vm, line, StepType::Promise, description);
    Ok(Val::Object(derived))
}

/// Store or queue a reaction; returns whether it was queued right away
fn add_reaction(vm: &mut VM, id: ObjId, reaction: Reaction) -> bool {
    let Some(current) = state(vm, id) else {
        return false;
    };
    match current {
        PromiseState::Pending => {
            if let Some(record) = record_mut(vm, id) {
                record.reactions.push(reaction);
            }
            false
        }
        settled => {
            enqueue(vm, reaction, settled);
            true
        }
    }
}

fn enqueue(vm: &mut VM, reaction: Reaction, outcome: PromiseState) {
    let handler = match (&outcome, &reaction.on_fulfilled, &reaction.on_rejected) {
        (PromiseState::Fulfilled(_), Some(f), _) | (PromiseState::Rejected(_), _, Some(f)) => {
            calls::function_name(vm, f)
        }
        _ => "passthrough".to_string(),
    };
    let label = format!("{}({})", reaction.kind.name(), handler);
    let line = reaction.line;
    vm.microtask_queue.push_back(Task {
        label,
        line,
        job: Job::Reaction { reaction, outcome },
    });
}

/// Run one reaction job and settle its derived promise
pub fn run_reaction(vm: &mut VM, reaction: Reaction, outcome: PromiseState) -> ExecResult<()> {
    let line = reaction.line;
    let derived = reaction.derived;

    let handler = match (&reaction.kind, &outcome) {
        (ReactionKind::Adopt, _) => None,
        (ReactionKind::Finally, _) => reaction.on_fulfilled.clone(),
        (_, PromiseState::Fulfilled(_)) => reaction.on_fulfilled.clone(),
        (_, PromiseState::Rejected(_)) => reaction.on_rejected.clone(),
        (_, PromiseState::Pending) => None,
    };

    let Some(handler) = handler else {
        pass_through(vm, derived, outcome, line);
        return Ok(());
    };

    let args = match (&reaction.kind, &outcome) {
        (ReactionKind::Finally, _) => Vec::new(),
        (_, PromiseState::Fulfilled(v)) | (_, PromiseState::Rejected(v)) => vec![v.clone()],
        (_, PromiseState::Pending) => Vec::new(),
    };

    match calls::call_function(vm, &handler, Val::Undefined, args, line) {
        Ok(_) if reaction.kind == ReactionKind::Finally => pass_through(vm, derived, outcome, line),
        Ok(value) => resolve_promise(vm, derived, value, line),
        Err(RuntimeError::UserThrow { value, .. }) => reject_promise(vm, derived, value, line),
        Err(e) => return Err(e),
    }
    Ok(())
}

fn pass_through(vm: &mut VM, derived: ObjId, outcome: PromiseState, line: usize) {
    match outcome {
        PromiseState::Fulfilled(v) => resolve_promise(vm, derived, v, line),
        PromiseState::Rejected(v) => reject_promise(vm, derived, v, line),
        PromiseState::Pending => {}
    }
}
