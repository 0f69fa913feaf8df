//! Event-loop simulator
//!
//! Runs once the synchronous program finishes:
//! 1. drain microtasks to a fixpoint
//! 2. move pending timers into the callback queue in registration order
//! 3. run one macrotask, then drain microtasks again
//! 4. go idle when the queues and the Web-API set are empty

use tracing::debug;

use super::calls;
use super::promises::{self, PromiseState, Reaction};
use super::stdlib::NativeFunc;
use super::tracer::{record, record_here, EventLoopPhase, StepType};
use super::types::{ExecResult, RuntimeError, Val};
use super::vm::VM;

/* ===================== Types ===================== */

/// Timer waiting in the simulated Web-API set
#[derive(Debug, Clone)]
pub struct WebApiEntry {
    pub id: usize,
    pub label: String,
    pub delay_ms: f64,
    pub registration_order: usize,
    pub callback: Val,
    pub args: Vec<Val>,
    pub line: usize,
}

/// Queue item for either task queue
#[derive(Debug, Clone)]
pub struct Task {
    pub label: String,
    pub line: usize,
    pub job: Job,
}

#[derive(Debug, Clone)]
pub enum Job {
    Callback { func: Val, args: Vec<Val> },
    Reaction {
        reaction: Reaction,
        outcome: PromiseState,
    },
}

/* ===================== Scheduling ===================== */

/// `setTimeout(fn, delay, ...args)`; `setInterval` fires once as well
pub fn schedule_timer(vm: &mut VM, func: NativeFunc, args: Vec<Val>, line: usize) -> ExecResult<Val> {
    let mut args = args.into_iter();
    let callback = args.next().unwrap_or(Val::Undefined);
    if !vm.is_callable(&callback) {
        return Err(RuntimeError::type_misuse(
            format!(
                "{}: callback {} is not a function",
                func.name(),
                vm.heap.inspect(&callback)
            ),
            line,
        ));
    }
    let delay_ms = args
        .next()
        .map(|v| vm.to_number(&v))
        .filter(|n| n.is_finite() && *n > 0.0)
        .unwrap_or(0.0);
    let extra: Vec<Val> = args.collect();

    let id = vm.next_timer_id;
    vm.next_timer_id += 1;
    let label = format!("{}({})", func.name(), calls::function_name(vm, &callback));
    vm.web_apis.push(WebApiEntry {
        id,
        label: label.clone(),
        delay_ms,
        registration_order: id,
        callback,
        args: extra,
        line,
    });

    record_here(
        vm,
        line,
        StepType::Timer,
        format!("{} registered with the Web APIs ({}ms)", label, delay_ms),
    );
    Ok(Val::Num(id as f64))
}

/// Cancellation is not simulated; the call is traced and ignored
pub fn clear_timer(vm: &mut VM, func: NativeFunc, args: &[Val], line: usize) -> ExecResult<Val> {
    let target = args.first().map(|v| vm.heap.inspect(v)).unwrap_or_default();
    record_here(
        vm,
        line,
        StepType::Timer,
        format!("{}({}) ignored: cancellation is not simulated", func.name(), target),
    );
    Ok(Val::Undefined)
}

/// `queueMicrotask(fn)`
pub fn queue_microtask(vm: &mut VM, args: Vec<Val>, line: usize) -> ExecResult<Val> {
    let func = args.into_iter().next().unwrap_or(Val::Undefined);
    if !vm.is_callable(&func) {
        return Err(RuntimeError::type_misuse(
            format!("queueMicrotask: {} is not a function", vm.heap.inspect(&func)),
            line,
        ));
    }
    let label = format!("queueMicrotask({})", calls::function_name(vm, &func));
    vm.microtask_queue.push_back(Task {
        label: label.clone(),
        line,
        job: Job::Callback {
            func,
            args: Vec::new(),
        },
    });
    record_here(
        vm,
        line,
        StepType::Microtask,
        format!("{} added to the microtask queue", label),
    );
    Ok(Val::Undefined)
}

/* ===================== Loop ===================== */

fn enter_phase(vm: &mut VM, phase: EventLoopPhase, description: impl Into<String>) {
    debug!(?phase, "event loop phase");
    vm.phase = phase;
    let global = vm.global_env;
    record(vm, global, 0, StepType::EventLoop, description);
}

/// Record the opening transition: the main script starts on the call stack
pub fn start(vm: &mut VM) {
    enter_phase(
        vm,
        EventLoopPhase::Executing,
        "Run script: synchronous code executes on the call stack",
    );
}

/// Drain queued work after the synchronous program completes
pub fn run(vm: &mut VM) -> ExecResult<()> {
    vm.current_env = vm.global_env;
    drain_microtasks(vm)?;

    loop {
        if vm.callback_queue.is_empty() {
            if vm.web_apis.is_empty() {
                break;
            }
            move_timers(vm);
        }
        let Some(task) = vm.callback_queue.pop_front() else {
            break;
        };

        vm.tick()?;
        enter_phase(
            vm,
            EventLoopPhase::Macrotasks,
            format!("Event loop picks macrotask {}", task.label),
        );
        vm.current_env = vm.global_env;
        record_here(
            vm,
            task.line,
            StepType::Macrotask,
            format!("Run {}", task.label),
        );
        run_task(vm, task)?;
        drain_microtasks(vm)?;
    }

    enter_phase(
        vm,
        EventLoopPhase::Idle,
        "Call stack and queues are empty: event loop idle",
    );
    Ok(())
}

/// Run microtasks until none remain, including ones queued meanwhile
fn drain_microtasks(vm: &mut VM) -> ExecResult<()> {
    if vm.microtask_queue.is_empty() {
        return Ok(());
    }
    enter_phase(
        vm,
        EventLoopPhase::Microtasks,
        "Call stack empty: draining the microtask queue",
    );
    while let Some(task) = vm.microtask_queue.pop_front() {
        vm.tick()?;
        vm.current_env = vm.global_env;
        record_here(
            vm,
            task.line,
            StepType::Microtask,
            format!("Run microtask {}", task.label),
        );
        run_task(vm, task)?;
    }
    Ok(())
}

/// Every pending timer is due at once; order is registration order
fn move_timers(vm: &mut VM) {
    let mut timers = std::mem::take(&mut vm.web_apis);
    timers.sort_by_key(|t| t.registration_order);
    let count = timers.len();
    for timer in timers {
        vm.callback_queue.push_back(Task {
            label: timer.label,
            line: timer.line,
            job: Job::Callback {
                func: timer.callback,
                args: timer.args,
            },
        });
    }
    let global = vm.global_env;
    record(
        vm,
        global,
        0,
        StepType::Timer,
        format!("{} timer(s) elapsed: callbacks moved to the callback queue", count),
    );
}

fn run_task(vm: &mut VM, task: Task) -> ExecResult<()> {
    match task.job {
        Job::Callback { func, args } => {
            calls::call_function(vm, &func, Val::Undefined, args, task.line)?;
            Ok(())
        }
        Job::Reaction { reaction, outcome } => promises::run_reaction(vm, reaction, outcome),
    }
}
