use crate::interpreter::tracer::{record_here, ConsoleEntry, StepType};
use crate::interpreter::types::{ExecResult, Val};
use crate::interpreter::vm::VM;

/// `console.*` methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleMethod {
    Log,
    Info,
    Warn,
    Error,
    Debug,
}

impl ConsoleMethod {
    pub fn name(&self) -> &'static str {
        match self {
            ConsoleMethod::Log => "log",
            ConsoleMethod::Info => "info",
            ConsoleMethod::Warn => "warn",
            ConsoleMethod::Error => "error",
            ConsoleMethod::Debug => "debug",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "log" => Some(ConsoleMethod::Log),
            "info" => Some(ConsoleMethod::Info),
            "warn" => Some(ConsoleMethod::Warn),
            "error" => Some(ConsoleMethod::Error),
            "debug" => Some(ConsoleMethod::Debug),
            _ => None,
        }
    }
}

/// Append a console entry and trace it
///
/// Arguments are rendered the way Node prints them: strings raw at the top
/// level, everything else inspected, separated by single spaces.
pub fn call(vm: &mut VM, method: ConsoleMethod, args: &[Val], line: usize) -> ExecResult<Val> {
    let text = args
        .iter()
        .map(|v| vm.heap.display(v))
        .collect::<Vec<_>>()
        .join(" ");

    vm.console.push(ConsoleEntry {
        method: method.name().to_string(),
        text: text.clone(),
    });
    record_here(
        vm,
        line,
        StepType::Console,
        format!("console.{}: {}", method.name(), text),
    );
    Ok(Val::Undefined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::vm::Limits;

    #[test]
    fn test_console_joins_arguments() {
        let mut vm = VM::new(Limits::default());
        let arr = vm.alloc_array(vec![Val::Num(1.0), Val::str("a")]);
        call(&mut vm, ConsoleMethod::Warn, &[Val::str("items"), arr], 2).unwrap();

        assert_eq!(vm.console[0].method, "warn");
        assert_eq!(vm.console[0].text, r#"items [ 1, "a" ]"#);
        assert_eq!(vm.steps.len(), 1);
        assert_eq!(vm.steps[0].step_type, StepType::Console);
        assert_eq!(vm.steps[0].console_output.len(), 1);
    }
}
