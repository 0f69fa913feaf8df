use super::arg;
use crate::interpreter::expressions::{own_entries, set_member};
use crate::interpreter::heap::ObjectKind;
use crate::interpreter::types::{ExecResult, ObjId, RuntimeError, Val};
use crate::interpreter::vm::VM;

fn require_object(vm: &VM, val: &Val, line: usize) -> ExecResult<()> {
    if val.is_nullish() {
        return Err(RuntimeError::type_misuse(
            format!("Cannot convert {} to object", vm.heap.inspect(val)),
            line,
        ));
    }
    Ok(())
}

pub fn keys(vm: &mut VM, args: &[Val], line: usize) -> ExecResult<Val> {
    require_object(vm, arg(args, 0), line)?;
    let keys = own_entries(vm, arg(args, 0))
        .into_iter()
        .map(|(k, _)| Val::Str(k))
        .collect();
    Ok(vm.alloc_array(keys))
}

pub fn values(vm: &mut VM, args: &[Val], line: usize) -> ExecResult<Val> {
    require_object(vm, arg(args, 0), line)?;
    let values = own_entries(vm, arg(args, 0))
        .into_iter()
        .map(|(_, v)| v)
        .collect();
    Ok(vm.alloc_array(values))
}

pub fn entries(vm: &mut VM, args: &[Val], line: usize) -> ExecResult<Val> {
    require_object(vm, arg(args, 0), line)?;
    let pairs = own_entries(vm, arg(args, 0));
    let mut out = Vec::with_capacity(pairs.len());
    for (k, v) in pairs {
        out.push(vm.alloc_array(vec![Val::Str(k), v]));
    }
    Ok(vm.alloc_array(out))
}

/// `Object.assign(target, ...sources)`
pub fn assign(vm: &mut VM, args: &[Val], line: usize) -> ExecResult<Val> {
    let target = arg(args, 0).clone();
    require_object(vm, &target, line)?;
    for source in args.iter().skip(1) {
        for (k, v) in own_entries(vm, source) {
            set_member(vm, &target, &k, v, line)?;
        }
    }
    Ok(target)
}

/// `Object.freeze(obj)`: later writes are ignored
pub fn freeze(vm: &mut VM, args: &[Val]) -> Val {
    let target = arg(args, 0).clone();
    if let Val::Object(id) = target {
        vm.heap.get_mut(id).frozen = true;
    }
    target
}

/// Methods every plain object answers to
pub fn is_method(name: &str) -> bool {
    matches!(name, "hasOwnProperty" | "toString")
}

pub fn call(vm: &mut VM, id: ObjId, name: &str, args: &[Val]) -> ExecResult<Val> {
    let key = vm.to_js_string(arg(args, 0));
    let obj = vm.heap.get(id);
    match (name, &obj.kind) {
        ("hasOwnProperty", ObjectKind::Object(props)) => Ok(Val::Bool(props.contains(&key))),
        ("toString", _) => Ok(Val::Str(vm.to_js_string(&Val::Object(id)))),
        _ => Ok(Val::Undefined),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::types::Props;
    use crate::interpreter::vm::Limits;

    fn sample(vm: &mut VM) -> Val {
        let props: Props = vec![
            ("a".to_string(), Val::Num(1.0)),
            ("b".to_string(), Val::Num(2.0)),
        ]
        .into_iter()
        .collect();
        vm.alloc_object(props)
    }

    #[test]
    fn test_keys_values_entries() {
        let mut vm = VM::new(Limits::default());
        let obj = sample(&mut vm);
        let k = keys(&mut vm, &[obj.clone()], 1).unwrap();
        let v = values(&mut vm, &[obj.clone()], 1).unwrap();
        let e = entries(&mut vm, &[obj], 1).unwrap();
        assert_eq!(vm.heap.inspect(&k), r#"[ "a", "b" ]"#);
        assert_eq!(vm.heap.inspect(&v), "[ 1, 2 ]");
        assert_eq!(vm.heap.inspect(&e), r#"[ [ "a", 1 ], [ "b", 2 ] ]"#);
    }

    #[test]
    fn test_keys_of_null_fails() {
        let mut vm = VM::new(Limits::default());
        let err = keys(&mut vm, &[Val::Null], 3).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: Cannot convert null to object");
    }

    #[test]
    fn test_freeze_blocks_writes() {
        let mut vm = VM::new(Limits::default());
        let obj = sample(&mut vm);
        freeze(&mut vm, &[obj.clone()]);
        set_member(&mut vm, &obj, "a", Val::Num(9.0), 1).unwrap();
        assert_eq!(vm.heap.inspect(&obj), "{ a: 1, b: 2 }");
    }
}
