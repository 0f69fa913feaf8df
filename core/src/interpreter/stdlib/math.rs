use crate::interpreter::types::Val;
use crate::interpreter::vm::VM;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathFunc {
    Abs,
    Floor,
    Ceil,
    Round,
    Trunc,
    Sign,
    Sqrt,
    Cbrt,
    Pow,
    Min,
    Max,
    Log,
    Exp,
    Random,
}

impl MathFunc {
    pub fn name(&self) -> &'static str {
        match self {
            MathFunc::Abs => "abs",
            MathFunc::Floor => "floor",
            MathFunc::Ceil => "ceil",
            MathFunc::Round => "round",
            MathFunc::Trunc => "trunc",
            MathFunc::Sign => "sign",
            MathFunc::Sqrt => "sqrt",
            MathFunc::Cbrt => "cbrt",
            MathFunc::Pow => "pow",
            MathFunc::Min => "min",
            MathFunc::Max => "max",
            MathFunc::Log => "log",
            MathFunc::Exp => "exp",
            MathFunc::Random => "random",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let f = match name {
            "abs" => MathFunc::Abs,
            "floor" => MathFunc::Floor,
            "ceil" => MathFunc::Ceil,
            "round" => MathFunc::Round,
            "trunc" => MathFunc::Trunc,
            "sign" => MathFunc::Sign,
            "sqrt" => MathFunc::Sqrt,
            "cbrt" => MathFunc::Cbrt,
            "pow" => MathFunc::Pow,
            "min" => MathFunc::Min,
            "max" => MathFunc::Max,
            "log" => MathFunc::Log,
            "exp" => MathFunc::Exp,
            "random" => MathFunc::Random,
            _ => return None,
        };
        Some(f)
    }
}

pub fn constant(key: &str) -> Option<f64> {
    match key {
        "PI" => Some(std::f64::consts::PI),
        "E" => Some(std::f64::consts::E),
        "LN2" => Some(std::f64::consts::LN_2),
        "LN10" => Some(std::f64::consts::LN_10),
        "SQRT2" => Some(std::f64::consts::SQRT_2),
        _ => None,
    }
}

pub fn call(vm: &mut VM, f: MathFunc, args: &[Val]) -> Val {
    let nums: Vec<f64> = args.iter().map(|v| vm.to_number(v)).collect();
    let x = nums.first().copied().unwrap_or(f64::NAN);

    let result = match f {
        MathFunc::Abs => x.abs(),
        MathFunc::Floor => x.floor(),
        MathFunc::Ceil => x.ceil(),
        // JavaScript rounds half-way cases towards +Infinity
        MathFunc::Round => (x + 0.5).floor(),
        MathFunc::Trunc => x.trunc(),
        MathFunc::Sign => {
            if x.is_nan() || x == 0.0 {
                x
            } else {
                x.signum()
            }
        }
        MathFunc::Sqrt => x.sqrt(),
        MathFunc::Cbrt => x.cbrt(),
        MathFunc::Pow => {
            let y = nums.get(1).copied().unwrap_or(f64::NAN);
            if y.is_nan() {
                f64::NAN
            } else {
                x.powf(y)
            }
        }
        MathFunc::Min => fold(&nums, f64::INFINITY, f64::min),
        MathFunc::Max => fold(&nums, f64::NEG_INFINITY, f64::max),
        MathFunc::Log => x.ln(),
        MathFunc::Exp => x.exp(),
        MathFunc::Random => vm.next_random(),
    };
    Val::Num(result)
}

/// `Math.min`/`Math.max` propagate NaN, unlike `f64::min`/`f64::max`
fn fold(nums: &[f64], init: f64, pick: fn(f64, f64) -> f64) -> f64 {
    if nums.iter().any(|n| n.is_nan()) {
        return f64::NAN;
    }
    nums.iter().copied().fold(init, pick)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::vm::Limits;

    fn run(f: MathFunc, args: &[f64]) -> Val {
        let mut vm = VM::new(Limits::default());
        let args: Vec<Val> = args.iter().map(|n| Val::Num(*n)).collect();
        call(&mut vm, f, &args)
    }

    #[test]
    fn test_math_functions() {
        assert_eq!(run(MathFunc::Max, &[1.0, 5.0, 3.0]), Val::Num(5.0));
        assert_eq!(run(MathFunc::Min, &[]), Val::Num(f64::INFINITY));
        assert_eq!(run(MathFunc::Round, &[2.5]), Val::Num(3.0));
        assert_eq!(run(MathFunc::Round, &[-2.5]), Val::Num(-2.0));
        assert_eq!(run(MathFunc::Pow, &[2.0, 10.0]), Val::Num(1024.0));
        assert_eq!(run(MathFunc::Trunc, &[-4.7]), Val::Num(-4.0));
    }

    #[test]
    fn test_max_propagates_nan() {
        match run(MathFunc::Max, &[1.0, f64::NAN]) {
            Val::Num(n) => assert!(n.is_nan()),
            other => panic!("expected number, got {:?}", other),
        }
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(MathFunc::from_name("floor"), Some(MathFunc::Floor));
        assert_eq!(MathFunc::from_name("nope"), None);
        assert_eq!(constant("PI"), Some(std::f64::consts::PI));
    }
}
