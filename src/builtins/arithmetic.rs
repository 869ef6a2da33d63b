// ABOUTME: Numeric native procedures — 32-bit integers only

use super::expect_int;
use crate::error::LispError;
use crate::runtime::Runtime;
use crate::value::Value;

pub fn register(rt: &mut Runtime) {
    rt.register_native("+", None, add);
    rt.register_native("-", None, sub);
    rt.register_native("*", None, mul);
    rt.register_native("/", None, div);
    rt.register_native("%", None, rem);
}

/// `(+)` with no arguments is `0`, not an arity error.
fn add(_rt: &mut Runtime, args: &[Value]) -> Result<Value, LispError> {
    let mut total: i32 = 0;
    for (i, arg) in args.iter().enumerate() {
        total = total.wrapping_add(expect_int(*arg, "+", i)?);
    }
    Ok(Value::Int(total))
}

/// `(-)` is `0`; `(- x)` negates; `(- x y z...)` subtracts left to right.
/// Overflow wraps two's-complement, matching the source.
fn sub(_rt: &mut Runtime, args: &[Value]) -> Result<Value, LispError> {
    match args {
        [] => Ok(Value::Int(0)),
        [only] => Ok(Value::Int(expect_int(*only, "-", 0)?.wrapping_neg())),
        [first, rest @ ..] => {
            let mut total = expect_int(*first, "-", 0)?;
            for (i, arg) in rest.iter().enumerate() {
                total = total.wrapping_sub(expect_int(*arg, "-", i + 1)?);
            }
            Ok(Value::Int(total))
        }
    }
}

fn mul(_rt: &mut Runtime, args: &[Value]) -> Result<Value, LispError> {
    let mut total: i32 = 1;
    for (i, arg) in args.iter().enumerate() {
        total = total.wrapping_mul(expect_int(*arg, "*", i)?);
    }
    Ok(Value::Int(total))
}

fn div(_rt: &mut Runtime, args: &[Value]) -> Result<Value, LispError> {
    let [first, rest @ ..] = args else {
        return Err(LispError::arity_error("/", "at least 1", args.len()));
    };
    let mut total = expect_int(*first, "/", 0)?;
    for (i, arg) in rest.iter().enumerate() {
        let divisor = expect_int(*arg, "/", i + 1)?;
        if divisor == 0 {
            return Err(LispError::type_error("/", "non-zero divisor", *arg, i + 1));
        }
        total = total.wrapping_div(divisor);
    }
    Ok(Value::Int(total))
}

fn rem(_rt: &mut Runtime, args: &[Value]) -> Result<Value, LispError> {
    let [a, b] = args else {
        return Err(LispError::arity_error("%", "2", args.len()));
    };
    let a = expect_int(*a, "%", 0)?;
    let b = expect_int(*b, "%", 1)?;
    if b == 0 {
        return Err(LispError::type_error("%", "non-zero divisor", Value::Int(b), 1));
    }
    Ok(Value::Int(a.wrapping_rem(b)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_arg_plus_and_minus_return_zero() {
        let mut rt = Runtime::new();
        assert_eq!(add(&mut rt, &[]).unwrap(), Value::Int(0));
        assert_eq!(sub(&mut rt, &[]).unwrap(), Value::Int(0));
    }

    #[test]
    fn subtraction_is_left_to_right() {
        let mut rt = Runtime::new();
        let args = [Value::Int(10), Value::Int(3), Value::Int(2)];
        assert_eq!(sub(&mut rt, &args).unwrap(), Value::Int(5));
    }

    #[test]
    fn addition_wraps_on_overflow() {
        let mut rt = Runtime::new();
        let args = [Value::Int(i32::MAX), Value::Int(1)];
        assert_eq!(add(&mut rt, &args).unwrap(), Value::Int(i32::MIN));
    }

    #[test]
    fn division_by_zero_is_a_type_error() {
        let mut rt = Runtime::new();
        let args = [Value::Int(1), Value::Int(0)];
        assert!(matches!(div(&mut rt, &args), Err(LispError::TypeMismatch { .. })));
    }
}
