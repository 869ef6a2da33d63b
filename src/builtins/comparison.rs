// ABOUTME: Numeric comparison native procedures

use super::expect_int;
use crate::error::LispError;
use crate::runtime::Runtime;
use crate::value::Value;

pub fn register(rt: &mut Runtime) {
    rt.register_native("<", None, lt);
    rt.register_native(">", None, gt);
    rt.register_native("<=", None, le);
    rt.register_native(">=", None, ge);
    rt.register_native("=", None, num_eq);
    rt.register_native("!=", None, num_ne);
}

fn chained(args: &[Value], function: &str, cmp: impl Fn(i32, i32) -> bool) -> Result<Value, LispError> {
    if args.len() < 2 {
        return Err(LispError::arity_error(function, "at least 2", args.len()));
    }
    let mut ints = Vec::with_capacity(args.len());
    for (i, arg) in args.iter().enumerate() {
        ints.push(expect_int(*arg, function, i)?);
    }
    Ok(Value::Bool(ints.windows(2).all(|pair| cmp(pair[0], pair[1]))))
}

fn lt(_rt: &mut Runtime, args: &[Value]) -> Result<Value, LispError> {
    chained(args, "<", |a, b| a < b)
}

fn gt(_rt: &mut Runtime, args: &[Value]) -> Result<Value, LispError> {
    chained(args, ">", |a, b| a > b)
}

fn le(_rt: &mut Runtime, args: &[Value]) -> Result<Value, LispError> {
    chained(args, "<=", |a, b| a <= b)
}

fn ge(_rt: &mut Runtime, args: &[Value]) -> Result<Value, LispError> {
    chained(args, ">=", |a, b| a >= b)
}

fn num_eq(_rt: &mut Runtime, args: &[Value]) -> Result<Value, LispError> {
    chained(args, "=", |a, b| a == b)
}

fn num_ne(_rt: &mut Runtime, args: &[Value]) -> Result<Value, LispError> {
    if args.len() != 2 {
        return Err(LispError::arity_error("!=", "2", args.len()));
    }
    let a = expect_int(args[0], "!=", 0)?;
    let b = expect_int(args[1], "!=", 1)?;
    Ok(Value::Bool(a != b))
}
