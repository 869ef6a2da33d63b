// ABOUTME: Reflective and resource-management native procedures

use crate::error::LispError;
use crate::runtime::Runtime;
use crate::value::Value;

pub fn register(rt: &mut Runtime) {
    rt.register_native("eval", Some(1), eval_builtin);
    rt.register_native("apply", Some(2), apply_builtin);
    rt.register_native("gc", Some(0), gc);
}

fn eval_builtin(rt: &mut Runtime, args: &[Value]) -> Result<Value, LispError> {
    let [form] = args else {
        return Err(LispError::arity_error("eval", "1", args.len()));
    };
    let top = rt.top_level;
    crate::eval::eval(rt, top, *form)
}

/// `(apply proc arg-list)`: the list's elements become positional
/// arguments, letting callers build an argument list at runtime.
fn apply_builtin(rt: &mut Runtime, args: &[Value]) -> Result<Value, LispError> {
    let [proc, arg_list] = args else {
        return Err(LispError::arity_error("apply", "2", args.len()));
    };
    let mut flattened = Vec::new();
    let mut current = *arg_list;
    loop {
        match current {
            Value::Nil => break,
            Value::Pair(r) => {
                let (car, cdr) = rt.heap.pair(r)?;
                flattened.push(car);
                current = cdr;
            }
            other => return Err(LispError::type_error("apply", "proper list", other, 1)),
        }
    }
    crate::eval::apply(rt, *proc, &flattened)
}

fn gc(rt: &mut Runtime, _args: &[Value]) -> Result<Value, LispError> {
    rt.collect();
    Ok(Value::Int(rt.heap.live_count() as i32))
}
