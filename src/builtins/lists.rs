// ABOUTME: Pair and list native procedures

use crate::error::LispError;
use crate::runtime::Runtime;
use crate::value::Value;

pub fn register(rt: &mut Runtime) {
    rt.register_native("cons", Some(2), cons);
    rt.register_native("car", Some(1), car);
    rt.register_native("cdr", Some(1), cdr);
    rt.register_native("list", None, list);
}

fn cons(rt: &mut Runtime, args: &[Value]) -> Result<Value, LispError> {
    let [car, cdr] = args else {
        return Err(LispError::arity_error("cons", "2", args.len()));
    };
    Ok(Value::Pair(rt.heap.alloc_pair(*car, *cdr)))
}

fn car(rt: &mut Runtime, args: &[Value]) -> Result<Value, LispError> {
    match args {
        [Value::Pair(r)] => Ok(rt.heap.pair(*r)?.0),
        [other] => Err(LispError::type_error("car", "pair", *other, 0)),
        _ => Err(LispError::arity_error("car", "1", args.len())),
    }
}

fn cdr(rt: &mut Runtime, args: &[Value]) -> Result<Value, LispError> {
    match args {
        [Value::Pair(r)] => Ok(rt.heap.pair(*r)?.1),
        [other] => Err(LispError::type_error("cdr", "pair", *other, 0)),
        _ => Err(LispError::arity_error("cdr", "1", args.len())),
    }
}

fn list(rt: &mut Runtime, args: &[Value]) -> Result<Value, LispError> {
    let mut result = Value::Nil;
    for item in args.iter().rev() {
        result = Value::Pair(rt.heap.alloc_pair(*item, result));
    }
    Ok(result)
}
