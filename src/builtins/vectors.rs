// ABOUTME: Vector native procedures — fixed-length sequences with mutation

use super::expect_int;
use crate::error::LispError;
use crate::runtime::Runtime;
use crate::value::Value;

pub fn register(rt: &mut Runtime) {
    rt.register_native("make-vector", Some(2), make_vector);
    rt.register_native("vector", None, vector);
    rt.register_native("vector-copy", Some(1), vector_copy);
    rt.register_native("vector-length", Some(1), vector_length);
    rt.register_native("vector-capacity", Some(1), vector_capacity);
    rt.register_native("vector-ref", Some(2), vector_ref);
    rt.register_native("vector-set!", Some(3), vector_set);
}

fn make_vector(rt: &mut Runtime, args: &[Value]) -> Result<Value, LispError> {
    let [len, fill] = args else {
        return Err(LispError::arity_error("make-vector", "2", args.len()));
    };
    let len = expect_int(*len, "make-vector", 0)?;
    if len < 0 {
        return Err(LispError::type_error("make-vector", "non-negative length", Value::Int(len), 0));
    }
    let items = vec![*fill; len as usize];
    Ok(Value::Vector(rt.heap.alloc_vector(items)))
}

fn vector(rt: &mut Runtime, args: &[Value]) -> Result<Value, LispError> {
    Ok(Value::Vector(rt.heap.alloc_vector(args.to_vec())))
}

fn vector_copy(rt: &mut Runtime, args: &[Value]) -> Result<Value, LispError> {
    match args {
        [Value::Vector(r)] => {
            let items = rt.heap.vector_items(*r)?.to_vec();
            Ok(Value::Vector(rt.heap.alloc_vector(items)))
        }
        [other] => Err(LispError::type_error("vector-copy", "vector", *other, 0)),
        _ => Err(LispError::arity_error("vector-copy", "1", args.len())),
    }
}

fn vector_length(rt: &mut Runtime, args: &[Value]) -> Result<Value, LispError> {
    match args {
        [Value::Vector(r)] => Ok(Value::Int(rt.heap.vector_items(*r)?.len() as i32)),
        [other] => Err(LispError::type_error("vector-length", "vector", *other, 0)),
        _ => Err(LispError::arity_error("vector-length", "1", args.len())),
    }
}

fn vector_capacity(rt: &mut Runtime, args: &[Value]) -> Result<Value, LispError> {
    match args {
        [Value::Vector(r)] => Ok(Value::Int(rt.heap.vector_capacity(*r)? as i32)),
        [other] => Err(LispError::type_error("vector-capacity", "vector", *other, 0)),
        _ => Err(LispError::arity_error("vector-capacity", "1", args.len())),
    }
}

fn vector_ref(rt: &mut Runtime, args: &[Value]) -> Result<Value, LispError> {
    let [vec_val, index] = args else {
        return Err(LispError::arity_error("vector-ref", "2", args.len()));
    };
    let r = match vec_val {
        Value::Vector(r) => *r,
        other => return Err(LispError::type_error("vector-ref", "vector", *other, 0)),
    };
    let index = expect_int(*index, "vector-ref", 1)?;
    let items = rt.heap.vector_items(r)?;
    if index < 0 || index as usize >= items.len() {
        return Err(LispError::range_error("vector-ref", index.max(0) as usize, items.len()));
    }
    Ok(items[index as usize])
}

fn vector_set(rt: &mut Runtime, args: &[Value]) -> Result<Value, LispError> {
    let [vec_val, index, value] = args else {
        return Err(LispError::arity_error("vector-set!", "3", args.len()));
    };
    let r = match vec_val {
        Value::Vector(r) => *r,
        other => return Err(LispError::type_error("vector-set!", "vector", *other, 0)),
    };
    let index = expect_int(*index, "vector-set!", 1)?;
    if index < 0 {
        let len = rt.heap.vector_items(r)?.len();
        return Err(LispError::range_error("vector-set!", 0, len));
    }
    rt.heap.vector_set(r, index as usize, *value)?;
    Ok(Value::Nil)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn make_vector_fills_and_reports_length() {
        let mut rt = Runtime::new();
        let v = make_vector(&mut rt, &[Value::Int(3), Value::Int(9)]).unwrap();
        assert_eq!(vector_length(&mut rt, &[v]).unwrap(), Value::Int(3));
        for i in 0..3 {
            assert_eq!(vector_ref(&mut rt, &[v, Value::Int(i)]).unwrap(), Value::Int(9));
        }
    }

    #[test]
    fn out_of_bounds_ref_is_range_error() {
        let mut rt = Runtime::new();
        let v = make_vector(&mut rt, &[Value::Int(2), Value::Int(0)]).unwrap();
        assert!(matches!(
            vector_ref(&mut rt, &[v, Value::Int(5)]),
            Err(LispError::RangeError { .. })
        ));
    }

    #[test]
    fn vector_set_mutates_in_place() {
        let mut rt = Runtime::new();
        let v = make_vector(&mut rt, &[Value::Int(2), Value::Int(0)]).unwrap();
        vector_set(&mut rt, &[v, Value::Int(1), Value::Int(42)]).unwrap();
        assert_eq!(vector_ref(&mut rt, &[v, Value::Int(1)]).unwrap(), Value::Int(42));
    }
}
