// ABOUTME: Output native procedures

use crate::error::LispError;
use crate::runtime::Runtime;
use crate::value::Value;

pub fn register(rt: &mut Runtime) {
    rt.register_native("display", Some(1), display);
}

fn display(rt: &mut Runtime, args: &[Value]) -> Result<Value, LispError> {
    let [v] = args else {
        return Err(LispError::arity_error("display", "1", args.len()));
    };
    crate::printer::print(rt, *v)?;
    Ok(Value::Nil)
}
