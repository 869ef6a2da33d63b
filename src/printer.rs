// ABOUTME: Formats a Value as a string; needs Heap/SymbolTable access so it
// cannot live behind the plain std::fmt::Display trait.

use crate::error::LispError;
use crate::heap::Heap;
use crate::runtime::Runtime;
use crate::symbol::SymbolTable;
use crate::value::Value;

pub fn format_value(heap: &Heap, symbols: &SymbolTable, value: Value) -> Result<String, LispError> {
    let mut out = String::new();
    write_value(heap, symbols, value, &mut out)?;
    Ok(out)
}

fn write_value(heap: &Heap, symbols: &SymbolTable, value: Value, out: &mut String) -> Result<(), LispError> {
    match value {
        Value::Nil => out.push_str("()"),
        Value::Bool(true) => out.push_str("#T"),
        Value::Bool(false) => out.push_str("#F"),
        Value::Int(n) => out.push_str(&n.to_string()),
        Value::Symbol(id) => out.push_str(symbols.name(id)),
        Value::Str(r) => write_escaped_string(heap.str_value(r)?, out),
        Value::Pair(r) => write_pair(heap, symbols, r, out)?,
        Value::Vector(r) => write_vector(heap, symbols, r, out)?,
        Value::Procedure(r) => {
            let proc = heap.procedure(r)?;
            out.push_str("[Procedure ");
            out.push_str(symbols.name(proc.name));
            out.push(']');
        }
        Value::Exception => {
            return Err(LispError::Internal(
                "attempted to print the Exception sentinel".into(),
            ));
        }
    }
    Ok(())
}

fn write_escaped_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
}

fn write_pair(
    heap: &Heap,
    symbols: &SymbolTable,
    r: crate::heap::HeapRef,
    out: &mut String,
) -> Result<(), LispError> {
    out.push('(');
    let (mut car, mut cdr) = heap.pair(r)?;
    write_value(heap, symbols, car, out)?;
    loop {
        match cdr {
            Value::Nil => break,
            Value::Pair(next) => {
                out.push(' ');
                let (next_car, next_cdr) = heap.pair(next)?;
                car = next_car;
                cdr = next_cdr;
                write_value(heap, symbols, car, out)?;
            }
            other => {
                out.push_str(" . ");
                write_value(heap, symbols, other, out)?;
                break;
            }
        }
    }
    out.push(')');
    Ok(())
}

fn write_vector(
    heap: &Heap,
    symbols: &SymbolTable,
    r: crate::heap::HeapRef,
    out: &mut String,
) -> Result<(), LispError> {
    out.push_str("#(");
    let items = heap.vector_items(r)?.to_vec();
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        write_value(heap, symbols, item, out)?;
    }
    out.push(')');
    Ok(())
}

pub fn display(rt: &Runtime, value: Value) -> Result<String, LispError> {
    format_value(&rt.heap, &rt.symbols, value)
}

pub fn print(rt: &Runtime, value: Value) -> Result<(), LispError> {
    println!("{}", display(rt, value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Runtime;

    #[test]
    fn formats_atoms() {
        let rt = Runtime::new();
        assert_eq!(display(&rt, Value::Nil).unwrap(), "()");
        assert_eq!(display(&rt, Value::Bool(true)).unwrap(), "#T");
        assert_eq!(display(&rt, Value::Bool(false)).unwrap(), "#F");
        assert_eq!(display(&rt, Value::Int(-7)).unwrap(), "-7");
    }

    #[test]
    fn formats_proper_and_improper_lists() {
        let mut rt = Runtime::new();
        let a = rt.heap.alloc_pair(Value::Int(1), Value::Nil);
        let proper = rt.heap.alloc_pair(Value::Int(0), Value::Pair(a));
        assert_eq!(display(&rt, Value::Pair(proper)).unwrap(), "(0 1)");

        let improper = rt.heap.alloc_pair(Value::Int(1), Value::Int(2));
        assert_eq!(display(&rt, Value::Pair(improper)).unwrap(), "(1 . 2)");
    }

    #[test]
    fn formats_vector_and_string() {
        let mut rt = Runtime::new();
        let v = rt.heap.alloc_vector(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(display(&rt, Value::Vector(v)).unwrap(), "#(1 2)");

        let s = rt.heap.alloc_str("hi\n".to_string());
        assert_eq!(display(&rt, Value::Str(s)).unwrap(), "\"hi\\n\"");
    }

    #[test]
    fn exception_refuses_to_print() {
        let rt = Runtime::new();
        assert!(display(&rt, Value::Exception).is_err());
    }
}
