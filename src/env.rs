// ABOUTME: Environment operations — ordered bindings with parent-chain lookup

use crate::error::LispError;
use crate::heap::{Heap, HeapRef};
use crate::symbol::SymbolId;
use crate::value::Value;

/// Defines `sym` in `env` itself, never walking the parent chain.
///
/// Redefinition is permitted only when `env` is the designated top-level
/// frame; redefining an existing binding in any other (local) frame is a
/// user error.
pub fn define(
    heap: &mut Heap,
    env: HeapRef,
    sym: SymbolId,
    name: &str,
    value: Value,
    is_top_level: bool,
) -> Result<(), LispError> {
    if !is_top_level && heap.env_own_binding(env, sym)?.is_some() {
        return Err(LispError::Internal(format!(
            "{} is already defined in this scope",
            name
        )));
    }
    heap.env_insert(env, sym, value)
}

/// Inserts or overwrites a binding in `env` itself, bypassing the duplicate
/// check. Used internally to pre-declare `letrec` names and then backfill
/// them once their initializers have been evaluated.
pub fn force_define(heap: &mut Heap, env: HeapRef, sym: SymbolId, value: Value) -> Result<(), LispError> {
    heap.env_insert(env, sym, value)
}

/// Walks `env` then its ancestors looking for `sym`; the first match wins.
pub fn lookup(heap: &Heap, env: HeapRef, sym: SymbolId, name: &str) -> Result<Value, LispError> {
    heap.env_lookup(env, sym)?
        .ok_or_else(|| LispError::UnboundVariable(name.to_string()))
}

/// Walks the parent chain looking for an existing binding to overwrite in
/// place; raises `unbound variable` if none exists. Never creates a binding.
pub fn assign(heap: &mut Heap, env: HeapRef, sym: SymbolId, name: &str, value: Value) -> Result<(), LispError> {
    if heap.env_assign(env, sym, value)? {
        Ok(())
    } else {
        Err(LispError::UnboundVariable(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Heap, crate::symbol::SymbolTable, HeapRef) {
        let mut heap = Heap::new();
        let symbols = crate::symbol::SymbolTable::new();
        let env = heap.alloc_env("test", None);
        (heap, symbols, env)
    }

    #[test]
    fn define_then_lookup() {
        let (mut heap, mut symbols, env) = setup();
        let x = symbols.intern("x");
        define(&mut heap, env, x, "x", Value::Int(42), true).unwrap();
        assert_eq!(lookup(&heap, env, x, "x").unwrap(), Value::Int(42));
    }

    #[test]
    fn lookup_missing_is_unbound() {
        let (heap, mut symbols, env) = setup();
        let x = symbols.intern("x");
        assert!(matches!(
            lookup(&heap, env, x, "x"),
            Err(LispError::UnboundVariable(_))
        ));
    }

    #[test]
    fn redefining_in_local_scope_errors() {
        let (mut heap, mut symbols, env) = setup();
        let x = symbols.intern("x");
        define(&mut heap, env, x, "x", Value::Int(1), false).unwrap();
        assert!(define(&mut heap, env, x, "x", Value::Int(2), false).is_err());
    }

    #[test]
    fn redefining_at_top_level_is_allowed() {
        let (mut heap, mut symbols, env) = setup();
        let x = symbols.intern("x");
        define(&mut heap, env, x, "x", Value::Int(1), true).unwrap();
        define(&mut heap, env, x, "x", Value::Int(2), true).unwrap();
        assert_eq!(lookup(&heap, env, x, "x").unwrap(), Value::Int(2));
    }

    #[test]
    fn child_sees_parent_bindings() {
        let mut heap = Heap::new();
        let mut symbols = crate::symbol::SymbolTable::new();
        let parent = heap.alloc_env("parent", None);
        let x = symbols.intern("x");
        define(&mut heap, parent, x, "x", Value::Int(7), true).unwrap();

        let child = heap.alloc_env("child", Some(parent));
        assert_eq!(lookup(&heap, child, x, "x").unwrap(), Value::Int(7));
    }

    #[test]
    fn child_shadows_parent_and_assign_updates_the_shadow() {
        let mut heap = Heap::new();
        let mut symbols = crate::symbol::SymbolTable::new();
        let parent = heap.alloc_env("parent", None);
        let x = symbols.intern("x");
        define(&mut heap, parent, x, "x", Value::Int(7), true).unwrap();

        let child = heap.alloc_env("child", Some(parent));
        define(&mut heap, child, x, "x", Value::Int(9), true).unwrap();
        assert_eq!(lookup(&heap, child, x, "x").unwrap(), Value::Int(9));
        assert_eq!(lookup(&heap, parent, x, "x").unwrap(), Value::Int(7));

        assign(&mut heap, child, x, "x", Value::Int(100)).unwrap();
        assert_eq!(lookup(&heap, child, x, "x").unwrap(), Value::Int(100));
        assert_eq!(lookup(&heap, parent, x, "x").unwrap(), Value::Int(7));
    }

    #[test]
    fn assign_missing_is_unbound_and_creates_nothing() {
        let (mut heap, mut symbols, env) = setup();
        let x = symbols.intern("x");
        assert!(assign(&mut heap, env, x, "x", Value::Int(1)).is_err());
        assert!(heap.env_own_binding(env, x).unwrap().is_none());
    }
}
