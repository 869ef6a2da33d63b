// ABOUTME: Runtime — bundles the heap, symbol table, and root environments
// that every other component is threaded through.

use crate::env;
use crate::error::LispError;
use crate::heap::{Heap, HeapRef, ProcedureKind};
use crate::symbol::{SymbolId, SymbolTable};
use crate::value::Value;

/// The process-wide state of one interpreter instance: object manager,
/// symbol interner, root environments, and the pending-exception stack
/// that `eval`'s public boundary lowers errors onto.
pub struct Runtime {
    pub heap: Heap,
    pub symbols: SymbolTable,
    pub global: HeapRef,
    pub top_level: HeapRef,
    exceptions: Vec<LispError>,
    /// Explicit GC roots for values (typically native-call argument
    /// buffers) held outside any environment for the duration of a call.
    frames: Vec<Value>,
    /// Environments on the evaluator's dynamic call chain. `eval` pushes
    /// its `env_ref` on entry and pops on exit, so every environment still
    /// being evaluated against is rooted regardless of whether anything
    /// else references it yet.
    env_frames: Vec<HeapRef>,
}

impl Runtime {
    pub fn new() -> Self {
        let mut heap = Heap::new();
        let global = heap.alloc_env("<global>", None);
        let top_level = heap.alloc_env("top-level", Some(global));
        let mut rt = Runtime {
            heap,
            symbols: SymbolTable::new(),
            global,
            top_level,
            exceptions: Vec::new(),
            frames: Vec::new(),
            env_frames: Vec::new(),
        };
        crate::builtins::register_all(&mut rt);
        rt
    }

    /// Pushes a value as a GC root for the duration of some nested
    /// evaluation; must be paired with `unroot`.
    pub fn root(&mut self, value: Value) {
        self.frames.push(value);
    }

    pub fn root_many(&mut self, values: &[Value]) {
        self.frames.extend_from_slice(values);
    }

    /// Pops `count` most-recently pushed roots. Frames are a stack, so
    /// callers must unroot in the reverse order they rooted.
    pub fn unroot(&mut self, count: usize) {
        let new_len = self.frames.len().saturating_sub(count);
        self.frames.truncate(new_len);
    }

    pub fn push_env_frame(&mut self, env: HeapRef) {
        self.env_frames.push(env);
    }

    pub fn pop_env_frame(&mut self) {
        self.env_frames.pop();
    }

    fn roots(&self) -> Vec<HeapRef> {
        let mut roots = vec![self.global, self.top_level];
        roots.extend_from_slice(&self.env_frames);
        for v in &self.frames {
            if let Some(r) = v.heap_ref() {
                roots.push(r);
            }
        }
        roots
    }

    /// Runs a collection if the heap's adaptive threshold says it's due.
    /// Called at every allocation point.
    pub fn maybe_collect(&mut self) {
        if self.heap.should_collect() {
            self.collect();
        }
    }

    pub fn collect(&mut self) {
        let roots = self.roots();
        self.heap.collect(roots);
    }

    pub fn intern(&mut self, name: &str) -> SymbolId {
        self.symbols.intern(name)
    }

    pub fn symbol_name(&self, id: SymbolId) -> &str {
        self.symbols.name(id)
    }

    pub fn push_exception(&mut self, err: LispError) {
        self.exceptions.push(err);
    }

    /// Pops the most recently raised error, per the embedding surface's
    /// `get_exception`.
    pub fn get_exception(&mut self) -> Option<LispError> {
        self.exceptions.pop()
    }

    pub fn print_exception(&mut self) {
        if let Some(err) = self.get_exception() {
            println!("Error: {}", err);
        }
    }

    /// Public evaluation entry point: lowers an internal `Result` onto the
    /// sentinel-plus-exception-list contract the embedding surface expects.
    pub fn eval(&mut self, env: HeapRef, value: Value) -> Value {
        match crate::eval::eval(self, env, value) {
            Ok(v) => v,
            Err(e) => {
                self.push_exception(e);
                Value::Exception
            }
        }
    }

    pub fn define_global(&mut self, name: &str, value: Value) -> Result<(), LispError> {
        let sym = self.intern(name);
        env::force_define(&mut self.heap, self.global, sym, value)
    }

    pub fn register_native(
        &mut self,
        name: &str,
        arg_max: Option<usize>,
        func: crate::heap::NativeFn,
    ) {
        let sym = self.intern(name);
        let proc = crate::heap::Procedure {
            name: sym,
            params: crate::heap::ParamSpec::Rest(sym),
            body: Vec::new(),
            kind: ProcedureKind::Native { func, arg_max },
        };
        let r = self.heap.alloc_procedure(proc);
        // Registration happens once at startup, before any rooted frame
        // could possibly reference this symbol, so a bare insert is safe.
        let _ = env::force_define(&mut self.heap, self.global, sym, Value::Procedure(r));
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_runtime_has_nested_top_level() {
        let rt = Runtime::new();
        assert_eq!(rt.heap.env_parent(rt.top_level).unwrap(), Some(rt.global));
    }

    #[test]
    fn exception_stack_is_lifo() {
        let mut rt = Runtime::new();
        rt.push_exception(LispError::OutOfMemory);
        rt.push_exception(LispError::UnboundVariable("x".into()));
        assert!(matches!(
            rt.get_exception(),
            Some(LispError::UnboundVariable(_))
        ));
        assert!(matches!(rt.get_exception(), Some(LispError::OutOfMemory)));
        assert!(rt.get_exception().is_none());
    }
}
