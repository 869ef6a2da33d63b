// ABOUTME: Object manager — arena-backed tracing collector for heap values

use crate::error::LispError;
use crate::symbol::SymbolId;
use crate::value::Value;
use std::collections::HashMap;

/// A reference to a heap-resident object. The generation guards against
/// accidentally dereferencing a slot that has since been recycled; under
/// correct rooting discipline this should never fire, so a mismatch is
/// reported as an internal error rather than silently aliasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeapRef {
    index: u32,
    generation: u32,
}

/// Parameter specification for an interpreted procedure.
#[derive(Debug, Clone)]
pub enum ParamSpec {
    Fixed(Vec<SymbolId>),
    Rest(SymbolId),
    Mixed(Vec<SymbolId>, SymbolId),
}

impl ParamSpec {
    pub fn arity_matches(&self, n: usize) -> bool {
        match self {
            ParamSpec::Fixed(p) => p.len() == n,
            ParamSpec::Rest(_) => true,
            ParamSpec::Mixed(p, _) => n >= p.len(),
        }
    }
}

pub type NativeFn = fn(&mut crate::runtime::Runtime, &[Value]) -> Result<Value, LispError>;

#[derive(Clone, Copy)]
pub enum ProcedureKind {
    Native { func: NativeFn, arg_max: Option<usize> },
    Interpreted { env: HeapRef },
}

#[derive(Clone)]
pub struct Procedure {
    pub name: SymbolId,
    pub params: ParamSpec,
    /// Body forms, sequentially evaluated; empty for native procedures.
    pub body: Vec<Value>,
    pub kind: ProcedureKind,
}

pub struct Env {
    pub name: &'static str,
    pub parent: Option<HeapRef>,
    pub bindings: HashMap<SymbolId, Value>,
}

pub enum Object {
    Pair { car: Value, cdr: Value },
    Str(String),
    Vector { items: Vec<Value>, capacity: usize },
    Procedure(Procedure),
    Env(Env),
}

struct Slot {
    generation: u32,
    marked: bool,
    object: Option<Object>,
}

/// Heap object manager. Collection is a mark-sweep trace run only at
/// allocation points: roots are the top-level environment plus
/// whatever the evaluator has explicitly rooted in `frames` for the duration
/// of a call that might itself allocate.
pub struct Heap {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    live_count: usize,
    threshold: usize,
    collections_run: usize,
}

const INITIAL_THRESHOLD: usize = 128;

impl Heap {
    pub fn new() -> Self {
        Heap {
            slots: Vec::new(),
            free_list: Vec::new(),
            live_count: 0,
            threshold: INITIAL_THRESHOLD,
            collections_run: 0,
        }
    }

    pub fn live_count(&self) -> usize {
        self.live_count
    }

    pub fn collections_run(&self) -> usize {
        self.collections_run
    }

    pub fn should_collect(&self) -> bool {
        self.live_count >= self.threshold
    }

    fn insert(&mut self, object: Object) -> HeapRef {
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.object = Some(object);
            self.live_count += 1;
            return HeapRef {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            marked: false,
            object: Some(object),
        });
        self.live_count += 1;
        HeapRef {
            index,
            generation: 0,
        }
    }

    pub fn alloc_pair(&mut self, car: Value, cdr: Value) -> HeapRef {
        self.insert(Object::Pair { car, cdr })
    }

    pub fn alloc_str(&mut self, s: String) -> HeapRef {
        self.insert(Object::Str(s))
    }

    pub fn alloc_vector(&mut self, items: Vec<Value>) -> HeapRef {
        let capacity = items.len();
        self.insert(Object::Vector { items, capacity })
    }

    pub fn alloc_procedure(&mut self, proc: Procedure) -> HeapRef {
        self.insert(Object::Procedure(proc))
    }

    pub fn alloc_env(&mut self, name: &'static str, parent: Option<HeapRef>) -> HeapRef {
        self.insert(Object::Env(Env {
            name,
            parent,
            bindings: HashMap::new(),
        }))
    }

    fn slot(&self, r: HeapRef) -> Result<&Object, LispError> {
        let slot = &self.slots[r.index as usize];
        if slot.generation != r.generation || slot.object.is_none() {
            return Err(LispError::Internal(
                "dereferenced a stale heap reference".into(),
            ));
        }
        Ok(slot.object.as_ref().unwrap())
    }

    fn slot_mut(&mut self, r: HeapRef) -> Result<&mut Object, LispError> {
        let slot = &mut self.slots[r.index as usize];
        if slot.generation != r.generation || slot.object.is_none() {
            return Err(LispError::Internal(
                "dereferenced a stale heap reference".into(),
            ));
        }
        Ok(slot.object.as_mut().unwrap())
    }

    pub fn get(&self, r: HeapRef) -> Result<&Object, LispError> {
        self.slot(r)
    }

    pub fn get_mut(&mut self, r: HeapRef) -> Result<&mut Object, LispError> {
        self.slot_mut(r)
    }

    pub fn pair(&self, r: HeapRef) -> Result<(Value, Value), LispError> {
        match self.slot(r)? {
            Object::Pair { car, cdr } => Ok((*car, *cdr)),
            _ => Err(LispError::Internal("expected pair".into())),
        }
    }

    pub fn str_value(&self, r: HeapRef) -> Result<&str, LispError> {
        match self.slot(r)? {
            Object::Str(s) => Ok(s.as_str()),
            _ => Err(LispError::Internal("expected string".into())),
        }
    }

    pub fn vector_items(&self, r: HeapRef) -> Result<&[Value], LispError> {
        match self.slot(r)? {
            Object::Vector { items, .. } => Ok(items.as_slice()),
            _ => Err(LispError::Internal("expected vector".into())),
        }
    }

    pub fn vector_capacity(&self, r: HeapRef) -> Result<usize, LispError> {
        match self.slot(r)? {
            Object::Vector { capacity, .. } => Ok(*capacity),
            _ => Err(LispError::Internal("expected vector".into())),
        }
    }

    pub fn vector_set(&mut self, r: HeapRef, index: usize, value: Value) -> Result<(), LispError> {
        match self.slot_mut(r)? {
            Object::Vector { items, .. } => {
                if index >= items.len() {
                    return Err(LispError::range_error("vector-set!", index, items.len()));
                }
                items[index] = value;
                Ok(())
            }
            _ => Err(LispError::Internal("expected vector".into())),
        }
    }

    pub fn procedure(&self, r: HeapRef) -> Result<&Procedure, LispError> {
        match self.slot(r)? {
            Object::Procedure(p) => Ok(p),
            _ => Err(LispError::Internal("expected procedure".into())),
        }
    }

    pub fn env_parent(&self, r: HeapRef) -> Result<Option<HeapRef>, LispError> {
        match self.slot(r)? {
            Object::Env(e) => Ok(e.parent),
            _ => Err(LispError::Internal("expected environment".into())),
        }
    }

    pub fn env_own_binding(&self, r: HeapRef, sym: SymbolId) -> Result<Option<Value>, LispError> {
        match self.slot(r)? {
            Object::Env(e) => Ok(e.bindings.get(&sym).copied()),
            _ => Err(LispError::Internal("expected environment".into())),
        }
    }

    pub fn env_insert(&mut self, r: HeapRef, sym: SymbolId, value: Value) -> Result<(), LispError> {
        match self.slot_mut(r)? {
            Object::Env(e) => {
                e.bindings.insert(sym, value);
                Ok(())
            }
            _ => Err(LispError::Internal("expected environment".into())),
        }
    }

    /// Walks `r` and its ancestors looking for `sym`; on a hit, overwrites the
    /// binding in place and returns `true`. Never creates a new binding.
    pub fn env_assign(&mut self, r: HeapRef, sym: SymbolId, value: Value) -> Result<bool, LispError> {
        let mut current = Some(r);
        while let Some(env_ref) = current {
            let (found, parent) = match self.slot_mut(env_ref)? {
                Object::Env(e) => (e.bindings.contains_key(&sym), e.parent),
                _ => return Err(LispError::Internal("expected environment".into())),
            };
            if found {
                if let Object::Env(e) = self.slot_mut(env_ref)? {
                    e.bindings.insert(sym, value);
                }
                return Ok(true);
            }
            current = parent;
        }
        Ok(false)
    }

    pub fn env_lookup(&self, r: HeapRef, sym: SymbolId) -> Result<Option<Value>, LispError> {
        let mut current = Some(r);
        while let Some(env_ref) = current {
            match self.slot(env_ref)? {
                Object::Env(e) => {
                    if let Some(v) = e.bindings.get(&sym) {
                        return Ok(Some(*v));
                    }
                    current = e.parent;
                }
                _ => return Err(LispError::Internal("expected environment".into())),
            }
        }
        Ok(None)
    }

    fn trace_value(value: Value, out: &mut Vec<HeapRef>) {
        if let Some(r) = value.heap_ref() {
            out.push(r);
        }
    }

    /// Enumerates every heap reference that `object` directly holds.
    fn trace_object(object: &Object, out: &mut Vec<HeapRef>) {
        match object {
            Object::Pair { car, cdr } => {
                Self::trace_value(*car, out);
                Self::trace_value(*cdr, out);
            }
            Object::Str(_) => {}
            Object::Vector { items, .. } => {
                for v in items {
                    Self::trace_value(*v, out);
                }
            }
            Object::Procedure(p) => {
                for v in &p.body {
                    Self::trace_value(*v, out);
                }
                if let ProcedureKind::Interpreted { env } = p.kind {
                    out.push(env);
                }
            }
            Object::Env(e) => {
                if let Some(parent) = e.parent {
                    out.push(parent);
                }
                for v in e.bindings.values() {
                    Self::trace_value(*v, out);
                }
            }
        }
    }

    /// Runs one mark-sweep collection cycle over the given root set.
    /// Reclaims every unreached object, including ones only reachable
    /// through each other (cycles) — the defining property this collector
    /// must provide.
    pub fn collect(&mut self, roots: impl IntoIterator<Item = HeapRef>) {
        let mut stack: Vec<HeapRef> = roots.into_iter().collect();
        while let Some(r) = stack.pop() {
            let slot = &mut self.slots[r.index as usize];
            if slot.marked || slot.object.is_none() {
                continue;
            }
            slot.marked = true;
            let mut children = Vec::new();
            Self::trace_object(slot.object.as_ref().unwrap(), &mut children);
            stack.extend(children);
        }

        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.object.is_some() {
                if slot.marked {
                    slot.marked = false;
                } else {
                    slot.object = None;
                    slot.generation = slot.generation.wrapping_add(1);
                    self.free_list.push(index as u32);
                    self.live_count -= 1;
                }
            }
        }

        self.collections_run += 1;
        self.threshold = std::cmp::max(INITIAL_THRESHOLD, self.live_count * 2);
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}
