//! The stack registry.
//!
//! Owns every named stack. Lookups take the read lock and hand back a
//! fresh `Arc` handle; structural changes (create/replace/remove) take the
//! write lock. Replacing a name swaps the map entry for a brand new stack,
//! which is what invalidates previously issued handles: callers must
//! re-resolve by name and never cache a handle across a replace.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use vantage_core::{Perspective, RuntimeError, TypedStack, ValueType};

/// A resolved stack: the per-stack mutex is the critical section every
/// mutation runs under.
pub type StackHandle = Arc<Mutex<TypedStack>>;

#[derive(Default)]
pub struct StackRegistry {
    stacks: RwLock<HashMap<String, StackHandle>>,
}

impl StackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a stack, replacing any existing stack of the same name.
    /// Returns the new handle and whether a replacement happened.
    pub fn create(
        &self,
        name: &str,
        elem: ValueType,
        perspective: Perspective,
        capacity: usize,
    ) -> (StackHandle, bool) {
        let handle = Arc::new(Mutex::new(TypedStack::new(name, elem, perspective, capacity)));
        let mut map = self
            .stacks
            .write()
            .expect("stack registry lock poisoned: a writer panicked");
        let replaced = map.insert(name.to_string(), Arc::clone(&handle)).is_some();
        (handle, replaced)
    }

    pub fn resolve(&self, name: &str) -> Option<StackHandle> {
        let map = self
            .stacks
            .read()
            .expect("stack registry lock poisoned: a writer panicked");
        map.get(name).cloned()
    }

    pub fn remove(&self, name: &str) -> Result<(), RuntimeError> {
        let mut map = self
            .stacks
            .write()
            .expect("stack registry lock poisoned: a writer panicked");
        map.remove(name)
            .map(|_| ())
            .ok_or_else(|| RuntimeError::UnknownTarget(name.to_string()))
    }

    /// Registered names, sorted for stable enumeration output.
    pub fn names(&self) -> Vec<String> {
        let map = self
            .stacks
            .read()
            .expect("stack registry lock poisoned: a writer panicked");
        let mut names: Vec<String> = map.keys().cloned().collect();
        names.sort();
        names
    }
}
