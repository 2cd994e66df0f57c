//! The task registry.
//!
//! Owns every live spawn and its join handle. Spawn names are unique;
//! creating a taken name is an error rather than a replace, because a
//! replace would orphan a running thread.
//!
//! Join discipline: handles are taken out of the map under the lock and
//! joined after it is released. A worker resolving this registry mid-script
//! can therefore never deadlock against a destroy or shutdown.

use crate::engine::ExecContext;
use crate::spawn::Spawn;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use tracing::debug;
use vantage_core::RuntimeError;

struct SpawnHandle {
    spawn: Arc<Spawn>,
    thread: Option<JoinHandle<()>>,
}

#[derive(Default)]
pub struct TaskRegistry {
    spawns: Mutex<HashMap<String, SpawnHandle>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_map(&self) -> MutexGuard<'_, HashMap<String, SpawnHandle>> {
        self.spawns
            .lock()
            .expect("task registry lock poisoned: a controller panicked")
    }

    /// Create a spawn. Its thread starts immediately and blocks waiting
    /// for a script.
    pub fn create(
        &self,
        name: &str,
        workspace_capacity: usize,
        ctx: ExecContext,
    ) -> Result<Arc<Spawn>, RuntimeError> {
        let mut map = self.lock_map();
        if map.contains_key(name) {
            return Err(RuntimeError::DuplicateTarget(name.to_string()));
        }
        let spawn = Spawn::new(name, workspace_capacity);
        let worker = Arc::clone(&spawn);
        let thread = thread::Builder::new()
            .name(format!("spawn-{}", name))
            .spawn(move || worker.run(ctx))
            .expect("failed to start a spawn worker thread");
        map.insert(
            name.to_string(),
            SpawnHandle {
                spawn: Arc::clone(&spawn),
                thread: Some(thread),
            },
        );
        debug!(spawn = name, "spawn created");
        Ok(spawn)
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<Spawn>> {
        self.lock_map().get(name).map(|h| Arc::clone(&h.spawn))
    }

    /// Live spawn names regardless of state, sorted for stable output.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock_map().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn pause(&self, name: &str) -> Result<(), RuntimeError> {
        self.resolve(name)
            .ok_or_else(|| RuntimeError::UnknownTarget(name.to_string()))?
            .pause();
        Ok(())
    }

    pub fn resume(&self, name: &str) -> Result<(), RuntimeError> {
        self.resolve(name)
            .ok_or_else(|| RuntimeError::UnknownTarget(name.to_string()))?
            .resume();
        Ok(())
    }

    /// Signal a stop. The registry retains the entry (a stopped spawn
    /// still enumerates) until `destroy` removes it.
    pub fn stop(&self, name: &str) -> Result<(), RuntimeError> {
        self.resolve(name)
            .ok_or_else(|| RuntimeError::UnknownTarget(name.to_string()))?
            .signal_stop();
        Ok(())
    }

    /// Stop the spawn, join its thread, and remove the entry.
    pub fn destroy(&self, name: &str) -> Result<(), RuntimeError> {
        let handle = {
            let mut map = self.lock_map();
            map.remove(name)
                .ok_or_else(|| RuntimeError::UnknownTarget(name.to_string()))?
        };
        handle.spawn.signal_stop();
        if let Some(thread) = handle.thread {
            let _ = thread.join();
        }
        debug!(spawn = name, "spawn destroyed");
        Ok(())
    }

    /// Stop and join every spawn. Used at session teardown.
    pub fn stop_all(&self) {
        let handles: Vec<SpawnHandle> = {
            let mut map = self.lock_map();
            map.drain().map(|(_, handle)| handle).collect()
        };
        for handle in &handles {
            handle.spawn.signal_stop();
        }
        for handle in handles {
            if let Some(thread) = handle.thread {
                let _ = thread.join();
            }
        }
    }
}
