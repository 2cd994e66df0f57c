//! The session facade.
//!
//! A `Session` owns the stack registry, the task registry, and the global
//! memory grid; nothing here is ambient global state. The front-end hands
//! it compound command lines (`dispatch`) and structured lifecycle
//! requests (the remaining methods) and gets human-readable status text
//! back.

use crate::config::SessionConfig;
use crate::dispatch;
use crate::engine::ExecContext;
use crate::registry::{StackHandle, StackRegistry};
use crate::spawn::SpawnStatus;
use crate::tasks::TaskRegistry;
use std::sync::Arc;
use tracing::info;
use vantage_core::{CellGrid, Perspective, RuntimeError, Value, ValueType};

pub struct Session {
    stacks: Arc<StackRegistry>,
    tasks: Arc<TaskRegistry>,
    memory: Arc<CellGrid>,
    config: SessionConfig,
}

impl Session {
    /// Build a session from environment tunables.
    pub fn new() -> Self {
        Self::with_config(SessionConfig::from_env())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        Session {
            stacks: Arc::new(StackRegistry::new()),
            tasks: Arc::new(TaskRegistry::new()),
            memory: Arc::new(CellGrid::new(config.memory_cells)),
            config,
        }
    }

    fn ctx(&self) -> ExecContext {
        ExecContext {
            stacks: Arc::clone(&self.stacks),
            memory: Arc::clone(&self.memory),
            tasks: Arc::downgrade(&self.tasks),
        }
    }

    /// Dispatch one compound command line (`@<name>: <sub-commands>`),
    /// returning one status line per sub-command.
    pub fn dispatch(&self, line: &str) -> Vec<String> {
        dispatch::dispatch_line(line, &self.ctx())
    }

    // ------------------------------------------------------------------
    // Stack lifecycle
    // ------------------------------------------------------------------

    /// Create a stack, replacing any existing stack of the same name.
    /// Perspective defaults to LIFO and capacity to the configured
    /// ceiling.
    pub fn create_stack(
        &self,
        name: &str,
        elem: ValueType,
        perspective: Option<Perspective>,
        capacity: Option<usize>,
    ) -> String {
        let perspective = perspective.unwrap_or_default();
        let capacity = capacity.unwrap_or(self.config.stack_capacity);
        let (_, replaced) = self.stacks.create(name, elem, perspective, capacity);
        info!(stack = name, %elem, %perspective, capacity, replaced, "stack created");
        let what = if replaced { "replaced" } else { "created" };
        format!(
            "stack `{}` {} ({} {}, capacity {})",
            name, what, elem, perspective, capacity
        )
    }

    pub fn destroy_stack(&self, name: &str) -> Result<(), RuntimeError> {
        self.stacks.remove(name)?;
        info!(stack = name, "stack destroyed");
        Ok(())
    }

    pub fn stack_names(&self) -> Vec<String> {
        self.stacks.names()
    }

    /// Resolve a stack handle. Handles do not survive a replace: resolve
    /// again rather than caching.
    pub fn stack(&self, name: &str) -> Option<StackHandle> {
        self.stacks.resolve(name)
    }

    pub fn render_stack(&self, name: &str) -> Result<String, RuntimeError> {
        let handle = self
            .stacks
            .resolve(name)
            .ok_or_else(|| RuntimeError::UnknownTarget(name.to_string()))?;
        Ok(crate::engine::lock_stack(&handle).render())
    }

    // ------------------------------------------------------------------
    // Spawn lifecycle
    // ------------------------------------------------------------------

    pub fn create_spawn(&self, name: &str) -> Result<String, RuntimeError> {
        self.tasks
            .create(name, self.config.stack_capacity, self.ctx())?;
        info!(spawn = name, "spawn created");
        Ok(format!("spawn `{}` created", name))
    }

    pub fn destroy_spawn(&self, name: &str) -> Result<(), RuntimeError> {
        self.tasks.destroy(name)?;
        info!(spawn = name, "spawn destroyed");
        Ok(())
    }

    pub fn spawn_names(&self) -> Vec<String> {
        self.tasks.names()
    }

    pub fn spawn_status(&self, name: &str) -> Result<SpawnStatus, RuntimeError> {
        Ok(self
            .tasks
            .resolve(name)
            .ok_or_else(|| RuntimeError::UnknownTarget(name.to_string()))?
            .status())
    }

    /// Queue a script (one or more newline-separated command lines) for a
    /// spawn and wake it.
    pub fn deposit_script(&self, name: &str, script: &str) -> Result<String, RuntimeError> {
        self.tasks
            .resolve(name)
            .ok_or_else(|| RuntimeError::UnknownTarget(name.to_string()))?
            .deposit(script.to_string());
        Ok(format!("{}: script deposited", name))
    }

    pub fn pause_spawn(&self, name: &str) -> Result<(), RuntimeError> {
        self.tasks.pause(name)
    }

    pub fn resume_spawn(&self, name: &str) -> Result<(), RuntimeError> {
        self.tasks.resume(name)
    }

    pub fn stop_spawn(&self, name: &str) -> Result<(), RuntimeError> {
        self.tasks.stop(name)
    }

    /// Block until the named spawn has drained its mailbox (or stopped).
    pub fn wait_spawn_idle(&self, name: &str) -> Result<(), RuntimeError> {
        self.tasks
            .resolve(name)
            .ok_or_else(|| RuntimeError::UnknownTarget(name.to_string()))?
            .wait_idle();
        Ok(())
    }

    /// Drain the status lines the spawn's scripts have produced.
    pub fn spawn_output(&self, name: &str) -> Result<Vec<String>, RuntimeError> {
        Ok(self
            .tasks
            .resolve(name)
            .ok_or_else(|| RuntimeError::UnknownTarget(name.to_string()))?
            .take_output())
    }

    pub fn spawn_workspace_render(&self, name: &str) -> Result<String, RuntimeError> {
        Ok(self
            .tasks
            .resolve(name)
            .ok_or_else(|| RuntimeError::UnknownTarget(name.to_string()))?
            .workspace_render())
    }

    pub fn spawn_workspace_values(&self, name: &str) -> Result<Vec<Value>, RuntimeError> {
        Ok(self
            .tasks
            .resolve(name)
            .ok_or_else(|| RuntimeError::UnknownTarget(name.to_string()))?
            .workspace_values())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Session {
    /// Stop and join every spawn so worker threads never outlive the
    /// registries they reference.
    fn drop(&mut self) {
        self.tasks.stop_all();
    }
}
