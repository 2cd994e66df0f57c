//! Vantage Runtime: the execution engine behind the perspective stacks.
//!
//! Layered over `vantage-core`:
//!
//! - `verbs`: the closed verb set and sub-command parsing
//! - `arith` / `text_ops`: numeric, bitwise, and text operations
//! - `engine`: executes one verb against a selected stack
//! - `dispatch`: compound command lines, per-sub-command error tolerance
//! - `registry`: the name-to-stack registry
//! - `spawn` / `tasks`: thread-per-spawn workers and their registry
//! - `config`: environment tunables
//! - `session`: the owning facade the front-end talks to
//!
//! The front-end (line editing, prompts, top-level routing) is a separate
//! collaborator; it hands a `Session` command lines and lifecycle requests
//! and renders the returned status text.

pub mod arith;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod registry;
pub mod session;
pub mod spawn;
pub mod tasks;
pub mod text_ops;
pub mod verbs;

pub use config::SessionConfig;
pub use engine::ExecContext;
pub use registry::{StackHandle, StackRegistry};
pub use session::Session;
pub use spawn::{Spawn, SpawnPhase, SpawnStatus};
pub use tasks::TaskRegistry;
pub use verbs::Verb;

// Re-export the core data model so dependents rarely need both crates.
pub use vantage_core::{CellGrid, Perspective, RuntimeError, TypedStack, Value, ValueType};
