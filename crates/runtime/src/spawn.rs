//! Spawn workers.
//!
//! A spawn is a named concurrent execution context: one OS thread, a
//! mailbox of pending scripts, a private Integer workspace stack, and an
//! output buffer. The thread starts at creation and blocks until a script
//! arrives or a stop is signaled.
//!
//! ## Mailbox protocol
//!
//! The mailbox is an explicit ordered queue, not a one-slot cell: a
//! deposit never overwrites a pending script, and scripts execute in
//! deposit order. All coordination runs through one mutex and two condition
//! variables. The worker waits on `wake`; observers performing the
//! synchronized handoff wait on `idle`. Notifications happen while the
//! mutex is held so a wakeup can never be missed between the predicate
//! check and the wait.
//!
//! ## Cancellation
//!
//! `stop` is cooperative: the flag is observed while waiting and between
//! script lines, never mid-operation. Once observed, the worker exits its
//! loop without consuming anything further and the phase becomes the
//! terminal `Stopped`.

use crate::dispatch;
use crate::engine::ExecContext;
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use tracing::{debug, warn};
use vantage_core::{Perspective, TypedStack, Value, ValueType};

/// Lifecycle phase of a spawn's thread of control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnPhase {
    WaitingForScript,
    Executing,
    Stopped,
}

/// A point-in-time view of a spawn's state. `paused` is orthogonal to the
/// phase: a paused spawn still reports `WaitingForScript`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnStatus {
    pub phase: SpawnPhase,
    pub paused: bool,
    pub pending: usize,
}

#[derive(Debug)]
struct MailboxInner {
    queue: VecDeque<String>,
    paused: bool,
    stopping: bool,
    phase: SpawnPhase,
}

pub struct Spawn {
    name: String,
    inner: Mutex<MailboxInner>,
    wake: Condvar,
    idle: Condvar,
    workspace: Mutex<TypedStack>,
    output: Mutex<Vec<String>>,
}

impl Spawn {
    pub(crate) fn new(name: &str, workspace_capacity: usize) -> Arc<Spawn> {
        Arc::new(Spawn {
            name: name.to_string(),
            inner: Mutex::new(MailboxInner {
                queue: VecDeque::new(),
                paused: false,
                stopping: false,
                phase: SpawnPhase::WaitingForScript,
            }),
            wake: Condvar::new(),
            idle: Condvar::new(),
            workspace: Mutex::new(TypedStack::new(
                name,
                ValueType::Int,
                Perspective::Lifo,
                workspace_capacity,
            )),
            output: Mutex::new(Vec::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn lock_inner(&self) -> MutexGuard<'_, MailboxInner> {
        self.inner
            .lock()
            .expect("spawn mailbox poisoned: a controller panicked while holding it")
    }

    /// Queue a script and wake the worker.
    pub fn deposit(&self, script: String) {
        let mut inner = self.lock_inner();
        inner.queue.push_back(script);
        debug!(
            spawn = self.name.as_str(),
            pending = inner.queue.len(),
            "script deposited"
        );
        self.wake.notify_one();
    }

    /// Defer script consumption. A script already executing finishes; the
    /// flag is observed before the next script is taken.
    pub fn pause(&self) {
        let mut inner = self.lock_inner();
        inner.paused = true;
        debug!(spawn = self.name.as_str(), "paused");
        self.idle.notify_all();
    }

    /// Clear the pause flag and signal the waiting thread.
    pub fn resume(&self) {
        let mut inner = self.lock_inner();
        inner.paused = false;
        debug!(spawn = self.name.as_str(), "resumed");
        self.wake.notify_one();
    }

    /// Signal the terminal stop. Observed at the next wait or between
    /// script lines.
    pub fn signal_stop(&self) {
        let mut inner = self.lock_inner();
        inner.stopping = true;
        debug!(spawn = self.name.as_str(), "stop signaled");
        self.wake.notify_one();
    }

    fn stop_requested(&self) -> bool {
        self.lock_inner().stopping
    }

    pub fn status(&self) -> SpawnStatus {
        let inner = self.lock_inner();
        SpawnStatus {
            phase: inner.phase,
            paused: inner.paused,
            pending: inner.queue.len(),
        }
    }

    /// Block until the worker has nothing left to do: stopped, or waiting
    /// with an empty queue, or waiting while paused. A signaled stop counts
    /// as work until the worker acknowledges it by entering `Stopped`. This
    /// is the synchronization point between the interactive command source
    /// and the worker thread.
    pub fn wait_idle(&self) {
        let mut inner = self.lock_inner();
        loop {
            let idle = match inner.phase {
                SpawnPhase::Stopped => true,
                SpawnPhase::WaitingForScript => {
                    !inner.stopping && (inner.queue.is_empty() || inner.paused)
                }
                SpawnPhase::Executing => false,
            };
            if idle {
                return;
            }
            inner = self
                .idle
                .wait(inner)
                .expect("spawn mailbox poisoned: the worker panicked");
        }
    }

    /// Drain the accumulated status lines.
    pub fn take_output(&self) -> Vec<String> {
        let mut output = self
            .output
            .lock()
            .expect("spawn output buffer poisoned: a writer panicked");
        std::mem::take(&mut *output)
    }

    pub fn workspace_render(&self) -> String {
        crate::engine::lock_stack(&self.workspace).render()
    }

    pub fn workspace_values(&self) -> Vec<Value> {
        crate::engine::lock_stack(&self.workspace).values().to_vec()
    }

    fn record(&self, statuses: Vec<String>, line: &str) {
        let mut output = self
            .output
            .lock()
            .expect("spawn output buffer poisoned: a writer panicked");
        for status in statuses {
            if status.starts_with("error:") {
                warn!(
                    spawn = self.name.as_str(),
                    line,
                    status = status.as_str(),
                    "script sub-command failed"
                );
            }
            output.push(status);
        }
    }

    /// The worker loop. Runs on the spawn's own thread until stopped.
    pub(crate) fn run(self: Arc<Self>, ctx: ExecContext) {
        debug!(spawn = self.name.as_str(), "spawn thread started");
        loop {
            let script = {
                let mut inner = self.lock_inner();
                loop {
                    if inner.stopping {
                        inner.phase = SpawnPhase::Stopped;
                        self.idle.notify_all();
                        debug!(spawn = self.name.as_str(), "spawn thread exiting");
                        return;
                    }
                    if !inner.paused {
                        if let Some(script) = inner.queue.pop_front() {
                            inner.phase = SpawnPhase::Executing;
                            break script;
                        }
                    }
                    inner.phase = SpawnPhase::WaitingForScript;
                    self.idle.notify_all();
                    inner = self
                        .wake
                        .wait(inner)
                        .expect("spawn mailbox poisoned: a controller panicked");
                }
            };

            for raw in script.lines() {
                let line = raw.trim();
                if line.is_empty() {
                    continue;
                }
                // Cooperative cancellation point between script lines.
                if self.stop_requested() {
                    debug!(
                        spawn = self.name.as_str(),
                        "stop observed between script lines"
                    );
                    break;
                }
                let statuses = if line.starts_with('@') {
                    dispatch::dispatch_line(line, &ctx)
                } else {
                    dispatch::run_subcommands(line, &self.workspace, &ctx)
                };
                self.record(statuses, line);
            }
        }
    }
}
