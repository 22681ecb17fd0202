//! Command runners: the per-tick state machine.
//!
//! A [`Runner`] is one admitted run-graph. It steps a set of [`Chain`]s: the
//! main chain starting at the graph root plus one chain per fork that has
//! been reached. Each chain follows `next` links, stepping one node per tick.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::core::audit::{build_audit_event, AuditSink};
use crate::core::command::{Command, CommandState};
use crate::core::compiler::{NodeId, NodeKind, RunGraph};
use crate::core::error::CommandResult;
use crate::core::requirement::Requirement;

/// Identifier assigned to each submission.
pub type RunnerId = u64;

/// Flags shared between a runner and every [`CommandHandle`](crate::core::CommandHandle)
/// pointing at it. Written from any thread, read by the stepping thread.
#[derive(Debug, Default)]
pub(crate) struct RunnerFlags {
    pub(crate) cancelled: AtomicBool,
    pub(crate) finished: AtomicBool,
}

/// Per-step inputs shared by every node stepped during one tick.
pub(crate) struct StepContext<'a> {
    pub(crate) runner: RunnerId,
    pub(crate) now_ms: i64,
    pub(crate) cancelled: bool,
    pub(crate) spawned: &'a mut Vec<NodeId>,
    pub(crate) sink: Option<&'a mut (dyn AuditSink + 'static)>,
}

/// Drives one leaf command through its lifecycle.
pub(crate) struct LeafRunner {
    command: Box<dyn Command>,
    name: String,
    timeout: Duration,
    state: CommandState,
    deadline_ms: Option<i64>,
    started: bool,
}

impl LeafRunner {
    pub(crate) fn new(command: Box<dyn Command>) -> Self {
        Self {
            name: command.name(),
            timeout: command.timeout(),
            command,
            state: CommandState::Uninitialized,
            deadline_ms: None,
            started: false,
        }
    }

    #[cfg(test)]
    pub(crate) const fn state(&self) -> CommandState {
        self.state
    }

    /// Advance the lifecycle by one tick. Returns `true` once finalized.
    pub(crate) fn step(&mut self, ctx: &mut StepContext<'_>) -> bool {
        if self.state == CommandState::Finalized {
            return true;
        }

        if ctx.cancelled {
            if self.state == CommandState::Uninitialized {
                // never started: no callbacks owed
                self.transition(CommandState::Finalized, ctx);
                return true;
            }
            if self.state != CommandState::Interrupted {
                self.transition(CommandState::Interrupted, ctx);
            }
        }

        if !self.started {
            self.started = true;
            if !self.timeout.is_zero() {
                self.deadline_ms = Some(ctx.now_ms.saturating_add(timeout_ms(self.timeout)));
            }
        }

        if let Some(deadline) = self.deadline_ms {
            if ctx.now_ms >= deadline && self.state == CommandState::Running {
                debug!(command = %self.name, deadline, now = ctx.now_ms, "command timed out");
                self.transition(CommandState::Finished, ctx);
            }
        }

        if self.state == CommandState::Uninitialized {
            let outcome = guard(&self.name, "initialize", || self.command.initialize());
            let next = if outcome.is_some() {
                CommandState::Running
            } else {
                CommandState::Interrupted
            };
            self.transition(next, ctx);
        }

        if self.state == CommandState::Running {
            match guard(&self.name, "execute", || self.command.execute()) {
                Some(true) => self.transition(CommandState::Finished, ctx),
                Some(false) => {}
                None => self.transition(CommandState::Interrupted, ctx),
            }
        }

        if self.state == CommandState::Interrupted {
            guard(&self.name, "interrupted", || self.command.interrupted());
            self.transition(CommandState::Finalized, ctx);
        }

        if self.state == CommandState::Finished {
            guard(&self.name, "end", || self.command.end());
            self.transition(CommandState::Finalized, ctx);
        }

        self.state == CommandState::Finalized
    }

    fn transition(&mut self, state: CommandState, ctx: &mut StepContext<'_>) {
        debug!(command = %self.name, from = %self.state, to = %state, "state transition");
        self.state = state;
        if let Some(sink) = ctx.sink.as_deref_mut() {
            sink.record(build_audit_event(ctx.runner, self.name.clone(), state, ctx.now_ms));
        }
    }
}

/// Run a user callback, converting both `Err` and panics into `None`.
fn guard<T>(name: &str, callback: &str, f: impl FnOnce() -> CommandResult<T>) -> Option<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            warn!(command = %name, callback, "command callback failed: {e:#}");
            None
        }
        Err(payload) => {
            error!(
                command = %name,
                callback,
                "command callback panicked: {}",
                panic_message(payload.as_ref())
            );
            None
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Millisecond length of a non-zero timeout, rounded up so it never rounds to zero.
fn timeout_ms(timeout: Duration) -> i64 {
    let ms = timeout.as_millis().max(1);
    i64::try_from(ms).unwrap_or(i64::MAX)
}

/// Cursor walking a run-graph along `next` links.
pub(crate) struct Chain {
    cursor: Option<NodeId>,
}

impl Chain {
    pub(crate) const fn new(head: NodeId) -> Self {
        Self { cursor: Some(head) }
    }

    pub(crate) const fn is_done(&self) -> bool {
        self.cursor.is_none()
    }

    /// Step the current node; advance past it once it completes.
    /// A cancelled chain stops instead of advancing.
    pub(crate) fn step(&mut self, graph: &mut RunGraph, ctx: &mut StepContext<'_>) -> bool {
        let Some(current) = self.cursor else {
            return true;
        };
        if graph.step_node(current, ctx) {
            self.cursor = if ctx.cancelled {
                None
            } else {
                graph.next_of(current)
            };
        }
        self.cursor.is_none()
    }
}

impl RunGraph {
    pub(crate) fn step_node(&mut self, id: NodeId, ctx: &mut StepContext<'_>) -> bool {
        match &mut self.nodes[id.index()].kind {
            NodeKind::Leaf(leaf) => leaf.step(ctx),
            NodeKind::Noop => true,
            NodeKind::Fork { child, spawned } => {
                if !*spawned {
                    *spawned = true;
                    if !ctx.cancelled {
                        ctx.spawned.push(*child);
                    }
                }
                true
            }
            NodeKind::Branch(chains) => {
                let mut chains = std::mem::take(chains);
                let mut done = true;
                for chain in &mut chains {
                    if !chain.step(self, ctx) {
                        done = false;
                    }
                }
                if let NodeKind::Branch(slot) = &mut self.nodes[id.index()].kind {
                    *slot = chains;
                }
                done
            }
        }
    }
}

/// One admitted (or pending) submission: a compiled run-graph plus the
/// chains currently being stepped.
pub struct Runner {
    id: RunnerId,
    graph: RunGraph,
    chains: Vec<Chain>,
    flags: Arc<RunnerFlags>,
}

impl Runner {
    pub(crate) fn new(id: RunnerId, graph: RunGraph, flags: Arc<RunnerFlags>) -> Self {
        let root = graph.root();
        Self {
            id,
            graph,
            chains: vec![Chain::new(root)],
            flags,
        }
    }

    /// Identifier of the submission.
    #[must_use]
    pub const fn id(&self) -> RunnerId {
        self.id
    }

    /// Name of the compiled command tree.
    #[must_use]
    pub fn name(&self) -> &str {
        self.graph.name()
    }

    /// Requirements of every leaf in the tree.
    pub fn requirements(&self) -> impl Iterator<Item = &Requirement> {
        self.graph.requirements().iter()
    }

    /// `false` if any leaf in the tree is non-interruptible.
    #[must_use]
    pub const fn is_interruptible(&self) -> bool {
        self.graph.is_interruptible()
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flags.cancelled.load(Ordering::Acquire)
    }

    /// Request cancellation; observed on the next step. Idempotent.
    pub fn cancel(&self) {
        self.flags.cancelled.store(true, Ordering::Release);
    }

    /// Number of chains currently stepping (main chain plus live forks).
    #[must_use]
    pub fn live_chains(&self) -> usize {
        self.chains.len()
    }

    pub(crate) fn mark_finished(&self) {
        self.flags.finished.store(true, Ordering::Release);
    }

    /// Step every live chain once. Returns `true` when nothing is left to run.
    ///
    /// Chains spawned by forks reached during this step are first stepped on
    /// the following tick.
    pub(crate) fn step(&mut self, now_ms: i64, sink: Option<&mut (dyn AuditSink + 'static)>) -> bool {
        let mut spawned = Vec::new();
        let mut ctx = StepContext {
            runner: self.id,
            now_ms,
            cancelled: self.is_cancelled(),
            spawned: &mut spawned,
            sink,
        };
        for chain in &mut self.chains {
            chain.step(&mut self.graph, &mut ctx);
        }
        self.chains.retain(|chain| !chain.is_done());
        if !spawned.is_empty() {
            debug!(runner = self.id, forks = spawned.len(), "forked chains registered");
            self.chains.extend(spawned.into_iter().map(Chain::new));
        }
        self.chains.is_empty()
    }
}
