//! The cooperative scheduler: admission, preemption and per-tick stepping.
//!
//! [`Scheduler`] is owned by the stepping thread. Other threads talk to it
//! through a cloneable [`SchedulerHandle`]; every submission returns a
//! [`CommandHandle`] that can cancel that submission alone.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut scheduler = Scheduler::new();
//! let handle = scheduler.submit(sequential([leaf(a), leaf(b)]))?;
//! scheduler.step(now_ms());
//! handle.cancel();
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::core::audit::AuditSink;
use crate::core::command::CommandGroup;
use crate::core::compiler::RunGraph;
use crate::core::error::SchedulerError;
use crate::core::requirement::Requirement;
use crate::core::runner::{Runner, RunnerFlags, RunnerId};

/// State reachable from any thread.
struct Shared {
    pending: Mutex<VecDeque<Runner>>,
    max_pending: usize,
    next_id: AtomicU64,
    kill_requested: AtomicBool,
    shut_down: AtomicBool,
}

impl Shared {
    fn submit(&self, group: CommandGroup) -> Result<CommandHandle, SchedulerError> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(SchedulerError::ShutDown);
        }

        let graph = RunGraph::compile(group);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let flags = Arc::new(RunnerFlags::default());
        let handle = CommandHandle {
            id,
            name: graph.name().to_string(),
            flags: Arc::clone(&flags),
        };

        let mut pending = self.pending.lock();
        if pending.len() >= self.max_pending {
            warn!(
                command = %handle.name,
                depth = pending.len(),
                "submission rejected: pending queue full"
            );
            return Err(SchedulerError::QueueFull(pending.len()));
        }
        pending.push_back(Runner::new(id, graph, flags));
        drop(pending);

        debug!(runner = id, command = %handle.name, "command submitted");
        Ok(handle)
    }
}

/// Handle to one submission. Safe to use from any thread.
#[derive(Debug, Clone)]
pub struct CommandHandle {
    id: RunnerId,
    name: String,
    flags: Arc<RunnerFlags>,
}

impl CommandHandle {
    /// Identifier of the submission.
    #[must_use]
    pub const fn id(&self) -> RunnerId {
        self.id
    }

    /// Name of the submitted command tree.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Request cancellation. The submission is interrupted on the next tick;
    /// if it has not been admitted yet it is dropped at admission.
    pub fn cancel(&self) {
        self.flags.cancelled.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flags.cancelled.load(Ordering::Acquire)
    }

    /// Whether the submission is gone: finalized, denied admission or discarded.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.flags.finished.load(Ordering::Acquire)
    }
}

/// Cloneable, thread-safe front door to a [`Scheduler`].
#[derive(Clone)]
pub struct SchedulerHandle {
    shared: Arc<Shared>,
}

impl SchedulerHandle {
    /// Queue a (possibly composite) command for admission on the next tick.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::QueueFull` if the pending queue is at capacity
    /// - `SchedulerError::ShutDown` if the owning driver has stopped
    pub fn submit(&self, command: impl Into<CommandGroup>) -> Result<CommandHandle, SchedulerError> {
        self.shared.submit(command.into())
    }

    /// Discard pending submissions now and interrupt every active command on
    /// the next tick.
    pub fn kill_all(&self) {
        discard_pending(&self.shared);
        self.shared.kill_requested.store(true, Ordering::Release);
    }

    /// Number of submissions waiting for admission.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.shared.pending.lock().len()
    }

    pub(crate) fn mark_shut_down(&self) {
        self.shared.shut_down.store(true, Ordering::Release);
    }
}

fn discard_pending(shared: &Shared) -> usize {
    let dropped: Vec<Runner> = shared.pending.lock().drain(..).collect();
    for runner in &dropped {
        runner.cancel();
        runner.mark_finished();
    }
    dropped.len()
}

/// Cooperative command scheduler.
///
/// All command callbacks run inside [`step`](Self::step) on the caller's
/// thread. The reservation table guarantees that each [`Requirement`] is
/// held by at most one admitted submission.
pub struct Scheduler {
    shared: Arc<Shared>,
    active: Vec<Runner>,
    reservations: HashMap<Requirement, RunnerId>,
    sink: Option<Box<dyn AuditSink>>,
    last_tick_ms: i64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Create a scheduler with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_pending(SchedulerConfig::default().max_pending)
    }

    /// Create a scheduler from configuration.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidConfig` if the configuration is invalid.
    pub fn with_config(cfg: &SchedulerConfig) -> Result<Self, SchedulerError> {
        cfg.validate().map_err(SchedulerError::InvalidConfig)?;
        Ok(Self::with_max_pending(cfg.max_pending))
    }

    fn with_max_pending(max_pending: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                pending: Mutex::new(VecDeque::new()),
                max_pending,
                next_id: AtomicU64::new(1),
                kill_requested: AtomicBool::new(false),
                shut_down: AtomicBool::new(false),
            }),
            active: Vec::new(),
            reservations: HashMap::new(),
            sink: None,
            last_tick_ms: 0,
        }
    }

    /// Attach an audit sink receiving every leaf state transition.
    #[must_use]
    pub fn with_audit(mut self, sink: Box<dyn AuditSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Thread-safe handle for submitting and cancelling from other threads.
    #[must_use]
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Queue a (possibly composite) command for admission on the next tick.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::QueueFull` if the pending queue is at capacity
    /// - `SchedulerError::ShutDown` if the owning driver has stopped
    pub fn submit(&self, command: impl Into<CommandGroup>) -> Result<CommandHandle, SchedulerError> {
        self.shared.submit(command.into())
    }

    /// Run one tick: admit pending submissions, then step every active one.
    pub fn step(&mut self, now_ms: i64) {
        self.last_tick_ms = now_ms;

        if self.shared.kill_requested.swap(false, Ordering::AcqRel) {
            self.kill_all();
        }

        self.admit_pending();
        self.step_active(now_ms);
    }

    /// Drop pending submissions and interrupt every active command, stepping
    /// them to finalization before returning.
    pub fn kill_all(&mut self) {
        let dropped = discard_pending(&self.shared);
        for runner in &self.active {
            runner.cancel();
        }
        info!(
            pending = dropped,
            active = self.active.len(),
            "killing all commands"
        );
        while !self.active.is_empty() {
            self.step_active(self.last_tick_ms);
        }
    }

    /// `true` when nothing is pending or active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.shared.pending.lock().is_empty()
    }

    /// Number of submissions waiting for admission.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.shared.pending.lock().len()
    }

    /// Number of admitted submissions still stepping.
    #[must_use]
    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    /// Requirements currently reserved by an admitted submission.
    pub fn reserved_requirements(&self) -> impl Iterator<Item = &Requirement> {
        self.reservations.keys()
    }

    /// Submission currently holding `requirement`, if any.
    #[must_use]
    pub fn holder_of(&self, requirement: &Requirement) -> Option<RunnerId> {
        self.reservations.get(requirement).copied()
    }

    /// Drain the pending queue once. Submissions arriving meanwhile wait for
    /// the next tick, and a denied submission is not retried.
    fn admit_pending(&mut self) {
        let batch: Vec<Runner> = self.shared.pending.lock().drain(..).collect();
        for runner in batch {
            self.try_admit(runner);
        }
    }

    fn try_admit(&mut self, runner: Runner) -> bool {
        if runner.is_cancelled() {
            debug!(runner = runner.id(), command = runner.name(), "cancelled before admission");
            runner.mark_finished();
            return false;
        }

        let mut holders: Vec<RunnerId> = Vec::new();
        for requirement in runner.requirements() {
            let Some(&holder) = self.reservations.get(requirement) else {
                continue;
            };
            let interruptible = self
                .active
                .iter()
                .find(|r| r.id() == holder)
                .is_none_or(Runner::is_interruptible);
            if !interruptible {
                debug!(
                    runner = runner.id(),
                    command = runner.name(),
                    requirement = %requirement,
                    holder,
                    "admission denied: requirement held by non-interruptible command"
                );
                runner.mark_finished();
                return false;
            }
            if !holders.contains(&holder) {
                holders.push(holder);
            }
        }

        for holder in &holders {
            if let Some(incumbent) = self.active.iter().find(|r| r.id() == *holder) {
                info!(
                    runner = incumbent.id(),
                    command = incumbent.name(),
                    by = runner.name(),
                    "preempting command"
                );
                incumbent.cancel();
            }
        }

        for requirement in runner.requirements() {
            self.reservations.insert(requirement.clone(), runner.id());
        }
        info!(runner = runner.id(), command = runner.name(), "command admitted");
        self.active.push(runner);
        true
    }

    fn step_active(&mut self, now_ms: i64) {
        let sink = &mut self.sink;
        let reservations = &mut self.reservations;
        self.active.retain_mut(|runner| {
            if !runner.step(now_ms, sink.as_deref_mut()) {
                return true;
            }
            let id = runner.id();
            reservations.retain(|_, owner| *owner != id);
            runner.mark_finished();
            debug!(runner = id, command = runner.name(), "command finished");
            false
        });
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shared.shut_down.store(true, Ordering::Release);
    }
}
