//! Audit sinks for command state transitions.
//!
//! The scheduler reports every leaf state change to an optional
//! [`AuditSink`]. Recording backends live outside this crate; the bounded
//! in-memory sink here is for tests and diagnostics.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::SchedulerConfig;
use crate::core::command::CommandState;
use crate::core::runner::RunnerId;

/// One state transition of one leaf command.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AuditEvent {
    /// Submission the command belongs to.
    pub runner: RunnerId,
    /// Command name.
    pub command: String,
    /// State entered.
    pub state: CommandState,
    /// Tick time of the transition in milliseconds.
    pub at_ms: i64,
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record a state transition.
    fn record(&mut self, event: AuditEvent);
}

impl<F> AuditSink for F
where
    F: FnMut(AuditEvent) + Send,
{
    fn record(&mut self, event: AuditEvent) {
        self(event);
    }
}

/// In-memory audit sink with a bounded buffer.
///
/// Clones share the same buffer, so a test can keep one clone while the
/// scheduler owns another.
#[derive(Clone)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<VecDeque<AuditEvent>>>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::with_capacity(max_events.min(4096)))),
            max_events,
        }
    }

    /// Create a sink sized by `audit_capacity`.
    #[must_use]
    pub fn from_config(cfg: &SchedulerConfig) -> Self {
        Self::new(cfg.audit_capacity)
    }

    /// Retrieve a snapshot of stored events.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Events recorded for one command name, oldest first.
    #[must_use]
    pub fn states_of(&self, command: &str) -> Vec<CommandState> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.command == command)
            .map(|e| e.state)
            .collect()
    }

    /// Drop all stored events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        if self.max_events == 0 {
            return;
        }
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }
}

/// Helper to build an audit event from context.
pub fn build_audit_event(
    runner: RunnerId,
    command: impl Into<String>,
    state: CommandState,
    at_ms: i64,
) -> AuditEvent {
    AuditEvent {
        runner,
        command: command.into(),
        state,
        at_ms,
    }
}
