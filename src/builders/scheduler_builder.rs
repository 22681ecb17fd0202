//! Builder that constructs a scheduler (and optionally its driver) from configuration.

use crate::config::SchedulerConfig;
use crate::core::{AuditSink, InMemoryAuditSink, Scheduler, SchedulerError};
#[cfg(not(target_arch = "wasm32"))]
use crate::runtime::TickDriver;

/// Builds a [`Scheduler`] from a validated [`SchedulerConfig`].
pub struct SchedulerBuilder {
    config: SchedulerConfig,
    sink: Option<Box<dyn AuditSink>>,
}

impl SchedulerBuilder {
    /// Start from an explicit configuration.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config, sink: None }
    }

    /// Start from environment variables (and `.env`).
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidConfig` if a variable is malformed.
    pub fn from_env() -> Result<Self, SchedulerError> {
        SchedulerConfig::from_env()
            .map(Self::new)
            .map_err(SchedulerError::InvalidConfig)
    }

    /// Configuration the scheduler will be built with.
    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Attach a custom audit sink.
    #[must_use]
    pub fn with_audit(mut self, sink: impl AuditSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Attach an in-memory sink sized by `audit_capacity` and return a clone
    /// of it for reading events back.
    #[must_use]
    pub fn with_in_memory_audit(mut self) -> (Self, InMemoryAuditSink) {
        let sink = InMemoryAuditSink::from_config(&self.config);
        self.sink = Some(Box::new(sink.clone()));
        (self, sink)
    }

    /// Build a scheduler to be stepped by the caller.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidConfig` if the configuration is invalid.
    pub fn build(self) -> Result<Scheduler, SchedulerError> {
        let scheduler = Scheduler::with_config(&self.config)?;
        Ok(match self.sink {
            Some(sink) => scheduler.with_audit(sink),
            None => scheduler,
        })
    }

    /// Build the scheduler and hand it to a [`TickDriver`] thread.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidConfig` for invalid configuration or
    /// `SchedulerError::Driver` if the thread cannot be spawned.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn start(self) -> Result<TickDriver, SchedulerError> {
        let config = self.config.clone();
        let scheduler = self.build()?;
        TickDriver::start(&config, scheduler)
    }
}
