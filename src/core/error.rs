//! Error types for scheduler operations.

use thiserror::Error;

/// Errors produced by scheduler components.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The pending queue already holds the configured maximum of submissions.
    #[error("pending queue full: {0} submissions waiting")]
    QueueFull(usize),
    /// The tick driver owning the scheduler has been shut down.
    #[error("scheduler has been shut down")]
    ShutDown,
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The tick driver thread could not be started or joined.
    #[error("driver error: {0}")]
    Driver(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;

/// Result returned by user command callbacks.
///
/// Any `Err` converts the leaf into an interruption (from `initialize` /
/// `execute`) or is only logged (from `interrupted` / `end`).
pub type CommandResult<T> = AppResult<T>;
