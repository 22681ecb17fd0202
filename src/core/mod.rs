//! Core scheduling abstractions: commands, the tree compiler, runners and
//! the scheduler.

pub mod audit;
pub mod command;
pub mod compiler;
pub mod error;
pub mod requirement;
pub mod runner;
pub mod scheduler;

pub use audit::{build_audit_event, AuditEvent, AuditSink, InMemoryAuditSink};
pub use command::{fork, leaf, sequential, simultaneously, Command, CommandGroup, CommandState};
pub use compiler::{NodeId, RunGraph};
pub use error::{AppResult, CommandResult, SchedulerError};
pub use requirement::Requirement;
pub use runner::{Runner, RunnerId};
pub use scheduler::{CommandHandle, Scheduler, SchedulerHandle};
