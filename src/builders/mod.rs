//! Builders for schedulers and closure-backed commands.

pub mod commands;
pub mod scheduler_builder;

pub use commands::{cancel_requirements, pause, run_once, run_until, CommandBuilder, FnCommand};
pub use scheduler_builder::SchedulerBuilder;
