//! Configuration models for the scheduler and its tick driver.

pub mod scheduler;

pub use scheduler::SchedulerConfig;
