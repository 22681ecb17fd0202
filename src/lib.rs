//! # Command Scheduler
//!
//! A cooperative, fixed-rate command scheduler for control software.
//!
//! Many independent units of work ("commands") run on one dedicated thread.
//! Each tick the scheduler admits newly submitted commands, reserving the
//! resources ("requirements") they declare and preempting interruptible
//! holders, then steps every admitted command once through its lifecycle:
//!
//! ```text
//! UNINITIALIZED ─initialize()─▶ RUNNING ─execute()==true / timeout─▶ FINISHED ─end()─┐
//!       │                          │                                              ├─▶ FINALIZED
//!       └──── error / cancel ──────┴──────────────▶ INTERRUPTED ─interrupted()────┘
//! ```
//!
//! ## Key Features
//!
//! - **Exclusive requirements**: at most one admitted command tree holds a requirement
//! - **Preemption**: new submissions cancel interruptible holders; non-interruptible
//!   holders cause the newcomer to be dropped
//! - **Composition**: `sequential`, `simultaneously` and `fork` compile into an
//!   arena-backed run-graph stepped one node per chain per tick
//! - **Failure isolation**: errors and panics in callbacks interrupt only the
//!   failing command
//! - **Cross-thread control**: submit, cancel and kill-all from any thread
//!
//! ## Example
//!
//! ```rust,ignore
//! use command_scheduler::builders::{pause, run_once};
//! use command_scheduler::core::{leaf, sequential, Scheduler};
//!
//! let mut scheduler = Scheduler::new();
//! scheduler.submit(sequential([
//!     leaf(run_once("open", || gripper.open())),
//!     leaf(pause(Duration::from_millis(250))),
//!     leaf(run_once("close", || gripper.close())),
//! ]))?;
//!
//! loop {
//!     scheduler.step(now_ms());
//!     std::thread::sleep(Duration::from_millis(20));
//! }
//! ```
//!
//! Or let a [`runtime::TickDriver`] own the scheduler and step it on its own thread.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions.
pub mod core;
/// Configuration models for the scheduler and driver.
pub mod config;
/// Builders for schedulers and closure-backed commands.
pub mod builders;
/// Runtime adapters (tick driver thread).
pub mod runtime;
/// Shared utilities.
pub mod util;
