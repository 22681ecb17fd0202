//! Closure-backed commands and a few stock commands.
//!
//! ```rust,ignore
//! let raise = CommandBuilder::new("raise")
//!     .requires(lift.clone())
//!     .timeout(Duration::from_secs(2))
//!     .on_execute(move || Ok(sensor.at_top()))
//!     .on_end(move || { motor.stop(); Ok(()) })
//!     .build();
//! scheduler.submit(sequential([leaf(raise), leaf(pause(Duration::from_millis(500)))]))?;
//! ```

use std::fmt;
use std::time::Duration;

use crate::core::{Command, CommandResult, Requirement};

type Callback = Box<dyn FnMut() -> CommandResult<()> + Send>;
type Poll = Box<dyn FnMut() -> CommandResult<bool> + Send>;

/// A [`Command`] whose callbacks are closures.
pub struct FnCommand {
    name: String,
    timeout: Duration,
    requirements: Vec<Requirement>,
    interruptible: bool,
    on_initialize: Option<Callback>,
    on_execute: Poll,
    on_interrupted: Option<Callback>,
    on_end: Option<Callback>,
}

impl fmt::Debug for FnCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCommand")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .field("requirements", &self.requirements)
            .field("interruptible", &self.interruptible)
            .finish_non_exhaustive()
    }
}

impl Command for FnCommand {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn requirements(&self) -> Vec<Requirement> {
        self.requirements.clone()
    }

    fn is_interruptible(&self) -> bool {
        self.interruptible
    }

    fn initialize(&mut self) -> CommandResult<()> {
        self.on_initialize.as_mut().map_or(Ok(()), |f| f())
    }

    fn execute(&mut self) -> CommandResult<bool> {
        (self.on_execute)()
    }

    fn interrupted(&mut self) -> CommandResult<()> {
        self.on_interrupted.as_mut().map_or(Ok(()), |f| f())
    }

    fn end(&mut self) -> CommandResult<()> {
        self.on_end.as_mut().map_or(Ok(()), |f| f())
    }
}

/// Fluent builder for [`FnCommand`].
///
/// Without `on_execute` the command finishes on its first tick.
pub struct CommandBuilder {
    name: String,
    timeout: Duration,
    requirements: Vec<Requirement>,
    interruptible: bool,
    on_initialize: Option<Callback>,
    on_execute: Option<Poll>,
    on_interrupted: Option<Callback>,
    on_end: Option<Callback>,
}

impl CommandBuilder {
    /// Start a command with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timeout: Duration::ZERO,
            requirements: Vec::new(),
            interruptible: true,
            on_initialize: None,
            on_execute: None,
            on_interrupted: None,
            on_end: None,
        }
    }

    /// Finish the command after `timeout` once it has started.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add one requirement.
    #[must_use]
    pub fn requires(mut self, requirement: Requirement) -> Self {
        if !self.requirements.contains(&requirement) {
            self.requirements.push(requirement);
        }
        self
    }

    /// Add several requirements.
    #[must_use]
    pub fn requires_all(self, requirements: impl IntoIterator<Item = Requirement>) -> Self {
        requirements.into_iter().fold(self, Self::requires)
    }

    /// Refuse preemption by later submissions.
    #[must_use]
    pub const fn not_interruptible(mut self) -> Self {
        self.interruptible = false;
        self
    }

    /// Set the `initialize` callback.
    #[must_use]
    pub fn on_initialize(mut self, f: impl FnMut() -> CommandResult<()> + Send + 'static) -> Self {
        self.on_initialize = Some(Box::new(f));
        self
    }

    /// Set the `execute` callback.
    #[must_use]
    pub fn on_execute(mut self, f: impl FnMut() -> CommandResult<bool> + Send + 'static) -> Self {
        self.on_execute = Some(Box::new(f));
        self
    }

    /// Set the `interrupted` callback.
    #[must_use]
    pub fn on_interrupted(mut self, f: impl FnMut() -> CommandResult<()> + Send + 'static) -> Self {
        self.on_interrupted = Some(Box::new(f));
        self
    }

    /// Set the `end` callback.
    #[must_use]
    pub fn on_end(mut self, f: impl FnMut() -> CommandResult<()> + Send + 'static) -> Self {
        self.on_end = Some(Box::new(f));
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> FnCommand {
        FnCommand {
            name: self.name,
            timeout: self.timeout,
            requirements: self.requirements,
            interruptible: self.interruptible,
            on_initialize: self.on_initialize,
            on_execute: self.on_execute.unwrap_or_else(|| Box::new(|| Ok(true))),
            on_interrupted: self.on_interrupted,
            on_end: self.on_end,
        }
    }
}

/// Do nothing for `duration`. A zero duration finishes on the first tick.
#[must_use]
pub fn pause(duration: Duration) -> FnCommand {
    let done = duration.is_zero();
    CommandBuilder::new("pause")
        .timeout(duration)
        .on_execute(move || Ok(done))
        .build()
}

/// Call `f` once and finish.
pub fn run_once(name: impl Into<String>, mut f: impl FnMut() + Send + 'static) -> FnCommand {
    CommandBuilder::new(name)
        .on_execute(move || {
            f();
            Ok(true)
        })
        .build()
}

/// Call `f` every tick until it returns `true` or `timeout` elapses.
pub fn run_until(
    name: impl Into<String>,
    timeout: Duration,
    mut f: impl FnMut() -> bool + Send + 'static,
) -> FnCommand {
    CommandBuilder::new(name)
        .timeout(timeout)
        .on_execute(move || Ok(f()))
        .build()
}

/// A non-interruptible no-op that preempts whatever currently holds
/// `requirements`, then finishes immediately.
pub fn cancel_requirements(requirements: impl IntoIterator<Item = Requirement>) -> FnCommand {
    CommandBuilder::new("cancel")
        .requires_all(requirements)
        .not_interruptible()
        .build()
}
