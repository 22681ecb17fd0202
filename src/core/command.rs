//! Command trait, lifecycle states and composite descriptors.
//!
//! A [`Command`] is a leaf unit of work. Composition is expressed with the
//! [`CommandGroup`] descriptor built by [`sequential`], [`simultaneously`] and
//! [`fork`]; groups are never executed directly but compiled into a run-graph
//! by [`crate::core::compiler`].

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::CommandResult;
use crate::core::requirement::Requirement;

/// Lifecycle state of a leaf command inside a runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandState {
    /// Admitted but `initialize()` not yet called.
    Uninitialized,
    /// Initialized; `execute()` is called once per tick.
    Running,
    /// Cancelled, preempted or failed; `interrupted()` is pending.
    Interrupted,
    /// Completed or timed out; `end()` is pending.
    Finished,
    /// Terminal state. No further callbacks.
    Finalized,
}

impl fmt::Display for CommandState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uninitialized => "uninitialized",
            Self::Running => "running",
            Self::Interrupted => "interrupted",
            Self::Finished => "finished",
            Self::Finalized => "finalized",
        };
        f.write_str(s)
    }
}

/// A unit of schedulable work.
///
/// All callbacks run on the stepping thread and must return promptly. Errors
/// (or panics) from `initialize` and `execute` interrupt the command; errors
/// from `interrupted` and `end` are logged and otherwise ignored.
///
/// # Example
///
/// ```rust,ignore
/// struct Raise { lift: Requirement, ticks: u32 }
///
/// impl Command for Raise {
///     fn requirements(&self) -> Vec<Requirement> { vec![self.lift.clone()] }
///     fn execute(&mut self) -> CommandResult<bool> {
///         self.ticks += 1;
///         Ok(self.ticks >= 10)
///     }
/// }
/// ```
pub trait Command: Send {
    /// Name used in logs and audit events.
    fn name(&self) -> String {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full).to_string()
    }

    /// Maximum run time once initialized. `Duration::ZERO` means no timeout.
    fn timeout(&self) -> Duration {
        Duration::ZERO
    }

    /// Resources this command needs exclusive use of.
    fn requirements(&self) -> Vec<Requirement> {
        Vec::new()
    }

    /// Whether a later submission may preempt this command.
    fn is_interruptible(&self) -> bool {
        true
    }

    /// Called once, on the first tick the command runs.
    fn initialize(&mut self) -> CommandResult<()> {
        Ok(())
    }

    /// Called every tick while running. Return `true` to finish.
    fn execute(&mut self) -> CommandResult<bool>;

    /// Called once if the command is cancelled, preempted or failed.
    fn interrupted(&mut self) -> CommandResult<()> {
        Ok(())
    }

    /// Called once after the command finished normally or timed out.
    fn end(&mut self) -> CommandResult<()> {
        Ok(())
    }
}

impl Command for Box<dyn Command> {
    fn name(&self) -> String {
        (**self).name()
    }

    fn timeout(&self) -> Duration {
        (**self).timeout()
    }

    fn requirements(&self) -> Vec<Requirement> {
        (**self).requirements()
    }

    fn is_interruptible(&self) -> bool {
        (**self).is_interruptible()
    }

    fn initialize(&mut self) -> CommandResult<()> {
        (**self).initialize()
    }

    fn execute(&mut self) -> CommandResult<bool> {
        (**self).execute()
    }

    fn interrupted(&mut self) -> CommandResult<()> {
        (**self).interrupted()
    }

    fn end(&mut self) -> CommandResult<()> {
        (**self).end()
    }
}

/// Composite command descriptor consumed by the tree compiler.
pub enum CommandGroup {
    /// A single command.
    Leaf(Box<dyn Command>),
    /// Children run one after another.
    Sequential(Vec<CommandGroup>),
    /// Children run together; the group completes when all have finalized.
    Parallel(Vec<CommandGroup>),
    /// Child runs independently; the group completes immediately.
    Fork(Box<CommandGroup>),
}

impl CommandGroup {
    /// Number of leaf commands in this tree.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::Sequential(children) | Self::Parallel(children) => {
                children.iter().map(Self::leaf_count).sum()
            }
            Self::Fork(child) => child.leaf_count(),
        }
    }

    /// Wrap this group in a two-element sequence with `other` following it.
    #[must_use]
    pub fn then(self, other: impl Into<Self>) -> Self {
        match self {
            Self::Sequential(mut children) => {
                children.push(other.into());
                Self::Sequential(children)
            }
            first => Self::Sequential(vec![first, other.into()]),
        }
    }
}

impl fmt::Debug for CommandGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf(command) => f.debug_tuple("Leaf").field(&command.name()).finish(),
            Self::Sequential(children) => f.debug_tuple("Sequential").field(children).finish(),
            Self::Parallel(children) => f.debug_tuple("Parallel").field(children).finish(),
            Self::Fork(child) => f.debug_tuple("Fork").field(child).finish(),
        }
    }
}

impl<C: Command + 'static> From<C> for CommandGroup {
    fn from(command: C) -> Self {
        Self::Leaf(Box::new(command))
    }
}

/// Wrap a single command as a group.
pub fn leaf(command: impl Command + 'static) -> CommandGroup {
    CommandGroup::Leaf(Box::new(command))
}

/// Run `commands` one after another.
pub fn sequential<I>(commands: I) -> CommandGroup
where
    I: IntoIterator,
    I::Item: Into<CommandGroup>,
{
    CommandGroup::Sequential(commands.into_iter().map(Into::into).collect())
}

/// Run `commands` at the same time; completes when all have finalized.
pub fn simultaneously<I>(commands: I) -> CommandGroup
where
    I: IntoIterator,
    I::Item: Into<CommandGroup>,
{
    CommandGroup::Parallel(commands.into_iter().map(Into::into).collect())
}

/// Run `command` as an independent branch without blocking the enclosing sequence.
pub fn fork(command: impl Into<CommandGroup>) -> CommandGroup {
    CommandGroup::Fork(Box::new(command.into()))
}
