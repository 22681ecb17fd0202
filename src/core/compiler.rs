//! Command tree compiler.
//!
//! Flattens a [`CommandGroup`] into a [`RunGraph`]: an arena of nodes linked
//! by forward-only `next` indices. Sequences are built right to left so every
//! node already knows its successor when it is created.

use std::collections::HashSet;

use crate::core::command::{Command, CommandGroup};
use crate::core::requirement::Requirement;
use crate::core::runner::{Chain, LeafRunner};

/// Index of a node inside a [`RunGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) const fn index(self) -> usize {
        self.0
    }
}

/// Structural variant of a run-graph node.
pub(crate) enum NodeKind {
    /// One command.
    Leaf(LeafRunner),
    /// Parallel child chains; complete when every chain is done.
    Branch(Vec<Chain>),
    /// Hands `child` to the active set on first step and completes at once.
    Fork { child: NodeId, spawned: bool },
    /// Degenerate node produced for empty groups. Always complete.
    Noop,
}

pub(crate) struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) next: Option<NodeId>,
}

/// Compiled, steppable form of a command tree.
pub struct RunGraph {
    pub(crate) nodes: Vec<Node>,
    root: NodeId,
    requirements: HashSet<Requirement>,
    interruptible: bool,
    name: String,
}

impl RunGraph {
    /// Compile `group` into a run-graph.
    ///
    /// Never fails: empty sequences and empty parallel groups compile to an
    /// always-complete node.
    #[must_use]
    pub fn compile(group: CommandGroup) -> Self {
        let name = describe(&group);
        let mut graph = Self {
            nodes: Vec::with_capacity(group.leaf_count() + 1),
            root: NodeId(0),
            requirements: HashSet::new(),
            interruptible: true,
            name,
        };
        graph.root = graph.build(group, None);
        graph
    }

    /// Entry node of the graph.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Union of every leaf's requirements.
    #[must_use]
    pub const fn requirements(&self) -> &HashSet<Requirement> {
        &self.requirements
    }

    /// `false` if any leaf is non-interruptible.
    #[must_use]
    pub const fn is_interruptible(&self) -> bool {
        self.interruptible
    }

    /// Name of the compiled tree, used in logs.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total number of nodes, including structural ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes. Never true for a compiled graph.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn next_of(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].next
    }

    fn push(&mut self, kind: NodeKind, next: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node { kind, next });
        id
    }

    fn build(&mut self, group: CommandGroup, next: Option<NodeId>) -> NodeId {
        match group {
            CommandGroup::Leaf(command) => {
                self.requirements.extend(command.requirements());
                self.interruptible &= command.is_interruptible();
                self.push(NodeKind::Leaf(LeafRunner::new(command)), next)
            }
            CommandGroup::Sequential(children) => {
                let mut follow = next;
                let mut head = None;
                for child in children.into_iter().rev() {
                    let id = self.build(child, follow);
                    follow = Some(id);
                    head = Some(id);
                }
                match head {
                    Some(id) => id,
                    None => self.push(NodeKind::Noop, next),
                }
            }
            CommandGroup::Parallel(children) => {
                if children.is_empty() {
                    return self.push(NodeKind::Noop, next);
                }
                let chains = children
                    .into_iter()
                    .map(|child| Chain::new(self.build(child, None)))
                    .collect();
                self.push(NodeKind::Branch(chains), next)
            }
            CommandGroup::Fork(child) => {
                let child = self.build(*child, None);
                self.push(
                    NodeKind::Fork {
                        child,
                        spawned: false,
                    },
                    next,
                )
            }
        }
    }
}

fn describe(group: &CommandGroup) -> String {
    match group {
        CommandGroup::Leaf(command) => command.name(),
        CommandGroup::Sequential(children) => format!("sequential({})", children.len()),
        CommandGroup::Parallel(children) => format!("simultaneously({})", children.len()),
        CommandGroup::Fork(child) => format!("fork({})", describe(child)),
    }
}
