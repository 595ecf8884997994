//! Arena slots for the history ring.

use crate::types::Atom;
use std::fmt;

/// Stable index of a node in the ring arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(pub(crate) u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

/// What a slot is currently used for.
///
/// The role is stored on the node itself so "is this node linked right now"
/// never has to be inferred from which outer handle points at it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum NodeRole {
    /// On the free list, contents empty.
    Free,
    /// The single unlinked staging buffer.
    Staging,
    /// Linked into the ring and counted on one side.
    Member,
    /// Linked into the ring but being applied by an undo/redo; counted on neither side.
    InProgress,
}

/// One slot of the arena.
pub(crate) struct RingNode<T> {
    pub(crate) atom: Atom<T>,
    /// Size of the atom when it was last committed as an undo step.
    pub(crate) cached_undo_size: usize,
    pub(crate) prev: NodeId,
    pub(crate) next: NodeId,
    pub(crate) role: NodeRole,
}

impl<T> RingNode<T> {
    /// A node linked only to itself.
    pub(crate) fn detached(id: NodeId, atom: Atom<T>, role: NodeRole) -> Self {
        Self {
            atom,
            cached_undo_size: 0,
            prev: id,
            next: id,
            role,
        }
    }

    pub(crate) fn is_linked(&self) -> bool {
        matches!(self.role, NodeRole::Member | NodeRole::InProgress)
    }
}
