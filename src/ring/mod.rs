//! The history ring.
//!
//! Committed atoms live in one circular doubly-linked list. Reading from the
//! root along `next` yields the undo atoms oldest to newest (ending at
//! `last`), then the redo atoms from the next one to be redone to the one
//! that would be redone last. Nodes live in an arena and link by index, so
//! splicing is plain index rewiring and slots are recycled instead of freed.

mod manager;
mod node;

pub(crate) use manager::{Evicted, Ring};
pub(crate) use node::{NodeId, NodeRole};
