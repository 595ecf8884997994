//! Circular doubly-linked list over an index arena.
//!
//! All link rewiring lives here. The ring knows nothing about which side a
//! node is counted on; the history controller owns the counters and decides
//! which ranges to cut.

use super::node::{NodeId, NodeRole, RingNode};
use crate::types::{Atom, Record, INITIAL_ATOM_CAPACITY};

/// Totals of a run of nodes cut out of the ring.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Evicted {
    pub(crate) atoms: usize,
    pub(crate) items: usize,
    pub(crate) size: usize,
}

/// The history ring plus its node arena.
pub(crate) struct Ring<T> {
    /// Every slot ever allocated.
    nodes: Vec<RingNode<T>>,

    /// Slots available for reuse.
    free: Vec<NodeId>,

    /// Oldest node in ring order.
    root: Option<NodeId>,

    /// Newest undo node.
    last: Option<NodeId>,
}

impl<T> Ring<T> {
    pub(crate) fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: None,
            last: None,
        }
    }

    // --- Arena ---

    /// Hand out an unlinked slot with an empty atom.
    pub(crate) fn alloc(&mut self, role: NodeRole) -> NodeId {
        debug_assert!(!matches!(role, NodeRole::Free));
        if let Some(id) = self.free.pop() {
            let node = &mut self.nodes[id.index()];
            node.role = role;
            node.prev = id;
            node.next = id;
            node.cached_undo_size = 0;
            id
        } else {
            let id = NodeId(self.nodes.len() as u32);
            self.nodes.push(RingNode::detached(
                id,
                Atom::with_capacity(INITIAL_ATOM_CAPACITY),
                role,
            ));
            id
        }
    }

    fn free_slot(&mut self, id: NodeId) {
        let node = &mut self.nodes[id.index()];
        debug_assert!(node.atom.is_empty());
        node.role = NodeRole::Free;
        node.prev = id;
        node.next = id;
        node.cached_undo_size = 0;
        node.atom = Atom::default();
        self.free.push(id);
    }

    /// Slots currently in use (ring members plus the staging buffer).
    pub(crate) fn live_slots(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    // --- Accessors ---

    pub(crate) fn node(&self, id: NodeId) -> &RingNode<T> {
        &self.nodes[id.index()]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut RingNode<T> {
        &mut self.nodes[id.index()]
    }

    pub(crate) fn atom(&self, id: NodeId) -> &Atom<T> {
        &self.nodes[id.index()].atom
    }

    pub(crate) fn atom_mut(&mut self, id: NodeId) -> &mut Atom<T> {
        &mut self.nodes[id.index()].atom
    }

    pub(crate) fn next(&self, id: NodeId) -> NodeId {
        self.nodes[id.index()].next
    }

    pub(crate) fn prev(&self, id: NodeId) -> NodeId {
        self.nodes[id.index()].prev
    }

    pub(crate) fn set_role(&mut self, id: NodeId, role: NodeRole) {
        self.nodes[id.index()].role = role;
    }

    pub(crate) fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub(crate) fn last(&self) -> Option<NodeId> {
        self.last
    }

    pub(crate) fn set_root(&mut self, root: Option<NodeId>) {
        self.root = root;
    }

    pub(crate) fn set_last(&mut self, last: Option<NodeId>) {
        self.last = last;
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    // --- Splicing ---

    /// Link an unlinked `node` right after `after`.
    ///
    /// With an empty ring the node becomes the sole element and the root.
    /// With `after == None` on a non-empty ring the node goes in front of the
    /// current root and becomes the new root.
    pub(crate) fn splice_in(&mut self, node: NodeId, after: Option<NodeId>) {
        debug_assert!(!self.nodes[node.index()].is_linked());

        match (self.root, after) {
            (None, _) => {
                let n = &mut self.nodes[node.index()];
                n.prev = node;
                n.next = node;
                self.root = Some(node);
            }
            (Some(root), None) => {
                let before = self.prev(root);
                self.link_between(before, node, root);
                self.root = Some(node);
            }
            (Some(_), Some(after)) => {
                let next = self.next(after);
                self.link_between(after, node, next);
            }
        }
        self.nodes[node.index()].role = NodeRole::Member;
    }

    fn link_between(&mut self, prev: NodeId, node: NodeId, next: NodeId) {
        self.nodes[prev.index()].next = node;
        self.nodes[next.index()].prev = node;
        let n = &mut self.nodes[node.index()];
        n.prev = prev;
        n.next = next;
    }

    /// Unlink a single node, leaving it as an unlinked staging slot.
    ///
    /// The root moves forward if it was the node. `last` must not point at it.
    pub(crate) fn unlink(&mut self, node: NodeId) {
        debug_assert!(self.nodes[node.index()].is_linked());
        debug_assert_ne!(self.last, Some(node));

        let (prev, next) = (self.prev(node), self.next(node));
        if next == node {
            self.root = None;
        } else {
            self.nodes[prev.index()].next = next;
            self.nodes[next.index()].prev = prev;
            if self.root == Some(node) {
                self.root = Some(next);
            }
        }

        let n = &mut self.nodes[node.index()];
        n.prev = node;
        n.next = node;
        n.role = NodeRole::Staging;
    }

    /// Release an unlinked node's records and return its slot to the arena.
    pub(crate) fn discard(&mut self, node: NodeId, mut release: impl FnMut(Record<T>)) {
        debug_assert!(!self.nodes[node.index()].is_linked());
        self.nodes[node.index()].atom.recycle(true, &mut release);
        self.free_slot(node);
    }

    /// Cut every node from `first` forward until the walk reaches the root.
    ///
    /// With `through_root` the root itself is cut too and the node after it
    /// becomes the new root; without it the walk stops just before the root.
    /// Starting at `root.next` with `through_root` empties the whole ring.
    /// If `last` falls inside the cut, the undo segment is gone and `last`
    /// becomes `None`. Every cut record goes to `release`.
    pub(crate) fn splice_out_range(
        &mut self,
        first: NodeId,
        through_root: bool,
        mut release: impl FnMut(Record<T>),
    ) -> Evicted {
        let mut evicted = Evicted::default();
        let Some(root) = self.root else {
            return evicted;
        };
        if first == root && !through_root {
            return evicted;
        }

        let whole = through_root && first == self.next(root);
        let before = self.prev(first);
        let after = if through_root { self.next(root) } else { root };

        let mut last_cut = false;
        let mut cur = first;
        loop {
            let is_root = cur == root;
            if is_root && !through_root {
                break;
            }
            let next = self.next(cur);
            if self.last == Some(cur) {
                last_cut = true;
            }

            let node = &mut self.nodes[cur.index()];
            debug_assert_eq!(node.role, NodeRole::Member);
            evicted.atoms += 1;
            evicted.items += node.atom.len();
            evicted.size += node.atom.size();
            node.atom.recycle(true, &mut release);
            self.free_slot(cur);

            if is_root {
                break;
            }
            cur = next;
        }

        if whole {
            self.root = None;
            self.last = None;
        } else {
            self.nodes[before.index()].next = after;
            self.nodes[after.index()].prev = before;
            if through_root {
                self.root = Some(after);
            }
            if last_cut {
                self.last = None;
            }
        }

        evicted
    }

    /// Put `staging` into the ring position held by `ring_node`.
    ///
    /// `ring_node` comes out unlinked, tagged as the new staging buffer, with
    /// its atom untouched so the caller can recycle it. Root and last follow
    /// the position, not the node.
    pub(crate) fn swap(&mut self, ring_node: NodeId, staging: NodeId) {
        debug_assert!(self.nodes[ring_node.index()].is_linked());
        debug_assert_eq!(self.nodes[staging.index()].role, NodeRole::Staging);

        let (prev, next) = (self.prev(ring_node), self.next(ring_node));
        if next == ring_node {
            let s = &mut self.nodes[staging.index()];
            s.prev = staging;
            s.next = staging;
        } else {
            self.link_between(prev, staging, next);
        }
        self.nodes[staging.index()].role = NodeRole::Member;

        let old = &mut self.nodes[ring_node.index()];
        old.prev = ring_node;
        old.next = ring_node;
        old.role = NodeRole::Staging;

        if self.root == Some(ring_node) {
            self.root = Some(staging);
        }
        if self.last == Some(ring_node) {
            self.last = Some(staging);
        }
    }

    // --- Inspection ---

    /// Ring order from the root, verifying link symmetry and roles on the way.
    pub(crate) fn walk(&self) -> std::result::Result<Vec<NodeId>, String> {
        let Some(root) = self.root else {
            return match self.last {
                Some(last) => Err(format!("empty ring but last is {:?}", last)),
                None => Ok(Vec::new()),
            };
        };

        let mut order = Vec::new();
        let mut cur = root;
        loop {
            let node = self.node(cur);
            if !node.is_linked() {
                return Err(format!("{:?} is in the ring with role {:?}", cur, node.role));
            }
            if self.node(node.next).prev != cur {
                return Err(format!("{:?}.next.prev does not point back", cur));
            }
            order.push(cur);
            if order.len() > self.nodes.len() {
                return Err("ring does not close on its root".into());
            }
            cur = node.next;
            if cur == root {
                break;
            }
        }

        if let Some(last) = self.last {
            if !order.contains(&last) {
                return Err(format!("last {:?} is not a ring member", last));
            }
        }
        Ok(order)
    }
}
