//! Commit policy and eviction.
//!
//! Every counter change goes through this file: committing the staging
//! atom, cutting atoms out of either side, and dropping an atom whose undo
//! or redo produced nothing.

use super::History;
use crate::ring::{Evicted, NodeId, NodeRole};
use crate::types::Mode;
use tracing::{debug, trace};

impl<T> History<T> {
    /// Commit the staging atom into the ring, or discard it if the size
    /// budget forbids it. Returns true if a node was linked.
    ///
    /// Which slot the atom lands in depends on its polarity and on whether
    /// an undo/redo is running:
    /// - redo atom while undoing: replaces the node being undone
    /// - undo atom while redoing: replaces the node being redone
    /// - redo atom while idle (rebuilding history): nearest redo position
    /// - undo atom while idle: after `last`, evicting the oldest undo atom
    ///   first if the depth ceiling is reached
    pub(crate) fn insert_current(&mut self) -> bool {
        let staging = self.staging;
        let (len, size, is_redo) = {
            let atom = self.ring.atom(staging);
            if atom.is_empty() {
                return false;
            }
            (atom.len(), atom.size(), atom.is_redo())
        };
        self.invalidate_cursors();

        if self.config.size_limited() && self.mode != Mode::Redoing {
            // The redo atom will turn back into an undo atom roughly the size
            // of the one being undone, so reserve whichever is larger.
            let reserved = match (is_redo, self.in_progress) {
                (true, Some(node)) => size.max(self.ring.node(node).cached_undo_size),
                _ => size,
            };
            let prospective = self.undo.size + self.redo.size + reserved;
            if prospective > self.config.max_size {
                if is_redo {
                    debug!(
                        size = reserved,
                        max_size = self.config.max_size,
                        "redo atom over size budget, dropping redo chain"
                    );
                    self.clear_redo_chain();
                } else {
                    debug!(
                        size,
                        max_size = self.config.max_size,
                        "undo atom over size budget, history is now irreversible"
                    );
                    self.irreversible = true;
                }
                self.recycle_staging(true);
                return false;
            }
        }

        let committed = match (is_redo, self.in_progress) {
            (true, Some(node)) => {
                debug_assert_eq!(self.mode, Mode::Undoing);
                self.ring.swap(node, staging);
                self.staging = node;
                self.redo.add(len, size);
                staging
            }
            (false, Some(node)) => {
                debug_assert_eq!(self.mode, Mode::Redoing);
                self.ring.swap(node, staging);
                self.ring.set_last(Some(staging));
                self.staging = node;
                self.undo.add(len, size);
                staging
            }
            (true, None) => {
                if self.config.depth_reached(self.depth())
                    || self.config.redo_reached(self.redo.depth)
                {
                    debug!(depth = self.depth(), "no room for a rebuilt redo atom, dropping it");
                    self.recycle_staging(true);
                    return false;
                }
                self.ring.splice_in(staging, self.ring.last());
                self.staging = self.ring.alloc(NodeRole::Staging);
                self.redo.add(len, size);
                staging
            }
            (false, None) => {
                self.clear_redo_chain();
                if self.config.depth_reached(self.undo.depth) {
                    self.evict_oldest_undo();
                }
                self.ring.splice_in(staging, self.ring.last());
                self.ring.set_last(Some(staging));
                self.staging = self.ring.alloc(NodeRole::Staging);
                self.undo.add(len, size);
                staging
            }
        };

        let node = self.ring.node_mut(committed);
        node.atom.commit_shrink();
        if !is_redo {
            node.cached_undo_size = size;
        }
        trace!(?committed, len, size, is_redo, "committed atom");

        self.recycle_staging(false);
        true
    }

    /// Empty the staging atom, releasing whatever it holds.
    pub(crate) fn recycle_staging(&mut self, force: bool) {
        let staging = self.staging;
        self.ring.atom_mut(staging).recycle(force, &mut self.release);
    }

    /// First counted redo node, skipping a node that is being applied.
    pub(crate) fn redo_head(&self) -> Option<NodeId> {
        let root = self.ring.root()?;
        let mut head = match self.ring.last() {
            Some(last) => {
                let next = self.ring.next(last);
                if next == root {
                    return None;
                }
                next
            }
            None => root,
        };
        if Some(head) == self.in_progress {
            head = self.ring.next(head);
            if head == root || Some(head) == self.in_progress {
                return None;
            }
        }
        Some(head)
    }

    /// Drop every redo atom. Returns true if anything was removed.
    pub(crate) fn clear_redo_chain(&mut self) -> bool {
        let Some(head) = self.redo_head() else {
            return false;
        };
        let evicted = if Some(head) == self.ring.root() {
            // Nothing but redo atoms in the ring.
            let start = self.ring.next(head);
            self.ring.splice_out_range(start, true, &mut self.release)
        } else {
            self.ring.splice_out_range(head, false, &mut self.release)
        };
        self.count_out(false, evicted);
        debug_assert_eq!(self.redo.depth, 0);
        debug!(atoms = evicted.atoms, "cleared redo chain");
        true
    }

    /// Drop every undo atom and mark the history irreversible. Returns true
    /// if anything was removed.
    pub(crate) fn clear_undo_chain(&mut self) -> bool {
        let (Some(root), Some(last)) = (self.ring.root(), self.ring.last()) else {
            return false;
        };
        let after = self.ring.next(last);
        let evicted = if after == root {
            let start = self.ring.next(root);
            self.ring.splice_out_range(start, true, &mut self.release)
        } else {
            self.ring.set_root(Some(after));
            self.ring.splice_out_range(root, false, &mut self.release)
        };
        self.count_out(true, evicted);
        debug_assert_eq!(self.undo.depth, 0);
        debug_assert!(self.ring.last().is_none());
        self.irreversible = true;
        debug!(atoms = evicted.atoms, "cleared undo chain, history is now irreversible");
        true
    }

    /// Drop the oldest undo atom. Returns true if one was removed.
    pub(crate) fn evict_oldest_undo(&mut self) -> bool {
        if self.undo.depth == 0 {
            return false;
        }
        let Some(root) = self.ring.root() else {
            return false;
        };
        let evicted = self.ring.splice_out_range(root, true, &mut self.release);
        self.count_out(true, evicted);
        self.irreversible = true;
        debug!(
            undo_depth = self.undo.depth,
            "evicted oldest undo atom, history is now irreversible"
        );
        true
    }

    /// Drop the redo atom that would be redone last. Returns true if one was
    /// removed.
    pub(crate) fn evict_farthest_redo(&mut self) -> bool {
        if self.redo.depth == 0 {
            return false;
        }
        let Some(root) = self.ring.root() else {
            return false;
        };
        let farthest = self.ring.prev(root);
        let evicted = if farthest == root {
            self.ring.splice_out_range(root, true, &mut self.release)
        } else {
            self.ring.splice_out_range(farthest, false, &mut self.release)
        };
        self.count_out(false, evicted);
        debug!(redo_depth = self.redo.depth, "evicted farthest redo atom");
        true
    }

    /// Size of the atom the next trim step would remove, and whether it
    /// sits on the undo side.
    pub(crate) fn next_trim_candidate(&self) -> Option<(bool, usize)> {
        let root = self.ring.root()?;
        if self.redo.depth > 0 {
            Some((false, self.ring.atom(self.ring.prev(root)).size()))
        } else if self.undo.depth > 0 {
            Some((true, self.ring.atom(root).size()))
        } else {
            None
        }
    }

    /// Unlink and release the node an undo/redo was applying.
    pub(crate) fn drop_in_progress(&mut self) {
        if let Some(node) = self.in_progress.take() {
            self.ring.unlink(node);
            self.ring.discard(node, &mut self.release);
        }
    }

    /// Take a counted atom off its side because an undo/redo is applying it.
    pub(crate) fn count_in_progress(&mut self, undo_side: bool, len: usize, size: usize) {
        self.count_out(
            undo_side,
            Evicted {
                atoms: 1,
                items: len,
                size,
            },
        );
    }

    fn count_out(&mut self, undo_side: bool, evicted: Evicted) {
        if undo_side {
            self.undo.remove(evicted);
        } else {
            self.redo.remove(evicted);
        }
    }
}
