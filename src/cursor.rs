//! Read-only walks over the undo and redo chains.
//!
//! The undo walk goes newest to oldest: the staging atom first when it
//! holds undo records, then `last`, `last.prev`, ... down to the root. The
//! redo walk goes farthest to nearest: `root.prev` down to the node after
//! `last`, then the staging atom when it holds redo records. A node being
//! applied is never visited.
//!
//! Two forms are offered. The stateful cursors (`first_undo`/`next_undo`,
//! `first_redo`/`next_redo`) live on the history and are reset by every
//! mutation. The iterator adapters ([`History::undo_atoms`],
//! [`History::redo_atoms`]) borrow the history and cannot outlive a change.

use crate::history::History;
use crate::ring::NodeId;
use crate::types::Atom;

/// Where a stateful cursor stands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum CursorPos {
    /// `first_*` has not been called since the last mutation.
    #[default]
    Unstarted,
    Staging,
    Node(NodeId),
    Done,
}

impl<T> History<T> {
    pub(crate) fn invalidate_cursors(&mut self) {
        self.undo_cursor = CursorPos::Unstarted;
        self.redo_cursor = CursorPos::Unstarted;
    }

    fn atom_at(&self, pos: CursorPos) -> Option<&Atom<T>> {
        match pos {
            CursorPos::Staging => Some(self.staging_atom()),
            CursorPos::Node(id) => Some(self.ring.atom(id)),
            CursorPos::Unstarted | CursorPos::Done => None,
        }
    }

    fn staged_on(&self, redo: bool) -> bool {
        let staged = self.staging_atom();
        !staged.is_empty() && staged.is_redo() == redo
    }

    // --- Undo walk ---

    fn undo_start(&self) -> CursorPos {
        if self.staged_on(false) {
            CursorPos::Staging
        } else {
            self.ring.last().map_or(CursorPos::Done, CursorPos::Node)
        }
    }

    fn undo_after(&self, pos: CursorPos) -> CursorPos {
        match pos {
            CursorPos::Staging => self.ring.last().map_or(CursorPos::Done, CursorPos::Node),
            CursorPos::Node(id) if Some(id) == self.ring.root() => CursorPos::Done,
            CursorPos::Node(id) => CursorPos::Node(self.ring.prev(id)),
            CursorPos::Unstarted | CursorPos::Done => CursorPos::Done,
        }
    }

    // --- Redo walk ---

    fn redo_tail(&self) -> CursorPos {
        if self.staged_on(true) {
            CursorPos::Staging
        } else {
            CursorPos::Done
        }
    }

    /// `id` if it is still on the counted redo side, else the walk's tail.
    fn redo_from(&self, id: NodeId) -> CursorPos {
        if Some(id) == self.ring.last() || Some(id) == self.in_progress {
            self.redo_tail()
        } else {
            CursorPos::Node(id)
        }
    }

    fn redo_start(&self) -> CursorPos {
        match self.ring.root() {
            Some(root) => self.redo_from(self.ring.prev(root)),
            None => self.redo_tail(),
        }
    }

    fn redo_after(&self, pos: CursorPos) -> CursorPos {
        match pos {
            CursorPos::Node(id) if Some(id) == self.ring.root() => self.redo_tail(),
            CursorPos::Node(id) => self.redo_from(self.ring.prev(id)),
            CursorPos::Unstarted | CursorPos::Staging | CursorPos::Done => CursorPos::Done,
        }
    }

    // --- Stateful cursors ---

    /// Start the undo cursor and return the newest undo atom.
    pub fn first_undo(&mut self) -> Option<&Atom<T>> {
        self.undo_cursor = self.undo_start();
        self.atom_at(self.undo_cursor)
    }

    /// Advance the undo cursor. Returns `None` at the end, or if the cursor
    /// was not started (or a mutation reset it).
    pub fn next_undo(&mut self) -> Option<&Atom<T>> {
        if self.undo_cursor == CursorPos::Unstarted {
            return None;
        }
        self.undo_cursor = self.undo_after(self.undo_cursor);
        self.atom_at(self.undo_cursor)
    }

    /// Start the redo cursor and return the redo atom that would be redone
    /// last.
    pub fn first_redo(&mut self) -> Option<&Atom<T>> {
        self.redo_cursor = self.redo_start();
        self.atom_at(self.redo_cursor)
    }

    /// Advance the redo cursor.
    pub fn next_redo(&mut self) -> Option<&Atom<T>> {
        if self.redo_cursor == CursorPos::Unstarted {
            return None;
        }
        self.redo_cursor = self.redo_after(self.redo_cursor);
        self.atom_at(self.redo_cursor)
    }

    // --- Iterators ---

    /// Undo atoms, newest first, including staged undo records.
    pub fn undo_atoms(&self) -> UndoAtoms<'_, T> {
        UndoAtoms {
            history: self,
            pos: self.undo_start(),
        }
    }

    /// Redo atoms, farthest first, ending with staged redo records.
    pub fn redo_atoms(&self) -> RedoAtoms<'_, T> {
        RedoAtoms {
            history: self,
            pos: self.redo_start(),
        }
    }
}

/// Iterator over undo atoms. See [`History::undo_atoms`].
pub struct UndoAtoms<'a, T> {
    history: &'a History<T>,
    pos: CursorPos,
}

impl<'a, T> Iterator for UndoAtoms<'a, T> {
    type Item = &'a Atom<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let atom = self.history.atom_at(self.pos)?;
        self.pos = self.history.undo_after(self.pos);
        Some(atom)
    }
}

/// Iterator over redo atoms. See [`History::redo_atoms`].
pub struct RedoAtoms<'a, T> {
    history: &'a History<T>,
    pos: CursorPos,
}

impl<'a, T> Iterator for RedoAtoms<'a, T> {
    type Item = &'a Atom<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let atom = self.history.atom_at(self.pos)?;
        self.pos = self.history.redo_after(self.pos);
        Some(atom)
    }
}
