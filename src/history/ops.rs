//! Public mutators: pushing, undo/redo and limit changes.

use super::{Compensation, History};
use crate::error::{HistoryError, Result};
use crate::notify::ChangeKind;
use crate::ring::{NodeId, NodeRole};
use crate::types::{Atom, Mode, Record, Side};
use tracing::{debug, trace};

impl<T> History<T> {
    // --- Pushing ---

    /// Push one record into the staging atom.
    ///
    /// Outside an undo/redo this is an ordinary edit: a pending separator is
    /// flushed first and any redo atoms are dropped. During an undo the
    /// record becomes part of the compensating redo atom and is rejected with
    /// [`HistoryError::CapacityExceeded`] (and released) if the redo side is
    /// already at its ceiling.
    pub fn push_item(&mut self, item: T, size: usize) -> Result<()> {
        let is_redo = self.mode == Mode::Undoing;
        if is_redo && self.redo_full() {
            (self.release)(Record::new(item, size, true));
            debug!(redo_depth = self.redo.depth, "redo side full, compensating record released");
            return Err(HistoryError::CapacityExceeded(Side::Redo));
        }

        if self.mode == Mode::Idle {
            self.flush_separator();
            if self.staged_polarity() == Some(true) {
                self.insert_current();
            }
            self.clear_redo_chain();
        }

        self.push_record(item, size, is_redo);
        self.debug_check();
        Ok(())
    }

    /// Mark a step boundary.
    ///
    /// With `immediately` the staging atom is committed now. Otherwise the
    /// commit happens on the next push, so a run of edits can be closed
    /// without knowing where the next one starts. Ignored during undo/redo.
    pub fn push_separator(&mut self, immediately: bool) {
        if self.mode != Mode::Idle {
            return;
        }
        if immediately {
            self.pending_separator = false;
            self.insert_current();
            self.debug_check();
        } else {
            self.pending_separator = true;
        }
    }

    /// Push one record as its own redo atom, for rebuilding a history from
    /// outside.
    ///
    /// A separator is forced first, so anything staged is committed and
    /// every call starts a new redo atom. Each committed redo atom becomes
    /// the nearest one, so rebuild the redo side farthest first.
    pub fn push_redo_item(&mut self, item: T, size: usize) -> Result<()> {
        if let Err(e) = self.ensure_idle() {
            (self.release)(Record::new(item, size, true));
            return Err(e);
        }
        self.pending_separator = false;
        self.insert_current();
        self.push_redo_record(item, size)
    }

    /// Stage a redo record, grouping it with staged redo records until the
    /// next separator. Staged undo records are committed first.
    pub(crate) fn push_redo_record(&mut self, item: T, size: usize) -> Result<()> {
        if let Err(e) = self.ensure_idle() {
            (self.release)(Record::new(item, size, true));
            return Err(e);
        }

        self.flush_separator();
        if self.staged_polarity() == Some(false) {
            self.insert_current();
        }
        if self.staged_polarity().is_none() && (self.redo_full() || self.undo_full()) {
            (self.release)(Record::new(item, size, true));
            debug!(depth = self.depth(), "no room for another redo atom, record released");
            return Err(HistoryError::CapacityExceeded(Side::Redo));
        }

        self.push_record(item, size, true);
        self.debug_check();
        Ok(())
    }

    /// Replace the most recently pushed record and hand the old one back.
    ///
    /// Looks at the staging atom first, then (when idle) at the newest
    /// committed undo atom. With no record anywhere the new item is released
    /// and [`HistoryError::NoRecord`] is returned.
    pub fn swap_last_item(&mut self, item: T, size: usize) -> Result<(T, usize)> {
        let item = match self.ring.atom_mut(self.staging).swap_last(item, size) {
            Ok(old) => {
                self.invalidate_cursors();
                return Ok((old.item, old.size));
            }
            Err(item) => item,
        };

        let target = match (self.mode, self.ring.last()) {
            (Mode::Idle, Some(last)) => last,
            _ => {
                (self.release)(Record::new(item, size, false));
                return Err(HistoryError::NoRecord);
            }
        };

        let node = self.ring.node_mut(target);
        match node.atom.swap_last(item, size) {
            Ok(old) => {
                node.cached_undo_size = node.atom.size();
                self.undo.size = self.undo.size - old.size + size;
                self.invalidate_cursors();
                self.debug_check();
                Ok((old.item, old.size))
            }
            Err(item) => {
                (self.release)(Record::new(item, size, false));
                Err(HistoryError::NoRecord)
            }
        }
    }

    /// Flag that some change bypassed the history.
    pub fn mark_irreversible(&mut self) {
        if !self.irreversible {
            debug!("history marked irreversible by the host");
        }
        self.irreversible = true;
    }

    fn flush_separator(&mut self) {
        if self.pending_separator {
            self.pending_separator = false;
            self.insert_current();
        }
    }

    /// Polarity of the staging atom, or `None` while it is empty.
    fn staged_polarity(&self) -> Option<bool> {
        let staged = self.staging_atom();
        (!staged.is_empty()).then(|| staged.is_redo())
    }

    fn push_record(&mut self, item: T, size: usize, is_redo: bool) {
        let staging = self.staging;
        let first = self.ring.atom(staging).is_empty();
        self.ring.atom_mut(staging).push(Record::new(item, size, is_redo));
        self.invalidate_cursors();
        if first && self.mode == Mode::Idle {
            self.notify(ChangeKind::Pushed);
        }
    }

    // --- Undo / redo ---

    /// Undo the newest atom through the installed apply callback.
    pub fn do_undo(&mut self) -> Result<()> {
        self.ensure_idle()?;
        let mut apply = self.take_apply()?;
        let result = self.run_undo(|atom, sink| apply(atom, sink));
        self.restore_apply(apply);
        result
    }

    /// Redo the nearest redo atom through the installed apply callback.
    pub fn do_redo(&mut self) -> Result<()> {
        self.ensure_idle()?;
        let mut apply = self.take_apply()?;
        let result = self.run_redo(|atom, sink| apply(atom, sink));
        self.restore_apply(apply);
        result
    }

    /// Undo with a one-off callback instead of the installed one.
    pub fn undo_with<F>(&mut self, apply: F) -> Result<()>
    where
        F: FnOnce(&Atom<T>, &mut Compensation<'_, T>),
    {
        self.run_undo(apply)
    }

    /// Redo with a one-off callback instead of the installed one.
    pub fn redo_with<F>(&mut self, apply: F) -> Result<()>
    where
        F: FnOnce(&Atom<T>, &mut Compensation<'_, T>),
    {
        self.run_redo(apply)
    }

    fn run_undo<F>(&mut self, apply: F) -> Result<()>
    where
        F: FnOnce(&Atom<T>, &mut Compensation<'_, T>),
    {
        self.ensure_idle()?;
        self.pending_separator = false;
        self.insert_current();

        let (Some(root), Some(node)) = (self.ring.root(), self.ring.last()) else {
            return Err(HistoryError::NothingToUndo);
        };

        let (len, size) = {
            let atom = self.ring.atom(node);
            (atom.len(), atom.size())
        };
        self.count_in_progress(true, len, size);
        let new_last = (node != root).then(|| self.ring.prev(node));
        self.ring.set_last(new_last);
        self.begin_apply(node, Mode::Undoing);
        trace!(?node, len, size, "undo started");

        self.apply_in_progress(node, apply);

        if self.staging_atom().is_empty() {
            // No compensation: whatever was redoable is stale now.
            self.drop_in_progress();
            self.clear_redo_chain();
        } else if self.insert_current() {
            self.in_progress = None;
        } else {
            self.drop_in_progress();
        }

        self.mode = Mode::Idle;
        trace!(undo_depth = self.undo.depth, redo_depth = self.redo.depth, "undo finished");
        self.notify(ChangeKind::Undone);
        self.debug_check();
        Ok(())
    }

    fn run_redo<F>(&mut self, apply: F) -> Result<()>
    where
        F: FnOnce(&Atom<T>, &mut Compensation<'_, T>),
    {
        self.ensure_idle()?;
        self.pending_separator = false;
        self.insert_current();

        let Some(node) = self.redo_head() else {
            return Err(HistoryError::NothingToRedo);
        };

        let (len, size) = {
            let atom = self.ring.atom(node);
            (atom.len(), atom.size())
        };
        self.count_in_progress(false, len, size);
        self.begin_apply(node, Mode::Redoing);
        trace!(?node, len, size, "redo started");

        self.apply_in_progress(node, apply);

        if !self.staging_atom().is_empty() && self.insert_current() {
            self.in_progress = None;
        } else {
            // Moving forward without a way back: the undo chain no longer
            // leads to the state it was recorded from.
            self.drop_in_progress();
            self.clear_undo_chain();
            self.irreversible = true;
        }

        self.mode = Mode::Idle;
        trace!(undo_depth = self.undo.depth, redo_depth = self.redo.depth, "redo finished");
        self.notify(ChangeKind::Redone);
        self.debug_check();
        Ok(())
    }

    fn begin_apply(&mut self, node: NodeId, mode: Mode) {
        self.ring.set_role(node, NodeRole::InProgress);
        self.in_progress = Some(node);
        self.mode = mode;
        self.invalidate_cursors();
    }

    /// Hand the in-progress atom to `apply`. The atom is moved out of its
    /// node for the duration so the callback can push through `self`.
    fn apply_in_progress<F>(&mut self, node: NodeId, apply: F)
    where
        F: FnOnce(&Atom<T>, &mut Compensation<'_, T>),
    {
        let atom = std::mem::take(&mut self.ring.node_mut(node).atom);
        apply(&atom, &mut Compensation { history: self });
        self.ring.node_mut(node).atom = atom;
    }

    // --- Clearing ---

    /// Drop everything: both sides and the staging atom.
    ///
    /// The irreversible flag is set to `mark_irreversible`.
    pub fn reset(&mut self, mark_irreversible: bool) -> Result<()> {
        self.ensure_idle()?;
        let had_content = !self.ring.is_empty() || !self.staging_atom().is_empty();
        let flag_changed = self.irreversible != mark_irreversible;
        if !had_content && !flag_changed {
            return Ok(());
        }

        self.pending_separator = false;
        self.recycle_staging(true);
        if let Some(root) = self.ring.root() {
            let start = self.ring.next(root);
            self.ring.splice_out_range(start, true, &mut self.release);
        }
        self.undo = Default::default();
        self.redo = Default::default();
        self.irreversible = mark_irreversible;

        debug!(mark_irreversible, "history reset");
        self.notify(ChangeKind::Reset);
        self.debug_check();
        Ok(())
    }

    /// Drop every undo atom, including staged undo records. Always leaves
    /// the history irreversible when something was dropped. Returns whether
    /// anything was removed.
    pub fn clear_undo_only(&mut self) -> Result<bool> {
        self.ensure_idle()?;
        let mut removed = false;
        if self.staged_polarity() == Some(false) {
            self.pending_separator = false;
            self.recycle_staging(true);
            self.irreversible = true;
            removed = true;
        }
        removed |= self.clear_undo_chain();
        if removed {
            self.notify(ChangeKind::Cleared { side: Side::Undo });
        }
        self.debug_check();
        Ok(removed)
    }

    /// Drop every redo atom, including staged redo records. Returns whether
    /// anything was removed.
    pub fn clear_redo_only(&mut self) -> Result<bool> {
        self.ensure_idle()?;
        let mut removed = false;
        if self.staged_polarity() == Some(true) {
            self.pending_separator = false;
            self.recycle_staging(true);
            removed = true;
        }
        removed |= self.clear_redo_chain();
        if removed {
            self.notify(ChangeKind::Cleared { side: Side::Redo });
        }
        self.debug_check();
        Ok(removed)
    }

    // --- Limits ---

    /// Change the depth ceilings, trimming right away if they are now
    /// exceeded. Redo atoms go first (farthest first), then the oldest undo
    /// atoms.
    pub fn set_max_depth(&mut self, max_undo_depth: usize, max_redo_depth: Option<usize>) -> Result<()> {
        self.ensure_idle()?;
        self.config.max_undo_depth = max_undo_depth;
        self.config.max_redo_depth = max_redo_depth;

        let mut trimmed = 0usize;
        if let Some(max_redo) = max_redo_depth {
            while self.redo.depth > max_redo && self.evict_farthest_redo() {
                trimmed += 1;
            }
        }
        if max_undo_depth > 0 {
            while self.depth() > max_undo_depth {
                if !(self.evict_farthest_redo() || self.evict_oldest_undo()) {
                    break;
                }
                trimmed += 1;
            }
        }

        if trimmed > 0 {
            debug!(trimmed, max_undo_depth, ?max_redo_depth, "trimmed to new depth limits");
            self.notify(ChangeKind::Trimmed);
        }
        self.debug_check();
        Ok(())
    }

    /// Change the size ceiling. With `apply_immediately`, committed atoms are
    /// trimmed (redo farthest first, then oldest undo) until the total fits.
    /// Otherwise only future commits see the new ceiling.
    pub fn set_max_size(&mut self, max_size: usize, apply_immediately: bool) -> Result<()> {
        self.ensure_idle()?;
        self.config.max_size = max_size;
        if !apply_immediately || max_size == 0 {
            return Ok(());
        }

        let mut trimmed = 0usize;
        let mut last_side = None;
        while let Some((undo_side, size)) = self.next_trim_candidate() {
            let over = self.size() > max_size;
            // Zero-weight atoms right behind a trimmed one on the same side
            // go with it.
            let absorb = size == 0 && last_side == Some(undo_side);
            if !over && !absorb {
                break;
            }
            if undo_side {
                self.evict_oldest_undo();
            } else {
                self.evict_farthest_redo();
            }
            last_side = Some(undo_side);
            trimmed += 1;
        }

        if trimmed > 0 {
            debug!(trimmed, max_size, size = self.size(), "trimmed to new size limit");
            self.notify(ChangeKind::Trimmed);
        }
        self.debug_check();
        Ok(())
    }
}
