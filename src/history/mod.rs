//! The history controller.
//!
//! [`History`] owns the ring, the staging atom and every counter. Edits are
//! pushed into the staging atom; a separator (or the start of an undo/redo)
//! commits it into the ring under the depth and size limits. Undo and redo
//! hand the affected atom to the apply callback, which pushes the inverse
//! records through a [`Compensation`]; those become the atom on the other
//! side, in the same ring position.
//!
//! ```text
//!        root                         last
//!         │                            │
//!   ┌──▶ [u1] ─▶ [u2] ─▶ ... ─▶ [un] ─┴▶ [r1] ─▶ ... ─▶ [rm] ──┐
//!   └──────────────────────────────────────────────────────────┘
//!   undo: oldest ─────────▶ newest    redo: next ───▶ farthest
//!
//!   staging (unlinked): receives push_item() until the next separator
//! ```

mod commit;
mod ops;

use crate::config::HistoryConfig;
use crate::error::{HistoryError, Result};
use crate::notify::ChangeKind;
use crate::ring::{Evicted, NodeId, NodeRole, Ring};
use crate::types::{Atom, HistoryStats, Mode, Record};
use std::fmt;

use crate::cursor::CursorPos;

/// Callback that applies (undoes or redoes) an atom.
pub type ApplyFn<T> = Box<dyn FnMut(&Atom<T>, &mut Compensation<'_, T>)>;

/// Callback that receives records the history no longer needs.
pub type ReleaseFn<T> = Box<dyn FnMut(Record<T>)>;

/// Callback fired once per externally visible mutation.
pub type ChangeFn = Box<dyn FnMut(ChangeKind)>;

/// Depth, record count and size of one side of the ring.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct SideCounters {
    pub(crate) depth: usize,
    pub(crate) items: usize,
    pub(crate) size: usize,
}

impl SideCounters {
    fn add(&mut self, items: usize, size: usize) {
        self.depth += 1;
        self.items += items;
        self.size += size;
    }

    fn remove(&mut self, evicted: Evicted) {
        debug_assert!(self.depth >= evicted.atoms);
        self.depth -= evicted.atoms;
        self.items -= evicted.items;
        self.size -= evicted.size;
    }
}

/// Capacity-bounded undo/redo history of caller-owned records.
pub struct History<T> {
    /// Committed atoms.
    pub(crate) ring: Ring<T>,

    /// The unlinked node receiving pushes.
    pub(crate) staging: NodeId,

    /// Ring node whose atom is being applied right now.
    pub(crate) in_progress: Option<NodeId>,

    pub(crate) undo: SideCounters,
    pub(crate) redo: SideCounters,

    pub(crate) config: HistoryConfig,
    pub(crate) mode: Mode,

    /// Some undo information has been thrown away.
    pub(crate) irreversible: bool,

    /// The next push commits the staging atom first.
    pub(crate) pending_separator: bool,

    pub(crate) undo_cursor: CursorPos,
    pub(crate) redo_cursor: CursorPos,

    /// Taken out while an undo/redo runs.
    apply: Option<ApplyFn<T>>,
    pub(crate) release: ReleaseFn<T>,
    on_change: ChangeFn,
}

impl<T: 'static> History<T> {
    /// Create an empty history. Records are simply dropped on release and
    /// the apply callback does nothing until one is installed.
    pub fn new(config: HistoryConfig) -> Self {
        let mut ring = Ring::new();
        let staging = ring.alloc(NodeRole::Staging);
        Self {
            ring,
            staging,
            in_progress: None,
            undo: SideCounters::default(),
            redo: SideCounters::default(),
            config,
            mode: Mode::Idle,
            irreversible: false,
            pending_separator: false,
            undo_cursor: CursorPos::Unstarted,
            redo_cursor: CursorPos::Unstarted,
            apply: Some(Box::new(|_: &Atom<T>, _: &mut Compensation<'_, T>| {})),
            release: Box::new(|record: Record<T>| drop(record)),
            on_change: Box::new(|_| {}),
        }
    }

    /// Create a history with all three callbacks.
    ///
    /// `max_redo_depth < 0` means unlimited; `0` for the other limits means
    /// unlimited.
    pub fn create<A, R, C>(
        max_undo_depth: u32,
        max_redo_depth: i32,
        max_size: u32,
        apply: A,
        release: R,
        on_change: C,
    ) -> Self
    where
        A: FnMut(&Atom<T>, &mut Compensation<'_, T>) + 'static,
        R: FnMut(Record<T>) + 'static,
        C: FnMut(ChangeKind) + 'static,
    {
        Self::new(HistoryConfig::from_signed(max_undo_depth, max_redo_depth, max_size))
            .with_apply(apply)
            .with_release(release)
            .with_on_change(on_change)
    }
}

impl<T> History<T> {
    /// Install the apply callback used by [`History::do_undo`] and [`History::do_redo`].
    pub fn with_apply<A>(mut self, apply: A) -> Self
    where
        A: FnMut(&Atom<T>, &mut Compensation<'_, T>) + 'static,
    {
        self.apply = Some(Box::new(apply));
        self
    }

    /// Install the release callback.
    pub fn with_release<R>(mut self, release: R) -> Self
    where
        R: FnMut(Record<T>) + 'static,
    {
        self.release = Box::new(release);
        self
    }

    /// Install the change callback.
    pub fn with_on_change<C>(mut self, on_change: C) -> Self
    where
        C: FnMut(ChangeKind) + 'static,
    {
        self.on_change = Box::new(on_change);
        self
    }

    pub(crate) fn take_apply(&mut self) -> Result<ApplyFn<T>> {
        self.apply.take().ok_or(HistoryError::Busy(self.mode))
    }

    pub(crate) fn restore_apply(&mut self, apply: ApplyFn<T>) {
        self.apply = Some(apply);
    }

    pub(crate) fn notify(&mut self, kind: ChangeKind) {
        self.invalidate_cursors();
        (self.on_change)(kind);
    }

    pub(crate) fn ensure_idle(&self) -> Result<()> {
        match self.mode {
            Mode::Idle => Ok(()),
            mode => Err(HistoryError::Busy(mode)),
        }
    }

    pub(crate) fn staging_atom(&self) -> &Atom<T> {
        self.ring.atom(self.staging)
    }

    // --- Queries ---

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Committed undo atoms.
    pub fn undo_depth(&self) -> usize {
        self.undo.depth
    }

    /// Committed redo atoms.
    pub fn redo_depth(&self) -> usize {
        self.redo.depth
    }

    /// Committed atoms on both sides.
    pub fn depth(&self) -> usize {
        self.undo.depth + self.redo.depth
    }

    /// Undo atoms counting a non-empty staging atom of undo polarity.
    pub fn undo_depth_with_pending(&self) -> usize {
        let staged = self.staging_atom();
        self.undo.depth + usize::from(!staged.is_empty() && !staged.is_redo())
    }

    /// Redo atoms counting a non-empty staging atom of redo polarity.
    pub fn redo_depth_with_pending(&self) -> usize {
        let staged = self.staging_atom();
        self.redo.depth + usize::from(!staged.is_empty() && staged.is_redo())
    }

    pub fn undo_size(&self) -> usize {
        self.undo.size
    }

    pub fn redo_size(&self) -> usize {
        self.redo.size
    }

    /// Committed size on both sides.
    pub fn size(&self) -> usize {
        self.undo.size + self.redo.size
    }

    /// Committed size plus the staging atom.
    pub fn size_with_pending(&self) -> usize {
        self.size() + self.pending_size()
    }

    /// Weight of the staging atom.
    pub fn pending_size(&self) -> usize {
        self.staging_atom().size()
    }

    /// Records in the staging atom.
    pub fn pending_len(&self) -> usize {
        self.staging_atom().len()
    }

    pub fn undo_item_count(&self) -> usize {
        self.undo.items
    }

    pub fn redo_item_count(&self) -> usize {
        self.redo.items
    }

    /// True if an undo would find something, counting the staging atom.
    pub fn can_undo(&self) -> bool {
        self.undo_depth_with_pending() > 0
    }

    /// True if a redo would find something.
    pub fn can_redo(&self) -> bool {
        self.redo.depth > 0
    }

    /// True if the document differs from the state the history started at.
    pub fn is_modified(&self) -> bool {
        self.undo.depth > 0 || self.irreversible
    }

    /// True if undo information has been discarded.
    pub fn is_irreversible(&self) -> bool {
        self.irreversible
    }

    pub fn is_performing_undo(&self) -> bool {
        self.mode == Mode::Undoing
    }

    pub fn is_performing_redo(&self) -> bool {
        self.mode == Mode::Redoing
    }

    /// True if the combined depth ceiling is reached, so the next ordinary
    /// commit evicts the oldest undo atom.
    pub fn undo_full(&self) -> bool {
        self.config.depth_reached(self.depth())
    }

    /// True if the redo ceiling is reached, so an undo cannot produce a
    /// redo atom.
    pub fn redo_full(&self) -> bool {
        self.config.redo_reached(self.redo.depth)
    }

    pub fn stats(&self) -> HistoryStats {
        HistoryStats {
            undo_depth: self.undo.depth,
            redo_depth: self.redo.depth,
            undo_items: self.undo.items,
            redo_items: self.redo.items,
            undo_size: self.undo.size,
            redo_size: self.redo.size,
            pending_items: self.pending_len(),
            pending_size: self.pending_size(),
            irreversible: self.irreversible,
        }
    }

    // --- Invariants ---

    /// Walk the ring and check links, roles, segment boundaries and
    /// counters against what is actually stored.
    pub fn validate(&self) -> Result<()> {
        let corrupt = |msg: String| HistoryError::Corruption(msg);
        let order = self.ring.walk().map_err(corrupt)?;

        let staging = self.ring.node(self.staging);
        if staging.role != NodeRole::Staging || order.contains(&self.staging) {
            return Err(corrupt(format!("staging {:?} is linked", self.staging)));
        }

        let undo_len = match self.ring.last() {
            Some(last) => order.iter().position(|&id| id == last).map_or(0, |i| i + 1),
            None => 0,
        };
        let (undo_nodes, mut rest) = order.split_at(undo_len);

        match self.in_progress {
            Some(node) => {
                if rest.first() != Some(&node) {
                    return Err(corrupt(format!("{:?} is not next to the undo segment", node)));
                }
                if self.ring.node(node).role != NodeRole::InProgress {
                    return Err(corrupt(format!("{:?} is not tagged in progress", node)));
                }
                rest = &rest[1..];
            }
            None if self.mode != Mode::Idle => {
                return Err(corrupt(format!("{:?} with nothing in progress", self.mode)));
            }
            None => {}
        }

        let tally = |nodes: &[NodeId], redo: bool| -> Result<SideCounters> {
            let mut counters = SideCounters::default();
            for &id in nodes {
                let node = self.ring.node(id);
                if node.role != NodeRole::Member {
                    return Err(corrupt(format!("{:?} has role {:?}", id, node.role)));
                }
                if node.atom.is_empty() || node.atom.is_redo() != redo {
                    return Err(corrupt(format!("{:?} holds a misplaced atom", id)));
                }
                counters.add(node.atom.len(), node.atom.size());
            }
            Ok(counters)
        };

        let undo = tally(undo_nodes, false)?;
        if undo != self.undo {
            return Err(corrupt(format!("undo counters {:?}, ring has {:?}", self.undo, undo)));
        }
        let redo = tally(rest, true)?;
        if redo != self.redo {
            return Err(corrupt(format!("redo counters {:?}, ring has {:?}", self.redo, redo)));
        }

        let expected_slots = order.len() + 1;
        if self.ring.live_slots() != expected_slots {
            return Err(corrupt(format!(
                "{} live slots for {} ring nodes",
                self.ring.live_slots(),
                order.len()
            )));
        }
        Ok(())
    }

    #[cfg(any(test, feature = "check-invariants"))]
    pub(crate) fn debug_check(&self) {
        if let Err(e) = self.validate() {
            panic!("history invariant violated: {}", e);
        }
    }

    #[cfg(not(any(test, feature = "check-invariants")))]
    pub(crate) fn debug_check(&self) {}
}

impl<T> fmt::Debug for History<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("History")
            .field("undo", &self.undo)
            .field("redo", &self.redo)
            .field("pending_items", &self.pending_len())
            .field("mode", &self.mode)
            .field("irreversible", &self.irreversible)
            .field("config", &self.config)
            .finish()
    }
}

/// What an apply callback may do to the history while an undo or redo runs:
/// push the compensating records, and look.
pub struct Compensation<'a, T> {
    pub(crate) history: &'a mut History<T>,
}

impl<'a, T> Compensation<'a, T> {
    /// Push one compensating record.
    pub fn push(&mut self, item: T, size: usize) -> Result<()> {
        self.history.push_item(item, size)
    }

    /// Replace the most recently pushed compensating record.
    pub fn swap_last_item(&mut self, item: T, size: usize) -> Result<(T, usize)> {
        self.history.swap_last_item(item, size)
    }

    /// Read-only view of the history.
    pub fn history(&self) -> &History<T> {
        self.history
    }

    pub fn mode(&self) -> Mode {
        self.history.mode
    }
}
