//! Core types for the history engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Capacity a recycled staging atom is reset to.
pub(crate) const INITIAL_ATOM_CAPACITY: usize = 8;

/// One caller-owned payload plus its declared weight.
///
/// The engine never inspects `item`; it only moves it around and hands it back
/// through the release callback (or [`crate::History::swap_last_item`]).
#[derive(Clone, PartialEq, Eq)]
pub struct Record<T> {
    /// The caller's payload.
    pub item: T,

    /// Caller-declared weight, counted against `max_size`.
    pub size: usize,

    /// True if the record was pushed as part of a redo atom.
    pub is_redo: bool,
}

impl<T> Record<T> {
    pub(crate) fn new(item: T, size: usize, is_redo: bool) -> Self {
        Self { item, size, is_redo }
    }

    /// Take the payload back.
    pub fn into_item(self) -> T {
        self.item
    }
}

impl<T: fmt::Debug> fmt::Debug for Record<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let polarity = if self.is_redo { "redo" } else { "undo" };
        write!(f, "Record({:?}, {}b, {})", self.item, self.size, polarity)
    }
}

/// An ordered group of records applied or undone as one step.
///
/// Records are kept in push order, which is also the order of application.
pub struct Atom<T> {
    records: Vec<Record<T>>,
    total_size: usize,
    is_redo: bool,
}

impl<T> Default for Atom<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            total_size: 0,
            is_redo: false,
        }
    }
}

impl<T> Atom<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
            total_size: 0,
            is_redo: false,
        }
    }

    /// Records in application order.
    pub fn records(&self) -> &[Record<T>] {
        &self.records
    }

    /// Iterate the records in application order.
    pub fn iter(&self) -> std::slice::Iter<'_, Record<T>> {
        self.records.iter()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sum of the record sizes.
    pub fn size(&self) -> usize {
        self.total_size
    }

    /// True if this atom lives (or will live) on the redo side.
    pub fn is_redo(&self) -> bool {
        self.is_redo
    }

    /// The most recently pushed record.
    pub fn last(&self) -> Option<&Record<T>> {
        self.records.last()
    }

    /// Allocated record slots.
    pub fn capacity(&self) -> usize {
        self.records.capacity()
    }

    /// Append a record. The first record decides the atom's polarity.
    pub(crate) fn push(&mut self, record: Record<T>) {
        if self.records.is_empty() {
            self.is_redo = record.is_redo;
        }
        debug_assert_eq!(self.is_redo, record.is_redo, "mixed polarity in one atom");
        self.total_size += record.size;
        self.records.push(record);
    }

    /// Replace the last record, returning the old one.
    ///
    /// On an empty atom the new item is handed straight back.
    pub(crate) fn swap_last(&mut self, item: T, size: usize) -> Result<Record<T>, T> {
        let is_redo = self.is_redo;
        let Some(slot) = self.records.last_mut() else {
            return Err(item);
        };
        let old = std::mem::replace(slot, Record::new(item, size, is_redo));
        self.total_size = self.total_size - old.size + size;
        Ok(old)
    }

    /// Trim backing storage to exactly fit; committed atoms do not grow.
    pub(crate) fn commit_shrink(&mut self) {
        self.records.shrink_to_fit();
    }

    /// Empty the atom, handing every record to `release`.
    ///
    /// With `force`, or when the buffer grew past the initial capacity, the
    /// backing storage is reallocated small again.
    pub(crate) fn recycle(&mut self, force: bool, mut release: impl FnMut(Record<T>)) {
        for record in self.records.drain(..) {
            release(record);
        }
        self.total_size = 0;
        self.is_redo = false;
        if force || self.records.capacity() > INITIAL_ATOM_CAPACITY {
            self.records = Vec::with_capacity(INITIAL_ATOM_CAPACITY);
        }
    }
}

impl<'a, T> IntoIterator for &'a Atom<T> {
    type Item = &'a Record<T>;
    type IntoIter = std::slice::Iter<'a, Record<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl<T: fmt::Debug> fmt::Debug for Atom<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Atom")
            .field("records", &self.records)
            .field("size", &self.total_size)
            .field("is_redo", &self.is_redo)
            .finish()
    }
}

/// What the history is doing right now.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Idle,
    Undoing,
    Redoing,
}

/// One of the two partitions of the ring.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Undo,
    Redo,
}

/// Point-in-time counters of a history.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryStats {
    pub undo_depth: usize,
    pub redo_depth: usize,
    pub undo_items: usize,
    pub redo_items: usize,
    pub undo_size: usize,
    pub redo_size: usize,
    /// Records waiting in the staging atom.
    pub pending_items: usize,
    /// Weight of the staging atom.
    pub pending_size: usize,
    pub irreversible: bool,
}
