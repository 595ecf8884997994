//! Journal: a detached copy of a history's atoms.
//!
//! A [`Journal`] is what a host hands around when a history has to be moved
//! between documents or kept across a reload it manages itself. It is
//! captured read-only through the cursors and replayed through the public
//! push API, so a restored history passes through the same limit policy as
//! one built by hand.
//!
//! ## Binary format
//!
//! ```text
//! ┌────────┬─────────┬──────────────┬──────────────────────┐
//! │ "UNDJ" │ version │ crc32 (LE)   │ MessagePack body     │
//! │ 4 B    │ 1 B     │ 4 B          │ ...                  │
//! └────────┴─────────┴──────────────┴──────────────────────┘
//! ```
//!
//! The checksum covers the body only.

use crate::error::{HistoryError, Result};
use crate::history::History;
use crate::types::{Atom, Side};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

const JOURNAL_MAGIC: &[u8; 4] = b"UNDJ";
const JOURNAL_VERSION: u8 = 1;
const HEADER_LEN: usize = 9;

/// One record of a journal atom.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalRecord<U> {
    pub item: U,
    pub size: usize,
}

/// One atom, records in application order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalAtom<U> {
    pub records: Vec<JournalRecord<U>>,
}

impl<U> JournalAtom<U> {
    fn capture<T>(atom: &Atom<T>, convert: &mut impl FnMut(&T) -> U) -> Self {
        Self {
            records: atom
                .iter()
                .map(|record| JournalRecord {
                    item: convert(&record.item),
                    size: record.size,
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn size(&self) -> usize {
        self.records.iter().map(|r| r.size).sum()
    }
}

/// Both sides of a history plus its irreversible flag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journal<U> {
    /// Undo atoms, oldest first.
    pub undo: Vec<JournalAtom<U>>,

    /// Redo atoms, farthest first.
    pub redo: Vec<JournalAtom<U>>,

    pub irreversible: bool,
}

impl<U> Default for Journal<U> {
    fn default() -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            irreversible: false,
        }
    }
}

impl<U> Journal<U> {
    /// Copy every atom of an idle history, staged records included.
    pub fn capture<T>(history: &History<T>, mut convert: impl FnMut(&T) -> U) -> Result<Self> {
        history.ensure_idle()?;

        let mut undo: Vec<_> = history
            .undo_atoms()
            .map(|atom| JournalAtom::capture(atom, &mut convert))
            .collect();
        undo.reverse();
        let redo = history
            .redo_atoms()
            .map(|atom| JournalAtom::capture(atom, &mut convert))
            .collect();

        Ok(Self {
            undo,
            redo,
            irreversible: history.is_irreversible(),
        })
    }

    /// Replace the contents of `history` with this journal.
    ///
    /// Atoms are replayed oldest undo first, then redo farthest first, so
    /// grouping and order come back as they were captured. Limits of the
    /// target history still apply. If the redo side cannot fit behind the
    /// retained undo atoms, the restore fails with
    /// [`HistoryError::CapacityExceeded`] before `history` is touched.
    /// Otherwise the history is reset and replayed; undo atoms beyond the
    /// target's ceilings are evicted as usual.
    pub fn restore<T>(self, history: &mut History<T>, mut convert: impl FnMut(U) -> T) -> Result<()> {
        history.ensure_idle()?;
        self.check_redo_room(history)?;
        history.reset(false)?;

        let (undo_atoms, redo_atoms) = (self.undo.len(), self.redo.len());
        for atom in self.undo {
            for record in atom.records {
                history.push_item(convert(record.item), record.size)?;
            }
            history.push_separator(true);
        }
        for atom in self.redo {
            for record in atom.records {
                history.push_redo_record(convert(record.item), record.size)?;
            }
            history.push_separator(true);
        }
        if self.irreversible {
            history.mark_irreversible();
        }

        debug!(undo_atoms, redo_atoms, "journal restored");
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.undo.is_empty() && self.redo.is_empty()
    }

    /// Fail if replaying the redo atoms would hit a depth ceiling of
    /// `history`. Undo atoms only ever get evicted, never rejected.
    fn check_redo_room<T>(&self, history: &History<T>) -> Result<()> {
        let redo = self.redo.len();
        if redo == 0 {
            return Ok(());
        }
        let config = history.config();
        let over_redo = config.max_redo_depth.map_or(false, |max| redo > max);
        let max_depth = config.max_undo_depth;
        let over_depth = max_depth > 0 && self.undo.len().min(max_depth) + redo > max_depth;
        if over_redo || over_depth {
            debug!(redo, max_depth, "journal redo side does not fit");
            return Err(HistoryError::CapacityExceeded(Side::Redo));
        }
        Ok(())
    }
}

impl<U: Serialize> Journal<U> {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Encode as a framed MessagePack blob.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let body = rmp_serde::to_vec_named(self)?;
        let checksum = crc32fast::hash(&body);

        let mut out = Vec::with_capacity(HEADER_LEN + body.len());
        out.extend_from_slice(JOURNAL_MAGIC);
        out.push(JOURNAL_VERSION);
        out.extend_from_slice(&checksum.to_le_bytes());
        out.extend_from_slice(&body);
        Ok(out)
    }
}

impl<U: DeserializeOwned> Journal<U> {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| HistoryError::Deserialization(e.to_string()))
    }

    /// Decode a blob produced by [`Journal::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(HistoryError::InvalidFormat(format!(
                "journal too short: {} bytes",
                bytes.len()
            )));
        }

        let (header, body) = bytes.split_at(HEADER_LEN);
        if &header[..4] != JOURNAL_MAGIC {
            return Err(HistoryError::InvalidFormat("Invalid journal magic".into()));
        }
        if header[4] != JOURNAL_VERSION {
            return Err(HistoryError::InvalidFormat(format!(
                "Unsupported journal version: {}",
                header[4]
            )));
        }

        let stored = u32::from_le_bytes([header[5], header[6], header[7], header[8]]);
        let computed = crc32fast::hash(body);
        if stored != computed {
            return Err(HistoryError::ChecksumMismatch {
                expected: stored,
                got: computed,
            });
        }

        Ok(rmp_serde::from_slice(body)?)
    }
}
