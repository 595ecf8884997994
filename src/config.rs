//! History limits.

use crate::error::{HistoryError, Result};
use serde::{Deserialize, Serialize};

/// Limits applied by a [`crate::History`].
///
/// `max_undo_depth` bounds the number of committed atoms on both sides
/// together; `max_redo_depth` additionally bounds the redo side alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum committed atoms, undo and redo combined (0 = unlimited).
    pub max_undo_depth: usize,

    /// Maximum redo atoms (None = unlimited).
    pub max_redo_depth: Option<usize>,

    /// Maximum summed record size over both sides (0 = unlimited).
    pub max_size: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_undo_depth: 100,
            max_redo_depth: None,
            max_size: 0,
        }
    }
}

impl HistoryConfig {
    /// Create a configuration with custom limits.
    pub fn new(max_undo_depth: usize, max_redo_depth: Option<usize>, max_size: usize) -> Self {
        Self {
            max_undo_depth,
            max_redo_depth,
            max_size,
        }
    }

    /// No limits at all.
    pub fn unlimited() -> Self {
        Self::new(0, None, 0)
    }

    /// Build from the host-facing integer form, where a negative redo depth
    /// means "unlimited".
    pub fn from_signed(max_undo_depth: u32, max_redo_depth: i32, max_size: u32) -> Self {
        Self {
            max_undo_depth: max_undo_depth as usize,
            max_redo_depth: usize::try_from(max_redo_depth).ok(),
            max_size: max_size as usize,
        }
    }

    pub fn with_max_undo_depth(mut self, depth: usize) -> Self {
        self.max_undo_depth = depth;
        self
    }

    pub fn with_max_redo_depth(mut self, depth: Option<usize>) -> Self {
        self.max_redo_depth = depth;
        self
    }

    pub fn with_max_size(mut self, size: usize) -> Self {
        self.max_size = size;
        self
    }

    /// Load limits from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| HistoryError::Deserialization(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// True if `depth` committed atoms fill the combined ceiling.
    pub(crate) fn depth_reached(&self, depth: usize) -> bool {
        self.max_undo_depth > 0 && depth >= self.max_undo_depth
    }

    /// True if `depth` redo atoms fill the redo ceiling.
    pub(crate) fn redo_reached(&self, depth: usize) -> bool {
        self.max_redo_depth.is_some_and(|max| depth >= max)
    }

    pub(crate) fn size_limited(&self) -> bool {
        self.max_size > 0
    }
}
