//! # Undo Ring
//!
//! A capacity-bounded undo/redo history for editors.
//!
//! ## Core Concepts
//!
//! - **Records**: Opaque caller-owned payloads with a declared size
//! - **Atoms**: Groups of records undone or redone as one step
//! - **Ring**: One circular list holding undo atoms followed by redo atoms
//! - **Limits**: Depth and size ceilings; evicting undo atoms makes the
//!   history irreversible
//!
//! ## Example
//!
//! ```ignore
//! use undoring::{History, HistoryConfig};
//!
//! let mut history = History::new(HistoryConfig::default())
//!     .with_apply(|atom, sink| {
//!         // Revert each edit in reverse and record how to put it back.
//!         for record in atom.iter().rev() {
//!             let inverse = document.revert(&record.item);
//!             sink.push(inverse, record.size).ok();
//!         }
//!     });
//!
//! history.push_item(Edit::insert(0, "hello"), 5)?;
//! history.push_separator(true);
//!
//! history.do_undo()?;
//! history.do_redo()?;
//! ```

pub mod config;
pub mod cursor;
pub mod error;
pub mod history;
pub mod journal;
pub mod notify;
pub(crate) mod ring;
pub mod types;

// Re-exports
pub use config::HistoryConfig;
pub use cursor::{RedoAtoms, UndoAtoms};
pub use error::{HistoryError, Result};
pub use history::{ApplyFn, ChangeFn, Compensation, History, ReleaseFn};
pub use journal::{Journal, JournalAtom, JournalRecord};
pub use notify::{ChangeEvent, ChangeFeed, ChangeKind, FeedHandle};
pub use types::*;
