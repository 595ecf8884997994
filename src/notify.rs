//! Change notifications.
//!
//! Every externally visible mutation of a [`crate::History`] calls its
//! `on_change` callback exactly once with a [`ChangeKind`]. Hosts that would
//! rather poll than react inline can route those calls into a [`ChangeFeed`],
//! a bounded channel that never blocks the editor.
//!
//! # Example
//!
//! ```ignore
//! let (feed, handle) = ChangeFeed::new(64);
//! let mut history = History::new(HistoryConfig::default()).with_on_change(feed.notifier());
//!
//! history.push_item("insert 'a'", 1)?;
//! while let Ok(event) = handle.try_recv() {
//!     println!("history changed: {:?}", event.kind);
//! }
//! ```

use crate::types::Side;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// What kind of mutation just happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeKind {
    /// The first record landed in an empty staging atom.
    Pushed,
    /// An undo step completed.
    Undone,
    /// A redo step completed.
    Redone,
    /// The whole history was cleared.
    Reset,
    /// One side was cleared.
    Cleared { side: Side },
    /// A limit change removed committed atoms.
    Trimmed,
}

/// A change as delivered through a [`ChangeFeed`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Position of this event in the feed, starting at 1. Gaps mean drops.
    pub seq: u64,
    pub kind: ChangeKind,
}

/// Sending half of a bounded change channel.
pub struct ChangeFeed {
    sender: Sender<ChangeEvent>,
    next_seq: u64,
    dropped: Arc<AtomicU64>,
}

impl ChangeFeed {
    /// Create a feed buffering at most `buffer_size` undelivered events.
    pub fn new(buffer_size: usize) -> (Self, FeedHandle) {
        let (sender, receiver) = bounded(buffer_size);
        let dropped = Arc::new(AtomicU64::new(0));
        let feed = Self {
            sender,
            next_seq: 1,
            dropped: Arc::clone(&dropped),
        };
        (feed, FeedHandle { receiver, dropped })
    }

    /// Publish one change. A full or disconnected channel counts as a drop.
    pub fn publish(&mut self, kind: ChangeKind) -> bool {
        let event = ChangeEvent {
            seq: self.next_seq,
            kind,
        };
        self.next_seq += 1;
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Turn the feed into an `on_change` callback.
    pub fn notifier(mut self) -> impl FnMut(ChangeKind) + 'static {
        move |kind| {
            self.publish(kind);
        }
    }
}

/// Receiving half of a [`ChangeFeed`].
pub struct FeedHandle {
    receiver: Receiver<ChangeEvent>,
    dropped: Arc<AtomicU64>,
}

impl FeedHandle {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<ChangeEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<ChangeEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> Result<ChangeEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Everything currently buffered.
    pub fn drain(&self) -> Vec<ChangeEvent> {
        self.receiver.try_iter().collect()
    }

    /// Events lost to a full buffer.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_delivers_in_order() {
        let (mut feed, handle) = ChangeFeed::new(8);
        feed.publish(ChangeKind::Pushed);
        feed.publish(ChangeKind::Undone);

        let events = handle.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], ChangeEvent { seq: 1, kind: ChangeKind::Pushed });
        assert_eq!(events[1].kind, ChangeKind::Undone);
    }

    #[test]
    fn test_full_buffer_drops_without_blocking() {
        let (feed, handle) = ChangeFeed::new(1);
        let mut notify = feed.notifier();
        notify(ChangeKind::Pushed);
        notify(ChangeKind::Redone);
        notify(ChangeKind::Reset);

        assert_eq!(handle.dropped(), 2);
        let event = handle.try_recv().unwrap();
        assert_eq!(event.seq, 1);
        assert!(handle.try_recv().is_err());
    }

    #[test]
    fn test_kind_serializes_tagged() {
        let json = serde_json::to_string(&ChangeKind::Cleared { side: Side::Redo }).unwrap();
        assert_eq!(json, r#"{"type":"cleared","side":"redo"}"#);
    }
}
