//! Segment store: the sender's copy of every segment read from the source.
//!
//! The reader appends, the transmission engine and the retransmission paths
//! look segments up by offset.  Entries are never removed so any segment can
//! be sent again until the transfer ends.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::watch;

use crate::packet::Segment;

/// Append-only map from byte offset to [`Segment`].
///
/// Offsets are contiguous: each inserted segment starts where the previous
/// one ended.
#[derive(Debug)]
pub struct SegmentStore {
    segments: RwLock<BTreeMap<u64, Arc<Segment>>>,
    ready: watch::Sender<bool>,
}

impl Default for SegmentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentStore {
    pub fn new() -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            segments: RwLock::new(BTreeMap::new()),
            ready,
        }
    }

    /// Append `segment` and return the offset just past it.
    ///
    /// The first insertion flips the "data available" flag.
    pub fn insert(&self, segment: Segment) -> u64 {
        let end = segment.end();
        {
            let mut segments = self.segments.write().unwrap_or_else(PoisonError::into_inner);
            debug_assert_eq!(
                segments.last_key_value().map_or(0, |(_, s)| s.end()),
                segment.offset,
                "segments must be appended contiguously"
            );
            segments.insert(segment.offset, Arc::new(segment));
        }
        self.mark_ready();
        end
    }

    /// The segment starting exactly at `offset`, if it has been read.
    pub fn get(&self, offset: u64) -> Option<Arc<Segment>> {
        self.segments
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&offset)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.segments.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Signal that the store can be consumed.
    ///
    /// Called on the first insertion, and by the reader at end of input so an
    /// empty source does not leave waiters blocked.  Only the first call has
    /// any effect.
    pub fn mark_ready(&self) {
        let changed = self.ready.send_if_modified(|ready| !std::mem::replace(ready, true));
        if changed {
            log::debug!("[store] data available");
        }
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Wait until [`mark_ready`](Self::mark_ready) has been called.
    pub async fn wait_ready(&self) {
        let mut rx = self.ready.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|ready| *ready).await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn seg(offset: u64, len: usize) -> Segment {
        Segment::new(offset, 100, vec![0xab; len])
    }

    #[test]
    fn lookup_by_start_offset_only() {
        let store = SegmentStore::new();
        assert_eq!(store.insert(seg(0, 10)), 10);
        assert_eq!(store.insert(seg(10, 10)), 20);

        assert_eq!(store.get(10).unwrap().offset, 10);
        assert!(store.get(5).is_none(), "mid-segment offsets are not keys");
        assert!(store.get(20).is_none());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn first_insert_marks_ready() {
        let store = SegmentStore::new();
        assert!(!store.is_ready());
        store.insert(seg(0, 1));
        assert!(store.is_ready());
    }

    #[test]
    #[should_panic(expected = "contiguously")]
    #[cfg(debug_assertions)]
    fn gap_is_rejected_in_debug_builds() {
        let store = SegmentStore::new();
        store.insert(seg(0, 10));
        store.insert(seg(20, 10));
    }

    #[tokio::test]
    async fn wait_ready_unblocks_on_insert() {
        let store = Arc::new(SegmentStore::new());
        let waiter = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.wait_ready().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        store.insert(seg(0, 4));
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter released")
            .unwrap();
    }

    #[tokio::test]
    async fn wait_ready_returns_immediately_once_ready() {
        let store = SegmentStore::new();
        store.mark_ready();
        store.mark_ready();
        tokio::time::timeout(Duration::from_millis(100), store.wait_ready())
            .await
            .expect("already ready");
        assert!(store.is_empty());
    }
}
