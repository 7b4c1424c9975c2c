//! Per-partition offset positions for a single consumer instance.

use crate::error::{Error, Result};
use crate::record::Record;
use std::collections::HashMap;
use tracing::debug;

/// Tracks the last observed and last committed offset per (topic, partition).
///
/// Offsets within a partition must be non-decreasing across successive
/// fetches, with two sanctioned exceptions: equal offsets (the broker may
/// redeliver the last uncommitted record after a reconnect), and rewinds to
/// at or above the committed offset (a group rebalance can reassign the
/// partition and resume the fetch from the last commit, replaying the
/// uncommitted tail). A rewind below the committed offset is a regression
/// and is rejected.
#[derive(Debug, Default)]
pub struct OffsetTracker {
    positions: HashMap<(String, i32), i64>,
    committed: HashMap<(String, i32), i64>,
}

impl OffsetTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the offset of a fetched record, rejecting regressions.
    pub fn observe(&mut self, record: &Record) -> Result<()> {
        let key = (record.topic.clone(), record.partition);
        if let Some(&last) = self.positions.get(&key) {
            if record.offset < last {
                // Replays resume at the committed offset; with no commit
                // recorded the resume point is the offset reset position,
                // so any non-negative rewind is a legal replay.
                let committed = self.committed.get(&key).copied().unwrap_or(0);
                if record.offset < committed {
                    return Err(Error::OffsetRegression {
                        topic: record.topic.clone(),
                        partition: record.partition,
                        last,
                        observed: record.offset,
                    });
                }
                debug!(
                    topic = %record.topic,
                    partition = record.partition,
                    from = last,
                    to = record.offset,
                    "Partition rewound to a replay point"
                );
            }
        }
        self.positions.insert(key, record.offset);
        Ok(())
    }

    /// Record a successful commit; `next_offset` is the offset a replay of
    /// this partition would resume at (committed record offset + 1).
    pub fn record_commit(&mut self, topic: &str, partition: i32, next_offset: i64) {
        let entry = self
            .committed
            .entry((topic.to_string(), partition))
            .or_insert(next_offset);
        *entry = (*entry).max(next_offset);
    }

    /// Last observed offset for a partition, if any record has been seen.
    pub fn position(&self, topic: &str, partition: i32) -> Option<i64> {
        self.positions.get(&(topic.to_string(), partition)).copied()
    }

    /// Number of partitions with at least one observed record.
    pub fn partition_count(&self) -> usize {
        self.positions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(topic: &str, partition: i32, offset: i64) -> Record {
        Record {
            topic: topic.to_string(),
            partition,
            offset,
            key: None,
            value: Vec::new(),
            timestamp: None,
        }
    }

    #[test]
    fn test_in_order_offsets_accepted() {
        let mut tracker = OffsetTracker::new();
        for offset in 0..5 {
            tracker.observe(&record("events", 0, offset)).unwrap();
        }
        assert_eq!(tracker.position("events", 0), Some(4));
    }

    #[test]
    fn test_equal_offset_accepted_for_redelivery() {
        let mut tracker = OffsetTracker::new();
        tracker.observe(&record("events", 0, 3)).unwrap();
        tracker.observe(&record("events", 0, 3)).unwrap();
        assert_eq!(tracker.position("events", 0), Some(3));
    }

    #[test]
    fn test_rebalance_replay_resumes_at_committed_offset() {
        let mut tracker = OffsetTracker::new();
        for offset in 0..6 {
            tracker.observe(&record("events", 0, offset)).unwrap();
        }
        // Records 0..=2 committed, then the partition is reassigned and the
        // fetch resumes at the committed offset, replaying 3..=5.
        tracker.record_commit("events", 0, 3);
        for offset in 3..7 {
            tracker.observe(&record("events", 0, offset)).unwrap();
        }
        assert_eq!(tracker.position("events", 0), Some(6));
    }

    #[test]
    fn test_rewind_without_commit_is_a_replay() {
        // No commit recorded: a reassignment resumes from the offset reset
        // position, so rewinding to the start of the partition is legal.
        let mut tracker = OffsetTracker::new();
        tracker.observe(&record("events", 0, 10)).unwrap();
        tracker.observe(&record("events", 0, 0)).unwrap();
        assert_eq!(tracker.position("events", 0), Some(0));
    }

    #[test]
    fn test_rewind_below_committed_offset_rejected() {
        let mut tracker = OffsetTracker::new();
        tracker.record_commit("events", 0, 8);
        tracker.observe(&record("events", 0, 10)).unwrap();
        let err = tracker.observe(&record("events", 0, 7)).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::OffsetRegression {
                last: 10,
                observed: 7,
                ..
            }
        ));
        // The tracked position is unchanged after a rejected observation.
        assert_eq!(tracker.position("events", 0), Some(10));
    }

    #[test]
    fn test_commit_floor_never_moves_backwards() {
        let mut tracker = OffsetTracker::new();
        tracker.record_commit("events", 0, 8);
        tracker.record_commit("events", 0, 5);
        tracker.observe(&record("events", 0, 10)).unwrap();
        let err = tracker.observe(&record("events", 0, 6)).unwrap_err();
        assert!(matches!(err, crate::Error::OffsetRegression { .. }));
    }

    #[test]
    fn test_partitions_tracked_independently() {
        let mut tracker = OffsetTracker::new();
        tracker.observe(&record("events", 0, 5)).unwrap();
        tracker.observe(&record("events", 1, 0)).unwrap();
        tracker.observe(&record("audit", 0, 2)).unwrap();
        assert_eq!(tracker.position("events", 0), Some(5));
        assert_eq!(tracker.position("events", 1), Some(0));
        assert_eq!(tracker.position("audit", 0), Some(2));
        assert_eq!(tracker.position("audit", 1), None);
        assert_eq!(tracker.partition_count(), 3);
    }
}
