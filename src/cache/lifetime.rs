//! Lifetime Tracker Module
//!
//! Implements strict insertion-order (FIFO) tracking for cache eviction.

use std::collections::VecDeque;

use crate::error::{CacheError, Result};

// == Lifetime Tracker ==
/// Tracks insertion order of live entries for FIFO eviction.
///
/// Records are stored in a VecDeque where:
/// - Front = Oldest (next eviction candidate)
/// - Back = Newest
///
/// Access never reorders the queue. The tracker holds no lock of its own;
/// callers must hold the lock that protects the entry table.
#[derive(Debug)]
pub struct LifetimeTracker<R> {
    /// Records in insertion order
    queue: VecDeque<R>,
    #[cfg(test)]
    fail_next_add: bool,
}

impl<R> LifetimeTracker<R> {
    // == Constructor ==
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            #[cfg(test)]
            fail_next_add: false,
        }
    }

    // == Add ==
    /// Appends a record as the newest entry.
    ///
    /// Fails only if the queue cannot grow, in which case it is left unchanged.
    pub fn add(&mut self, record: R) -> Result<()> {
        self.reserve_one()?;
        self.queue.push_back(record);
        Ok(())
    }

    // == Pop Oldest ==
    /// Removes and returns the oldest record.
    ///
    /// Returns `CacheError::QueueEmpty` if nothing is tracked.
    pub fn pop_oldest(&mut self) -> Result<R> {
        self.queue.pop_front().ok_or(CacheError::QueueEmpty)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.queue.iter()
    }

    #[cfg(not(test))]
    fn reserve_one(&mut self) -> Result<()> {
        self.queue.try_reserve(1)?;
        Ok(())
    }

    #[cfg(test)]
    fn reserve_one(&mut self) -> Result<()> {
        if std::mem::take(&mut self.fail_next_add) {
            self.queue.try_reserve(usize::MAX)?;
        }
        self.queue.try_reserve(1)?;
        Ok(())
    }

    /// Makes the next `add` fail as if the queue could not grow.
    #[cfg(test)]
    pub(crate) fn fail_next_add(&mut self) {
        self.fail_next_add = true;
    }
}

impl<R> Default for LifetimeTracker<R> {
    fn default() -> Self {
        Self::new()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_new() {
        let tracker: LifetimeTracker<u32> = LifetimeTracker::new();
        assert!(tracker.is_empty());
        assert_eq!(tracker.len(), 0);
    }

    #[test]
    fn test_pop_from_empty() {
        let mut tracker: LifetimeTracker<u32> = LifetimeTracker::new();
        assert!(matches!(tracker.pop_oldest(), Err(CacheError::QueueEmpty)));
    }

    #[test]
    fn test_single_insertion() {
        let mut tracker = LifetimeTracker::new();
        tracker.add(14793u32).unwrap();

        assert_eq!(tracker.pop_oldest().unwrap(), 14793);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_multi_insertion_is_fifo() {
        let mut tracker = LifetimeTracker::new();
        let limit = 1000u32;
        for i in 0..limit {
            tracker.add(i).unwrap();
        }

        assert_eq!(tracker.iter().next(), Some(&0));
        for i in 0..limit {
            assert_eq!(tracker.pop_oldest().unwrap(), i);
        }
        assert!(tracker.pop_oldest().is_err());
    }

    #[test]
    fn test_failed_add_leaves_queue_unchanged() {
        let mut tracker = LifetimeTracker::new();
        tracker.add("a").unwrap();
        tracker.fail_next_add();

        let result = tracker.add("b");
        assert!(matches!(result, Err(CacheError::TrackerAllocation(_))));
        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.iter().copied().collect::<Vec<_>>(), vec!["a"]);

        // Only the next add is affected
        tracker.add("c").unwrap();
        assert_eq!(tracker.len(), 2);
    }
}
