//! Transaction-visibility and id-ceiling tracking.
//!
//! The oracle holds the highest commit timestamp published to readers and
//! the highest entity id the engine may consider handed out. Both only ever
//! move forward.

use std::sync::atomic::{AtomicU64, Ordering};

use graphlet_common::types::{Timestamp, Uid};

/// Monotonic counters shared by the engine's read and write paths.
#[derive(Debug, Default)]
pub struct Oracle {
    max_assigned: AtomicU64,
    max_uid: AtomicU64,
}

impl Oracle {
    /// Creates an oracle with both counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the highest published timestamp.
    #[must_use]
    pub fn max_assigned(&self) -> Timestamp {
        Timestamp::new(self.max_assigned.load(Ordering::Acquire))
    }

    /// Raises the published timestamp. Lower values are ignored.
    pub fn publish(&self, ts: Timestamp) {
        self.max_assigned.fetch_max(ts.as_u64(), Ordering::AcqRel);
    }

    /// Returns the highest entity id reserved by the lease layer.
    #[must_use]
    pub fn max_uid(&self) -> Uid {
        Uid::new(self.max_uid.load(Ordering::Acquire))
    }

    /// Raises the id ceiling. Lower values are ignored.
    pub fn bump_max_uid(&self, uid: Uid) {
        self.max_uid.fetch_max(uid.as_u64(), Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_only_advance() {
        let oracle = Oracle::new();
        oracle.publish(Timestamp::new(10));
        oracle.publish(Timestamp::new(4));
        assert_eq!(oracle.max_assigned(), Timestamp::new(10));

        oracle.bump_max_uid(Uid::new(100));
        oracle.bump_max_uid(Uid::new(50));
        assert_eq!(oracle.max_uid(), Uid::new(100));
    }
}
