//! Queue Statistics Module
//!
//! Snapshot of the concurrency queue's occupancy and lifetime counters.

use serde::Serialize;

// == Queue Stats ==
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Maximum number of operations running at once
    pub capacity: usize,
    /// Operations currently running
    pub active: usize,
    /// Operations waiting for a free slot
    pub pending: usize,
    /// Operations ever submitted
    pub enqueued: u64,
    /// Operations ever started
    pub admitted: u64,
    /// Operations that finished, whatever the outcome
    pub completed: u64,
    /// Completed operations that resolved with an error
    pub failed: u64,
}

impl QueueStats {
    /// True when nothing is running or waiting.
    pub fn is_idle(&self) -> bool {
        self.active == 0 && self.pending == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        assert!(QueueStats::default().is_idle());
    }

    #[test]
    fn test_busy_is_not_idle() {
        let stats = QueueStats {
            capacity: 3,
            active: 1,
            ..Default::default()
        };
        assert!(!stats.is_idle());
    }
}
