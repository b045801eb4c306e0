//! Peer records, ordered by configured priority.

use std::time::Instant;

use codec::{Hostname, NodeState};

pub const HIGHEST_PRIORITY: u16 = 1;
pub const REPLICA_PRIORITY: u16 = 0xFFFF;

/// A single configured peer. `last_heard` is `None` until the first valid
/// heartbeat arrives from this host — that is distinct from "heard a long
/// time ago" and must never be conflated with an elapsed-time comparison
/// against the epoch.
#[derive(Debug, Clone)]
pub struct NodeEntry {
    pub hostname: Hostname,
    pub priority: u16,
    pub state: NodeState,
    pub score: u16,
    pub heartbeat_gap: u16,
    pub last_heard: Option<Instant>,
}

impl NodeEntry {
    pub fn new(hostname: Hostname, priority: u16) -> Self {
        Self {
            hostname,
            priority,
            state: NodeState::Unknown,
            score: 0,
            heartbeat_gap: 0,
            last_heard: None,
        }
    }

    pub fn is_replica(&self) -> bool {
        self.priority == REPLICA_PRIORITY
    }

    /// Whether a heartbeat has been received within `interval` of `now`.
    /// An unset `last_heard` always counts as not-received.
    pub fn received_within(&self, now: Instant, interval: std::time::Duration) -> bool {
        match self.last_heard {
            Some(at) => now.saturating_duration_since(at) <= interval,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_last_heard_is_never_received() {
        let node = NodeEntry::new(Hostname::new("a"), HIGHEST_PRIORITY);
        assert!(!node.received_within(Instant::now(), std::time::Duration::from_secs(3600)));
    }

    #[test]
    fn recent_heartbeat_counts_as_received() {
        let mut node = NodeEntry::new(Hostname::new("a"), HIGHEST_PRIORITY);
        node.last_heard = Some(Instant::now());
        assert!(node.received_within(Instant::now(), std::time::Duration::from_secs(5)));
    }
}
