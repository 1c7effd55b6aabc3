use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub packets_sent: u64,
    pub packets_delivered: u64,
    pub packets_forwarded: u64,
    pub packets_dropped: u64,
    pub updates_sent: u64,
    pub updates_received: u64,
    pub route_changes: u64,
    pub malformed: u64,
}

impl StatsSnapshot {
    pub fn merge(&mut self, other: &StatsSnapshot) {
        self.packets_sent += other.packets_sent;
        self.packets_delivered += other.packets_delivered;
        self.packets_forwarded += other.packets_forwarded;
        self.packets_dropped += other.packets_dropped;
        self.updates_sent += other.updates_sent;
        self.updates_received += other.updates_received;
        self.route_changes += other.route_changes;
        self.malformed += other.malformed;
    }
}

/// Per-node counters. Clones share the same storage, so the driver can keep a
/// handle while the node runs on another task.
#[derive(Debug, Clone, Default)]
pub struct NodeStats {
    inner: Arc<RwLock<StatsSnapshot>>,
}

impl NodeStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn packet_sent(&self) {
        self.inner.write().packets_sent += 1;
    }

    pub fn packet_delivered(&self) {
        self.inner.write().packets_delivered += 1;
    }

    pub fn packet_forwarded(&self) {
        self.inner.write().packets_forwarded += 1;
    }

    pub fn packet_dropped(&self) {
        self.inner.write().packets_dropped += 1;
    }

    pub fn update_sent(&self) {
        self.inner.write().updates_sent += 1;
    }

    pub fn update_received(&self) {
        self.inner.write().updates_received += 1;
    }

    pub fn routes_changed(&self, count: usize) {
        self.inner.write().route_changes += count as u64;
    }

    pub fn malformed(&self) {
        self.inner.write().malformed += 1;
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        *self.inner.read()
    }
}
