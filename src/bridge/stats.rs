//! Traffic statistics for a session
//!
//! Thread-safe counters, lock-free atomics only.

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-session traffic counters
#[derive(Debug, Default)]
pub struct Stats {
    /// Total bytes written to serial (TCP -> Serial)
    tx_total: AtomicU64,
    /// Total bytes written to TCP (Serial -> TCP)
    rx_total: AtomicU64,
    /// Heartbeats successfully queued
    heartbeats: AtomicU64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add bytes relayed TCP -> Serial
    #[inline]
    pub fn add_tx(&self, bytes: usize) {
        self.tx_total.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Add bytes relayed Serial -> TCP
    #[inline]
    pub fn add_rx(&self, bytes: usize) {
        self.rx_total.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_heartbeat(&self) {
        self.heartbeats.fetch_add(1, Ordering::Relaxed);
    }

    /// Total bytes relayed to serial
    #[inline]
    pub fn tx_bytes(&self) -> u64 {
        self.tx_total.load(Ordering::Relaxed)
    }

    /// Total bytes relayed to TCP
    #[inline]
    pub fn rx_bytes(&self) -> u64 {
        self.rx_total.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn heartbeats(&self) -> u64 {
        self.heartbeats.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = Stats::new();
        stats.add_tx(10);
        stats.add_tx(5);
        stats.add_rx(3);
        stats.add_heartbeat();

        assert_eq!(stats.tx_bytes(), 15);
        assert_eq!(stats.rx_bytes(), 3);
        assert_eq!(stats.heartbeats(), 1);
    }
}
