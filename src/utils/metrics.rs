//! Observability counters for the endpoint.
//!
//! Uses atomic counters so the transport task and any inspection thread
//! can share one collector without locking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Endpoint-wide metrics collector.
#[derive(Debug)]
pub struct Metrics {
    /// Total datagrams received
    pub datagrams_received: AtomicU64,
    /// Total datagrams sent
    pub datagrams_sent: AtomicU64,
    /// Total bytes received
    pub bytes_received: AtomicU64,
    /// Total bytes sent
    pub bytes_sent: AtomicU64,
    /// Datagrams dropped because parsing failed
    pub parse_failures: AtomicU64,
    /// Addresses added to the ban set
    pub bans_issued: AtomicU64,
    /// Peers that completed the join handshake
    pub joins_completed: AtomicU64,
    /// Server-browser queries routed away from the core
    pub browser_queries: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        Self {
            datagrams_received: AtomicU64::new(0),
            datagrams_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            parse_failures: AtomicU64::new(0),
            bans_issued: AtomicU64::new(0),
            joins_completed: AtomicU64::new(0),
            browser_queries: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn datagram_received(&self, bytes: usize) {
        self.datagrams_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn datagram_sent(&self, bytes: usize) {
        self.datagrams_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn parse_failure(&self) {
        self.parse_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn ban_issued(&self) {
        self.bans_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn join_completed(&self) {
        self.joins_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn browser_query(&self) {
        self.browser_queries.fetch_add(1, Ordering::Relaxed);
    }

    /// Uptime in seconds.
    #[must_use]
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Log a one-line summary of all counters.
    pub fn summarize(&self) {
        info!(
            uptime_secs = self.uptime_secs(),
            datagrams_received = self.datagrams_received.load(Ordering::Relaxed),
            datagrams_sent = self.datagrams_sent.load(Ordering::Relaxed),
            bytes_received = self.bytes_received.load(Ordering::Relaxed),
            bytes_sent = self.bytes_sent.load(Ordering::Relaxed),
            parse_failures = self.parse_failures.load(Ordering::Relaxed),
            bans_issued = self.bans_issued.load(Ordering::Relaxed),
            joins_completed = self.joins_completed.load(Ordering::Relaxed),
            browser_queries = self.browser_queries.load(Ordering::Relaxed),
            "endpoint metrics"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let metrics = Metrics::new();
        metrics.datagram_received(100);
        metrics.datagram_received(28);
        metrics.parse_failure();

        assert_eq!(metrics.datagrams_received.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.bytes_received.load(Ordering::Relaxed), 128);
        assert_eq!(metrics.parse_failures.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.datagrams_sent.load(Ordering::Relaxed), 0);
    }
}
