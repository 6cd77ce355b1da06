use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide ingest counters, shared by every connection.
#[derive(Debug, Default)]
pub struct IngestStats {
    connections_accepted: AtomicU64,
    connections_closed: AtomicU64,
    frames_received: AtomicU64,
    records_decoded: AtomicU64,
    records_dropped: AtomicU64,
    records_consumed: AtomicU64,
    handshake_failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStatsSnapshot {
    pub connections_accepted: u64,
    pub connections_closed: u64,
    pub frames_received: u64,
    pub records_decoded: u64,
    pub records_dropped: u64,
    pub records_consumed: u64,
    pub handshake_failures: u64,
}

impl IngestStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_connection_accepted(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connection_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decoded(&self) {
        self.records_decoded.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the running total, for log lines.
    pub fn record_dropped(&self) -> u64 {
        self.records_dropped.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_consumed(&self) {
        self.records_consumed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_handshake_failure(&self) {
        self.handshake_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> IngestStatsSnapshot {
        IngestStatsSnapshot {
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            connections_closed: self.connections_closed.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            records_decoded: self.records_decoded.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
            records_consumed: self.records_consumed.load(Ordering::Relaxed),
            handshake_failures: self.handshake_failures.load(Ordering::Relaxed),
        }
    }
}
