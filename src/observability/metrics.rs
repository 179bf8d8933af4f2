//! Codec metrics for tern
//!
//! Per OBSERVABILITY.md:
//! - Counters only (no gauges, no histograms)
//! - Monotonic increase
//! - Reset only when the owning writer or reader is dropped
//! - Thread-safe but lock-minimal
//!
//! Each stream writer and reader owns one [`CodecMetrics`]; there is no
//! global registry.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one stream writer or reader
///
/// # Thread Safety
///
/// All counters use atomic operations with Relaxed ordering for minimal
/// overhead; eventual consistency is fine for metrics.
#[derive(Debug, Default)]
pub struct CodecMetrics {
    /// Records successfully encoded
    records_encoded: AtomicU64,
    /// Records successfully decoded
    records_decoded: AtomicU64,
    /// Encode attempts that failed
    encode_errors: AtomicU64,
    /// Decode attempts that failed
    decode_errors: AtomicU64,
    /// Total bytes written to the sink, framing included
    bytes_written: AtomicU64,
}

impl CodecMetrics {
    /// Create a new metrics block with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment records encoded
    pub(crate) fn increment_records_encoded(&self) {
        self.records_encoded.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment records decoded
    pub(crate) fn increment_records_decoded(&self) {
        self.records_decoded.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment encode errors
    pub(crate) fn increment_encode_errors(&self) {
        self.encode_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment decode errors
    pub(crate) fn increment_decode_errors(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Add bytes written to the sink
    pub(crate) fn add_bytes_written(&self, bytes: u64) {
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Get current values as JSON
    pub fn to_json(&self) -> String {
        format!(
            r#"{{"records_encoded":{},"records_decoded":{},"encode_errors":{},"decode_errors":{},"bytes_written":{}}}"#,
            self.records_encoded.load(Ordering::Relaxed),
            self.records_decoded.load(Ordering::Relaxed),
            self.encode_errors.load(Ordering::Relaxed),
            self.decode_errors.load(Ordering::Relaxed),
            self.bytes_written.load(Ordering::Relaxed),
        )
    }

    /// Get all counters as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_encoded: self.records_encoded.load(Ordering::Relaxed),
            records_decoded: self.records_decoded.load(Ordering::Relaxed),
            encode_errors: self.encode_errors.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of codec counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub records_encoded: u64,
    pub records_decoded: u64,
    pub encode_errors: u64,
    pub decode_errors: u64,
    pub bytes_written: u64,
}
