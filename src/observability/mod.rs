//! Observability subsystem for tern
//!
//! Structured JSON log lines and per-stream counters, per
//! OBSERVABILITY.md §1-2.
//!
//! # Design Principles
//!
//! 1. Observation never mutates codec state
//! 2. No threads, no timers, no buffering
//! 3. The same stream produces the same log bytes
//! 4. Off by default; a log write that fails is dropped, never surfaced
//!
//! # Usage
//!
//! ```ignore
//! use tern::observability::{set_logging, Logger};
//!
//! set_logging(true);
//! Logger::info("STREAM_OPENED", &[("encoding", "binary")]);
//! ```

mod logger;
mod metrics;

pub use logger::{logging_enabled, set_logging, Logger, Severity};
pub use metrics::{CodecMetrics, MetricsSnapshot};
