//! Stream subsystem for tern
//!
//! The stream layer owns framing, lifecycle, and failure policy on top of
//! the codec's per-record work (STREAMS.md §1-44). A `BlockWriter` frames
//! encoded records onto a byte sink; a `BlockReader` pulls them back out,
//! one block per call. Both are built once per stream against a compiled
//! binding and carry their own metrics.
//!
//! # Design Principles
//!
//! - One driver instance per stream, no sharing
//! - Mode and encoding are declared at construction, never autodetected
//! - A record reaches the sink whole or not at all
//! - Failures are loud: a broken stream refuses further use instead of
//!   resynchronizing silently
//!
//! # Invariants Enforced
//!
//! - Records are written only between `start_stream` and `end_stream`
//! - A single-record stream carries exactly one record
//! - Blocks and drivers agree on the binding by pointer identity
//! - A reader that reported a decode error stays poisoned

mod errors;
mod reader;
mod writer;

pub use errors::{StreamError, StreamResult};
pub use reader::BlockReader;
pub use writer::BlockWriter;
