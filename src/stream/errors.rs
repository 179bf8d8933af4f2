//! # Stream Errors
//!
//! Error types for the stream driver. Record-level failures wrap the
//! codec's coded errors; lifecycle misuse gets its own variants.

use thiserror::Error;

use crate::codec::{DecodeError, EncodeError, EncodeErrorCode};

/// Result type for stream operations
pub type StreamResult<T> = Result<T, StreamError>;

/// Stream driver errors
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    // ==================
    // Record Codec Errors
    // ==================
    /// A record failed to decode
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A record failed to encode
    #[error(transparent)]
    Encode(#[from] EncodeError),

    // ==================
    // Lifecycle Errors
    // ==================
    /// Writing before start_stream
    #[error("stream is not started")]
    NotStarted,

    /// Using a stream after end_stream
    #[error("stream is already finished")]
    Finished,

    /// Record count violates single-record mode
    #[error("a single-record stream carries exactly one record")]
    SingleRecordMode,

    /// An earlier decode failure left the stream position undefined
    #[error("stream is poisoned by an earlier decode failure")]
    Poisoned,

    // ==================
    // Configuration Errors
    // ==================
    /// Separator configuration cannot be scanned unambiguously
    #[error("invalid framing: {0}")]
    BadFraming(String),

    /// Block compiled from a different schema binding than the stream
    #[error("block is bound to a different schema binding")]
    ForeignBlock,
}

impl StreamError {
    /// True if the writer or reader that returned this error is still in
    /// a well-defined state and may keep being used.
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Nothing reaches the sink on a failed encode, unless the
            // sink io itself failed mid-write.
            StreamError::Encode(e) => e.code() != EncodeErrorCode::Io,
            StreamError::NotStarted
            | StreamError::Finished
            | StreamError::SingleRecordMode
            | StreamError::BadFraming(_)
            | StreamError::ForeignBlock => true,
            // The source position is undefined after a decode failure.
            StreamError::Decode(_) | StreamError::Poisoned => false,
        }
    }
}
