//! Block error types following ERRORS.md
//!
//! Block errors are recoverable: a failed mutation leaves the block exactly
//! as it was, and a failed read leaves it untouched. Callers may retry with
//! corrected arguments.
//!
//! Error codes:
//! - TERN_BLOCK_FIXED_RESIZE
//! - TERN_BLOCK_ARRAY_OVERFLOW
//! - TERN_BLOCK_TYPE_MISMATCH
//! - TERN_BLOCK_BAD_PATH
//! - TERN_BLOCK_BAD_INDEX
//! - TERN_BLOCK_TIME_RANGE

use std::fmt;

use crate::schema::Severity;

/// Block error codes as defined in ERRORS.md
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockErrorCode {
    /// Resize requested on an array with schema-constant length
    FixedResize,
    /// Resize requested beyond the per-array element cap
    ArrayOverflow,
    /// Value variant does not match the declared scalar kind
    TypeMismatch,
    /// A path does not resolve to an atom in the current block state
    BadPath,
    /// An atom, array, choice, or alternative index is out of range
    BadIndex,
    /// A time atom holds milliseconds outside the representable range
    TimeRange,
}

impl BlockErrorCode {
    /// Returns the stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            BlockErrorCode::FixedResize => "TERN_BLOCK_FIXED_RESIZE",
            BlockErrorCode::ArrayOverflow => "TERN_BLOCK_ARRAY_OVERFLOW",
            BlockErrorCode::TypeMismatch => "TERN_BLOCK_TYPE_MISMATCH",
            BlockErrorCode::BadPath => "TERN_BLOCK_BAD_PATH",
            BlockErrorCode::BadIndex => "TERN_BLOCK_BAD_INDEX",
            BlockErrorCode::TimeRange => "TERN_BLOCK_TIME_RANGE",
        }
    }

    /// Returns the severity; block errors never poison the block
    pub fn severity(&self) -> Severity {
        Severity::Error
    }
}

/// An error raised by a block operation.
#[derive(Debug, Clone)]
pub struct BlockError {
    code: BlockErrorCode,
    message: String,
    context: Option<String>,
}

impl BlockError {
    /// Create an error tagged with the path or index it concerns
    pub fn at(
        code: BlockErrorCode,
        context: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            context: Some(context.into()),
        }
    }

    /// Create an error without positional context
    pub fn new(code: BlockErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> BlockErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the human-readable message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the path or index context, if known
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }
}

impl fmt::Display for BlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref context) = self.context {
            write!(f, " (at {})", context)?;
        }
        Ok(())
    }
}

impl std::error::Error for BlockError {}

/// Result type for block operations
pub type BlockResult<T> = Result<T, BlockError>;
