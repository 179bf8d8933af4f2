//! Codec error types following ERRORS.md
//!
//! Decode errors are fatal for the stream: once input fails to parse, the
//! current position is meaningless and the reader refuses further work.
//! Encode errors are recoverable: records are staged in full before any
//! byte reaches the sink, so a failed encode leaves the stream exactly as
//! it was.
//!
//! Decode codes:
//! - TERN_DECODE_TRUNCATED
//! - TERN_DECODE_BAD_SYNTAX
//! - TERN_DECODE_BAD_VALUE
//! - TERN_DECODE_BAD_COUNT
//! - TERN_DECODE_ARRAY_OVERFLOW
//! - TERN_DECODE_TEXT_OVERFLOW
//! - TERN_DECODE_BAD_UTF8
//! - TERN_DECODE_BAD_DISCRIMINANT
//! - TERN_DECODE_ENUM_VIOLATION
//! - TERN_DECODE_MISSING_FIELD
//! - TERN_DECODE_UNDECLARED_FIELD
//! - TERN_DECODE_LENGTH_MISMATCH
//! - TERN_DECODE_TRAILING_DATA
//! - TERN_DECODE_IO
//!
//! Encode codes:
//! - TERN_ENCODE_LENGTH_MISMATCH
//! - TERN_ENCODE_FOREIGN_BLOCK
//! - TERN_ENCODE_ENUM_VIOLATION
//! - TERN_ENCODE_UNENCODABLE_TEXT
//! - TERN_ENCODE_TIME_RANGE
//! - TERN_ENCODE_IO

use std::fmt;
use std::io;

use crate::schema::Severity;

/// Decode error codes as defined in ERRORS.md
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorCode {
    /// Input ended in the middle of a record
    Truncated,
    /// Input bytes violate the format's grammar
    BadSyntax,
    /// A well-formed token is not a valid value of the declared kind
    BadValue,
    /// A decoded array count is negative
    BadCount,
    /// A decoded array count exceeds the element cap
    ArrayOverflow,
    /// A string length field exceeds the text byte cap
    TextOverflow,
    /// String bytes are not valid UTF-8
    BadUtf8,
    /// A choice discriminant names no alternative
    BadDiscriminant,
    /// A category value is outside its declared enumeration
    EnumViolation,
    /// A declared field is absent from the input object
    MissingField,
    /// The input object carries a field the schema does not declare
    UndeclaredField,
    /// An input array's length disagrees with its governing count
    LengthMismatch,
    /// Bytes remain after the final record of the stream
    TrailingData,
    /// The underlying reader failed
    Io,
}

impl DecodeErrorCode {
    /// Returns the stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            DecodeErrorCode::Truncated => "TERN_DECODE_TRUNCATED",
            DecodeErrorCode::BadSyntax => "TERN_DECODE_BAD_SYNTAX",
            DecodeErrorCode::BadValue => "TERN_DECODE_BAD_VALUE",
            DecodeErrorCode::BadCount => "TERN_DECODE_BAD_COUNT",
            DecodeErrorCode::ArrayOverflow => "TERN_DECODE_ARRAY_OVERFLOW",
            DecodeErrorCode::TextOverflow => "TERN_DECODE_TEXT_OVERFLOW",
            DecodeErrorCode::BadUtf8 => "TERN_DECODE_BAD_UTF8",
            DecodeErrorCode::BadDiscriminant => "TERN_DECODE_BAD_DISCRIMINANT",
            DecodeErrorCode::EnumViolation => "TERN_DECODE_ENUM_VIOLATION",
            DecodeErrorCode::MissingField => "TERN_DECODE_MISSING_FIELD",
            DecodeErrorCode::UndeclaredField => "TERN_DECODE_UNDECLARED_FIELD",
            DecodeErrorCode::LengthMismatch => "TERN_DECODE_LENGTH_MISMATCH",
            DecodeErrorCode::TrailingData => "TERN_DECODE_TRAILING_DATA",
            DecodeErrorCode::Io => "TERN_DECODE_IO",
        }
    }

    /// Returns the severity; decode errors poison the stream position
    pub fn severity(&self) -> Severity {
        Severity::Fatal
    }
}

/// An error raised while decoding a record.
#[derive(Debug, Clone)]
pub struct DecodeError {
    code: DecodeErrorCode,
    message: String,
    path: Option<String>,
    offset: Option<u64>,
}

impl DecodeError {
    /// Create an error without positional context
    pub fn new(code: DecodeErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
            offset: None,
        }
    }

    /// Create an error tagged with the component path it concerns
    pub fn at_path(
        code: DecodeErrorCode,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            path: Some(path.into()),
            offset: None,
        }
    }

    /// Attach a component path if none is recorded yet
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        if self.path.is_none() {
            self.path = Some(path.into());
        }
        self
    }

    /// Attach a byte offset if none is recorded yet
    pub fn with_offset(mut self, offset: u64) -> Self {
        if self.offset.is_none() {
            self.offset = Some(offset);
        }
        self
    }

    /// Returns the error code
    pub fn code(&self) -> DecodeErrorCode {
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

    /// Returns the component path, if known
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Returns the input byte offset, if known
    pub fn offset(&self) -> Option<u64> {
        self.offset
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        match (&self.path, self.offset) {
            (Some(path), Some(offset)) => write!(f, " (at {}, byte {})", path, offset)?,
            (Some(path), None) => write!(f, " (at {})", path)?,
            (None, Some(offset)) => write!(f, " (at byte {})", offset)?,
            (None, None) => {}
        }
        Ok(())
    }
}

impl std::error::Error for DecodeError {}

impl From<io::Error> for DecodeError {
    fn from(err: io::Error) -> Self {
        let code = if err.kind() == io::ErrorKind::UnexpectedEof {
            DecodeErrorCode::Truncated
        } else {
            DecodeErrorCode::Io
        };
        DecodeError::new(code, err.to_string())
    }
}

/// Result type for decode operations
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Encode error codes as defined in ERRORS.md
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeErrorCode {
    /// A count atom disagrees with its linked array's length
    LengthMismatch,
    /// The block was minted from a different binding instance
    ForeignBlock,
    /// A category value is outside its declared enumeration
    EnumViolation,
    /// A text token would collide with the separator configuration
    UnencodableText,
    /// A time atom is outside the formattable range
    TimeRange,
    /// The underlying writer failed
    Io,
}

impl EncodeErrorCode {
    /// Returns the stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            EncodeErrorCode::LengthMismatch => "TERN_ENCODE_LENGTH_MISMATCH",
            EncodeErrorCode::ForeignBlock => "TERN_ENCODE_FOREIGN_BLOCK",
            EncodeErrorCode::EnumViolation => "TERN_ENCODE_ENUM_VIOLATION",
            EncodeErrorCode::UnencodableText => "TERN_ENCODE_UNENCODABLE_TEXT",
            EncodeErrorCode::TimeRange => "TERN_ENCODE_TIME_RANGE",
            EncodeErrorCode::Io => "TERN_ENCODE_IO",
        }
    }

    /// Returns the severity; nothing reaches the sink on a failed encode
    pub fn severity(&self) -> Severity {
        Severity::Error
    }
}

/// An error raised while encoding a record.
#[derive(Debug, Clone)]
pub struct EncodeError {
    code: EncodeErrorCode,
    message: String,
    path: Option<String>,
}

impl EncodeError {
    /// Create an error without positional context
    pub fn new(code: EncodeErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
        }
    }

    /// Create an error tagged with the component path it concerns
    pub fn at_path(
        code: EncodeErrorCode,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            path: Some(path.into()),
        }
    }

    /// Attach a component path if none is recorded yet
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        if self.path.is_none() {
            self.path = Some(path.into());
        }
        self
    }

    /// Returns the error code
    pub fn code(&self) -> EncodeErrorCode {
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

    /// Returns the component path, if known
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref path) = self.path {
            write!(f, " (at {})", path)?;
        }
        Ok(())
    }
}

impl std::error::Error for EncodeError {}

impl From<io::Error> for EncodeError {
    fn from(err: io::Error) -> Self {
        EncodeError::new(EncodeErrorCode::Io, err.to_string())
    }
}

/// Result type for encode operations
pub type EncodeResult<T> = Result<T, EncodeError>;
