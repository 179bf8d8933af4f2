//! Schema error types following ERRORS.md
//!
//! Structural errors are detected when a component tree is compiled into a
//! binding, never mid-stream (DATAMODEL.md §4). They are all fatal for the
//! schema in question: a tree that fails to bind cannot be used at all.
//!
//! Error codes:
//! - TERN_SCHEMA_DUPLICATE_NAME
//! - TERN_SCHEMA_EMPTY_COMPOSITE
//! - TERN_SCHEMA_VECTOR_NOT_SCALAR
//! - TERN_SCHEMA_UNRESOLVED_SIZE_REF
//! - TERN_SCHEMA_MISORDERED_SIZE_REF
//! - TERN_SCHEMA_SIZE_REF_NOT_COUNT
//! - TERN_SCHEMA_DUPLICATE_SIZE_ID
//! - TERN_SCHEMA_VARIABLE_ELEMENT
//! - TERN_SCHEMA_TOO_MANY_ALTERNATIVES
//! - TERN_SCHEMA_BAD_ENUMERATION

use std::fmt;

/// Severity levels for codec errors as defined in ERRORS.md
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The operation fails; the artifact it ran against remains usable
    Error,
    /// The artifact (schema, stream position) is unusable and must be rebuilt
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Structural error codes as defined in ERRORS.md
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// Two siblings share a name
    DuplicateName,
    /// A record, vector, or choice has no children
    EmptyComposite,
    /// A vector coordinate is not a scalar
    VectorNotScalar,
    /// A linked array references an id that no count in scope declares
    UnresolvedSizeRef,
    /// The referenced count exists but not before the array in atom order
    MisorderedSizeRef,
    /// The referenced id belongs to a scalar that is not a count
    SizeRefNotCount,
    /// Two count scalars declare the same id
    DuplicateSizeId,
    /// An array element has no fixed atom width
    VariableElement,
    /// A choice declares more than 255 alternatives
    TooManyAlternatives,
    /// A category enumeration is empty or contains duplicates
    BadEnumeration,
}

impl SchemaErrorCode {
    /// Returns the string code as defined in ERRORS.md
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::DuplicateName => "TERN_SCHEMA_DUPLICATE_NAME",
            SchemaErrorCode::EmptyComposite => "TERN_SCHEMA_EMPTY_COMPOSITE",
            SchemaErrorCode::VectorNotScalar => "TERN_SCHEMA_VECTOR_NOT_SCALAR",
            SchemaErrorCode::UnresolvedSizeRef => "TERN_SCHEMA_UNRESOLVED_SIZE_REF",
            SchemaErrorCode::MisorderedSizeRef => "TERN_SCHEMA_MISORDERED_SIZE_REF",
            SchemaErrorCode::SizeRefNotCount => "TERN_SCHEMA_SIZE_REF_NOT_COUNT",
            SchemaErrorCode::DuplicateSizeId => "TERN_SCHEMA_DUPLICATE_SIZE_ID",
            SchemaErrorCode::VariableElement => "TERN_SCHEMA_VARIABLE_ELEMENT",
            SchemaErrorCode::TooManyAlternatives => "TERN_SCHEMA_TOO_MANY_ALTERNATIVES",
            SchemaErrorCode::BadEnumeration => "TERN_SCHEMA_BAD_ENUMERATION",
        }
    }

    /// Structural errors are always fatal for the schema
    pub fn severity(&self) -> Severity {
        Severity::Fatal
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Structural schema error with component-path context.
#[derive(Debug, Clone)]
pub struct SchemaError {
    /// Error code
    code: SchemaErrorCode,
    /// Human-readable message
    message: String,
    /// Dotted component path where the violation was found
    path: Option<String>,
}

impl SchemaError {
    /// Create a structural error at a component path
    pub fn at_path(
        code: SchemaErrorCode,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            path: Some(path.into()),
        }
    }

    /// Create a structural error without path context (root-level)
    pub fn new(code: SchemaErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> SchemaErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the component path, if known
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}

impl fmt::Display for SchemaError {
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

impl std::error::Error for SchemaError {}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_strings() {
        assert_eq!(
            SchemaErrorCode::DuplicateName.code(),
            "TERN_SCHEMA_DUPLICATE_NAME"
        );
        assert_eq!(
            SchemaErrorCode::UnresolvedSizeRef.code(),
            "TERN_SCHEMA_UNRESOLVED_SIZE_REF"
        );
        assert_eq!(
            SchemaErrorCode::VariableElement.code(),
            "TERN_SCHEMA_VARIABLE_ELEMENT"
        );
    }

    #[test]
    fn test_structural_errors_are_fatal() {
        assert_eq!(SchemaErrorCode::DuplicateName.severity(), Severity::Fatal);
        assert_eq!(SchemaErrorCode::BadEnumeration.severity(), Severity::Fatal);
    }

    #[test]
    fn test_display_contains_code_and_path() {
        let err = SchemaError::at_path(
            SchemaErrorCode::DuplicateName,
            "weather.samples",
            "duplicate sibling name 'c1'",
        );
        let display = format!("{}", err);
        assert!(display.contains("FATAL"));
        assert!(display.contains("TERN_SCHEMA_DUPLICATE_NAME"));
        assert!(display.contains("duplicate sibling name 'c1'"));
        assert!(display.contains("at weather.samples"));
    }

    #[test]
    fn test_root_level_error_has_no_path() {
        let err = SchemaError::new(SchemaErrorCode::EmptyComposite, "record has no fields");
        assert!(err.path().is_none());
        assert!(!format!("{}", err).contains(" (at "));
    }
}
