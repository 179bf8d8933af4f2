//! Atom types per DATAMODEL.md §6
//!
//! An atom is one scalar value slot within a block. The value is a closed
//! tagged union; the declared scalar kind travels with the value so typed
//! access and round-trip fidelity never require re-walking the schema.
//! Atoms decoded by the binary codec additionally carry the byte span they
//! occupied in the input stream.

use chrono::{DateTime, TimeZone, Utc};

use crate::schema::ScalarKind;

/// Runtime value of one atom.
///
/// Kind → value mapping: boolean→Bool, count→Int, quantity→Double,
/// text→Text, category→Text, time→Int (epoch milliseconds, UTC).
#[derive(Debug, Clone, PartialEq)]
pub enum AtomValue {
    /// Boolean flag
    Bool(bool),
    /// 64-bit signed integer (counts and epoch-millisecond times)
    Int(i64),
    /// 64-bit floating point
    Double(f64),
    /// UTF-8 text (free-form or category token)
    Text(String),
}

impl AtomValue {
    /// Returns the value name used in mismatch messages
    pub fn type_name(&self) -> &'static str {
        match self {
            AtomValue::Bool(_) => "bool",
            AtomValue::Int(_) => "int",
            AtomValue::Double(_) => "double",
            AtomValue::Text(_) => "text",
        }
    }

    /// Returns the boolean, if this is a Bool atom
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AtomValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the integer, if this is an Int atom
    pub fn as_int(&self) -> Option<i64> {
        match self {
            AtomValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the double, if this is a Double atom
    pub fn as_double(&self) -> Option<f64> {
        match self {
            AtomValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the text, if this is a Text atom
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AtomValue::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the default value for a scalar kind: `false`, `0`, `0.0`,
    /// the empty string, or epoch 0 for times.
    pub fn default_of(kind: ScalarKind) -> Self {
        match kind {
            ScalarKind::Boolean => AtomValue::Bool(false),
            ScalarKind::Count | ScalarKind::Time => AtomValue::Int(0),
            ScalarKind::Quantity => AtomValue::Double(0.0),
            ScalarKind::Text | ScalarKind::Category => AtomValue::Text(String::new()),
        }
    }

    /// Returns true if this value's variant is the one the kind declares
    pub fn matches_kind(&self, kind: ScalarKind) -> bool {
        matches!(
            (self, kind),
            (AtomValue::Bool(_), ScalarKind::Boolean)
                | (AtomValue::Int(_), ScalarKind::Count)
                | (AtomValue::Int(_), ScalarKind::Time)
                | (AtomValue::Double(_), ScalarKind::Quantity)
                | (AtomValue::Text(_), ScalarKind::Text)
                | (AtomValue::Text(_), ScalarKind::Category)
        )
    }
}

/// Byte range one atom occupied in a binary input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteSpan {
    /// Offset of the first byte
    pub start: u64,
    /// Offset one past the last byte
    pub end: u64,
}

impl ByteSpan {
    /// Length of the span in bytes
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// True if the span is empty
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// One scalar value slot within a block.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Declared scalar kind
    pub(crate) kind: ScalarKind,
    /// Current value; its variant always matches the declared kind
    pub(crate) value: AtomValue,
    /// Byte span in the source stream, set only by the binary decoder
    pub(crate) span: Option<ByteSpan>,
}

impl Atom {
    /// Create an atom holding the default value for its kind
    pub fn default_of(kind: ScalarKind) -> Self {
        Self {
            kind,
            value: AtomValue::default_of(kind),
            span: None,
        }
    }

    /// Returns the declared scalar kind
    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    /// Returns the current value
    pub fn value(&self) -> &AtomValue {
        &self.value
    }

    /// Returns the byte span this atom occupied in binary input, if any
    pub fn span(&self) -> Option<ByteSpan> {
        self.span
    }

    /// Interprets a time atom as a UTC instant.
    ///
    /// Returns `None` for non-time atoms and for millisecond values outside
    /// the range chrono can represent.
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match (self.kind, &self.value) {
            (ScalarKind::Time, AtomValue::Int(ms)) => Utc.timestamp_millis_opt(*ms).single(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_kinds() {
        for kind in [
            ScalarKind::Boolean,
            ScalarKind::Count,
            ScalarKind::Quantity,
            ScalarKind::Text,
            ScalarKind::Category,
            ScalarKind::Time,
        ] {
            let atom = Atom::default_of(kind);
            assert!(atom.value().matches_kind(kind), "default for {:?}", kind);
            assert!(atom.span().is_none());
        }
    }

    #[test]
    fn test_matches_kind_rejects_cross_assignment() {
        assert!(!AtomValue::Bool(true).matches_kind(ScalarKind::Count));
        assert!(!AtomValue::Double(1.0).matches_kind(ScalarKind::Time));
        assert!(!AtomValue::Text("x".into()).matches_kind(ScalarKind::Quantity));
        assert!(AtomValue::Int(5).matches_kind(ScalarKind::Time));
    }

    #[test]
    fn test_typed_accessors() {
        assert_eq!(AtomValue::Int(42).as_int(), Some(42));
        assert_eq!(AtomValue::Int(42).as_double(), None);
        assert_eq!(AtomValue::Double(2.5).as_double(), Some(2.5));
        assert_eq!(AtomValue::Text("abc".into()).as_text(), Some("abc"));
        assert_eq!(AtomValue::Bool(true).as_bool(), Some(true));
    }

    #[test]
    fn test_time_atom_as_datetime() {
        let mut atom = Atom::default_of(ScalarKind::Time);
        atom.value = AtomValue::Int(1_700_000_000_000);
        let dt = atom.as_datetime().unwrap();
        assert_eq!(dt.timestamp_millis(), 1_700_000_000_000);

        // Non-time atoms have no datetime view.
        let count = Atom::default_of(ScalarKind::Count);
        assert!(count.as_datetime().is_none());
    }

    #[test]
    fn test_byte_span_len() {
        let span = ByteSpan { start: 8, end: 16 };
        assert_eq!(span.len(), 8);
        assert!(!span.is_empty());
    }
}
