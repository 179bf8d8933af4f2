//! Codec subsystem for tern
//!
//! Three wire formats share one structural traversal (ENCODINGS.md §12-60):
//! the drivers in this module walk a block against its compiled handler
//! tree in depth-first order and raise events on a format-specific sink or
//! source. Only the syntax lives in the per-format modules; sizing,
//! enumeration checks, choice discipline, and error context are driven
//! here, once.
//!
//! # Design Principles
//!
//! - One traversal, three syntaxes
//! - The schema is never on the wire, only values
//! - Strict in both directions: what tern emits, tern reads back
//! - Decode trusts nothing: counts, lengths, and discriminants are
//!   validated before they touch a block
//!
//! # Invariants Enforced
//!
//! - Size registers are written before the arrays they govern
//! - A count atom and its linked array length agree on encode
//! - Decoded array counts respect sign and cap before any allocation
//! - Category values stay inside their enumeration in both directions

mod binary;
mod errors;
mod json;
mod text;

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::block::{AtomValue, ByteSpan, DataBlock, MAX_ARRAY_ELEMENTS};
use crate::schema::{Handler, ScalarKind, Sizing};

pub use errors::{
    DecodeError, DecodeErrorCode, DecodeResult, EncodeError, EncodeErrorCode, EncodeResult,
};
pub use text::TextFraming;

pub(crate) use binary::{BinarySink, BinarySource};
pub(crate) use json::{JsonSink, JsonSource};
pub(crate) use text::{TextSink, TextSource};

/// Hard cap on the byte length of a single decoded string. Guards decoder
/// memory against hostile length fields and unterminated text input.
pub const MAX_TEXT_BYTES: usize = 16 * 1024 * 1024;

/// Wire format selector for writers and readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum Encoding {
    /// Separator-delimited value tokens
    Text(TextFraming),
    /// JSON with named fields, one value per record
    Json,
    /// Little-endian binary, length-prefixed strings
    Binary,
}

impl Encoding {
    /// Text encoding with the default separators
    pub fn text() -> Self {
        Encoding::Text(TextFraming::default())
    }

    /// Returns the format name used in log events
    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Text(_) => "text",
            Encoding::Json => "json",
            Encoding::Binary => "binary",
        }
    }
}

/// Record cardinality of a stream, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamMode {
    /// Exactly one record, no inter-record framing
    Single,
    /// Zero or more records with per-format framing between them
    Multi,
}

/// Format-specific output events raised by the encode driver.
///
/// Defaults are no-ops so each format only implements the events its
/// syntax marks: the text codec is all scalars, the binary codec adds
/// choice bytes, the JSON codec implements everything.
pub(crate) trait RecordSink {
    fn scalar(&mut self, kind: ScalarKind, value: &AtomValue) -> EncodeResult<()>;
    fn begin_struct(&mut self) -> EncodeResult<()> {
        Ok(())
    }
    fn end_struct(&mut self) -> EncodeResult<()> {
        Ok(())
    }
    fn begin_field(&mut self, _name: &str) -> EncodeResult<()> {
        Ok(())
    }
    fn end_field(&mut self) -> EncodeResult<()> {
        Ok(())
    }
    fn begin_array(&mut self, _len: usize) -> EncodeResult<()> {
        Ok(())
    }
    fn begin_element(&mut self, _index: usize) -> EncodeResult<()> {
        Ok(())
    }
    fn end_array(&mut self) -> EncodeResult<()> {
        Ok(())
    }
    fn begin_choice(&mut self, _index: u8, _name: &str) -> EncodeResult<()> {
        Ok(())
    }
    fn end_choice(&mut self) -> EncodeResult<()> {
        Ok(())
    }
}

/// Stream-level framing on top of [`RecordSource`]: the reader drives any
/// format through one generic loop of these events.
pub(crate) trait RecordStream: RecordSource {
    /// Consume the stream opener, if the format has one
    fn begin_stream(&mut self) -> DecodeResult<()> {
        Ok(())
    }
    /// Position on the next record; false means clean end of stream
    fn begin_record(&mut self) -> DecodeResult<bool>;
    /// Verify the record's terminator after all values were consumed
    fn finish_record(&mut self) -> DecodeResult<()>;
    /// Reject bytes left after the stream's final record
    fn end_stream(&mut self) -> DecodeResult<()>;
}

/// Format-specific input events consumed by the decode driver.
pub(crate) trait RecordSource {
    fn scalar(&mut self, kind: ScalarKind) -> DecodeResult<(AtomValue, Option<ByteSpan>)>;
    /// Read the choice discriminant and return the selected alternative
    /// index. Formats that carry names resolve them against
    /// `alternatives`; the binary format returns its raw index byte.
    fn choice(&mut self, alternatives: &[&str]) -> DecodeResult<usize>;
    fn begin_struct(&mut self) -> DecodeResult<()> {
        Ok(())
    }
    fn end_struct(&mut self) -> DecodeResult<()> {
        Ok(())
    }
    fn begin_field(&mut self, _name: &str) -> DecodeResult<()> {
        Ok(())
    }
    fn end_field(&mut self) -> DecodeResult<()> {
        Ok(())
    }
    fn begin_array(&mut self, _len: usize) -> DecodeResult<()> {
        Ok(())
    }
    fn begin_element(&mut self, _index: usize) -> DecodeResult<()> {
        Ok(())
    }
    fn end_array(&mut self) -> DecodeResult<()> {
        Ok(())
    }
}

/// One segment of a traversal path, rendered only when an error needs it.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Seg<'a> {
    Name(&'a str),
    Index(usize),
}

/// Render a traversal path in the block addressing grammar,
/// e.g. `samples[1].c2`.
pub(crate) fn render_path(segs: &[Seg<'_>]) -> String {
    if segs.is_empty() {
        return "$root".to_string();
    }
    let mut out = String::new();
    for seg in segs {
        match seg {
            Seg::Name(name) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(name);
            }
            Seg::Index(index) => {
                out.push('[');
                out.push_str(&index.to_string());
                out.push(']');
            }
        }
    }
    out
}

/// Encode one record: walk the block's handler tree in atom order and
/// raise sink events. Validates count/length agreement and enumeration
/// membership as it goes; nothing is defined about sink content after an
/// error, which is why writers stage into a buffer.
pub(crate) fn write_record<S: RecordSink>(block: &DataBlock, sink: &mut S) -> EncodeResult<()> {
    let binding = Arc::clone(block.binding());
    let mut encoder = Encoder {
        block,
        sink,
        registers: vec![0; binding.register_count()],
        cursor: 0,
        path: Vec::new(),
    };
    encoder.walk(binding.root())
}

struct Encoder<'a, 'b, S: RecordSink> {
    block: &'a DataBlock,
    sink: &'a mut S,
    registers: Vec<i64>,
    cursor: usize,
    path: Vec<Seg<'b>>,
}

impl<'a, 'b, S: RecordSink> Encoder<'a, 'b, S> {
    fn walk(&mut self, handler: &'b Handler) -> EncodeResult<()> {
        match handler {
            Handler::Scalar {
                kind,
                size_register,
                enumeration,
            } => {
                let atom = &self.block.atoms()[self.cursor];
                if let (Some(values), AtomValue::Text(token)) = (enumeration, atom.value()) {
                    if !values.iter().any(|v| v == token) {
                        return Err(EncodeError::at_path(
                            EncodeErrorCode::EnumViolation,
                            render_path(&self.path),
                            format!("'{}' is not in the declared enumeration", token),
                        ));
                    }
                }
                if let (Some(register), AtomValue::Int(n)) = (size_register, atom.value()) {
                    self.registers[*register] = *n;
                }
                self.sink
                    .scalar(*kind, atom.value())
                    .map_err(|e| e.with_path(render_path(&self.path)))?;
                self.cursor += 1;
                Ok(())
            }
            Handler::Record { fields }
            | Handler::Vector {
                coordinates: fields,
            } => {
                self.sink.begin_struct()?;
                for field in fields {
                    self.sink.begin_field(&field.name)?;
                    self.path.push(Seg::Name(&field.name));
                    self.walk(&field.handler)?;
                    self.path.pop();
                    self.sink.end_field()?;
                }
                self.sink.end_struct()
            }
            Handler::Array {
                index,
                sizing,
                element,
                ..
            } => {
                let len = self.block.lengths()[*index];
                if let Sizing::Linked { register } = sizing {
                    let declared = self.registers[*register];
                    if declared != len as i64 {
                        return Err(EncodeError::at_path(
                            EncodeErrorCode::LengthMismatch,
                            render_path(&self.path),
                            format!(
                                "count atom says {}, array holds {} elements",
                                declared, len
                            ),
                        ));
                    }
                }
                self.sink.begin_array(len)?;
                for i in 0..len {
                    self.sink.begin_element(i)?;
                    self.path.push(Seg::Index(i));
                    self.walk(element)?;
                    self.path.pop();
                }
                self.sink.end_array()
            }
            Handler::Choice {
                index,
                alternatives,
            } => {
                let selected = self.block.selections()[*index];
                let alt = &alternatives[selected];
                self.sink
                    .begin_choice(selected as u8, &alt.name)
                    .map_err(|e| e.with_path(render_path(&self.path)))?;
                self.path.push(Seg::Name(&alt.name));
                self.walk(&alt.handler)?;
                self.path.pop();
                self.sink.end_choice()
            }
        }
    }
}

/// Decode one record into `block`: walk the handler tree, resize linked
/// arrays from decoded counts, select choices from decoded discriminants,
/// and write scalar atoms at the running cursor. On error the block's
/// contents are unspecified; the stream reader poisons itself.
pub(crate) fn read_record<S: RecordSource>(
    block: &mut DataBlock,
    source: &mut S,
) -> DecodeResult<()> {
    let binding = Arc::clone(block.binding());
    let mut decoder = Decoder {
        block,
        source,
        registers: vec![0; binding.register_count()],
        cursor: 0,
        path: Vec::new(),
    };
    decoder.walk(binding.root())
}

struct Decoder<'a, 'b, S: RecordSource> {
    block: &'a mut DataBlock,
    source: &'a mut S,
    registers: Vec<i64>,
    cursor: usize,
    path: Vec<Seg<'b>>,
}

impl<'a, 'b, S: RecordSource> Decoder<'a, 'b, S> {
    fn ctx(&self, err: DecodeError) -> DecodeError {
        err.with_path(render_path(&self.path))
    }

    fn walk(&mut self, handler: &'b Handler) -> DecodeResult<()> {
        match handler {
            Handler::Scalar {
                kind,
                size_register,
                enumeration,
            } => {
                let (value, span) = match self.source.scalar(*kind) {
                    Ok(pair) => pair,
                    Err(e) => return Err(self.ctx(e)),
                };
                if let (Some(values), AtomValue::Text(token)) = (enumeration, &value) {
                    if !values.iter().any(|v| v == token) {
                        return Err(DecodeError::at_path(
                            DecodeErrorCode::EnumViolation,
                            render_path(&self.path),
                            format!("'{}' is not in the declared enumeration", token),
                        ));
                    }
                }
                if let (Some(register), AtomValue::Int(n)) = (size_register, &value) {
                    self.registers[*register] = *n;
                }
                self.block
                    .set_decoded(self.cursor, value, span)
                    .map_err(|e| {
                        DecodeError::at_path(
                            DecodeErrorCode::BadValue,
                            render_path(&self.path),
                            e.to_string(),
                        )
                    })?;
                self.cursor += 1;
                Ok(())
            }
            Handler::Record { fields }
            | Handler::Vector {
                coordinates: fields,
            } => {
                self.source.begin_struct().map_err(|e| self.ctx(e))?;
                for field in fields {
                    self.source
                        .begin_field(&field.name)
                        .map_err(|e| self.ctx(e))?;
                    self.path.push(Seg::Name(&field.name));
                    self.walk(&field.handler)?;
                    self.path.pop();
                    self.source.end_field().map_err(|e| self.ctx(e))?;
                }
                self.source.end_struct().map_err(|e| self.ctx(e))
            }
            Handler::Array {
                index,
                sizing,
                element,
                ..
            } => {
                let expected = match sizing {
                    Sizing::Fixed(len) => *len,
                    Sizing::Linked { register } => {
                        let raw = self.registers[*register];
                        if raw < 0 {
                            return Err(DecodeError::at_path(
                                DecodeErrorCode::BadCount,
                                render_path(&self.path),
                                format!("array count is {}", raw),
                            ));
                        }
                        if raw as u64 > MAX_ARRAY_ELEMENTS as u64 {
                            return Err(DecodeError::at_path(
                                DecodeErrorCode::ArrayOverflow,
                                render_path(&self.path),
                                format!(
                                    "array count {} exceeds the element cap of {}",
                                    raw, MAX_ARRAY_ELEMENTS
                                ),
                            ));
                        }
                        let expected = raw as usize;
                        self.block.resize_array(*index, expected).map_err(|e| {
                            DecodeError::at_path(
                                DecodeErrorCode::BadCount,
                                render_path(&self.path),
                                e.to_string(),
                            )
                        })?;
                        expected
                    }
                };
                self.source.begin_array(expected).map_err(|e| self.ctx(e))?;
                for i in 0..expected {
                    self.source.begin_element(i).map_err(|e| self.ctx(e))?;
                    self.path.push(Seg::Index(i));
                    self.walk(element)?;
                    self.path.pop();
                }
                self.source.end_array().map_err(|e| self.ctx(e))
            }
            Handler::Choice {
                index,
                alternatives,
            } => {
                let names: Vec<&str> = alternatives.iter().map(|a| a.name.as_str()).collect();
                let selected = match self.source.choice(&names) {
                    Ok(selected) => selected,
                    Err(e) => return Err(self.ctx(e)),
                };
                if selected >= alternatives.len() {
                    return Err(DecodeError::at_path(
                        DecodeErrorCode::BadDiscriminant,
                        render_path(&self.path),
                        format!(
                            "discriminant {} out of range, choice has {} alternatives",
                            selected,
                            alternatives.len()
                        ),
                    ));
                }
                self.block.select_choice(*index, selected).map_err(|e| {
                    DecodeError::at_path(
                        DecodeErrorCode::BadDiscriminant,
                        render_path(&self.path),
                        e.to_string(),
                    )
                })?;
                let alt = &alternatives[selected];
                self.path.push(Seg::Name(&alt.name));
                self.walk(&alt.handler)?;
                self.path.pop();
                Ok(())
            }
        }
    }
}

/// Format epoch milliseconds as RFC 3339 UTC with millisecond precision,
/// e.g. `2023-11-14T22:13:20.000Z`.
pub(crate) fn format_time_utc(ms: i64) -> EncodeResult<String> {
    match Utc.timestamp_millis_opt(ms).single() {
        Some(instant) => Ok(instant.to_rfc3339_opts(SecondsFormat::Millis, true)),
        None => Err(EncodeError::new(
            EncodeErrorCode::TimeRange,
            format!("{} ms is outside the formattable time range", ms),
        )),
    }
}

/// Parse an RFC 3339 time at any offset into epoch milliseconds.
pub(crate) fn parse_time_utc(token: &str) -> DecodeResult<i64> {
    DateTime::parse_from_rfc3339(token)
        .map(|instant| instant.timestamp_millis())
        .map_err(|e| {
            DecodeError::new(
                DecodeErrorCode::BadValue,
                format!("'{}' is not an RFC 3339 time: {}", token, e),
            )
        })
}

/// Format a quantity as its shortest round-tripping decimal, with the
/// fixed spellings `NaN`, `+INF`, `-INF` for non-finite values.
pub(crate) fn format_quantity(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+INF".to_string()
    } else if value == f64::NEG_INFINITY {
        "-INF".to_string()
    } else {
        format!("{}", value)
    }
}

/// Parse a quantity token; only the three fixed spellings may produce
/// non-finite values.
pub(crate) fn parse_quantity(token: &str) -> DecodeResult<f64> {
    match token {
        "NaN" => Ok(f64::NAN),
        "+INF" => Ok(f64::INFINITY),
        "-INF" => Ok(f64::NEG_INFINITY),
        _ => {
            let value: f64 = token.parse().map_err(|_| {
                DecodeError::new(
                    DecodeErrorCode::BadValue,
                    format!("'{}' is not a quantity", token),
                )
            })?;
            if !value.is_finite() {
                return Err(DecodeError::new(
                    DecodeErrorCode::BadValue,
                    format!("'{}' is not a quantity", token),
                ));
            }
            Ok(value)
        }
    }
}
