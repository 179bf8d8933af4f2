//! JSON codec per ENCODINGS.md §119-187
//!
//! The self-describing format: records and vectors become objects keyed by
//! field name, arrays become JSON arrays, choices become a one-member
//! object keyed by the selected alternative's name. Field names on the
//! wire let a reader cross-check the schema, and the decoder does so
//! strictly: a missing field, an extra field, or an array whose length
//! disagrees with its count atom all fail the record.
//!
//! ```text
//!   {"t0":"2023-11-14T22:13:20.000Z","size":2,
//!    "samples":[{"c1":1.5,"c2":2.5},{"c1":3.5,"c2":4.5}]}
//! ```
//!
//! Value forms:
//! - boolean: JSON true / false
//! - count: JSON integer
//! - quantity: JSON number; non-finite values as the strings
//!   `"NaN"` / `"+INF"` / `"-INF"`
//! - text, category: JSON string with standard escaping
//! - time: RFC 3339 UTC milliseconds as a JSON string
//!
//! The encoder emits members in declaration order with no insignificant
//! whitespace; `serde_json` handles all string escaping and number
//! formatting, while structural punctuation is written directly.

use std::io::{self, BufRead, BufReader, Read};

use serde_json::{Map, Value};

use crate::block::{AtomValue, ByteSpan};
use crate::codec::errors::{
    DecodeError, DecodeErrorCode, DecodeResult, EncodeError, EncodeErrorCode, EncodeResult,
};
use crate::codec::{parse_time_utc, RecordSink, RecordSource, RecordStream, StreamMode};
use crate::schema::ScalarKind;

/// Encode side: streams one record as compact JSON into a staging buffer.
pub(crate) struct JsonSink<'a> {
    out: &'a mut Vec<u8>,
    /// One entry per open object or array: whether a member was written
    comma: Vec<bool>,
}

impl<'a> JsonSink<'a> {
    pub(crate) fn new(out: &'a mut Vec<u8>) -> Self {
        Self {
            out,
            comma: Vec::new(),
        }
    }

    fn member(&mut self) {
        if let Some(top) = self.comma.last_mut() {
            if *top {
                self.out.push(b',');
            }
            *top = true;
        }
    }

    fn string(&mut self, value: &str) -> EncodeResult<()> {
        serde_json::to_writer(&mut *self.out, value)
            .map_err(|e| EncodeError::new(EncodeErrorCode::Io, e.to_string()))
    }
}

impl RecordSink for JsonSink<'_> {
    fn scalar(&mut self, kind: ScalarKind, value: &AtomValue) -> EncodeResult<()> {
        match value {
            AtomValue::Bool(b) => {
                self.out
                    .extend_from_slice(if *b { b"true" } else { b"false" });
                Ok(())
            }
            AtomValue::Int(n) => {
                if kind == ScalarKind::Time {
                    let token = super::format_time_utc(*n)?;
                    self.string(&token)
                } else {
                    self.out.extend_from_slice(n.to_string().as_bytes());
                    Ok(())
                }
            }
            AtomValue::Double(v) => {
                if v.is_finite() {
                    self.out
                        .extend_from_slice(super::format_quantity(*v).as_bytes());
                    Ok(())
                } else {
                    self.string(&super::format_quantity(*v))
                }
            }
            AtomValue::Text(s) => self.string(s),
        }
    }

    fn begin_struct(&mut self) -> EncodeResult<()> {
        self.out.push(b'{');
        self.comma.push(false);
        Ok(())
    }

    fn end_struct(&mut self) -> EncodeResult<()> {
        self.comma.pop();
        self.out.push(b'}');
        Ok(())
    }

    fn begin_field(&mut self, name: &str) -> EncodeResult<()> {
        self.member();
        self.string(name)?;
        self.out.push(b':');
        Ok(())
    }

    fn begin_array(&mut self, _len: usize) -> EncodeResult<()> {
        self.out.push(b'[');
        self.comma.push(false);
        Ok(())
    }

    fn begin_element(&mut self, _index: usize) -> EncodeResult<()> {
        self.member();
        Ok(())
    }

    fn end_array(&mut self) -> EncodeResult<()> {
        self.comma.pop();
        self.out.push(b']');
        Ok(())
    }

    fn begin_choice(&mut self, _index: u8, name: &str) -> EncodeResult<()> {
        self.out.push(b'{');
        self.string(name)?;
        self.out.push(b':');
        Ok(())
    }

    fn end_choice(&mut self) -> EncodeResult<()> {
        self.out.push(b'}');
        Ok(())
    }
}

/// Traversal state over one parsed record.
#[derive(Debug)]
enum Frame {
    /// A value waiting for the event that consumes it
    Pending(Value),
    /// An open object; fields are removed as the schema names them
    Object(Map<String, Value>),
    /// An open array being drained in order
    Array(std::vec::IntoIter<Value>),
}

/// Decode side: parses one JSON value per record and walks it against the
/// schema-driven events.
#[derive(Debug)]
pub(crate) struct JsonSource<R: Read> {
    reader: BufReader<R>,
    mode: StreamMode,
    records: usize,
    frames: Vec<Frame>,
}

impl<R: Read> JsonSource<R> {
    pub(crate) fn new(inner: R, mode: StreamMode) -> Self {
        Self {
            reader: BufReader::new(inner),
            mode,
            records: 0,
            frames: Vec::new(),
        }
    }

    fn parse_value(&mut self) -> DecodeResult<Value> {
        let raw = self.read_raw_value()?;
        serde_json::from_slice(&raw).map_err(|e| {
            let code = if e.is_eof() {
                DecodeErrorCode::Truncated
            } else {
                DecodeErrorCode::BadSyntax
            };
            DecodeError::new(code, e.to_string())
        })
    }

    /// Accumulate the bytes of exactly one JSON value, never consuming the
    /// byte that follows it. A parser pulling straight off the reader
    /// would swallow the `,` or `]` that terminates a bare number, so the
    /// value boundary is found here with string and bracket state, and the
    /// strict parse runs over the captured slice.
    fn read_raw_value(&mut self) -> DecodeResult<Vec<u8>> {
        let mut raw: Vec<u8> = Vec::new();
        let mut depth: usize = 0;
        let mut in_string = false;
        let mut escaped = false;
        loop {
            let byte = match self.peek_byte()? {
                Some(byte) => byte,
                None => break,
            };
            if in_string {
                raw.push(byte);
                self.consume_byte();
                if escaped {
                    escaped = false;
                } else if byte == b'\\' {
                    escaped = true;
                } else if byte == b'"' {
                    in_string = false;
                    if depth == 0 {
                        break;
                    }
                }
                continue;
            }
            match byte {
                b' ' | b'\t' | b'\r' | b'\n' | b',' if depth == 0 => break,
                b'}' | b']' if depth == 0 => break,
                b'{' | b'[' => {
                    depth += 1;
                    raw.push(byte);
                    self.consume_byte();
                }
                b'}' | b']' => {
                    depth -= 1;
                    raw.push(byte);
                    self.consume_byte();
                    if depth == 0 {
                        break;
                    }
                }
                b'"' => {
                    in_string = true;
                    raw.push(byte);
                    self.consume_byte();
                }
                _ => {
                    raw.push(byte);
                    self.consume_byte();
                }
            }
        }
        if raw.is_empty() {
            return Err(match self.peek_byte()? {
                Some(byte) => DecodeError::new(
                    DecodeErrorCode::BadSyntax,
                    format!("expected a record, found '{}'", byte as char),
                ),
                None => DecodeError::new(
                    DecodeErrorCode::Truncated,
                    "expected a record, found end of input",
                ),
            });
        }
        Ok(raw)
    }

    fn skip_whitespace(&mut self) -> DecodeResult<()> {
        while let Some(byte) = self.peek_byte()? {
            if byte == b' ' || byte == b'\t' || byte == b'\r' || byte == b'\n' {
                self.consume_byte();
            } else {
                break;
            }
        }
        Ok(())
    }

    fn peek_byte(&mut self) -> DecodeResult<Option<u8>> {
        loop {
            match self.reader.fill_buf() {
                Ok(buf) => return Ok(buf.first().copied()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn consume_byte(&mut self) {
        self.reader.consume(1);
    }

    fn expect_byte(&mut self, expected: u8, what: &str) -> DecodeResult<()> {
        match self.peek_byte()? {
            Some(byte) if byte == expected => {
                self.consume_byte();
                Ok(())
            }
            Some(byte) => Err(DecodeError::new(
                DecodeErrorCode::BadSyntax,
                format!("expected {}, found '{}'", what, byte as char),
            )),
            None => Err(DecodeError::new(
                DecodeErrorCode::Truncated,
                format!("expected {}, found end of input", what),
            )),
        }
    }

    fn pop_pending(&mut self) -> DecodeResult<Value> {
        match self.frames.pop() {
            Some(Frame::Pending(value)) => Ok(value),
            _ => Err(DecodeError::new(
                DecodeErrorCode::BadSyntax,
                "wire structure does not match the schema",
            )),
        }
    }
}

impl<R: Read> RecordStream for JsonSource<R> {
    /// Consume the stream opener: `[` in multi mode, nothing in single.
    fn begin_stream(&mut self) -> DecodeResult<()> {
        if self.mode == StreamMode::Multi {
            self.skip_whitespace()?;
            self.expect_byte(b'[', "a '[' opening the record stream")?;
        }
        Ok(())
    }

    /// Position on the next record. Returns false on clean end of stream:
    /// the closing `]` in multi mode, end of input in single mode.
    fn begin_record(&mut self) -> DecodeResult<bool> {
        self.skip_whitespace()?;
        match self.mode {
            StreamMode::Single => {
                if self.peek_byte()?.is_none() {
                    return Ok(false);
                }
            }
            StreamMode::Multi => match self.peek_byte()? {
                None => {
                    return Err(DecodeError::new(
                        DecodeErrorCode::Truncated,
                        "record stream is missing its closing ']'",
                    ));
                }
                Some(b']') => {
                    self.consume_byte();
                    return Ok(false);
                }
                Some(b',') if self.records > 0 => {
                    self.consume_byte();
                    self.skip_whitespace()?;
                }
                Some(byte) if self.records > 0 => {
                    return Err(DecodeError::new(
                        DecodeErrorCode::BadSyntax,
                        format!("expected ',' or ']' between records, found '{}'", byte as char),
                    ));
                }
                Some(_) => {}
            },
        }
        let value = self.parse_value()?;
        self.frames.clear();
        self.frames.push(Frame::Pending(value));
        self.records += 1;
        Ok(true)
    }

    /// Verify the record was fully consumed.
    fn finish_record(&mut self) -> DecodeResult<()> {
        if !self.frames.is_empty() {
            return Err(DecodeError::new(
                DecodeErrorCode::BadSyntax,
                "record value was not fully consumed",
            ));
        }
        Ok(())
    }

    /// Reject any non-whitespace bytes past the end of the stream.
    fn end_stream(&mut self) -> DecodeResult<()> {
        self.skip_whitespace()?;
        if self.peek_byte()?.is_some() {
            return Err(DecodeError::new(
                DecodeErrorCode::TrailingData,
                "bytes remain after the record stream",
            ));
        }
        Ok(())
    }
}

impl<R: Read> RecordSource for JsonSource<R> {
    fn scalar(&mut self, kind: ScalarKind) -> DecodeResult<(AtomValue, Option<ByteSpan>)> {
        let value = self.pop_pending()?;
        let decoded = match kind {
            ScalarKind::Boolean => match value {
                Value::Bool(b) => AtomValue::Bool(b),
                other => return Err(wrong_type("a boolean", &other)),
            },
            ScalarKind::Count => match value {
                Value::Number(ref n) => match n.as_i64() {
                    Some(i) => AtomValue::Int(i),
                    None => return Err(wrong_type("an integer", &value)),
                },
                other => return Err(wrong_type("an integer", &other)),
            },
            ScalarKind::Quantity => match value {
                Value::Number(ref n) => match n.as_f64() {
                    Some(v) => AtomValue::Double(v),
                    None => return Err(wrong_type("a number", &value)),
                },
                Value::String(s) => match s.as_str() {
                    "NaN" => AtomValue::Double(f64::NAN),
                    "+INF" => AtomValue::Double(f64::INFINITY),
                    "-INF" => AtomValue::Double(f64::NEG_INFINITY),
                    _ => {
                        return Err(DecodeError::new(
                            DecodeErrorCode::BadValue,
                            format!("'{}' is not a non-finite quantity spelling", s),
                        ));
                    }
                },
                other => return Err(wrong_type("a number", &other)),
            },
            ScalarKind::Time => match value {
                Value::String(s) => AtomValue::Int(parse_time_utc(&s)?),
                other => return Err(wrong_type("an RFC 3339 time string", &other)),
            },
            ScalarKind::Text | ScalarKind::Category => match value {
                Value::String(s) => AtomValue::Text(s),
                other => return Err(wrong_type("a string", &other)),
            },
        };
        Ok((decoded, None))
    }

    fn choice(&mut self, alternatives: &[&str]) -> DecodeResult<usize> {
        let value = self.pop_pending()?;
        let map = match value {
            Value::Object(map) => map,
            other => return Err(wrong_type("a one-member choice object", &other)),
        };
        if map.len() != 1 {
            return Err(DecodeError::new(
                DecodeErrorCode::BadSyntax,
                format!("choice object has {} members, expected exactly one", map.len()),
            ));
        }
        let (key, inner) = match map.into_iter().next() {
            Some(entry) => entry,
            None => {
                return Err(DecodeError::new(
                    DecodeErrorCode::BadSyntax,
                    "choice object has no members",
                ));
            }
        };
        match alternatives.iter().position(|name| *name == key) {
            Some(index) => {
                self.frames.push(Frame::Pending(inner));
                Ok(index)
            }
            None => Err(DecodeError::new(
                DecodeErrorCode::BadDiscriminant,
                format!("'{}' names no alternative", key),
            )),
        }
    }

    fn begin_struct(&mut self) -> DecodeResult<()> {
        let value = self.pop_pending()?;
        match value {
            Value::Object(map) => {
                self.frames.push(Frame::Object(map));
                Ok(())
            }
            other => Err(wrong_type("an object", &other)),
        }
    }

    fn end_struct(&mut self) -> DecodeResult<()> {
        match self.frames.pop() {
            Some(Frame::Object(map)) => {
                if let Some(name) = map.keys().next() {
                    return Err(DecodeError::new(
                        DecodeErrorCode::UndeclaredField,
                        format!("field '{}' is not in the schema", name),
                    ));
                }
                Ok(())
            }
            _ => Err(DecodeError::new(
                DecodeErrorCode::BadSyntax,
                "wire structure does not match the schema",
            )),
        }
    }

    fn begin_field(&mut self, name: &str) -> DecodeResult<()> {
        let map = match self.frames.last_mut() {
            Some(Frame::Object(map)) => map,
            _ => {
                return Err(DecodeError::new(
                    DecodeErrorCode::BadSyntax,
                    "wire structure does not match the schema",
                ));
            }
        };
        match map.remove(name) {
            Some(value) => {
                self.frames.push(Frame::Pending(value));
                Ok(())
            }
            None => Err(DecodeError::new(
                DecodeErrorCode::MissingField,
                format!("field '{}' is missing", name),
            )),
        }
    }

    fn begin_array(&mut self, len: usize) -> DecodeResult<()> {
        let value = self.pop_pending()?;
        match value {
            Value::Array(elements) => {
                if elements.len() != len {
                    return Err(DecodeError::new(
                        DecodeErrorCode::LengthMismatch,
                        format!(
                            "wire array holds {} elements, the count atom says {}",
                            elements.len(),
                            len
                        ),
                    ));
                }
                self.frames.push(Frame::Array(elements.into_iter()));
                Ok(())
            }
            other => Err(wrong_type("an array", &other)),
        }
    }

    fn begin_element(&mut self, _index: usize) -> DecodeResult<()> {
        let next = match self.frames.last_mut() {
            Some(Frame::Array(elements)) => elements.next(),
            _ => {
                return Err(DecodeError::new(
                    DecodeErrorCode::BadSyntax,
                    "wire structure does not match the schema",
                ));
            }
        };
        match next {
            Some(value) => {
                self.frames.push(Frame::Pending(value));
                Ok(())
            }
            None => Err(DecodeError::new(
                DecodeErrorCode::BadSyntax,
                "wire array ran out of elements",
            )),
        }
    }

    fn end_array(&mut self) -> DecodeResult<()> {
        match self.frames.pop() {
            Some(Frame::Array(_)) => Ok(()),
            _ => Err(DecodeError::new(
                DecodeErrorCode::BadSyntax,
                "wire structure does not match the schema",
            )),
        }
    }
}

fn wrong_type(expected: &str, found: &Value) -> DecodeError {
    let found = match found {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    };
    DecodeError::new(
        DecodeErrorCode::BadValue,
        format!("expected {}, found {}", expected, found),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::DataBlock;
    use crate::codec::{read_record, write_record};
    use crate::schema::{Binding, Component};
    use std::sync::Arc;

    fn burst_binding() -> Arc<Binding> {
        let schema = Component::record(vec![
            ("t0", Component::time()),
            ("size", Component::count_with_id("sample-count")),
            (
                "samples",
                Component::array_linked(
                    "sample-count",
                    Component::vector(vec![
                        ("c1", Component::quantity()),
                        ("c2", Component::quantity()),
                    ]),
                ),
            ),
        ]);
        Arc::new(Binding::compile(&schema).unwrap())
    }

    fn burst_block() -> DataBlock {
        let mut block = DataBlock::new(burst_binding());
        block.set_int("t0", 1_700_000_000_000).unwrap();
        block.resize_array_at("samples", 2).unwrap();
        block.set_double("samples[0].c1", 1.5).unwrap();
        block.set_double("samples[0].c2", 2.5).unwrap();
        block.set_double("samples[1].c1", 3.5).unwrap();
        block.set_double("samples[1].c2", 4.5).unwrap();
        block
    }

    fn encode(block: &DataBlock) -> String {
        let mut out = Vec::new();
        let mut sink = JsonSink::new(&mut out);
        write_record(block, &mut sink).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn decode(bytes: &[u8], binding: &Arc<Binding>) -> DataBlock {
        let mut block = DataBlock::new(binding.clone());
        decode_into(bytes, &mut block).unwrap();
        block
    }

    fn decode_into(bytes: &[u8], block: &mut DataBlock) -> DecodeResult<()> {
        let mut source = JsonSource::new(bytes, StreamMode::Single);
        source.begin_stream()?;
        assert!(source.begin_record()?);
        read_record(block, &mut source)?;
        source.finish_record()?;
        source.end_stream()
    }

    fn decode_err(bytes: &[u8], binding: &Arc<Binding>) -> DecodeError {
        let mut block = DataBlock::new(binding.clone());
        decode_into(bytes, &mut block).unwrap_err()
    }

    #[test]
    fn test_encode_burst_record() {
        assert_eq!(
            encode(&burst_block()),
            "{\"t0\":\"2023-11-14T22:13:20.000Z\",\"size\":2,\
             \"samples\":[{\"c1\":1.5,\"c2\":2.5},{\"c1\":3.5,\"c2\":4.5}]}"
        );
    }

    #[test]
    fn test_decode_reconstructs_block() {
        let binding = burst_binding();
        let bytes = br#"{"t0":"2023-11-14T22:13:20.000Z","size":2,
                         "samples":[{"c1":1.5,"c2":2.5},{"c1":3.5,"c2":4.5}]}"#;
        assert_eq!(decode(bytes, &binding), burst_block());
    }

    #[test]
    fn test_field_order_on_wire_is_free() {
        let binding = burst_binding();
        let bytes = br#"{"samples":[],"size":0,"t0":"2023-11-14T22:13:20.000Z"}"#;
        let block = decode(bytes, &binding);
        assert_eq!(block.get_int("t0").unwrap(), 1_700_000_000_000);
    }

    #[test]
    fn test_missing_field() {
        let binding = burst_binding();
        let err = decode_err(br#"{"t0":"2023-11-14T22:13:20.000Z","samples":[]}"#, &binding);
        assert_eq!(err.code(), DecodeErrorCode::MissingField);
        assert!(err.message().contains("size"));
    }

    #[test]
    fn test_undeclared_field() {
        let binding = burst_binding();
        let err = decode_err(
            br#"{"t0":"2023-11-14T22:13:20.000Z","size":0,"samples":[],"extra":1}"#,
            &binding,
        );
        assert_eq!(err.code(), DecodeErrorCode::UndeclaredField);
        assert!(err.message().contains("extra"));
    }

    #[test]
    fn test_array_length_must_match_count() {
        let binding = burst_binding();
        let err = decode_err(
            br#"{"t0":"2023-11-14T22:13:20.000Z","size":2,"samples":[{"c1":1.0,"c2":2.0}]}"#,
            &binding,
        );
        assert_eq!(err.code(), DecodeErrorCode::LengthMismatch);
        assert_eq!(err.path(), Some("samples"));
    }

    #[test]
    fn test_count_must_be_integral() {
        let binding = burst_binding();
        let err = decode_err(
            br#"{"t0":"2023-11-14T22:13:20.000Z","size":1.5,"samples":[]}"#,
            &binding,
        );
        assert_eq!(err.code(), DecodeErrorCode::BadValue);
        assert_eq!(err.path(), Some("size"));
    }

    #[test]
    fn test_time_must_be_a_string() {
        let binding = burst_binding();
        let err = decode_err(br#"{"t0":1700000000000,"size":0,"samples":[]}"#, &binding);
        assert_eq!(err.code(), DecodeErrorCode::BadValue);
        assert_eq!(err.path(), Some("t0"));
    }

    #[test]
    fn test_nonfinite_quantities_as_strings() {
        let schema = Component::record(vec![
            ("a", Component::quantity()),
            ("b", Component::quantity()),
            ("c", Component::quantity()),
        ]);
        let binding = Arc::new(Binding::compile(&schema).unwrap());
        let mut block = DataBlock::new(binding.clone());
        block.set_double("a", f64::NAN).unwrap();
        block.set_double("b", f64::INFINITY).unwrap();
        block.set_double("c", f64::NEG_INFINITY).unwrap();
        let text = encode(&block);
        assert_eq!(text, r#"{"a":"NaN","b":"+INF","c":"-INF"}"#);

        let back = decode(text.as_bytes(), &binding);
        assert!(back.get_double("a").unwrap().is_nan());
        assert_eq!(back.get_double("b").unwrap(), f64::INFINITY);

        // A finite value spelled as a string stays an error.
        let err = decode_err(br#"{"a":"2.5","b":1.0,"c":1.0}"#, &binding);
        assert_eq!(err.code(), DecodeErrorCode::BadValue);
    }

    #[test]
    fn test_string_escaping_round_trips() {
        let schema = Component::record(vec![("note", Component::text())]);
        let binding = Arc::new(Binding::compile(&schema).unwrap());
        let mut block = DataBlock::new(binding.clone());
        let gnarly = "line one\nsays \"hi\"\tback\\slash";
        block.set_text("note", gnarly).unwrap();
        let text = encode(&block);
        let back = decode(text.as_bytes(), &binding);
        assert_eq!(back.get_text("note").unwrap(), gnarly);
    }

    #[test]
    fn test_choice_is_a_one_member_object() {
        let schema = Component::record(vec![(
            "payload",
            Component::choice(vec![
                ("scalar", Component::quantity()),
                ("note", Component::text()),
            ]),
        )]);
        let binding = Arc::new(Binding::compile(&schema).unwrap());

        let mut block = DataBlock::new(binding.clone());
        block.select_choice(0, 1).unwrap();
        block.set_text("payload.note", "hi").unwrap();
        assert_eq!(encode(&block), r#"{"payload":{"note":"hi"}}"#);

        let back = decode(br#"{"payload":{"scalar":2.5}}"#, &binding);
        assert_eq!(back.choice_selection(0).unwrap(), 0);
        assert_eq!(back.get_double("payload.scalar").unwrap(), 2.5);

        let err = decode_err(br#"{"payload":{"horse":1}}"#, &binding);
        assert_eq!(err.code(), DecodeErrorCode::BadDiscriminant);

        let err = decode_err(br#"{"payload":{"scalar":1.0,"note":"x"}}"#, &binding);
        assert_eq!(err.code(), DecodeErrorCode::BadSyntax);
    }

    #[test]
    fn test_multi_stream_framing() {
        let binding = Arc::new(
            Binding::compile(&Component::record(vec![("n", Component::count())])).unwrap(),
        );
        let bytes = b" [ {\"n\":1} , {\"n\":2} ] ";
        let mut source = JsonSource::new(&bytes[..], StreamMode::Multi);
        source.begin_stream().unwrap();

        let mut seen = Vec::new();
        loop {
            if !source.begin_record().unwrap() {
                break;
            }
            let mut block = DataBlock::new(binding.clone());
            read_record(&mut block, &mut source).unwrap();
            source.finish_record().unwrap();
            seen.push(block.get_int("n").unwrap());
        }
        source.end_stream().unwrap();
        assert_eq!(seen, vec![1, 2]);
    }

    #[test]
    fn test_multi_stream_missing_close() {
        let bytes = b"[{\"n\":1}";
        let mut source = JsonSource::new(&bytes[..], StreamMode::Multi);
        source.begin_stream().unwrap();
        assert!(source.begin_record().unwrap());
        let binding = Arc::new(
            Binding::compile(&Component::record(vec![("n", Component::count())])).unwrap(),
        );
        let mut block = DataBlock::new(binding);
        read_record(&mut block, &mut source).unwrap();
        source.finish_record().unwrap();
        let err = source.begin_record().unwrap_err();
        assert_eq!(err.code(), DecodeErrorCode::Truncated);
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let binding = Arc::new(
            Binding::compile(&Component::record(vec![("n", Component::count())])).unwrap(),
        );
        let err = decode_err(b"{\"n\":1} garbage", &binding);
        assert_eq!(err.code(), DecodeErrorCode::TrailingData);
    }

    #[test]
    fn test_malformed_json() {
        let binding = Arc::new(
            Binding::compile(&Component::record(vec![("n", Component::count())])).unwrap(),
        );
        let err = decode_err(b"{\"n\":}", &binding);
        assert_eq!(err.code(), DecodeErrorCode::BadSyntax);

        let err = decode_err(b"{\"n\":1", &binding);
        assert_eq!(err.code(), DecodeErrorCode::Truncated);
    }
}
