//! Delimited text codec per ENCODINGS.md §62-118
//!
//! The leanest of the three formats: every atom becomes one token, tokens
//! are joined by the token separator, records are terminated by the block
//! separator. No names, no brackets, no escaping. The reader reconstructs
//! all structure from the schema alone.
//!
//! ```text
//!   2023-11-14T22:13:20.000Z,2,1.5,2.5,3.5,4.5\n
//!   |----------------------| |-| |-----------|
//!        time token         count  2x2 array    record terminator
//! ```
//!
//! Token forms:
//! - boolean: `true` / `false` on output; `1` / `0` also accepted on input
//! - count: decimal integer
//! - quantity: shortest round-tripping decimal; `NaN` / `+INF` / `-INF`
//! - text, category: the raw string
//! - time: RFC 3339 UTC milliseconds
//! - choice: the selected alternative's name
//!
//! Because there is no escaping, the encoder refuses any token that
//! contains either separator rather than emit a stream that cannot be
//! read back.

use std::io::{self, BufRead, BufReader, Read};

use serde::{Deserialize, Serialize};

use crate::block::{AtomValue, ByteSpan};
use crate::codec::errors::{
    DecodeError, DecodeErrorCode, DecodeResult, EncodeError, EncodeErrorCode, EncodeResult,
};
use crate::codec::{
    format_quantity, format_time_utc, parse_quantity, parse_time_utc, RecordSink, RecordSource,
    RecordStream, MAX_TEXT_BYTES,
};
use crate::schema::ScalarKind;

/// Separator configuration for the text format.
///
/// Both separators are free-form byte strings; the defaults produce the
/// classic one-record-per-line comma layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFraming {
    /// Written between consecutive value tokens of one record
    #[serde(default = "default_token_separator")]
    pub token_separator: String,
    /// Written after every record
    #[serde(default = "default_block_separator")]
    pub block_separator: String,
}

fn default_token_separator() -> String {
    ",".to_string()
}

fn default_block_separator() -> String {
    "\n".to_string()
}

impl Default for TextFraming {
    fn default() -> Self {
        Self {
            token_separator: default_token_separator(),
            block_separator: default_block_separator(),
        }
    }
}

impl TextFraming {
    /// Check that the separators can be scanned unambiguously: both
    /// non-empty, and ending in different bytes so an input byte completes
    /// at most one of them.
    pub fn validate(&self) -> Result<(), String> {
        if self.token_separator.is_empty() {
            return Err("token separator is empty".to_string());
        }
        if self.block_separator.is_empty() {
            return Err("block separator is empty".to_string());
        }
        let token_last = self.token_separator.as_bytes().last();
        let block_last = self.block_separator.as_bytes().last();
        if token_last == block_last {
            return Err(format!(
                "separators '{}' and '{}' end in the same byte",
                self.token_separator.escape_default(),
                self.block_separator.escape_default()
            ));
        }
        Ok(())
    }
}

/// Encode side: joins value tokens into a staging buffer.
pub(crate) struct TextSink<'a> {
    out: &'a mut Vec<u8>,
    framing: &'a TextFraming,
    first: bool,
}

impl<'a> TextSink<'a> {
    pub(crate) fn new(out: &'a mut Vec<u8>, framing: &'a TextFraming) -> Self {
        Self {
            out,
            framing,
            first: true,
        }
    }

    fn token(&mut self, token: &str) -> EncodeResult<()> {
        if token.contains(self.framing.token_separator.as_str())
            || token.contains(self.framing.block_separator.as_str())
        {
            return Err(EncodeError::new(
                EncodeErrorCode::UnencodableText,
                format!(
                    "'{}' contains a separator and the text format has no escaping",
                    token.escape_default()
                ),
            ));
        }
        if !self.first {
            self.out
                .extend_from_slice(self.framing.token_separator.as_bytes());
        }
        self.first = false;
        self.out.extend_from_slice(token.as_bytes());
        Ok(())
    }
}

impl RecordSink for TextSink<'_> {
    fn scalar(&mut self, kind: ScalarKind, value: &AtomValue) -> EncodeResult<()> {
        match value {
            AtomValue::Bool(b) => self.token(if *b { "true" } else { "false" }),
            AtomValue::Int(n) => {
                if kind == ScalarKind::Time {
                    let token = format_time_utc(*n)?;
                    self.token(&token)
                } else {
                    self.token(&n.to_string())
                }
            }
            AtomValue::Double(v) => self.token(&format_quantity(*v)),
            AtomValue::Text(s) => self.token(s),
        }
    }

    fn begin_choice(&mut self, _index: u8, name: &str) -> EncodeResult<()> {
        self.token(name)
    }
}

/// What ended the most recently scanned token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Term {
    /// No token scanned yet in this record
    Start,
    /// Token separator: more tokens follow in this record
    Token,
    /// Block separator: the record is over
    Block,
    /// End of input
    Eof,
}

/// Decode side: scans separator-delimited tokens off a byte stream.
#[derive(Debug)]
pub(crate) struct TextSource<R: Read> {
    reader: BufReader<R>,
    framing: TextFraming,
    term: Term,
    /// Bytes consumed so far, for error positions
    offset: u64,
    /// Offset of the first byte of the current token
    token_start: u64,
}

impl<R: Read> TextSource<R> {
    pub(crate) fn new(inner: R, framing: TextFraming) -> Self {
        Self {
            reader: BufReader::new(inner),
            framing,
            term: Term::Start,
            offset: 0,
            token_start: 0,
        }
    }

    fn has_input(&mut self) -> DecodeResult<bool> {
        loop {
            match self.reader.fill_buf() {
                Ok(buf) => return Ok(!buf.is_empty()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Scan one token. The terminator that ended it is recorded in
    /// `self.term`; requesting a token after the record already ended is a
    /// decode error.
    fn next_token(&mut self) -> DecodeResult<String> {
        match self.term {
            Term::Block => {
                return Err(DecodeError::new(
                    DecodeErrorCode::BadSyntax,
                    "record separator arrived before all values",
                )
                .with_offset(self.offset));
            }
            Term::Eof => {
                return Err(DecodeError::new(
                    DecodeErrorCode::Truncated,
                    "input ended before all values",
                )
                .with_offset(self.offset));
            }
            Term::Start | Term::Token => {}
        }

        self.token_start = self.offset;
        let mut buf: Vec<u8> = Vec::new();
        let token_sep = self.framing.token_separator.as_bytes();
        let block_sep = self.framing.block_separator.as_bytes();
        loop {
            let mut byte = [0u8; 1];
            let n = match self.reader.read(&mut byte) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            if n == 0 {
                self.term = Term::Eof;
                break;
            }
            self.offset += 1;
            buf.push(byte[0]);
            if buf.len() > MAX_TEXT_BYTES {
                return Err(DecodeError::new(
                    DecodeErrorCode::TextOverflow,
                    format!("token exceeds the {} byte cap", MAX_TEXT_BYTES),
                )
                .with_offset(self.token_start));
            }
            if buf.ends_with(block_sep) {
                buf.truncate(buf.len() - block_sep.len());
                self.term = Term::Block;
                break;
            }
            if buf.ends_with(token_sep) {
                buf.truncate(buf.len() - token_sep.len());
                self.term = Term::Token;
                break;
            }
        }

        String::from_utf8(buf).map_err(|e| {
            DecodeError::new(
                DecodeErrorCode::BadUtf8,
                format!("token is not valid UTF-8: {}", e),
            )
            .with_offset(self.token_start)
        })
    }
}

impl<R: Read> RecordStream for TextSource<R> {
    /// Probe for another record. Returns false on clean end of input.
    fn begin_record(&mut self) -> DecodeResult<bool> {
        if !self.has_input()? {
            return Ok(false);
        }
        self.term = Term::Start;
        Ok(true)
    }

    /// Verify the record's terminator after all values were consumed.
    fn finish_record(&mut self) -> DecodeResult<()> {
        match self.term {
            Term::Block | Term::Eof => Ok(()),
            Term::Token => Err(DecodeError::new(
                DecodeErrorCode::BadSyntax,
                "extra value tokens before the record separator",
            )
            .with_offset(self.offset)),
            Term::Start => {
                // Zero-token records still carry their terminator.
                let token = self.next_token()?;
                if !token.is_empty() || self.term == Term::Token {
                    return Err(DecodeError::new(
                        DecodeErrorCode::BadSyntax,
                        "unexpected tokens in a record with no values",
                    )
                    .with_offset(self.token_start));
                }
                Ok(())
            }
        }
    }

    /// Reject any bytes past the final record of a single-record stream.
    fn end_stream(&mut self) -> DecodeResult<()> {
        if self.has_input()? {
            return Err(DecodeError::new(
                DecodeErrorCode::TrailingData,
                "bytes remain after the record",
            )
            .with_offset(self.offset));
        }
        Ok(())
    }
}

impl<R: Read> RecordSource for TextSource<R> {
    fn scalar(&mut self, kind: ScalarKind) -> DecodeResult<(AtomValue, Option<ByteSpan>)> {
        let token = self.next_token()?;
        let start = self.token_start;
        let value = match kind {
            ScalarKind::Boolean => match token.as_str() {
                "true" | "1" => AtomValue::Bool(true),
                "false" | "0" => AtomValue::Bool(false),
                _ => {
                    return Err(DecodeError::new(
                        DecodeErrorCode::BadValue,
                        format!("'{}' is not a boolean", token),
                    )
                    .with_offset(start));
                }
            },
            ScalarKind::Count => {
                let n: i64 = token.parse().map_err(|_| {
                    DecodeError::new(
                        DecodeErrorCode::BadValue,
                        format!("'{}' is not a count", token),
                    )
                    .with_offset(start)
                })?;
                AtomValue::Int(n)
            }
            ScalarKind::Quantity => {
                AtomValue::Double(parse_quantity(&token).map_err(|e| e.with_offset(start))?)
            }
            ScalarKind::Time => {
                AtomValue::Int(parse_time_utc(&token).map_err(|e| e.with_offset(start))?)
            }
            ScalarKind::Text | ScalarKind::Category => AtomValue::Text(token),
        };
        Ok((value, None))
    }

    fn choice(&mut self, alternatives: &[&str]) -> DecodeResult<usize> {
        let token = self.next_token()?;
        alternatives
            .iter()
            .position(|name| *name == token)
            .ok_or_else(|| {
                DecodeError::new(
                    DecodeErrorCode::BadDiscriminant,
                    format!("'{}' names no alternative", token),
                )
                .with_offset(self.token_start)
            })
    }
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

    fn encode(block: &DataBlock, framing: &TextFraming) -> Vec<u8> {
        let mut out = Vec::new();
        let mut sink = TextSink::new(&mut out, framing);
        write_record(block, &mut sink).unwrap();
        out
    }

    fn decode(bytes: &[u8], binding: &Arc<Binding>, framing: TextFraming) -> DataBlock {
        let mut source = TextSource::new(bytes, framing);
        assert!(source.begin_record().unwrap());
        let mut block = DataBlock::new(binding.clone());
        read_record(&mut block, &mut source).unwrap();
        source.finish_record().unwrap();
        block
    }

    #[test]
    fn test_encode_burst_record() {
        let out = encode(&burst_block(), &TextFraming::default());
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "2023-11-14T22:13:20.000Z,2,1.5,2.5,3.5,4.5"
        );
    }

    #[test]
    fn test_decode_reconstructs_block() {
        let binding = burst_binding();
        let bytes = b"2023-11-14T22:13:20.000Z,2,1.5,2.5,3.5,4.5\n";
        let block = decode(bytes, &binding, TextFraming::default());
        assert_eq!(block, burst_block());
    }

    #[test]
    fn test_decode_accepts_trailing_record_without_terminator() {
        let binding = burst_binding();
        let bytes = b"2023-11-14T22:13:20.000Z,0";
        let block = decode(bytes, &binding, TextFraming::default());
        assert_eq!(block.array_length_at("samples").unwrap(), 0);
    }

    #[test]
    fn test_custom_separators() {
        let framing = TextFraming {
            token_separator: "|".to_string(),
            block_separator: ";".to_string(),
        };
        let out = encode(&burst_block(), &framing);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("|2|1.5|"));

        let binding = burst_binding();
        let block = decode(text.as_bytes(), &binding, framing);
        assert_eq!(block, burst_block());
    }

    #[test]
    fn test_separator_in_text_value_refused() {
        let schema = Component::record(vec![("note", Component::text())]);
        let binding = Arc::new(Binding::compile(&schema).unwrap());
        let mut block = DataBlock::new(binding);
        block.set_text("note", "a,b").unwrap();
        let mut out = Vec::new();
        let framing = TextFraming::default();
        let mut sink = TextSink::new(&mut out, &framing);
        let err = write_record(&block, &mut sink).unwrap_err();
        assert_eq!(err.code(), EncodeErrorCode::UnencodableText);
        assert_eq!(err.path(), Some("note"));
    }

    #[test]
    fn test_boolean_token_forms() {
        let schema = Component::record(vec![
            ("a", Component::boolean()),
            ("b", Component::boolean()),
        ]);
        let binding = Arc::new(Binding::compile(&schema).unwrap());
        let block = decode(b"1,false\n", &binding, TextFraming::default());
        assert!(block.get_bool("a").unwrap());
        assert!(!block.get_bool("b").unwrap());
    }

    #[test]
    fn test_bad_tokens_rejected() {
        let binding = burst_binding();
        let cases: [(&[u8], DecodeErrorCode); 4] = [
            (b"not-a-time,0\n", DecodeErrorCode::BadValue),
            (b"2023-11-14T22:13:20.000Z,abc\n", DecodeErrorCode::BadValue),
            (
                b"2023-11-14T22:13:20.000Z,1,oops,2.5\n",
                DecodeErrorCode::BadValue,
            ),
            (b"2023-11-14T22:13:20.000Z,-1,\n", DecodeErrorCode::BadCount),
        ];
        for (bytes, expected) in cases {
            let mut source = TextSource::new(bytes, TextFraming::default());
            assert!(source.begin_record().unwrap());
            let mut block = DataBlock::new(binding.clone());
            let err = read_record(&mut block, &mut source).unwrap_err();
            assert_eq!(err.code(), expected, "input {:?}", bytes);
        }
    }

    #[test]
    fn test_errors_carry_byte_positions() {
        let binding = burst_binding();
        let bytes = b"2023-11-14T22:13:20.000Z,abc\n";
        let mut source = TextSource::new(&bytes[..], TextFraming::default());
        assert!(source.begin_record().unwrap());
        let mut block = DataBlock::new(binding);
        let err = read_record(&mut block, &mut source).unwrap_err();
        // The offending token starts at byte 25.
        assert_eq!(err.offset(), Some(25));
        assert_eq!(err.path(), Some("size"));
    }

    #[test]
    fn test_premature_record_separator() {
        let binding = burst_binding();
        let bytes = b"2023-11-14T22:13:20.000Z,2,1.5\n";
        let mut source = TextSource::new(&bytes[..], TextFraming::default());
        assert!(source.begin_record().unwrap());
        let mut block = DataBlock::new(binding);
        let err = read_record(&mut block, &mut source).unwrap_err();
        assert_eq!(err.code(), DecodeErrorCode::BadSyntax);
        // The failing component is named.
        assert_eq!(err.path(), Some("samples[0].c2"));
    }

    #[test]
    fn test_truncated_input() {
        let binding = burst_binding();
        let bytes = b"2023-11-14T22:13:20.000Z,2,1.5,2.5";
        let mut source = TextSource::new(&bytes[..], TextFraming::default());
        assert!(source.begin_record().unwrap());
        let mut block = DataBlock::new(binding);
        let err = read_record(&mut block, &mut source).unwrap_err();
        assert_eq!(err.code(), DecodeErrorCode::Truncated);
    }

    #[test]
    fn test_extra_tokens_flagged_at_finish() {
        let schema = Component::record(vec![("n", Component::count())]);
        let binding = Arc::new(Binding::compile(&schema).unwrap());
        let mut source = TextSource::new(&b"5,6\n"[..], TextFraming::default());
        assert!(source.begin_record().unwrap());
        let mut block = DataBlock::new(binding);
        read_record(&mut block, &mut source).unwrap();
        let err = source.finish_record().unwrap_err();
        assert_eq!(err.code(), DecodeErrorCode::BadSyntax);
    }

    #[test]
    fn test_choice_token_is_alternative_name() {
        let schema = Component::record(vec![(
            "payload",
            Component::choice(vec![
                ("pair", Component::vector(vec![
                    ("a", Component::count()),
                    ("b", Component::count()),
                ])),
                ("note", Component::text()),
            ]),
        )]);
        let binding = Arc::new(Binding::compile(&schema).unwrap());

        let mut block = DataBlock::new(binding.clone());
        block.select_choice(0, 1).unwrap();
        block.set_text("payload.note", "hi").unwrap();
        let out = encode(&block, &TextFraming::default());
        assert_eq!(String::from_utf8(out).unwrap(), "note,hi");

        let decoded = decode(b"pair,3,4\n", &binding, TextFraming::default());
        assert_eq!(decoded.choice_selection(0).unwrap(), 0);
        assert_eq!(decoded.get_int("payload.pair.a").unwrap(), 3);

        let mut source = TextSource::new(&b"horse,1\n"[..], TextFraming::default());
        assert!(source.begin_record().unwrap());
        let mut block = DataBlock::new(binding);
        let err = read_record(&mut block, &mut source).unwrap_err();
        assert_eq!(err.code(), DecodeErrorCode::BadDiscriminant);
    }

    #[test]
    fn test_enumeration_enforced_both_ways() {
        let schema = Component::record(vec![(
            "color",
            Component::category_of(vec!["red", "green", "blue"]),
        )]);
        let binding = Arc::new(Binding::compile(&schema).unwrap());

        let mut block = DataBlock::new(binding.clone());
        block.set_text("color", "mauve").unwrap();
        let mut out = Vec::new();
        let framing = TextFraming::default();
        let mut sink = TextSink::new(&mut out, &framing);
        let err = write_record(&block, &mut sink).unwrap_err();
        assert_eq!(err.code(), EncodeErrorCode::EnumViolation);

        let mut source = TextSource::new(&b"mauve\n"[..], TextFraming::default());
        assert!(source.begin_record().unwrap());
        let mut block = DataBlock::new(binding);
        let err = read_record(&mut block, &mut source).unwrap_err();
        assert_eq!(err.code(), DecodeErrorCode::EnumViolation);
    }

    #[test]
    fn test_framing_validation() {
        assert!(TextFraming::default().validate().is_ok());
        let empty = TextFraming {
            token_separator: String::new(),
            block_separator: "\n".to_string(),
        };
        assert!(empty.validate().is_err());
        let clashing = TextFraming {
            token_separator: ",".to_string(),
            block_separator: ";,".to_string(),
        };
        assert!(clashing.validate().is_err());
    }
}
