//! Binary codec per ENCODINGS.md §188-241
//!
//! The densest format: atoms in traversal order, nothing else. No names,
//! no separators, no record terminator. All multi-byte values are
//! little-endian.
//!
//! ```text
//! +----------+---------+---------------------------------------------+
//! | kind     | width   | layout                                      |
//! +----------+---------+---------------------------------------------+
//! | boolean  | 1 byte  | 0x00 false, 0x01 true, others rejected      |
//! | count    | 8 bytes | i64, little-endian                          |
//! | quantity | 8 bytes | IEEE 754 binary64, little-endian            |
//! | text     | 4 + n   | u32 byte length little-endian, UTF-8 bytes  |
//! | time     | 8 bytes | i64 epoch milliseconds, little-endian       |
//! | choice   | 1 byte  | alternative index, then the selected subtree|
//! +----------+---------+---------------------------------------------+
//! ```
//!
//! Records, vectors, and arrays contribute no bytes of their own; an
//! array's length travels in its count atom, which the schema places
//! ahead of the elements. The decoder therefore always knows how many
//! bytes to expect next, and it reports the byte offset of every failure.
//! Scalar spans recorded on decode cover the value's full extent,
//! including the length prefix of a text atom.

use std::io::{self, BufRead, BufReader, Read};

use crate::block::{AtomValue, ByteSpan};
use crate::codec::errors::{
    DecodeError, DecodeErrorCode, DecodeResult, EncodeError, EncodeErrorCode, EncodeResult,
};
use crate::codec::{RecordSink, RecordSource, RecordStream, MAX_TEXT_BYTES};
use crate::schema::ScalarKind;

/// Encode side: appends little-endian atom bytes to a staging buffer.
pub(crate) struct BinarySink<'a> {
    out: &'a mut Vec<u8>,
}

impl<'a> BinarySink<'a> {
    pub(crate) fn new(out: &'a mut Vec<u8>) -> Self {
        Self { out }
    }
}

impl RecordSink for BinarySink<'_> {
    fn scalar(&mut self, _kind: ScalarKind, value: &AtomValue) -> EncodeResult<()> {
        match value {
            AtomValue::Bool(b) => self.out.push(u8::from(*b)),
            AtomValue::Int(n) => self.out.extend_from_slice(&n.to_le_bytes()),
            AtomValue::Double(v) => self.out.extend_from_slice(&v.to_le_bytes()),
            AtomValue::Text(s) => {
                if s.len() > MAX_TEXT_BYTES {
                    return Err(EncodeError::new(
                        EncodeErrorCode::UnencodableText,
                        format!(
                            "text of {} bytes exceeds the {} byte cap",
                            s.len(),
                            MAX_TEXT_BYTES
                        ),
                    ));
                }
                self.out.extend_from_slice(&(s.len() as u32).to_le_bytes());
                self.out.extend_from_slice(s.as_bytes());
            }
        }
        Ok(())
    }

    fn begin_choice(&mut self, index: u8, _name: &str) -> EncodeResult<()> {
        self.out.push(index);
        Ok(())
    }
}

/// Decode side: reads exact atom widths and tracks the stream offset for
/// error reports and value spans.
#[derive(Debug)]
pub(crate) struct BinarySource<R: Read> {
    reader: BufReader<R>,
    offset: u64,
}

impl<R: Read> BinarySource<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            offset: 0,
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

    fn read_bytes(&mut self, buf: &mut [u8]) -> DecodeResult<()> {
        self.reader
            .read_exact(buf)
            .map_err(|e| DecodeError::from(e).with_offset(self.offset))?;
        self.offset += buf.len() as u64;
        Ok(())
    }

    fn read_u8(&mut self) -> DecodeResult<u8> {
        let mut buf = [0u8; 1];
        self.read_bytes(&mut buf)?;
        Ok(buf[0])
    }

    fn read_i64(&mut self) -> DecodeResult<i64> {
        let mut buf = [0u8; 8];
        self.read_bytes(&mut buf)?;
        Ok(i64::from_le_bytes(buf))
    }

    fn read_f64(&mut self) -> DecodeResult<f64> {
        let mut buf = [0u8; 8];
        self.read_bytes(&mut buf)?;
        Ok(f64::from_le_bytes(buf))
    }

    fn read_text(&mut self) -> DecodeResult<String> {
        let mut prefix = [0u8; 4];
        self.read_bytes(&mut prefix)?;
        let len = u32::from_le_bytes(prefix) as usize;
        if len > MAX_TEXT_BYTES {
            return Err(DecodeError::new(
                DecodeErrorCode::TextOverflow,
                format!("text length {} exceeds the {} byte cap", len, MAX_TEXT_BYTES),
            )
            .with_offset(self.offset - 4));
        }
        let mut bytes = vec![0u8; len];
        self.read_bytes(&mut bytes)?;
        String::from_utf8(bytes).map_err(|e| {
            DecodeError::new(
                DecodeErrorCode::BadUtf8,
                format!("text is not valid UTF-8: {}", e),
            )
            .with_offset(self.offset - len as u64)
        })
    }
}

impl<R: Read> RecordStream for BinarySource<R> {
    /// Probe for another record. Returns false on clean end of input;
    /// records are back to back, so any leftover byte starts one.
    fn begin_record(&mut self) -> DecodeResult<bool> {
        self.has_input()
    }

    /// Records carry no terminator; nothing to verify.
    fn finish_record(&mut self) -> DecodeResult<()> {
        Ok(())
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

impl<R: Read> RecordSource for BinarySource<R> {
    fn scalar(&mut self, kind: ScalarKind) -> DecodeResult<(AtomValue, Option<ByteSpan>)> {
        let start = self.offset;
        let value = match kind {
            ScalarKind::Boolean => match self.read_u8()? {
                0x00 => AtomValue::Bool(false),
                0x01 => AtomValue::Bool(true),
                byte => {
                    return Err(DecodeError::new(
                        DecodeErrorCode::BadValue,
                        format!("byte 0x{:02X} is not a boolean", byte),
                    )
                    .with_offset(start));
                }
            },
            ScalarKind::Count | ScalarKind::Time => AtomValue::Int(self.read_i64()?),
            ScalarKind::Quantity => AtomValue::Double(self.read_f64()?),
            ScalarKind::Text | ScalarKind::Category => AtomValue::Text(self.read_text()?),
        };
        let span = ByteSpan {
            start,
            end: self.offset,
        };
        Ok((value, Some(span)))
    }

    fn choice(&mut self, _alternatives: &[&str]) -> DecodeResult<usize> {
        // Range validation happens in the decode driver.
        Ok(self.read_u8()? as usize)
    }
}
