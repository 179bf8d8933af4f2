//! Stream reader for tern
//!
//! Per STREAMS.md §45-96: a `BlockReader` turns a framed byte stream back
//! into blocks, one record per call.
//!
//! # Design Principles
//!
//! - One generic record loop drives all three formats
//! - Callers choose allocation: a fresh block per record or decode into
//!   one they own
//! - After a decode failure the source position is undefined, so the
//!   reader poisons itself rather than resynchronize by guesswork
//!
//! # Invariants Enforced
//!
//! - Clean end of stream is only reported at a record boundary
//! - A single-record stream yields its record only if nothing follows it
//! - A poisoned reader refuses every further read
//! - Blocks passed in for reuse were compiled from the reader's binding

use std::io::Read;
use std::sync::Arc;

use crate::block::DataBlock;
use crate::codec::{
    read_record, BinarySource, DecodeError, Encoding, JsonSource, RecordStream, StreamMode,
    TextSource,
};
use crate::observability::{logging_enabled, CodecMetrics, Logger, MetricsSnapshot};
use crate::schema::Binding;
use crate::stream::errors::{StreamError, StreamResult};

#[derive(Debug)]
enum SourceKind<R: Read> {
    Text(TextSource<R>),
    Json(JsonSource<R>),
    Binary(BinarySource<R>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderState {
    Created,
    Reading,
    Finished,
    Poisoned,
}

/// Reads a stream of records in one encoding.
///
/// ```no_run
/// use std::sync::Arc;
/// use tern::schema::{Binding, Component};
/// use tern::codec::{Encoding, StreamMode};
/// use tern::stream::BlockReader;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let schema = Component::record(vec![("n", Component::count())]);
/// let binding = Arc::new(Binding::compile(&schema)?);
/// let bytes: &[u8] = b"[{\"n\":1},{\"n\":2}]";
///
/// let mut reader = BlockReader::new(bytes, binding, Encoding::Json, StreamMode::Multi)?;
/// while let Some(block) = reader.read_next()? {
///     println!("n = {}", block.get_int("n")?);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct BlockReader<R: Read> {
    source: SourceKind<R>,
    binding: Arc<Binding>,
    mode: StreamMode,
    state: ReaderState,
    records: u64,
    metrics: CodecMetrics,
}

impl<R: Read> BlockReader<R> {
    /// Create a reader over `inner`. Validates the text separator
    /// configuration up front.
    pub fn new(
        inner: R,
        binding: Arc<Binding>,
        encoding: Encoding,
        mode: StreamMode,
    ) -> StreamResult<Self> {
        let source = match encoding {
            Encoding::Text(framing) => {
                framing.validate().map_err(StreamError::BadFraming)?;
                SourceKind::Text(TextSource::new(inner, framing))
            }
            Encoding::Json => SourceKind::Json(JsonSource::new(inner, mode)),
            Encoding::Binary => SourceKind::Binary(BinarySource::new(inner)),
        };
        Ok(Self {
            source,
            binding,
            mode,
            state: ReaderState::Created,
            records: 0,
            metrics: CodecMetrics::new(),
        })
    }

    /// Decode the next record into a fresh block. `None` means clean end
    /// of stream; asking again keeps returning `None`.
    pub fn read_next(&mut self) -> StreamResult<Option<DataBlock>> {
        let mut block = DataBlock::new(Arc::clone(&self.binding));
        if self.read_next_into(&mut block)? {
            Ok(Some(block))
        } else {
            Ok(None)
        }
    }

    /// Decode the next record into a caller-owned block, reusing its
    /// allocations. Returns false on clean end of stream, leaving the
    /// block untouched. On a decode error the block's contents are
    /// unspecified and the reader is poisoned.
    pub fn read_next_into(&mut self, block: &mut DataBlock) -> StreamResult<bool> {
        match self.state {
            ReaderState::Poisoned => return Err(StreamError::Poisoned),
            ReaderState::Finished => return Ok(false),
            ReaderState::Created | ReaderState::Reading => {}
        }
        if !Arc::ptr_eq(&self.binding, block.binding()) {
            return Err(StreamError::ForeignBlock);
        }
        if self.state == ReaderState::Created {
            if let Err(e) = self.open() {
                return Err(self.poison(e));
            }
        }

        let single_done = self.mode == StreamMode::Single && self.records >= 1;
        let result = match &mut self.source {
            SourceKind::Text(source) => next_record(source, block, self.mode, single_done),
            SourceKind::Json(source) => next_record(source, block, self.mode, single_done),
            SourceKind::Binary(source) => next_record(source, block, self.mode, single_done),
        };
        match result {
            Ok(true) => {
                self.records += 1;
                self.metrics.increment_records_decoded();
                if logging_enabled() {
                    Logger::trace("RECORD_READ", &[("record", &self.records.to_string())]);
                }
                Ok(true)
            }
            Ok(false) => {
                self.state = ReaderState::Finished;
                if logging_enabled() {
                    Logger::trace(
                        "STREAM_ENDED",
                        &[("records", &self.records.to_string())],
                    );
                }
                Ok(false)
            }
            Err(e) => Err(self.poison(e)),
        }
    }

    /// Records decoded so far
    pub fn records_read(&self) -> u64 {
        self.records
    }

    /// Snapshot of this reader's counters
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn open(&mut self) -> Result<(), DecodeError> {
        match &mut self.source {
            SourceKind::Text(source) => source.begin_stream()?,
            SourceKind::Json(source) => source.begin_stream()?,
            SourceKind::Binary(source) => source.begin_stream()?,
        }
        self.state = ReaderState::Reading;
        Logger::trace("STREAM_OPENED", &[("mode", mode_name(self.mode))]);
        Ok(())
    }

    fn poison(&mut self, err: DecodeError) -> StreamError {
        self.state = ReaderState::Poisoned;
        self.metrics.increment_decode_errors();
        if logging_enabled() {
            Logger::error(
                "RECORD_DECODE_FAILED",
                &[("code", err.code().code()), ("message", err.message())],
            );
        }
        err.into()
    }
}

/// Drive one record through any format's source. `single_done` marks a
/// single-record stream whose record was already delivered; its end was
/// verified eagerly, so this is a clean end without touching the source.
fn next_record<S: RecordStream>(
    source: &mut S,
    block: &mut DataBlock,
    mode: StreamMode,
    single_done: bool,
) -> Result<bool, DecodeError> {
    if single_done {
        return Ok(false);
    }
    if !source.begin_record()? {
        // Bytes after a multi stream's closing frame are an error, not
        // a clean end.
        source.end_stream()?;
        return Ok(false);
    }
    read_record(block, source)?;
    source.finish_record()?;
    if mode == StreamMode::Single {
        // Trailing garbage fails the first read, not a later one.
        source.end_stream()?;
    }
    Ok(true)
}

fn mode_name(mode: StreamMode) -> &'static str {
    match mode {
        StreamMode::Single => "single",
        StreamMode::Multi => "multi",
    }
}
