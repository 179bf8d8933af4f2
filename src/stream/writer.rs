//! Stream writer for tern
//!
//! Per STREAMS.md §9-44: a `BlockWriter` turns blocks into a framed byte
//! stream in one encoding and one mode, both fixed at construction.
//!
//! # Design Principles
//!
//! - Records are staged in memory and reach the sink with one `write_all`
//! - A failed encode leaves the sink exactly as it was
//! - Lifecycle misuse is an error, never silent reordering
//!
//! # Invariants Enforced
//!
//! - `start_stream` precedes the first record, `end_stream` follows the
//!   last
//! - A single-record stream carries exactly one record
//! - Every block written was compiled from the writer's own binding

use std::io::Write;
use std::sync::Arc;

use crate::block::DataBlock;
use crate::codec::{
    write_record, BinarySink, EncodeError, EncodeErrorCode, EncodeResult, Encoding, JsonSink,
    StreamMode, TextSink,
};
use crate::observability::{logging_enabled, CodecMetrics, Logger, MetricsSnapshot};
use crate::schema::Binding;
use crate::stream::errors::{StreamError, StreamResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Created,
    Started,
    Finished,
}

/// Writes a stream of records in one encoding.
///
/// ```no_run
/// use std::sync::Arc;
/// use tern::schema::{Binding, Component};
/// use tern::block::DataBlock;
/// use tern::codec::{Encoding, StreamMode};
/// use tern::stream::BlockWriter;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let schema = Component::record(vec![("n", Component::count())]);
/// let binding = Arc::new(Binding::compile(&schema)?);
/// let mut block = DataBlock::new(binding.clone());
/// block.set_int("n", 7)?;
///
/// let mut writer = BlockWriter::new(Vec::new(), binding, Encoding::Binary, StreamMode::Multi)?;
/// writer.start_stream()?;
/// writer.write(&block)?;
/// writer.end_stream()?;
/// let bytes = writer.into_inner();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct BlockWriter<W: Write> {
    out: W,
    binding: Arc<Binding>,
    encoding: Encoding,
    mode: StreamMode,
    state: WriterState,
    records: u64,
    staging: Vec<u8>,
    metrics: CodecMetrics,
}

impl<W: Write> BlockWriter<W> {
    /// Create a writer over `out`. Validates the text separator
    /// configuration up front.
    pub fn new(
        out: W,
        binding: Arc<Binding>,
        encoding: Encoding,
        mode: StreamMode,
    ) -> StreamResult<Self> {
        if let Encoding::Text(framing) = &encoding {
            framing.validate().map_err(StreamError::BadFraming)?;
        }
        Ok(Self {
            out,
            binding,
            encoding,
            mode,
            state: WriterState::Created,
            records: 0,
            staging: Vec::new(),
            metrics: CodecMetrics::new(),
        })
    }

    /// Write the stream opener. Must precede the first record; calling it
    /// again on a started stream is a no-op.
    pub fn start_stream(&mut self) -> StreamResult<()> {
        match self.state {
            WriterState::Created => {}
            WriterState::Started => return Ok(()),
            WriterState::Finished => return Err(StreamError::Finished),
        }
        if self.encoding == Encoding::Json && self.mode == StreamMode::Multi {
            if let Err(e) = self.out.write_all(b"[") {
                return Err(EncodeError::from(e).into());
            }
            self.metrics.add_bytes_written(1);
        }
        self.state = WriterState::Started;
        Logger::trace(
            "STREAM_STARTED",
            &[
                ("encoding", self.encoding.name()),
                ("mode", mode_name(self.mode)),
            ],
        );
        Ok(())
    }

    /// Encode one record and hand it to the sink in a single `write_all`.
    /// On an encode error nothing reaches the sink and the writer stays
    /// usable.
    pub fn write(&mut self, block: &DataBlock) -> StreamResult<()> {
        match self.state {
            WriterState::Created => return Err(StreamError::NotStarted),
            WriterState::Finished => return Err(StreamError::Finished),
            WriterState::Started => {}
        }
        if self.mode == StreamMode::Single && self.records >= 1 {
            return Err(StreamError::SingleRecordMode);
        }
        if !Arc::ptr_eq(&self.binding, block.binding()) {
            let err = EncodeError::new(
                EncodeErrorCode::ForeignBlock,
                "block was compiled from a different schema binding",
            );
            self.record_encode_failure(&err);
            return Err(err.into());
        }

        if let Err(e) = self.encode_into_staging(block) {
            self.record_encode_failure(&e);
            return Err(e.into());
        }

        if let Err(e) = self.out.write_all(&self.staging) {
            let err = EncodeError::from(e);
            self.record_encode_failure(&err);
            return Err(err.into());
        }
        self.metrics.add_bytes_written(self.staging.len() as u64);
        self.metrics.increment_records_encoded();
        self.records += 1;
        if logging_enabled() {
            Logger::trace(
                "RECORD_WRITTEN",
                &[
                    ("bytes", &self.staging.len().to_string()),
                    ("record", &self.records.to_string()),
                ],
            );
        }
        Ok(())
    }

    /// Write the stream closer and flush the sink.
    pub fn end_stream(&mut self) -> StreamResult<()> {
        match self.state {
            WriterState::Created => return Err(StreamError::NotStarted),
            WriterState::Finished => return Err(StreamError::Finished),
            WriterState::Started => {}
        }
        if self.mode == StreamMode::Single && self.records != 1 {
            return Err(StreamError::SingleRecordMode);
        }
        if self.encoding == Encoding::Json && self.mode == StreamMode::Multi {
            if let Err(e) = self.out.write_all(b"]") {
                return Err(EncodeError::from(e).into());
            }
            self.metrics.add_bytes_written(1);
        }
        if let Err(e) = self.out.flush() {
            return Err(EncodeError::from(e).into());
        }
        self.state = WriterState::Finished;
        if logging_enabled() {
            Logger::trace(
                "STREAM_FINISHED",
                &[("records", &self.records.to_string())],
            );
        }
        Ok(())
    }

    /// Consume the writer and return the sink.
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Records written so far
    pub fn records_written(&self) -> u64 {
        self.records
    }

    /// Snapshot of this writer's counters
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn encode_into_staging(&mut self, block: &DataBlock) -> EncodeResult<()> {
        self.staging.clear();
        if self.encoding == Encoding::Json
            && self.mode == StreamMode::Multi
            && self.records > 0
        {
            self.staging.push(b',');
        }
        match &self.encoding {
            Encoding::Text(framing) => {
                let mut sink = TextSink::new(&mut self.staging, framing);
                write_record(block, &mut sink)?;
                self.staging
                    .extend_from_slice(framing.block_separator.as_bytes());
            }
            Encoding::Json => {
                let mut sink = JsonSink::new(&mut self.staging);
                write_record(block, &mut sink)?;
            }
            Encoding::Binary => {
                let mut sink = BinarySink::new(&mut self.staging);
                write_record(block, &mut sink)?;
            }
        }
        Ok(())
    }

    fn record_encode_failure(&self, err: &EncodeError) {
        self.metrics.increment_encode_errors();
        if logging_enabled() {
            Logger::error(
                "RECORD_ENCODE_FAILED",
                &[("code", err.code().code()), ("message", err.message())],
            );
        }
    }
}

fn mode_name(mode: StreamMode) -> &'static str {
    match mode {
        StreamMode::Single => "single",
        StreamMode::Multi => "multi",
    }
}
