//! tern - A strict, schema-driven codec for streaming structured records
//!
//! A component schema tree is compiled once into a binding; each record
//! travels through a flat value buffer (`DataBlock`) and one of three wire
//! encodings (delimited text, JSON, binary). Bindings are immutable and
//! shared; every stream gets its own driver and its own block.
//!
//! ```no_run
//! use std::sync::Arc;
//! use chrono::Utc;
//! use tern::codec::{Encoding, StreamMode};
//! use tern::schema::{Binding, Component};
//! use tern::stream::{BlockReader, BlockWriter};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = Component::record(vec![
//!     ("time", Component::time()),
//!     ("depth", Component::quantity_in("m")),
//! ]);
//! let binding = Arc::new(Binding::compile(&schema)?);
//!
//! let mut writer = BlockWriter::new(
//!     Vec::new(),
//!     Arc::clone(&binding),
//!     Encoding::text(),
//!     StreamMode::Multi,
//! )?;
//! writer.start_stream()?;
//! let mut block = tern::block::DataBlock::new(Arc::clone(&binding));
//! block.set_time("time", Utc::now())?;
//! block.set_double("depth", 13.5)?;
//! writer.write(&block)?;
//! writer.end_stream()?;
//!
//! let bytes = writer.into_inner();
//! let mut reader =
//!     BlockReader::new(&bytes[..], binding, Encoding::text(), StreamMode::Multi)?;
//! while let Some(record) = reader.read_next()? {
//!     println!("depth = {}", record.get_double("depth")?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod block;
pub mod codec;
pub mod observability;
pub mod schema;
pub mod stream;
