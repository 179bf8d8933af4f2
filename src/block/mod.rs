//! Data block subsystem for tern
//!
//! A block is the in-memory value carrier for one record: a flat atom
//! buffer laid out in the depth-first order of its schema, plus the array
//! lengths and choice selections that determine the layout
//! (DATAMODEL.md §141-210).
//!
//! # Design Principles
//!
//! - Layout is always derivable from lengths and selections alone
//! - Mutations either complete or leave the block untouched
//! - Typed access over raw buffer poking
//! - Allocation reuse across records on the hot decode path
//!
//! # Invariants Enforced
//!
//! - Atom count always equals the layout implied by lengths and selections
//! - Resizing a linked array rewrites its governing count atom
//! - Deselected choice alternatives reset their nested state
//! - Atom values always match their declared scalar kind

mod atom;
mod buffer;
mod errors;

pub use atom::{Atom, AtomValue, ByteSpan};
pub use buffer::DataBlock;
pub use errors::{BlockError, BlockErrorCode, BlockResult};

/// Hard cap on elements in a single array instance. Guards block memory
/// against absurd resize requests and decoded length fields alike.
pub const MAX_ARRAY_ELEMENTS: usize = 1 << 20;
