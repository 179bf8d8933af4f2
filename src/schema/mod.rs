//! Schema subsystem for tern
//!
//! Per DATAMODEL.md, every stream is governed by a component schema agreed
//! out of band: a tree of records, vectors, arrays, and choices with typed
//! scalar leaves. The wire formats carry values only, so the schema is the
//! sole source of structure on both ends.
//!
//! # Design Principles
//!
//! - Structure is validated once, at bind time, never mid-stream
//! - Depth-first field order is the one canonical atom order
//! - Array sizes live in the data, bound to named count scalars
//! - Compiled bindings are immutable and shared
//!
//! # Invariants Enforced
//!
//! - Sibling names unique within every composite
//! - Composites non-empty, vector coordinates scalar-only
//! - Size references resolve to a count preceding the array
//! - Array elements have a fixed atom width
//! - Choice alternatives capped at one discriminant byte

mod binding;
mod component;
mod errors;

pub use binding::{Binding, MAX_CHOICE_ALTERNATIVES};
pub use component::{ArraySizing, Component, Field, ScalarDef, ScalarKind};
pub use errors::{SchemaError, SchemaErrorCode, SchemaResult, Severity};

pub(crate) use binding::{ArrayInfo, BoundField, Handler, Sizing};
