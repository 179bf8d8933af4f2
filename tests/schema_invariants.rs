//! Schema Invariant Tests
//!
//! Tests for the schema contract per DATAMODEL.md:
//! - Component trees travel as JSON documents: a schema parsed from a
//!   document drives the codecs exactly like one built in code
//! - Compilation is deterministic and all structural violations surface
//!   at compile time, never mid-stream
//! - A compiled binding is immutable and serves concurrent streams
//!
//! The schema document format is the inbound collaborator contract: a
//! protocol-binding layer supplies the tree, tern never parses envelopes.

use std::sync::Arc;
use std::thread;

use serde_json::json;
use tern::block::DataBlock;
use tern::codec::{Encoding, StreamMode, TextFraming};
use tern::schema::{Binding, Component, SchemaErrorCode};
use tern::stream::{BlockReader, BlockWriter};

// =============================================================================
// Test Utilities
// =============================================================================

fn burst_schema() -> Component {
    Component::record(vec![
        ("t0", Component::time()),
        ("size", Component::count_with_id("sample-count")),
        (
            "samples",
            Component::array_linked(
                "sample-count",
                Component::vector(vec![
                    ("c1", Component::quantity_in("m/s")),
                    ("c2", Component::quantity_in("m/s")),
                ]),
            ),
        ),
    ])
}

// =============================================================================
// Schema Documents
// =============================================================================

/// A component tree serializes to a stable tagged document and parses
/// back to an equal tree.
#[test]
fn test_schema_document_roundtrip() {
    let schema = burst_schema();
    let doc = serde_json::to_value(&schema).unwrap();
    assert_eq!(
        doc,
        json!({
            "type": "record",
            "fields": [
                {"name": "t0", "type": "scalar", "kind": "time"},
                {"name": "size", "type": "scalar", "kind": "count", "id": "sample-count"},
                {"name": "samples", "type": "array",
                 "sizing": {"linked": "sample-count"},
                 "element": {"type": "vector", "coordinates": [
                     {"name": "c1", "type": "scalar", "kind": "quantity", "unit": "m/s"},
                     {"name": "c2", "type": "scalar", "kind": "quantity", "unit": "m/s"}
                 ]}}
            ]
        })
    );

    let parsed: Component = serde_json::from_value(doc).unwrap();
    assert_eq!(parsed, schema);
}

/// A schema parsed from a hand-written document compiles and carries
/// records end to end.
#[test]
fn test_document_supplied_schema_drives_codecs() {
    let doc = r#"{
        "type": "record",
        "fields": [
            {"name": "station", "type": "scalar", "kind": "text"},
            {"name": "status", "type": "scalar", "kind": "category",
             "enumeration": ["ok", "degraded", "down"]},
            {"name": "pressure", "type": "scalar", "kind": "quantity", "unit": "dbar"}
        ]
    }"#;
    let schema: Component = serde_json::from_str(doc).unwrap();
    let binding = Arc::new(Binding::compile(&schema).unwrap());

    let mut block = DataBlock::new(Arc::clone(&binding));
    block.set_text("station", "argo-7").unwrap();
    block.set_text("status", "ok").unwrap();
    block.set_double("pressure", 1013.25).unwrap();

    let mut writer = BlockWriter::new(
        Vec::new(),
        Arc::clone(&binding),
        Encoding::Json,
        StreamMode::Single,
    )
    .unwrap();
    writer.start_stream().unwrap();
    writer.write(&block).unwrap();
    writer.end_stream().unwrap();
    let bytes = writer.into_inner();
    assert_eq!(
        String::from_utf8(bytes.clone()).unwrap(),
        r#"{"station":"argo-7","status":"ok","pressure":1013.25}"#
    );

    let mut reader = BlockReader::new(
        &bytes[..],
        Arc::clone(&binding),
        Encoding::Json,
        StreamMode::Single,
    )
    .unwrap();
    assert_eq!(reader.read_next().unwrap().unwrap(), block);
}

/// A structurally broken document is caught when the tree is compiled,
/// with the code and path of the violation.
#[test]
fn test_document_violations_surface_at_compile_time() {
    let doc = r#"{
        "type": "record",
        "fields": [
            {"name": "items", "type": "array",
             "sizing": {"linked": "n"},
             "element": {"type": "scalar", "kind": "quantity"}},
            {"name": "n", "type": "scalar", "kind": "count", "id": "n"}
        ]
    }"#;
    let schema: Component = serde_json::from_str(doc).unwrap();
    let err = Binding::compile(&schema).unwrap_err();
    assert_eq!(err.code(), SchemaErrorCode::MisorderedSizeRef);
    assert_eq!(err.path(), Some("items"));
}

/// Encoding descriptors parse from configuration documents, separator
/// defaults included.
#[test]
fn test_encoding_descriptor_documents() {
    let encoding: Encoding =
        serde_json::from_str(r#"{"format":"binary"}"#).unwrap();
    assert_eq!(encoding, Encoding::Binary);

    let encoding: Encoding = serde_json::from_str(
        r#"{"format":"text","token_separator":"|","block_separator":";"}"#,
    )
    .unwrap();
    assert_eq!(
        encoding,
        Encoding::Text(TextFraming {
            token_separator: "|".to_string(),
            block_separator: ";".to_string(),
        })
    );

    // Omitted separators fall back to the defaults.
    let encoding: Encoding = serde_json::from_str(r#"{"format":"text"}"#).unwrap();
    assert_eq!(encoding, Encoding::text());

    let mode: StreamMode = serde_json::from_str(r#""multi""#).unwrap();
    assert_eq!(mode, StreamMode::Multi);
}

// =============================================================================
// Compilation Determinism
// =============================================================================

/// The same tree compiles to the same layout every time.
#[test]
fn test_compilation_is_deterministic() {
    let schema = burst_schema();
    for _ in 0..50 {
        let binding = Binding::compile(&schema).unwrap();
        assert_eq!(binding.array_count(), 1);
        assert_eq!(binding.choice_count(), 0);
        assert_eq!(binding.array_index("samples"), Some(0));
        assert_eq!(binding.array_path(0), Some("samples"));
    }
}

/// An invalid tree fails the same way every time.
#[test]
fn test_compile_failure_is_deterministic() {
    let schema = Component::record(vec![
        ("x", Component::count()),
        ("x", Component::text()),
    ]);
    for _ in 0..50 {
        let err = Binding::compile(&schema).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::DuplicateName);
    }
}

// =============================================================================
// Shared Bindings
// =============================================================================

/// One compiled binding serves many concurrent streams, each with its own
/// block, with no rebuild per stream.
#[test]
fn test_binding_shared_across_concurrent_streams() {
    let binding = Arc::new(Binding::compile(&burst_schema()).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let binding = Arc::clone(&binding);
            thread::spawn(move || {
                for round in 0..25 {
                    let len = (worker + round) % 4;
                    let mut block = DataBlock::new(Arc::clone(&binding));
                    block.set_int("t0", 1_700_000_000_000 + round as i64).unwrap();
                    block.resize_array_at("samples", len).unwrap();
                    for i in 0..len {
                        block
                            .set_double(&format!("samples[{}].c1", i), i as f64)
                            .unwrap();
                        block
                            .set_double(&format!("samples[{}].c2", i), worker as f64)
                            .unwrap();
                    }

                    let mut writer = BlockWriter::new(
                        Vec::new(),
                        Arc::clone(&binding),
                        Encoding::Binary,
                        StreamMode::Single,
                    )
                    .unwrap();
                    writer.start_stream().unwrap();
                    writer.write(&block).unwrap();
                    writer.end_stream().unwrap();
                    let bytes = writer.into_inner();

                    let mut reader = BlockReader::new(
                        &bytes[..],
                        Arc::clone(&binding),
                        Encoding::Binary,
                        StreamMode::Single,
                    )
                    .unwrap();
                    let decoded = reader.read_next().unwrap().unwrap();
                    assert_eq!(decoded, block);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}
