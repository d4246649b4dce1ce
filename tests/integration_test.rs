//! Integration tests for transform-registry
//!
//! These tests exercise the registry the way a runtime does: a roster of
//! converters, implicit conversions resolved through the graph, and lookups
//! from many threads at once.

use std::io::{Cursor, Read};
use std::sync::Arc;
use std::thread;

use transform_registry::prelude::*;
use transform_registry::{
    same_converter, CompositeConverter, GraphTransformerResolver, TransformationGraph,
    TransformationGraphLookupStrategy,
};

// =============================================================================
// Test Converters
// =============================================================================

/// JSON text, kept distinct from plain strings so each stage is observable
#[derive(Debug, Clone, PartialEq)]
struct Json(String);

type ByteStream = Cursor<Vec<u8>>;

fn json_type() -> DataType {
    DataType::new("json").with_media_type(MediaType::JSON)
}

fn input_stream_to_string() -> Arc<dyn Converter> {
    Arc::new(
        FnConverter::builder("inputStreamToString")
            .from(DataType::INPUT_STREAM)
            .to(DataType::STRING)
            .build_typed(|mut stream: ByteStream, _| {
                let mut text = String::new();
                stream.read_to_string(&mut text).map(|_| text)
            }),
    )
}

fn string_to_json() -> Arc<dyn Converter> {
    Arc::new(
        FnConverter::builder("stringToJson")
            .from(DataType::STRING)
            .to(json_type())
            .build_typed(|s: String, _| Ok::<_, String>(Json(format!("{{\"value\":\"{s}\"}}")))),
    )
}

fn bytes_to_string() -> Arc<dyn Converter> {
    Arc::new(
        FnConverter::builder("bytesToString")
            .from(DataType::BYTES)
            .to(DataType::STRING)
            .weighting(2)
            .build_typed(|b: Vec<u8>, _| String::from_utf8(b)),
    )
}

fn registry_of(converters: &[Arc<dyn Converter>]) -> DefaultTransformersRegistry {
    let registry = converters
        .iter()
        .cloned()
        .map(Transformer::Converter)
        .fold(DefaultTransformersRegistry::builder(), RegistryBuilder::with)
        .build()
        .unwrap();
    registry.initialise().unwrap();
    registry
}

// =============================================================================
// Graph Tests
// =============================================================================

#[test]
fn test_lookup_builds_composite_from_input_stream_to_json() {
    let stream_to_string = input_stream_to_string();
    let to_json = string_to_json();

    let mut graph = TransformationGraph::new();
    graph.add_converter(&stream_to_string);
    graph.add_converter(&to_json);

    let found = TransformationGraphLookupStrategy::new(&graph)
        .lookup_converters(&DataType::INPUT_STREAM, &json_type());
    assert_eq!(found.len(), 1);

    let composite = found[0].downcast_ref::<CompositeConverter>().unwrap();
    assert_eq!(composite.chain().len(), 2);
    assert!(same_converter(&composite.chain()[0], &stream_to_string));
    assert!(same_converter(&composite.chain()[1], &to_json));
    assert_eq!(found[0].return_data_type(), json_type());
}

#[test]
fn test_graph_resolver_sees_registered_converters() {
    let resolver = GraphTransformerResolver::new();
    let converter = bytes_to_string();

    resolver.transformer_change(&converter, RegistryAction::Added);
    assert_eq!(resolver.graph().edge_count(), 1);

    resolver.transformer_change(&converter, RegistryAction::Removed);
    assert_eq!(resolver.graph().vertex_count(), 0);
}

// =============================================================================
// Registry Tests
// =============================================================================

#[test]
fn test_end_to_end_implicit_conversion() {
    let registry = registry_of(&[input_stream_to_string(), string_to_json()]);

    let transformer = registry
        .lookup_transformer(&DataType::INPUT_STREAM, &DataType::new("json"))
        .unwrap();

    let payload: Payload = Box::new(Cursor::new(b"hello".to_vec()));
    let out = transformer.transform(payload, None).unwrap();
    let json = out.downcast::<Json>().unwrap();
    assert_eq!(*json, Json("{\"value\":\"hello\"}".to_string()));
}

#[test]
fn test_result_media_type_does_not_narrow_lookup() {
    let registry = registry_of(&[bytes_to_string()]);

    let plain = registry
        .lookup_transformer(&DataType::BYTES, &DataType::STRING)
        .unwrap();
    let with_charset = registry
        .lookup_transformer(
            &DataType::BYTES,
            &DataType::STRING.with_media_type(MediaType::TEXT).with_charset("utf-8"),
        )
        .unwrap();
    assert!(plain.same_instance(&with_charset));
}

#[test]
fn test_bad_input_is_reported() {
    let registry = registry_of(&[bytes_to_string()]);
    let transformer = registry
        .lookup_transformer(&DataType::BYTES, &DataType::STRING)
        .unwrap();

    let err = transformer.transform(Box::new(17_u32), None).unwrap_err();
    assert!(matches!(err, TransformerError::UnsupportedPayload { .. }));

    let err = transformer.transform(Box::new(vec![0xff_u8, 0xfe]), None).unwrap_err();
    assert!(matches!(err, TransformerError::TransformFailed { .. }));
}

#[test]
fn test_roster_changes_are_visible_to_lookups() {
    let registry = registry_of(&[input_stream_to_string()]);
    assert!(matches!(
        registry.lookup_transformer(&DataType::INPUT_STREAM, &json_type()),
        Err(RegistryError::NoTransformerFound { .. })
    ));

    registry
        .register_transformer(Transformer::Converter(string_to_json()))
        .unwrap();
    let found = registry
        .lookup_transformer(&DataType::INPUT_STREAM, &json_type())
        .unwrap();
    assert_eq!(found.name(), "inputStreamToStringstringToJson");

    registry.unregister_transformer("stringToJson").unwrap();
    assert!(registry
        .lookup_transformer(&DataType::INPUT_STREAM, &json_type())
        .is_err());
    assert_eq!(registry.transformers().len(), 1);
}

#[test]
fn test_lookup_transformers_lists_direct_matches_only() {
    let registry = registry_of(&[input_stream_to_string(), string_to_json(), bytes_to_string()]);

    let direct: Vec<String> = registry
        .lookup_transformers(&DataType::BYTES, &DataType::STRING)
        .iter()
        .map(Transformer::name)
        .collect();
    assert_eq!(direct, vec!["bytesToString"]);

    assert!(registry
        .lookup_transformers(&DataType::INPUT_STREAM, &json_type())
        .is_empty());
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_lookups_agree_on_one_instance() {
    let registry = registry_of(&[input_stream_to_string(), string_to_json()]);

    let resolved: Vec<Transformer> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    registry
                        .lookup_transformer(&DataType::INPUT_STREAM, &json_type())
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let first = &resolved[0];
    assert!(resolved.iter().all(|t| t.same_instance(first)));
}

#[test]
fn test_lookups_during_registration() {
    let registry = registry_of(&[input_stream_to_string()]);

    thread::scope(|scope| {
        let readers: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(|| {
                    for _ in 0..200 {
                        let _ = registry.lookup_transformer(&DataType::INPUT_STREAM, &json_type());
                        let _ = registry.lookup_transformers(&DataType::STRING, &json_type());
                    }
                })
            })
            .collect();

        scope.spawn(|| {
            registry
                .register_transformer(Transformer::Converter(string_to_json()))
                .unwrap();
        });

        for reader in readers {
            reader.join().unwrap();
        }
    });

    assert!(registry
        .lookup_transformer(&DataType::INPUT_STREAM, &json_type())
        .is_ok());
    assert_eq!(
        registry
            .lookup_transformers(&DataType::STRING, &json_type())
            .len(),
        1
    );
}

// =============================================================================
// Stream Tests
// =============================================================================

#[tokio::test]
async fn test_registry_events() {
    use futures::StreamExt;

    let registry = registry_of(&[]);
    let mut events = registry.subscribe();

    registry
        .register_transformer(Transformer::Converter(bytes_to_string()))
        .unwrap();
    registry
        .register_transformer(Transformer::Simple(Arc::new(
            FnConverter::builder("audit").build_identity(),
        )))
        .unwrap();

    assert_eq!(
        events.next().await,
        Some(RegistryEvent::Registered {
            name: "bytesToString".to_string(),
            converter: true,
        })
    );
    assert_eq!(
        events.next().await,
        Some(RegistryEvent::Registered {
            name: "audit".to_string(),
            converter: false,
        })
    );

    registry.dispose();
    assert_eq!(events.next().await, Some(RegistryEvent::Disposed));
    assert_eq!(events.next().await, None);
}

// =============================================================================
// Error Tests
// =============================================================================

#[test]
fn test_registry_error_display() {
    let error = RegistryError::AlreadyRegistered("test".to_string());
    let msg = format!("{}", error);
    assert!(msg.contains("test"));
    assert!(msg.contains("already registered"));
}

#[test]
fn test_not_found_error_names_types() {
    let registry = registry_of(&[]);
    let err = registry
        .lookup_transformer(&DataType::BOOLEAN, &DataType::NUMBER)
        .unwrap_err();

    let msg = err.to_string();
    assert!(msg.contains("boolean"));
    assert!(msg.contains("number"));

    let rolled: Error = err.into();
    assert!(matches!(rolled, Error::Registry(_)));
}
