use flatgraph::*;
use std::rc::Rc;
use std::sync::Arc;

mod harness {
    pub mod graph;
}
use harness::graph::{Circle, Lossy, Node, Point};

#[test]
fn int_read_as_string_is_type_mismatch() {
    let mut writer = FlatWriter::new();
    writer.add_value(&String::from("first")).unwrap();
    writer.add_value(&17i32).unwrap();

    let mut reader = FlatReader::new(writer.into_payload());
    reader.get_value::<String>().unwrap();
    match reader.get_value::<String>() {
        Err(Error::TypeMismatch {
            stream,
            position,
            expected,
            actual,
        }) => {
            assert_eq!(stream, StreamKind::Any);
            assert_eq!(position, 1);
            assert_eq!(expected, "String");
            assert_eq!(actual, "i32");
        }
        other => panic!("expected TypeMismatch, got {other:?}"),
    }
}

#[test]
fn exhausted_stream_is_named() {
    let mut writer = FlatWriter::new();
    writer.add_int(1);
    let mut reader = FlatReader::new(writer.into_payload());
    reader.get_int().unwrap();

    let err = reader.get_int().unwrap_err();
    assert!(matches!(
        err,
        Error::StreamExhausted {
            stream: StreamKind::Int
        }
    ));
    assert!(err.to_string().contains("intValues"));

    assert!(matches!(
        reader.get_bool(),
        Err(Error::StreamExhausted {
            stream: StreamKind::Bool
        })
    ));
}

#[test]
fn reading_fewer_fields_fails_completeness() {
    let payload = flatten_root(&Lossy {
        kept: 1,
        dropped: 2,
    })
    .unwrap();
    match unflatten_root::<Lossy>(payload) {
        Err(Error::IncompleteConsumption { stream, remaining }) => {
            assert_eq!(stream, StreamKind::Int);
            assert_eq!(remaining, 1);
        }
        other => panic!("expected IncompleteConsumption, got {other:?}"),
    }
}

#[test]
fn self_reference_is_unsupported_cycle() {
    let node = Node::new("loop", None);
    *node.link.borrow_mut() = Some(Rc::clone(&node));

    // Writing terminates: the second visit only emits the handle.
    let mut writer = FlatWriter::new();
    writer.add_handle(Some(&node)).unwrap();
    let payload = writer.into_payload();
    node.link.borrow_mut().take();

    let mut reader = FlatReader::new(payload);
    match reader.get_value_for_handle::<Node>() {
        Err(Error::UnsupportedCycle { handle }) => assert_eq!(handle, 0),
        Err(other) => panic!("expected UnsupportedCycle, got {other:?}"),
        Ok(_) => panic!("cyclic graph must not reconstruct"),
    }
}

#[test]
fn transitive_cycle_is_unsupported() {
    let a = Node::new("a", None);
    let b = Node::new("b", Some(Rc::clone(&a)));
    *a.link.borrow_mut() = Some(Rc::clone(&b));

    let payload = flatten_root(&vec![Rc::clone(&a)]).unwrap();
    a.link.borrow_mut().take();

    match unflatten_root::<Vec<Rc<Node>>>(payload) {
        Err(Error::UnsupportedCycle { handle }) => assert_eq!(handle, 0),
        Err(other) => panic!("expected UnsupportedCycle, got {other:?}"),
        Ok(_) => panic!("cyclic graph must not reconstruct"),
    }
}

#[test]
fn forward_and_negative_handles_are_invalid() {
    for bad in [1, 5, -2] {
        let payload = Payload::new(vec![], vec![bad], vec![]);
        let mut reader = FlatReader::new(payload);
        match reader.get_value_for_handle::<Point>() {
            Err(Error::InvalidHandle { handle, table_len }) => {
                assert_eq!(handle, bad);
                assert_eq!(table_len, 0);
            }
            other => panic!("expected InvalidHandle for {bad}, got {other:?}"),
        }
    }
}

#[test]
fn unknown_type_identifier_is_unsupported() {
    let payload = flatten_root(&Circle { radius: 1.0 }).unwrap();
    let options = ReaderOptions::new().with_registry(Arc::new(TypeRegistry::new()));
    let mut reader = FlatReader::with_options(payload, options);
    match reader.get_dyn_flattenable() {
        Err(Error::UnsupportedType { type_name, .. }) => assert_eq!(type_name, "graph::Circle"),
        Err(other) => panic!("expected UnsupportedType, got {other:?}"),
        Ok(_) => panic!("unregistered type must not reconstruct"),
    }
}

#[test]
fn tag_without_factory_is_unsupported() {
    let registry = Arc::new(TypeRegistry::new());
    registry.register_tag(Circle::TYPE_TAG);
    let payload = flatten_root(&Circle { radius: 1.0 }).unwrap();
    let options = ReaderOptions::new().with_registry(registry);
    let mut reader = FlatReader::with_options(payload, options);
    assert!(matches!(
        reader.get_dyn_flattenable(),
        Err(Error::UnsupportedType { .. })
    ));
}

#[test]
fn flattenable_read_as_other_type_is_mismatch() {
    let payload = flatten_root(&Circle { radius: 2.0 }).unwrap();
    let registry = Arc::new(TypeRegistry::new().with::<Circle>());
    let options = ReaderOptions::new().with_registry(registry);
    match unflatten_root_with::<Point>(payload, options) {
        Err(Error::TypeMismatch {
            stream,
            position,
            expected,
            actual,
        }) => {
            assert_eq!(stream, StreamKind::Int);
            assert_eq!(position, 0);
            assert_eq!(expected, "graph::Point");
            assert_eq!(actual, "graph::Circle");
        }
        other => panic!("expected TypeMismatch, got {other:?}"),
    }
}

#[test]
fn shared_value_mismatch_uses_short_type_names() {
    let shared = Rc::new(String::from("names"));
    let mut writer = FlatWriter::new();
    writer.add_handle(Some(&shared)).unwrap();
    writer.add_handle(Some(&shared)).unwrap();

    let mut reader = FlatReader::new(writer.into_payload());
    reader.get_value_for_handle::<String>().unwrap();
    match reader.get_value_for_handle::<Vec<String>>() {
        Err(Error::TypeMismatch {
            stream,
            position,
            expected,
            actual,
        }) => {
            assert_eq!(stream, StreamKind::Int);
            assert_eq!(position, 1);
            assert_eq!(expected, "Vec<String>");
            assert_eq!(actual, "String");
        }
        other => panic!("expected TypeMismatch, got {other:?}"),
    }
}

#[test]
fn collection_length_limit() {
    let payload = flatten_root(&vec![0u8; 16]).unwrap();
    let options = ReaderOptions::new().with_max_collection_len(8);
    assert!(matches!(
        unflatten_root_with::<Vec<u8>>(payload, options),
        Err(Error::InvalidLength {
            length: 16,
            limit: 8,
            ..
        })
    ));
}

#[test]
fn null_count_for_required_array() {
    let mut writer = FlatWriter::new();
    writer.add_null::<Vec<i64>>().unwrap();
    let mut reader = FlatReader::new(writer.into_payload());
    assert!(matches!(
        reader.get_array::<i64>(),
        Err(Error::UnexpectedNull {
            stream: StreamKind::Int,
            position: 0
        })
    ));
}
