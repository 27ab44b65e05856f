use super::Builder;
use crate::{from_bytes, to_bytes, Compound, Document, List, Tag, Value};

fn chunk_like_document() -> Document {
    let mut sections = List::new(Tag::Compound);
    for y in -4i8..4 {
        let mut section = Compound::new();
        section.insert("Y".to_string(), Value::Byte(y));
        section.insert(
            "data".to_string(),
            Value::LongArray((0..16).map(|n| n * 31).collect()),
        );
        sections.push(Value::Compound(section)).unwrap();
    }

    let mut root = Compound::new();
    root.insert("DataVersion".to_string(), Value::Int(3465));
    root.insert("xPos".to_string(), Value::Int(-1));
    root.insert("zPos".to_string(), Value::Int(-1));
    root.insert("LastUpdate".to_string(), Value::Long(123456789));
    root.insert("Status".to_string(), Value::String("minecraft:full".into()));
    root.insert("sections".to_string(), Value::List(sections));
    root.insert(
        "empty".to_string(),
        Value::List(List::unknown()),
    );
    Document::new("", Value::Compound(root))
}

#[test]
fn writer_matches_builder_bytes() {
    let mut c = Compound::new();
    c.insert("count".to_string(), Value::Int(42));
    c.insert("name".to_string(), Value::String("hello".into()));
    let doc = Document::new("object", Value::Compound(c));

    let expected = Builder::new()
        .start_compound("object")
        .int("count", 42)
        .string("name", "hello")
        .end_compound()
        .build();

    assert_eq!(to_bytes(&doc).unwrap(), expected);
}

#[test]
fn round_trip_preserves_tree() {
    let doc = chunk_like_document();
    let bytes = to_bytes(&doc).unwrap();
    let parsed = from_bytes(&bytes).unwrap();
    assert_eq!(parsed, doc);
}

#[test]
fn round_trip_is_byte_stable() {
    let doc = chunk_like_document();
    let bytes = to_bytes(&doc).unwrap();
    let again = to_bytes(&from_bytes(&bytes).unwrap()).unwrap();
    assert_eq!(bytes, again);
}

#[test]
fn unknown_empty_list_keeps_end_kind_on_wire() {
    let mut c = Compound::new();
    c.insert("xs".to_string(), Value::List(List::unknown()));
    let doc = Document::new("", Value::Compound(c));

    let expected = Builder::new()
        .start_compound("")
        .start_list("xs", Tag::End, 0)
        .end_compound()
        .build();

    assert_eq!(to_bytes(&doc).unwrap(), expected);
}

#[test]
fn non_compound_root_is_rejected() {
    let doc = Document {
        name: String::new(),
        root: Value::Int(5),
    };
    assert!(to_bytes(&doc).is_err());
}
