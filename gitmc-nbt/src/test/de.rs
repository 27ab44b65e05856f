use super::Builder;
use crate::{from_bytes, Error, List, Tag, Value};

#[test]
fn simple_compound() {
    let data = Builder::new()
        .start_compound("object")
        .int("count", 42)
        .string("name", "hello")
        .end_compound()
        .build();

    let doc = from_bytes(&data).unwrap();
    assert_eq!(doc.name, "object");
    let c = doc.compound();
    assert_eq!(c["count"], Value::Int(42));
    assert_eq!(c["name"], Value::String("hello".to_string()));
}

#[test]
fn empty_root_name_is_legal() {
    let data = Builder::new().start_compound("").end_compound().build();
    let doc = from_bytes(&data).unwrap();
    assert_eq!(doc.name, "");
    assert!(doc.compound().is_empty());
}

#[test]
fn every_scalar_kind() {
    let data = Builder::new()
        .start_compound("")
        .byte("b", -1)
        .short("s", -2)
        .int("i", -3)
        .long("l", -4)
        .float("f", 1.5)
        .double("d", 2.5)
        .end_compound()
        .build();

    let doc = from_bytes(&data).unwrap();
    let c = doc.compound();
    assert_eq!(c["b"], Value::Byte(-1));
    assert_eq!(c["s"], Value::Short(-2));
    assert_eq!(c["i"], Value::Int(-3));
    assert_eq!(c["l"], Value::Long(-4));
    assert_eq!(c["f"], Value::Float(1.5));
    assert_eq!(c["d"], Value::Double(2.5));
}

#[test]
fn typed_arrays() {
    let data = Builder::new()
        .start_compound("")
        .byte_array("ba", &[1, 2, -3])
        .int_array("ia", &[1 << 20, -5])
        .long_array("la", &[i64::MAX, i64::MIN])
        .end_compound()
        .build();

    let doc = from_bytes(&data).unwrap();
    let c = doc.compound();
    assert_eq!(c["ba"], Value::ByteArray(vec![1, 2, -3]));
    assert_eq!(c["ia"], Value::IntArray(vec![1 << 20, -5]));
    assert_eq!(c["la"], Value::LongArray(vec![i64::MAX, i64::MIN]));
}

#[test]
fn nested_compounds_preserve_order() {
    let data = Builder::new()
        .start_compound("")
        .start_compound("inner")
        .int("z", 1)
        .int("a", 2)
        .int("m", 3)
        .end_compound()
        .end_compound()
        .build();

    let doc = from_bytes(&data).unwrap();
    let inner = doc.compound()["inner"].as_compound().unwrap();
    let keys: Vec<&str> = inner.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["z", "a", "m"]);
}

#[test]
fn list_of_ints() {
    let data = Builder::new()
        .start_compound("")
        .start_list("xs", Tag::Int, 3)
        .int_payload(7)
        .int_payload(8)
        .int_payload(9)
        .end_compound()
        .build();

    let doc = from_bytes(&data).unwrap();
    let list = doc.compound()["xs"].as_list().unwrap();
    assert_eq!(list.element(), Tag::Int);
    assert_eq!(
        list.items(),
        &[Value::Int(7), Value::Int(8), Value::Int(9)]
    );
}

#[test]
fn empty_list_of_end_kind_is_unknown() {
    let data = Builder::new()
        .start_compound("")
        .start_list("xs", Tag::End, 0)
        .end_compound()
        .build();

    let doc = from_bytes(&data).unwrap();
    let list = doc.compound()["xs"].as_list().unwrap();
    assert_eq!(list.element(), Tag::End);
    assert!(list.is_empty());
}

#[test]
fn negative_list_length_reads_as_empty() {
    let data = Builder::new()
        .start_compound("")
        .start_list("xs", Tag::End, -1)
        .end_compound()
        .build();

    let doc = from_bytes(&data).unwrap();
    assert!(doc.compound()["xs"].as_list().unwrap().is_empty());
}

#[test]
fn nonempty_list_of_end_kind_fails() {
    let data = Builder::new()
        .start_compound("")
        .start_list("xs", Tag::End, 3)
        .end_compound()
        .build();

    assert!(matches!(from_bytes(&data), Err(Error::ListOfEnd(3))));
}

#[test]
fn root_must_be_compound() {
    let data = Builder::new().int("n", 1).build();
    assert!(matches!(from_bytes(&data), Err(Error::NoRootCompound)));
}

#[test]
fn invalid_tag_byte() {
    let data = Builder::new()
        .start_compound("")
        .raw_bytes(&[99])
        .build();
    assert!(matches!(from_bytes(&data), Err(Error::InvalidTag(99))));
}

#[test]
fn truncated_payload_is_io_error() {
    let mut data = Builder::new()
        .start_compound("")
        .long("l", 12345)
        .end_compound()
        .build();
    data.truncate(data.len() - 5);
    assert!(matches!(from_bytes(&data), Err(Error::Io(_))));
}

#[test]
fn negative_array_length_fails() {
    let data = Builder::new()
        .start_compound("")
        .tag(Tag::IntArray)
        .name("xs")
        .int_payload(-2)
        .end_compound()
        .build();
    assert!(matches!(
        from_bytes(&data),
        Err(Error::InvalidLength("int array", -2))
    ));
}

#[test]
fn unicode_name_and_string() {
    let data = Builder::new()
        .start_compound("döc")
        .string("name", "日本語")
        .end_compound()
        .build();

    let doc = from_bytes(&data).unwrap();
    assert_eq!(doc.name, "döc");
    assert_eq!(doc.compound()["name"], Value::String("日本語".to_string()));
}

#[test]
fn list_push_fixes_unknown_kind() {
    let mut list = List::unknown();
    list.push(Value::Int(1)).unwrap();
    assert_eq!(list.element(), Tag::Int);
    assert!(list.push(Value::Byte(1)).is_err());
}
