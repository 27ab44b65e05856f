use gitmc_nbt::{Compound, List, Tag, Value};

use crate::normalize_empty_lists;

#[test]
fn unknown_empty_list_becomes_compound() {
    let mut v = Value::List(List::unknown());
    normalize_empty_lists(&mut v);
    assert_eq!(v.as_list().unwrap().element(), Tag::Compound);
}

#[test]
fn concrete_empty_list_is_untouched() {
    let mut v = Value::List(List::new(Tag::Int));
    normalize_empty_lists(&mut v);
    assert_eq!(v.as_list().unwrap().element(), Tag::Int);
}

#[test]
fn normalization_recurses_into_compounds_and_lists() {
    let mut inner = Compound::new();
    inner.insert("xs".to_string(), Value::List(List::unknown()));

    let mut outer_list = List::new(Tag::Compound);
    outer_list.push(Value::Compound(inner)).unwrap();

    let mut root = Compound::new();
    root.insert("list".to_string(), Value::List(outer_list));
    let mut v = Value::Compound(root);

    normalize_empty_lists(&mut v);

    let list = v.as_compound().unwrap()["list"].as_list().unwrap();
    let member = list.items()[0].as_compound().unwrap();
    assert_eq!(member["xs"].as_list().unwrap().element(), Tag::Compound);
}

#[test]
fn normalization_is_idempotent() {
    let mut root = Compound::new();
    root.insert("xs".to_string(), Value::List(List::unknown()));
    let mut v = Value::Compound(root);

    normalize_empty_lists(&mut v);
    let once = v.clone();
    normalize_empty_lists(&mut v);
    assert_eq!(v, once);
}
