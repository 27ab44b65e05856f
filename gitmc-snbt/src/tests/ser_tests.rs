use gitmc_nbt::{Compound, List, Tag, Value};

use crate::{to_string, QuoteStyle, SnbtOptions};

fn compound(entries: Vec<(&str, Value)>) -> Value {
    let mut c = Compound::new();
    for (k, v) in entries {
        c.insert(k.to_string(), v);
    }
    Value::Compound(c)
}

#[test]
fn compact_scalars() {
    let v = compound(vec![
        ("b", Value::Byte(1)),
        ("s", Value::Short(-2)),
        ("i", Value::Int(3)),
        ("l", Value::Long(-4)),
        ("f", Value::Float(1.5)),
        ("d", Value::Double(2.5)),
    ]);
    assert_eq!(
        to_string(&v, &SnbtOptions::compact()),
        "{b:1b,s:-2s,i:3,l:-4L,f:1.5f,d:2.5d}"
    );
}

#[test]
fn compact_is_whitespace_free() {
    let v = compound(vec![
        ("xs", Value::IntArray(vec![1, 2, 3])),
        ("inner", compound(vec![("k", Value::String("v".into()))])),
    ]);
    let text = to_string(&v, &SnbtOptions::compact());
    assert_eq!(text, "{xs:[I;1,2,3],inner:{k:\"v\"}}");
}

#[test]
fn expanded_indents_nested_structures() {
    let v = compound(vec![(
        "inner",
        compound(vec![("count", Value::Int(3))]),
    )]);
    let text = to_string(&v, &SnbtOptions::expanded());
    assert_eq!(text, "{\n    inner: {\n        count: 3\n    }\n}");
}

#[test]
fn expanded_list_one_element_per_line() {
    let mut list = List::new(Tag::Int);
    list.push(Value::Int(1)).unwrap();
    list.push(Value::Int(2)).unwrap();
    let v = compound(vec![("xs", Value::List(list))]);
    let text = to_string(&v, &SnbtOptions::expanded());
    assert_eq!(text, "{\n    xs: [\n        1,\n        2\n    ]\n}");
}

#[test]
fn typed_arrays_stay_on_one_line() {
    let v = compound(vec![("ba", Value::ByteArray(vec![1, 2]))]);
    assert_eq!(
        to_string(&v, &SnbtOptions::expanded()),
        "{\n    ba: [B; 1b, 2b]\n}"
    );
    assert_eq!(to_string(&v, &SnbtOptions::compact()), "{ba:[B;1b,2b]}");
}

#[test]
fn long_array_elements_are_suffixed() {
    let v = Value::LongArray(vec![-9, 9]);
    assert_eq!(to_string(&v, &SnbtOptions::compact()), "[L;-9L,9L]");
}

#[test]
fn strings_are_escaped() {
    let v = Value::String("a\"b\\c\nd".into());
    assert_eq!(
        to_string(&v, &SnbtOptions::compact()),
        "\"a\\\"b\\\\c\\nd\""
    );
}

#[test]
fn non_bare_keys_are_quoted() {
    let v = compound(vec![
        ("plain.key", Value::Int(1)),
        ("needs quoting", Value::Int(2)),
    ]);
    assert_eq!(
        to_string(&v, &SnbtOptions::compact()),
        "{plain.key:1,\"needs quoting\":2}"
    );
}

#[test]
fn sort_keys_orders_members() {
    let v = compound(vec![
        ("zebra", Value::Int(1)),
        ("apple", Value::Int(2)),
    ]);
    let mut opts = SnbtOptions::compact();
    opts.sort_keys = true;
    assert_eq!(to_string(&v, &opts), "{apple:2,zebra:1}");
}

#[test]
fn empty_containers() {
    let v = compound(vec![
        ("c", Value::Compound(Compound::new())),
        ("l", Value::List(List::new(Tag::Compound))),
    ]);
    assert_eq!(to_string(&v, &SnbtOptions::compact()), "{c:{},l:[]}");
}

#[test]
fn single_quote_style() {
    let v = Value::String("it's".into());
    let mut opts = SnbtOptions::compact();
    opts.quote_style = QuoteStyle::Single;
    assert_eq!(to_string(&v, &opts), "'it\\'s'");
}

#[test]
fn suffixes_can_be_suppressed() {
    let v = compound(vec![("b", Value::Byte(1)), ("l", Value::Long(2))]);
    let mut opts = SnbtOptions::compact();
    opts.print_typed_suffixes = false;
    assert_eq!(to_string(&v, &opts), "{b:1,l:2}");
}

#[test]
fn serialization_is_deterministic() {
    let v = super::kitchen_sink();
    let a = to_string(&v, &SnbtOptions::expanded());
    let b = to_string(&v, &SnbtOptions::expanded());
    assert_eq!(a, b);
}
