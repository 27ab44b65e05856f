mod normalize_tests;
mod ser_tests;

use gitmc_nbt::{Compound, List, Tag, Value};

/// A tree touching every value kind, shared by the round-trip tests.
pub(crate) fn kitchen_sink() -> Value {
    let mut inner = Compound::new();
    inner.insert("name".to_string(), Value::String("minecraft:stone".into()));
    inner.insert("odd key".to_string(), Value::Byte(1));

    let mut list = List::new(Tag::Compound);
    list.push(Value::Compound(inner)).unwrap();

    let mut root = Compound::new();
    root.insert("byte".to_string(), Value::Byte(-5));
    root.insert("short".to_string(), Value::Short(300));
    root.insert("int".to_string(), Value::Int(-1234567));
    root.insert("long".to_string(), Value::Long(1 << 40));
    root.insert("float".to_string(), Value::Float(1.5));
    root.insert("double".to_string(), Value::Double(-0.25));
    root.insert("text".to_string(), Value::String("say \"hi\"\n".into()));
    root.insert("bytes".to_string(), Value::ByteArray(vec![1, -2, 3]));
    root.insert("ints".to_string(), Value::IntArray(vec![10, 20]));
    root.insert("longs".to_string(), Value::LongArray(vec![-1, 1 << 50]));
    root.insert("list".to_string(), Value::List(list));
    // "[]" carries no element kind, so only the unknown form is exactly
    // round-trippable; the concrete forms are covered by normalize tests.
    root.insert("empty".to_string(), Value::List(List::unknown()));
    Value::Compound(root)
}
