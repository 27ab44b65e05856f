mod files;
mod folder;

pub use builder::Builder;

use gitmc_nbt::{Compound, Document, List, Tag, Value};

/// A small but realistic chunk document for round-trip tests.
pub fn chunk_doc(cx: i32, cz: i32) -> Document {
    let mut sections = List::new(Tag::Compound);
    for y in -4i8..0 {
        let mut section = Compound::new();
        section.insert("Y".to_string(), Value::Byte(y));
        section.insert(
            "block_states".to_string(),
            Value::LongArray((0..64).map(|n| n as i64 * 7 + cx as i64).collect()),
        );
        sections.push(Value::Compound(section)).unwrap();
    }

    let mut root = Compound::new();
    root.insert("DataVersion".to_string(), Value::Int(3465));
    root.insert("xPos".to_string(), Value::Int(cx));
    root.insert("zPos".to_string(), Value::Int(cz));
    root.insert("yPos".to_string(), Value::Int(-4));
    root.insert("LastUpdate".to_string(), Value::Long(998877));
    root.insert(
        "Status".to_string(),
        Value::String("minecraft:full".to_string()),
    );
    root.insert("sections".to_string(), Value::List(sections));
    Document::new("", Value::Compound(root))
}

/// Incompressible-ish payload to force a chunk over the inline limit.
pub fn noise(len: usize) -> Vec<i8> {
    let mut state = 0x2545F4914F6CDD1Du64;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (state >> 33) as u8 as i8
        })
        .collect()
}
