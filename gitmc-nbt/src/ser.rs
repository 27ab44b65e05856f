use std::io::Write;

use byteorder::{BigEndian, WriteBytesExt};

use crate::error::{Error, Result};
use crate::{Document, Tag, Value};

/// Serialize a document as uncompressed big-endian NBT.
pub fn to_writer<W: Write>(mut writer: W, doc: &Document) -> Result<()> {
    if doc.root.tag() != Tag::Compound {
        return Err(Error::NoRootCompound);
    }
    writer.write_u8(Tag::Compound as u8)?;
    write_string(&mut writer, &doc.name)?;
    write_payload(&mut writer, &doc.root)
}

/// Serialize a document to uncompressed bytes.
pub fn to_bytes(doc: &Document) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    to_writer(&mut out, doc)?;
    Ok(out)
}

fn write_string<W: Write>(writer: &mut W, s: &str) -> Result<()> {
    let encoded = cesu8::to_java_cesu8(s);
    writer.write_u16::<BigEndian>(encoded.len() as u16)?;
    writer.write_all(&encoded)?;
    Ok(())
}

fn write_payload<W: Write>(writer: &mut W, value: &Value) -> Result<()> {
    match value {
        Value::Byte(n) => writer.write_i8(*n)?,
        Value::Short(n) => writer.write_i16::<BigEndian>(*n)?,
        Value::Int(n) => writer.write_i32::<BigEndian>(*n)?,
        Value::Long(n) => writer.write_i64::<BigEndian>(*n)?,
        Value::Float(n) => writer.write_f32::<BigEndian>(*n)?,
        Value::Double(n) => writer.write_f64::<BigEndian>(*n)?,
        Value::String(s) => write_string(writer, s)?,
        Value::ByteArray(items) => {
            writer.write_i32::<BigEndian>(items.len() as i32)?;
            for b in items {
                writer.write_i8(*b)?;
            }
        }
        Value::IntArray(items) => {
            writer.write_i32::<BigEndian>(items.len() as i32)?;
            for n in items {
                writer.write_i32::<BigEndian>(*n)?;
            }
        }
        Value::LongArray(items) => {
            writer.write_i32::<BigEndian>(items.len() as i32)?;
            for n in items {
                writer.write_i64::<BigEndian>(*n)?;
            }
        }
        Value::List(list) => {
            writer.write_u8(list.element() as u8)?;
            writer.write_i32::<BigEndian>(list.len() as i32)?;
            for item in list {
                write_payload(writer, item)?;
            }
        }
        Value::Compound(compound) => {
            for (name, value) in compound {
                writer.write_u8(value.tag() as u8)?;
                write_string(writer, name)?;
                write_payload(writer, value)?;
            }
            writer.write_u8(Tag::End as u8)?;
        }
    }
    Ok(())
}
