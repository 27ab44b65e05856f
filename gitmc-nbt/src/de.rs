use std::convert::TryFrom;
use std::io::Read;

use byteorder::{BigEndian, ReadBytesExt};

use crate::error::{Error, Result};
use crate::{Compound, List, Tag, Value};

/// A parsed document: the root compound plus the name it was stored under.
/// The name is almost always empty in practice, but it is part of the wire
/// form and must survive a round-trip.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub name: String,
    pub root: Value,
}

impl Document {
    pub fn new(name: impl Into<String>, root: Value) -> Document {
        Document {
            name: name.into(),
            root,
        }
    }

    pub fn compound(&self) -> &Compound {
        match &self.root {
            Value::Compound(c) => c,
            // Construction and parsing both guarantee a compound root.
            _ => unreachable!("document root is always a compound"),
        }
    }

    pub fn compound_mut(&mut self) -> &mut Compound {
        match &mut self.root {
            Value::Compound(c) => c,
            _ => unreachable!("document root is always a compound"),
        }
    }
}

/// Parse uncompressed NBT from a reader. The root must be a compound;
/// an empty root name is legal.
pub fn from_reader<R: Read>(mut reader: R) -> Result<Document> {
    let tag = read_tag(&mut reader)?;
    if tag != Tag::Compound {
        return Err(Error::NoRootCompound);
    }
    let name = read_string(&mut reader)?;
    let root = read_payload(&mut reader, Tag::Compound)?;
    Ok(Document { name, root })
}

/// Parse uncompressed NBT from a byte slice.
pub fn from_bytes(input: &[u8]) -> Result<Document> {
    from_reader(input)
}

fn read_tag<R: Read>(reader: &mut R) -> Result<Tag> {
    let byte = reader.read_u8()?;
    Tag::try_from(byte).map_err(|_| Error::InvalidTag(byte))
}

fn read_string<R: Read>(reader: &mut R) -> Result<String> {
    let len = reader.read_u16::<BigEndian>()? as usize;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    let s = cesu8::from_java_cesu8(&buf).map_err(|_| Error::NonUnicodeString)?;
    Ok(s.into_owned())
}

fn read_payload<R: Read>(reader: &mut R, tag: Tag) -> Result<Value> {
    Ok(match tag {
        Tag::End => return Err(Error::InvalidTag(Tag::End as u8)),
        Tag::Byte => Value::Byte(reader.read_i8()?),
        Tag::Short => Value::Short(reader.read_i16::<BigEndian>()?),
        Tag::Int => Value::Int(reader.read_i32::<BigEndian>()?),
        Tag::Long => Value::Long(reader.read_i64::<BigEndian>()?),
        Tag::Float => Value::Float(reader.read_f32::<BigEndian>()?),
        Tag::Double => Value::Double(reader.read_f64::<BigEndian>()?),
        Tag::String => Value::String(read_string(reader)?),
        Tag::ByteArray => {
            let len = read_array_len(reader, "byte array")?;
            let mut buf = vec![0u8; len];
            reader.read_exact(&mut buf)?;
            Value::ByteArray(buf.into_iter().map(|b| b as i8).collect())
        }
        Tag::IntArray => {
            let len = read_array_len(reader, "int array")?;
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(reader.read_i32::<BigEndian>()?);
            }
            Value::IntArray(items)
        }
        Tag::LongArray => {
            let len = read_array_len(reader, "long array")?;
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(reader.read_i64::<BigEndian>()?);
            }
            Value::LongArray(items)
        }
        Tag::List => {
            let element = read_tag(reader)?;
            let len = reader.read_i32::<BigEndian>()?;
            // Vanilla writes a negative length for some empty lists; treat
            // any non-positive length as empty.
            let len = len.max(0);
            if element == Tag::End && len > 0 {
                return Err(Error::ListOfEnd(len));
            }
            let mut list = List::new(element);
            for _ in 0..len {
                let value = read_payload(reader, element)?;
                list.push(value)?;
            }
            Value::List(list)
        }
        Tag::Compound => {
            let mut compound = Compound::new();
            loop {
                let tag = read_tag(reader)?;
                if tag == Tag::End {
                    break;
                }
                let name = read_string(reader)?;
                let value = read_payload(reader, tag)?;
                compound.insert(name, value);
            }
            Value::Compound(compound)
        }
    })
}

fn read_array_len<R: Read>(reader: &mut R, what: &'static str) -> Result<usize> {
    let len = reader.read_i32::<BigEndian>()?;
    if len < 0 {
        return Err(Error::InvalidLength(what, len));
    }
    Ok(len as usize)
}
