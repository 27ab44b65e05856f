//! Binary NBT codec for *Minecraft: Java Edition* world data.
//!
//! NBT is a named, typed tree. This crate parses the big-endian binary form
//! into a [`Value`] tree that preserves everything needed to write the exact
//! same bytes back out: compound member order, the element kind of empty
//! lists, and the root compound's name. Compression (gzip, zlib, LZ4 or
//! none) is sniffed on read and caller-chosen on write.

mod compression;
mod de;
mod error;
mod ser;
mod value;

pub use compression::*;
pub use de::*;
pub use error::{Error, Result};
pub use ser::*;
pub use value::*;

use num_enum::TryFromPrimitive;

#[cfg(test)]
mod test;

/// The NBT tag byte that introduces every value on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum Tag {
    End = 0,
    Byte = 1,
    Short = 2,
    Int = 3,
    Long = 4,
    Float = 5,
    Double = 6,
    ByteArray = 7,
    String = 8,
    List = 9,
    Compound = 10,
    IntArray = 11,
    LongArray = 12,
}

impl Tag {
    /// The tag's conventional name, eg `TAG_Byte_Array` is "ByteArray".
    pub fn name(self) -> &'static str {
        match self {
            Tag::End => "End",
            Tag::Byte => "Byte",
            Tag::Short => "Short",
            Tag::Int => "Int",
            Tag::Long => "Long",
            Tag::Float => "Float",
            Tag::Double => "Double",
            Tag::ByteArray => "ByteArray",
            Tag::String => "String",
            Tag::List => "List",
            Tag::Compound => "Compound",
            Tag::IntArray => "IntArray",
            Tag::LongArray => "LongArray",
        }
    }
}
