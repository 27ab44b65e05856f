use thiserror::Error;

use crate::Tag;

/// Convenience type for Result.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while reading or writing binary NBT.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid nbt tag value: {0}")]
    InvalidTag(u8),

    #[error("invalid nbt: root is not a compound")]
    NoRootCompound,

    #[error("invalid nbt string: not cesu-8")]
    NonUnicodeString,

    #[error("invalid nbt: {0} length {1} out of range")]
    InvalidLength(&'static str, i32),

    #[error("invalid nbt: list of unknown element kind has {0} elements")]
    ListOfEnd(i32),

    #[error("list of {expected} cannot hold {found}")]
    ListElementMismatch { expected: &'static str, found: &'static str },

    #[error("unknown compression tag: {0}")]
    UnknownCompression(u8),

    #[error("cannot sniff compression: unrecognised leading byte {0:#04x}")]
    UnknownLeadingByte(u8),
}

impl Error {
    pub(crate) fn list_mismatch(expected: Tag, found: Tag) -> Error {
        Error::ListElementMismatch {
            expected: expected.name(),
            found: found.name(),
        }
    }
}
