use std::convert::TryFrom;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use lz4_java_wrc::{Lz4BlockInput, Lz4BlockOutput};
use num_enum::TryFromPrimitive;

use crate::error::{Error, Result};
use crate::{de, ser, Document};

/// Compression schemes NBT data is stored with. The discriminants are the
/// Anvil chunk compression tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum Compression {
    Gzip = 1,
    Zlib = 2,
    None = 3,
    Lz4 = 4,
}

impl Compression {
    /// Identify the compression of a buffer from its leading byte.
    ///
    /// Gzip streams open with `0x1F`, zlib with `0x78`, an uncompressed
    /// root with the compound tag `0x0A` (or, in malformed files, a list
    /// tag `0x08`, which the parser then rejects as a non-compound root),
    /// and Minecraft's LZ4 block format with its `LZ4Block` magic
    /// (`0x4C`).
    pub fn sniff(data: &[u8]) -> Result<Compression> {
        match data.first() {
            Some(0x1F) => Ok(Compression::Gzip),
            Some(0x78) => Ok(Compression::Zlib),
            Some(0x0A) | Some(0x08) => Ok(Compression::None),
            Some(0x4C) => Ok(Compression::Lz4),
            Some(b) => Err(Error::UnknownLeadingByte(*b)),
            None => Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "empty nbt buffer",
            ))),
        }
    }

    /// Map an Anvil compression tag (with the external-file bit already
    /// masked off) to a scheme. Tag 127 is the "custom" escape which no
    /// vanilla world uses; it is rejected here.
    pub fn from_anvil_tag(tag: u8) -> Result<Compression> {
        Compression::try_from(tag).map_err(|_| Error::UnknownCompression(tag))
    }

    pub fn decompress(self, data: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        match self {
            Compression::Gzip => GzDecoder::new(data).read_to_end(&mut out)?,
            Compression::Zlib => ZlibDecoder::new(data).read_to_end(&mut out)?,
            Compression::None => {
                out.extend_from_slice(data);
                data.len()
            }
            Compression::Lz4 => Lz4BlockInput::new(data).read_to_end(&mut out)?,
        };
        Ok(out)
    }

    pub fn compress(self, data: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        match self {
            Compression::Gzip => {
                let mut enc = GzEncoder::new(&mut out, flate2::Compression::default());
                enc.write_all(data)?;
                enc.finish()?;
            }
            Compression::Zlib => {
                let mut enc = ZlibEncoder::new(&mut out, flate2::Compression::default());
                enc.write_all(data)?;
                enc.finish()?;
            }
            Compression::None => out.extend_from_slice(data),
            Compression::Lz4 => {
                let mut enc = Lz4BlockOutput::new(&mut out);
                enc.write_all(data)?;
                enc.flush()?;
            }
        }
        Ok(out)
    }
}

/// Parse NBT from a buffer whose compression is sniffed from its first byte.
pub fn from_compressed_bytes(data: &[u8]) -> Result<Document> {
    let compression = Compression::sniff(data)?;
    let plain = compression.decompress(data)?;
    de::from_bytes(&plain)
}

/// Serialize a document and compress it with the given scheme.
pub fn to_compressed_bytes(doc: &Document, compression: Compression) -> Result<Vec<u8>> {
    let plain = ser::to_bytes(doc)?;
    compression.compress(&plain)
}

/// Read an NBT file such as `level.dat`, sniffing its compression.
pub fn read_nbt_file(path: &Path) -> Result<Document> {
    let mut data = Vec::new();
    File::open(path)?.read_to_end(&mut data)?;
    from_compressed_bytes(&data)
}

/// Write an NBT file. Data files like `level.dat` are conventionally gzip.
pub fn write_nbt_file(path: &Path, doc: &Document, compression: Compression) -> Result<()> {
    let data = to_compressed_bytes(doc, compression)?;
    let mut file = File::create(path)?;
    file.write_all(&data)?;
    Ok(())
}
