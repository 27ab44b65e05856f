//! For handling Minecraft's region format, Anvil, and the per-chunk SNBT
//! folder layout that makes regions diffable.
//!
//! A [`Region`] wraps a `Read + Seek` stream (usually a file) and decodes
//! the two 4 KiB header tables, per-chunk compression, and external `.mcc`
//! spillover files. [`folder`] explodes a region into one SNBT file per
//! chunk and recombines such a folder back into a byte-exact `.mca`.

pub mod atomic;
pub mod folder;

mod files;
mod region;

pub use files::*;
pub use region::*;

#[cfg(test)]
mod test;

use std::path::PathBuf;

use thiserror::Error;

/// the size in bytes of a 'sector' in a region file. Sectors are
/// Minecraft's allocation unit for chunks; a chunk might occupy
/// `3 * SECTOR_SIZE` bytes.
pub const SECTOR_SIZE: usize = 4096;

/// the size of the region file header: the locations table plus the
/// timestamps table.
pub const HEADER_SIZE: usize = 2 * SECTOR_SIZE;

/// A chunk payload larger than this many sectors (the sector-count field
/// is one byte) spills to an external `.mcc` file.
pub const MAX_INLINE_SECTORS: usize = 255;

/// A region coordinate, eg the `0` and `-1` of `r.0.-1.mca`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RCoord(pub i32);

/// An absolute chunk coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CCoord(pub i32);

impl CCoord {
    /// The region this chunk lives in.
    pub fn region(self) -> RCoord {
        RCoord(self.0 >> 5)
    }

    /// The chunk's 0..32 offset within its region.
    pub fn local(self) -> usize {
        (self.0 & 31) as usize
    }
}

impl RCoord {
    /// The absolute coordinate of this region's chunk at local offset
    /// `local`.
    pub fn chunk(self, local: usize) -> CCoord {
        CCoord(self.0 * 32 + local as i32)
    }
}

/// Convenience type for Result.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Nbt(#[from] gitmc_nbt::Error),

    #[error("invalid chunk offset: x = {0}, z = {1}")]
    InvalidOffset(usize, usize),

    #[error("region header truncated: file is {0} bytes")]
    TruncatedHeader(u64),

    #[error("chunk ({x}, {z}) location [{offset}; {sectors}] is outside the file")]
    BadLocation {
        x: usize,
        z: usize,
        offset: usize,
        sectors: usize,
    },

    #[error("chunk ({x}, {z}) overlaps sectors claimed by another chunk")]
    OverlappingSectors { x: usize, z: usize },

    #[error("chunk ({x}, {z}) has a corrupt payload header")]
    BadChunkHeader { x: usize, z: usize },

    #[error("chunk ({x}, {z}) is external but the region has no backing directory")]
    ExternalUnsupported { x: usize, z: usize },

    #[error("external chunk file missing: {0:?}")]
    MissingExternal(PathBuf),

    #[error("not a region file name: {0:?}")]
    BadRegionName(PathBuf),

    #[error("not a chunk snbt file name: {0:?}")]
    BadChunkName(PathBuf),

    #[error("chunk snbt {path:?} failed to parse: {source}")]
    ChunkSnbt {
        path: PathBuf,
        source: gitmc_snbt::Error,
    },
}
