use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use chrono::Utc;
use gitmc_nbt::{Compression, Document};
use log::warn;

use crate::files::external_file_name;
use crate::{Error, RCoord, Result, HEADER_SIZE, MAX_INLINE_SECTORS, SECTOR_SIZE};

const EXTERNAL_BIT: u8 = 0x80;

/// The location of chunk data within a region file, in sectors. An offset
/// or count of zero means the chunk is absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Location {
    offset: u32,
    sectors: u8,
}

impl Location {
    fn is_empty(self) -> bool {
        self.offset == 0 || self.sectors == 0
    }
}

/// A present chunk as reported by [`Region::chunks`]. Coordinates are
/// region-local, 0..32.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkInfo {
    pub x: usize,
    pub z: usize,
    pub offset: usize,
    pub sectors: usize,
    pub timestamp: u32,
}

/// A chunk payload still in its stored compression.
#[derive(Debug, Clone)]
pub struct RawChunk {
    pub compression: Compression,
    pub data: Vec<u8>,
}

/// Ties a stream-backed region to the directory and coordinates it came
/// from, so external `c.<cx>.<cz>.mcc` files can be resolved.
#[derive(Debug, Clone)]
pub struct ExternalFiles {
    dir: PathBuf,
    rx: RCoord,
    rz: RCoord,
}

impl ExternalFiles {
    pub fn new(dir: PathBuf, rx: RCoord, rz: RCoord) -> ExternalFiles {
        ExternalFiles { dir, rx, rz }
    }

    fn chunk_path(&self, x: usize, z: usize) -> PathBuf {
        let cx = self.rx.chunk(x);
        let cz = self.rz.chunk(z);
        self.dir.join(external_file_name(cx, cz))
    }
}

/// A Minecraft region: a 32×32 grid of chunks behind a seekable stream.
///
/// Reading needs `Read + Seek`; writing additionally needs `Write`. The
/// sector free list is rebuilt from the header when the region is opened.
pub struct Region<S> {
    stream: S,
    locations: Vec<Location>,
    timestamps: Vec<u32>,
    used: SectorMap,
    external: Option<ExternalFiles>,
}

impl<S> Region<S> {
    /// Attach the directory context used to resolve `.mcc` files. Without
    /// it, external chunks fail with [`Error::ExternalUnsupported`].
    pub fn with_external(mut self, external: ExternalFiles) -> Region<S> {
        self.external = Some(external);
        self
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    fn index(x: usize, z: usize) -> usize {
        z * 32 + x
    }

    fn location(&self, x: usize, z: usize) -> Result<Location> {
        if x >= 32 || z >= 32 {
            return Err(Error::InvalidOffset(x, z));
        }
        Ok(self.locations[Self::index(x, z)])
    }

    /// Every present chunk's location and timestamp.
    pub fn chunks(&self) -> Vec<ChunkInfo> {
        let mut out = Vec::new();
        for z in 0..32 {
            for x in 0..32 {
                let loc = self.locations[Self::index(x, z)];
                if !loc.is_empty() {
                    out.push(ChunkInfo {
                        x,
                        z,
                        offset: loc.offset as usize,
                        sectors: loc.sectors as usize,
                        timestamp: self.timestamps[Self::index(x, z)],
                    });
                }
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.locations.iter().all(|loc| loc.is_empty())
    }
}

impl<S: Read + Seek> Region<S> {
    /// Open a region from its stream, parsing and validating both header
    /// tables and rebuilding the sector free list. Overlapping sector
    /// claims are fatal here; per-chunk payload problems surface lazily
    /// when the chunk is read.
    pub fn from_stream(mut stream: S) -> Result<Region<S>> {
        let len = stream.seek(SeekFrom::End(0))?;
        if len < HEADER_SIZE as u64 {
            return Err(Error::TruncatedHeader(len));
        }
        if len % SECTOR_SIZE as u64 != 0 {
            warn!("region file length {len} is not a multiple of {SECTOR_SIZE}");
        }

        stream.seek(SeekFrom::Start(0))?;
        let mut locations = Vec::with_capacity(1024);
        for _ in 0..1024 {
            let word = stream.read_u32::<BigEndian>()?;
            locations.push(Location {
                offset: word >> 8,
                sectors: (word & 0xFF) as u8,
            });
        }
        let mut timestamps = Vec::with_capacity(1024);
        for _ in 0..1024 {
            timestamps.push(stream.read_u32::<BigEndian>()?);
        }

        let mut used = SectorMap::new();
        for z in 0..32 {
            for x in 0..32 {
                let loc = locations[Self::index(x, z)];
                if loc.is_empty() {
                    continue;
                }
                let offset = loc.offset as usize;
                let sectors = loc.sectors as usize;
                // The chunk's own 5-byte header must at least be inside
                // the file; the full range may legitimately be short for
                // external chunks, which store only that header inline.
                if offset < 2 || (offset * SECTOR_SIZE + 5) as u64 > len {
                    return Err(Error::BadLocation {
                        x,
                        z,
                        offset,
                        sectors,
                    });
                }
                used.claim(offset, sectors)
                    .map_err(|_| Error::OverlappingSectors { x, z })?;
            }
        }

        Ok(Region {
            stream,
            locations,
            timestamps,
            used,
            external: None,
        })
    }

    /// Read the still-compressed payload of the chunk at region-local
    /// (x, z), or `None` when absent.
    pub fn read_raw_chunk(&mut self, x: usize, z: usize) -> Result<Option<RawChunk>> {
        let loc = self.location(x, z)?;
        if loc.is_empty() {
            return Ok(None);
        }

        self.stream
            .seek(SeekFrom::Start(loc.offset as u64 * SECTOR_SIZE as u64))?;
        let len = self.stream.read_u32::<BigEndian>()?;
        let tag = self.stream.read_u8()?;

        if tag & EXTERNAL_BIT != 0 {
            let compression = Compression::from_anvil_tag(tag & !EXTERNAL_BIT)
                .map_err(Error::Nbt)?;
            let external = self
                .external
                .as_ref()
                .ok_or(Error::ExternalUnsupported { x, z })?;
            let path = external.chunk_path(x, z);
            let data = match fs::read(&path) {
                Ok(data) => data,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(Error::MissingExternal(path))
                }
                Err(e) => return Err(Error::Io(e)),
            };
            return Ok(Some(RawChunk { compression, data }));
        }

        let compression = Compression::from_anvil_tag(tag).map_err(Error::Nbt)?;
        if len < 1 {
            return Err(Error::BadChunkHeader { x, z });
        }
        let mut data = vec![0u8; len as usize - 1];
        self.stream.read_exact(&mut data)?;
        Ok(Some(RawChunk { compression, data }))
    }

    /// Read and decompress the chunk at region-local (x, z).
    pub fn read_chunk(&mut self, x: usize, z: usize) -> Result<Option<Vec<u8>>> {
        match self.read_raw_chunk(x, z)? {
            Some(raw) => Ok(Some(raw.compression.decompress(&raw.data)?)),
            None => Ok(None),
        }
    }

    /// Read the chunk at region-local (x, z) and parse its NBT.
    pub fn read_chunk_document(&mut self, x: usize, z: usize) -> Result<Option<Document>> {
        match self.read_chunk(x, z)? {
            Some(data) => Ok(Some(gitmc_nbt::from_bytes(&data)?)),
            None => Ok(None),
        }
    }

    /// Check every present chunk: the sector range, the external file if
    /// any, decompression and the NBT parse. Problems are collected, not
    /// fatal; the caller decides what to do with a partly broken region.
    pub fn validate(&mut self) -> Validation {
        let mut report = Validation::default();
        for info in self.chunks() {
            match self.read_chunk_document(info.x, info.z) {
                Ok(Some(_)) => {}
                Ok(None) => {}
                Err(e) => report
                    .errors
                    .push(format!("chunk ({}, {}): {e}", info.x, info.z)),
            }
        }
        report
    }
}

/// The outcome of [`Region::validate`].
#[derive(Debug, Default)]
pub struct Validation {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Validation {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

impl<S: Read + Write + Seek> Region<S> {
    /// Initialize an empty region into the stream: both header tables
    /// zeroed, no payload sectors.
    pub fn create(mut stream: S) -> Result<Region<S>> {
        stream.seek(SeekFrom::Start(0))?;
        stream.write_all(&[0u8; HEADER_SIZE])?;
        Ok(Region {
            stream,
            locations: vec![Location::default(); 1024],
            timestamps: vec![0; 1024],
            used: SectorMap::new(),
            external: None,
        })
    }

    /// Write a chunk's uncompressed NBT bytes with the default (zlib)
    /// chunk compression, stamping the timestamp table with the current
    /// UTC second.
    pub fn write_chunk(&mut self, x: usize, z: usize, data: &[u8]) -> Result<()> {
        self.write_chunk_with(x, z, data, Compression::Zlib, None)
    }

    /// Write a chunk with explicit compression and, optionally, an
    /// explicit timestamp (used to preserve a source region's stamps).
    ///
    /// An oversize payload spills to `c.<cx>.<cz>.mcc` next to the region
    /// and only the 5-byte header is stored inline, with the external bit
    /// set on the compression tag.
    pub fn write_chunk_with(
        &mut self,
        x: usize,
        z: usize,
        data: &[u8],
        compression: Compression,
        timestamp: Option<u32>,
    ) -> Result<()> {
        let old = self.location(x, z)?;
        let compressed = compression.compress(data)?;
        let total = compressed.len() + 5;
        let inline = total <= MAX_INLINE_SECTORS * SECTOR_SIZE;
        if !inline && self.external.is_none() {
            return Err(Error::ExternalUnsupported { x, z });
        }

        if !old.is_empty() {
            self.used.free(old.offset as usize, old.sectors as usize);
        }

        let idx = Self::index(x, z);
        if inline {
            let sectors = total.div_ceil(SECTOR_SIZE);
            let offset = self.used.allocate(sectors);
            self.stream
                .seek(SeekFrom::Start(offset as u64 * SECTOR_SIZE as u64))?;
            self.stream
                .write_u32::<BigEndian>(compressed.len() as u32 + 1)?;
            self.stream.write_u8(compression as u8)?;
            self.stream.write_all(&compressed)?;
            let pad = sectors * SECTOR_SIZE - total;
            self.stream.write_all(&vec![0u8; pad])?;
            self.locations[idx] = Location {
                offset: offset as u32,
                sectors: sectors as u8,
            };
            // A previous oversize version of this chunk leaves a stale
            // external file behind.
            if let Some(external) = &self.external {
                let stale = external.chunk_path(x, z);
                if stale.exists() {
                    fs::remove_file(stale)?;
                }
            }
        } else {
            // Presence checked above.
            let external = self
                .external
                .as_ref()
                .ok_or(Error::ExternalUnsupported { x, z })?;
            let path = external.chunk_path(x, z);
            let tmp = crate::atomic::temp_path(&path);
            fs::write(&tmp, &compressed)?;
            crate::atomic::persist_temp(&tmp, &path)?;

            let offset = self.used.allocate(1);
            self.stream
                .seek(SeekFrom::Start(offset as u64 * SECTOR_SIZE as u64))?;
            self.stream.write_u32::<BigEndian>(1)?;
            self.stream.write_u8(compression as u8 | EXTERNAL_BIT)?;
            self.stream.write_all(&vec![0u8; SECTOR_SIZE - 5])?;
            self.locations[idx] = Location {
                offset: offset as u32,
                sectors: 1,
            };
        }

        self.timestamps[idx] =
            timestamp.unwrap_or_else(|| Utc::now().timestamp().max(0) as u32);
        self.write_header()?;
        self.pad_to_sector()?;
        Ok(())
    }

    /// Remove a chunk: free its sectors and zero both table entries.
    pub fn delete_chunk(&mut self, x: usize, z: usize) -> Result<()> {
        let loc = self.location(x, z)?;
        if loc.is_empty() {
            return Ok(());
        }
        self.used.free(loc.offset as usize, loc.sectors as usize);
        let idx = Self::index(x, z);
        self.locations[idx] = Location::default();
        self.timestamps[idx] = 0;
        if let Some(external) = &self.external {
            let stale = external.chunk_path(x, z);
            if stale.exists() {
                fs::remove_file(stale)?;
            }
        }
        self.write_header()?;
        Ok(())
    }

    fn write_header(&mut self) -> Result<()> {
        self.stream.seek(SeekFrom::Start(0))?;
        for loc in &self.locations {
            self.stream
                .write_u32::<BigEndian>((loc.offset << 8) | loc.sectors as u32)?;
        }
        for ts in &self.timestamps {
            self.stream.write_u32::<BigEndian>(*ts)?;
        }
        Ok(())
    }

    fn pad_to_sector(&mut self) -> Result<()> {
        let len = self.stream.seek(SeekFrom::End(0))?;
        let rem = len % SECTOR_SIZE as u64;
        if rem != 0 {
            let pad = SECTOR_SIZE as u64 - rem;
            self.stream.write_all(&vec![0u8; pad as usize])?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.stream.flush()?;
        Ok(())
    }
}

/// First-fit sector accounting, rebuilt from the header on open. Index 0
/// and 1 are the header and always claimed.
struct SectorMap {
    used: Vec<bool>,
}

impl SectorMap {
    fn new() -> SectorMap {
        SectorMap {
            used: vec![true, true],
        }
    }

    /// Claim exact sectors while rebuilding from a header. Fails if any
    /// sector in the range is already claimed.
    fn claim(&mut self, offset: usize, count: usize) -> std::result::Result<(), ()> {
        if self.used.len() < offset + count {
            self.used.resize(offset + count, false);
        }
        if self.used[offset..offset + count].iter().any(|&u| u) {
            return Err(());
        }
        for s in &mut self.used[offset..offset + count] {
            *s = true;
        }
        Ok(())
    }

    fn free(&mut self, offset: usize, count: usize) {
        let end = (offset + count).min(self.used.len());
        for s in &mut self.used[offset..end] {
            *s = false;
        }
    }

    /// First fit: the lowest run of `count` free sectors, extending the
    /// file when no gap is wide enough.
    fn allocate(&mut self, count: usize) -> usize {
        let mut run = 0;
        for i in 2..self.used.len() {
            if self.used[i] {
                run = 0;
            } else {
                run += 1;
                if run == count {
                    let start = i + 1 - count;
                    for s in &mut self.used[start..start + count] {
                        *s = true;
                    }
                    return start;
                }
            }
        }
        // No interior gap: extend past the current end, reusing any free
        // tail run.
        let mut start = self.used.len();
        while start > 2 && !self.used[start - 1] {
            start -= 1;
        }
        if self.used.len() < start + count {
            self.used.resize(start + count, false);
        }
        for s in &mut self.used[start..start + count] {
            *s = true;
        }
        start
    }
}
