//! Explode a region into a folder of per-chunk SNBT files, and recombine
//! such a folder back into a single `.mca`.
//!
//! The folder is named after its source region (`r.<rx>.<rz>.mca/`) and
//! holds one `chunk_<cx>_<cz>.snbt` per present chunk, in the Expanded
//! form. A sibling `r.<rx>.<rz>.mca.snbt.chunk_mode` marker records that
//! the region has been exploded and where. File names are authoritative
//! for coordinates everywhere; a disagreeing `xPos`/`zPos` inside the NBT
//! is reported as a warning and ignored.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use gitmc_nbt::{Compound, Document, Value};
use gitmc_snbt::SnbtOptions;
use log::warn;

use crate::atomic;
use crate::{
    chunk_file_name, coords_from_chunk_path, coords_from_region_path, open_region,
    region_file_name, CCoord, Error, ExternalFiles, RCoord, Region, Result,
};

/// The stand-in file written for a region with no chunks at all.
pub const REGION_INFO_FILE: &str = "region_info.snbt";

/// Suffix of the marker written next to an exploded region's folder.
pub const CHUNK_MODE_SUFFIX: &str = ".snbt.chunk_mode";

/// `r.<rx>.<rz>.mca.snbt.chunk_mode`
pub fn chunk_mode_marker_name(rx: RCoord, rz: RCoord) -> String {
    format!("{}{}", region_file_name(rx, rz), CHUNK_MODE_SUFFIX)
}

#[derive(Debug, Default)]
pub struct ExplodeOutcome {
    /// SNBT files written, in write order.
    pub written: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Default)]
pub struct CombineOutcome {
    pub chunks: usize,
    pub warnings: Vec<String>,
}

/// Explode every present chunk of `region_path` into `dest_dir`.
///
/// A chunk that fails to decode is recorded as a warning and skipped; the
/// rest of the region is still exploded.
pub fn explode_region(region_path: &Path, dest_dir: &Path) -> Result<ExplodeOutcome> {
    let (rx, rz) = coords_from_region_path(region_path)?;
    let mut region = open_region(region_path)?;
    let chunks = region.chunks();

    let mut outcome = ExplodeOutcome::default();
    fs::create_dir_all(dest_dir)?;

    if chunks.is_empty() {
        let path = dest_dir.join(REGION_INFO_FILE);
        atomic::write_atomic(&path, region_info(rx, rz).as_bytes())?;
        outcome.written.push(path);
    }

    for info in chunks {
        let cx = rx.chunk(info.x);
        let cz = rz.chunk(info.z);
        let doc = match region.read_chunk_document(info.x, info.z) {
            Ok(Some(doc)) => doc,
            Ok(None) => continue,
            Err(e) => {
                outcome
                    .warnings
                    .push(format!("chunk ({}, {}): {e}", cx.0, cz.0));
                continue;
            }
        };
        let text = gitmc_snbt::to_string(&doc.root, &SnbtOptions::expanded());
        let path = dest_dir.join(chunk_file_name(cx, cz));
        atomic::write_atomic(&path, text.as_bytes())?;
        outcome.written.push(path);
    }

    write_marker(dest_dir, rx, rz)?;
    Ok(outcome)
}

/// Explode only the given chunks (absolute coordinates) of `region_path`.
/// Chunks absent from the region are recorded as warnings.
pub fn explode_chunks(
    region_path: &Path,
    dest_dir: &Path,
    chunks: &[(i32, i32)],
) -> Result<ExplodeOutcome> {
    let (rx, rz) = coords_from_region_path(region_path)?;
    let mut region = open_region(region_path)?;

    let mut outcome = ExplodeOutcome::default();
    fs::create_dir_all(dest_dir)?;

    for &(cx, cz) in chunks {
        let (cx, cz) = (CCoord(cx), CCoord(cz));
        if cx.region() != rx || cz.region() != rz {
            outcome.warnings.push(format!(
                "chunk ({}, {}) does not belong to region ({}, {})",
                cx.0, cz.0, rx.0, rz.0
            ));
            continue;
        }
        let doc = match region.read_chunk_document(cx.local(), cz.local()) {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                outcome
                    .warnings
                    .push(format!("chunk ({}, {}) is not present", cx.0, cz.0));
                continue;
            }
            Err(e) => {
                outcome
                    .warnings
                    .push(format!("chunk ({}, {}): {e}", cx.0, cz.0));
                continue;
            }
        };
        let text = gitmc_snbt::to_string(&doc.root, &SnbtOptions::expanded());
        let path = dest_dir.join(chunk_file_name(cx, cz));
        atomic::write_atomic(&path, text.as_bytes())?;
        outcome.written.push(path);
    }

    write_marker(dest_dir, rx, rz)?;
    Ok(outcome)
}

/// Recombine a region folder into `dest`. Every `chunk_*.snbt` in the
/// folder is parsed and written through the region codec; a parse failure
/// aborts the whole region rather than fabricating a placeholder.
pub fn combine_region(folder: &Path, dest: &Path) -> Result<CombineOutcome> {
    let (rx, rz) = coords_from_region_path(folder)?;
    let mut outcome = CombineOutcome::default();

    let mut chunk_files: Vec<(CCoord, CCoord, PathBuf)> = Vec::new();
    for entry in fs::read_dir(folder)? {
        let path = entry?.path();
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => continue,
        };
        if !name.starts_with("chunk_") || !name.ends_with(".snbt") {
            continue;
        }
        let (cx, cz) = coords_from_chunk_path(&path)?;
        if cx.region() != rx || cz.region() != rz {
            outcome.warnings.push(format!(
                "{name} does not belong to region ({}, {}); skipped",
                rx.0, rz.0
            ));
            continue;
        }
        chunk_files.push((cx, cz, path));
    }
    // Vanilla writes chunks in z-major order; matching it keeps sector
    // allocation stable across round trips.
    chunk_files.sort_by_key(|(cx, cz, _)| (cz.local(), cx.local()));

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = atomic::temp_path(dest);
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(&tmp)?;
    let external_dir = dest
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    let mut region =
        Region::create(file)?.with_external(ExternalFiles::new(external_dir, rx, rz));

    for (cx, cz, path) in chunk_files {
        let text = fs::read_to_string(&path)?;
        let mut value = gitmc_snbt::from_str(&text).map_err(|source| Error::ChunkSnbt {
            path: path.clone(),
            source,
        })?;
        gitmc_snbt::normalize_empty_lists(&mut value);
        check_position(&value, cx, cz, &mut outcome.warnings);
        let doc = Document::new("", value);
        let bytes = gitmc_nbt::to_bytes(&doc)?;
        region.write_chunk(cx.local(), cz.local(), &bytes)?;
        outcome.chunks += 1;
    }

    region.flush()?;
    let file = region.into_inner();
    file.sync_all()?;
    drop(file);
    atomic::persist_temp(&tmp, dest)?;
    Ok(outcome)
}

/// The `region_info.snbt` body for an empty region.
fn region_info(rx: RCoord, rz: RCoord) -> String {
    let mut c = Compound::new();
    c.insert(
        "RegionCoordinates".to_string(),
        Value::IntArray(vec![rx.0, rz.0]),
    );
    c.insert("IsEmpty".to_string(), Value::Byte(1));
    c.insert("ChunkCount".to_string(), Value::Int(0));
    gitmc_snbt::to_string(&Value::Compound(c), &SnbtOptions::expanded())
}

fn write_marker(dest_dir: &Path, rx: RCoord, rz: RCoord) -> Result<()> {
    let parent = match dest_dir.parent() {
        Some(parent) => parent,
        None => return Ok(()),
    };
    let marker = parent.join(chunk_mode_marker_name(rx, rz));
    let folder_name = dest_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    atomic::write_atomic(&marker, format!("{folder_name}\n").as_bytes())
}

fn check_position(value: &Value, cx: CCoord, cz: CCoord, warnings: &mut Vec<String>) {
    let compound = match value.as_compound() {
        Some(c) => c,
        None => return,
    };
    let x = compound.get("xPos").and_then(Value::as_int);
    let z = compound.get("zPos").and_then(Value::as_int);
    if let (Some(x), Some(z)) = (x, z) {
        if x != cx.0 || z != cz.0 {
            warn!(
                "chunk file ({}, {}) disagrees with its xPos/zPos ({x}, {z}); file name wins",
                cx.0, cz.0
            );
            warnings.push(format!(
                "chunk ({}, {}) carries xPos/zPos ({x}, {z}); file name wins",
                cx.0, cz.0
            ));
        }
    }
}
