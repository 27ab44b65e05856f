use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::{CCoord, Error, ExternalFiles, RCoord, Region, Result};

/// `r.<rx>.<rz>.mca`
pub fn region_file_name(rx: RCoord, rz: RCoord) -> String {
    format!("r.{}.{}.mca", rx.0, rz.0)
}

/// `chunk_<cx>_<cz>.snbt`
pub fn chunk_file_name(cx: CCoord, cz: CCoord) -> String {
    format!("chunk_{}_{}.snbt", cx.0, cz.0)
}

/// `c.<cx>.<cz>.mcc`
pub fn external_file_name(cx: CCoord, cz: CCoord) -> String {
    format!("c.{}.{}.mcc", cx.0, cz.0)
}

/// Parse region coordinates out of an `r.<rx>.<rz>.mca` file or folder
/// name. The name is authoritative; nothing inside the file is consulted.
pub fn coords_from_region_path(path: &Path) -> Result<(RCoord, RCoord)> {
    let bad = || Error::BadRegionName(path.to_path_buf());
    let name = path.file_name().and_then(|n| n.to_str()).ok_or_else(bad)?;
    let mut parts = name.split('.');
    if parts.next() != Some("r") {
        return Err(bad());
    }
    let rx = parts.next().and_then(|p| p.parse().ok()).ok_or_else(bad)?;
    let rz = parts.next().and_then(|p| p.parse().ok()).ok_or_else(bad)?;
    if parts.next() != Some("mca") {
        return Err(bad());
    }
    Ok((RCoord(rx), RCoord(rz)))
}

/// Parse absolute chunk coordinates out of a `chunk_<cx>_<cz>.snbt` file
/// name. As with regions, the file name wins over anything in the data.
pub fn coords_from_chunk_path(path: &Path) -> Result<(CCoord, CCoord)> {
    let bad = || Error::BadChunkName(path.to_path_buf());
    let name = path.file_name().and_then(|n| n.to_str()).ok_or_else(bad)?;
    let stem = name
        .strip_prefix("chunk_")
        .and_then(|n| n.strip_suffix(".snbt"))
        .ok_or_else(bad)?;
    let mut parts = stem.split('_');
    let cx = parts.next().and_then(|p| p.parse().ok()).ok_or_else(bad)?;
    let cz = parts.next().and_then(|p| p.parse().ok()).ok_or_else(bad)?;
    if parts.next().is_some() {
        return Err(bad());
    }
    Ok((CCoord(cx), CCoord(cz)))
}

/// Non-empty `.mca` files directly under `dir`, sorted by name for
/// deterministic iteration.
pub fn scan_region_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    if !dir.is_dir() {
        return Ok(out);
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some("mca") {
            continue;
        }
        if fs::metadata(&path)?.len() == 0 {
            continue;
        }
        if coords_from_region_path(&path).is_ok() {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

/// Open an existing region file for reading and writing, wiring up the
/// external-file context from its name and directory.
pub fn open_region(path: &Path) -> Result<Region<File>> {
    let (rx, rz) = coords_from_region_path(path)?;
    let dir = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
    let file = OpenOptions::new().read(true).write(true).open(path)?;
    Ok(Region::from_stream(file)?.with_external(ExternalFiles::new(dir, rx, rz)))
}

/// Create (or truncate) a region file with an empty header.
pub fn create_region_file(path: &Path) -> Result<Region<File>> {
    let (rx, rz) = coords_from_region_path(path)?;
    let dir = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    Ok(Region::create(file)?.with_external(ExternalFiles::new(dir, rx, rz)))
}
