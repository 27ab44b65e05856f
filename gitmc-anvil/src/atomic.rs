//! Write-to-temp-then-rename discipline for every externally visible
//! output file.
//!
//! A crash between the temp write and the rename leaves `<target>.tmp`
//! behind; such leftovers are safe to delete and [`clean_stale_tmp`]
//! sweeps them on the next run.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::Result;

const TMP_SUFFIX: &str = ".tmp";

/// The temp sibling a write to `target` goes through.
pub fn temp_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(TMP_SUFFIX);
    target.with_file_name(name)
}

/// Write `bytes` to `target` atomically: temp sibling, flush, fsync,
/// rename over the target.
pub fn write_atomic(target: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = temp_path(target);
    {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.flush()?;
        file.sync_all()?;
    }
    rename_over(&tmp, target)?;
    sync_parent_dir(target);
    Ok(())
}

/// Promote an already-written temp file over its target. The caller is
/// responsible for having flushed the temp file.
pub fn persist_temp(tmp: &Path, target: &Path) -> Result<()> {
    rename_over(tmp, target)?;
    sync_parent_dir(target);
    Ok(())
}

fn rename_over(tmp: &Path, target: &Path) -> Result<()> {
    // On Windows-like filesystems rename does not replace an existing
    // file; drop the target first.
    #[cfg(windows)]
    if target.exists() {
        fs::remove_file(target)?;
    }
    fs::rename(tmp, target)?;
    Ok(())
}

/// Best-effort directory fsync so the rename itself is durable. Not every
/// platform allows opening a directory for sync; failures are ignored.
fn sync_parent_dir(target: &Path) {
    #[cfg(unix)]
    if let Some(parent) = target.parent() {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }
    #[cfg(not(unix))]
    let _ = target;
}

/// Delete leftover `.tmp` files under `dir`, recursively, returning how
/// many were removed.
pub fn clean_stale_tmp(dir: &Path) -> Result<usize> {
    let mut removed = 0;
    if !dir.is_dir() {
        return Ok(0);
    }
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            removed += clean_stale_tmp(&path)?;
        } else if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(TMP_SUFFIX))
        {
            fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}
