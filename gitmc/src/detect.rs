use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use gitmc_anvil::{
    coords_from_chunk_path, coords_from_region_path, open_region, region_file_name, CCoord,
    RCoord,
};
use gitmc_nbt::Value;
use gitmc_snbt::SnbtOptions;
use log::{debug, warn};
use rayon::prelude::*;
use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::error::Result;
use crate::manifest::{CommitRef, Manifest};
use crate::vcs::Vcs;

/// The save subtrees that hold region files.
pub const DIMENSION_DIRS: [&str; 3] = ["region", "entities", "poi"];

/// Per-region outcome: which chunks really changed and which disappeared.
/// Coordinates are absolute.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionDelta {
    /// Save-relative forward-slash path, eg `region/r.0.-1.mca`.
    pub rel_path: String,
    pub dim: String,
    pub rx: i32,
    pub rz: i32,
    pub changed: Vec<(i32, i32)>,
    pub deleted: Vec<(i32, i32)>,
}

impl RegionDelta {
    /// The core-relative folder prefix this region's SNBT lives under.
    pub fn folder_prefix(&self) -> String {
        format!(
            "{}/{}/",
            self.dim,
            region_file_name(RCoord(self.rx), RCoord(self.rz))
        )
    }

    pub fn chunk_rel_path(&self, cx: i32, cz: i32) -> String {
        format!("{}chunk_{cx}_{cz}.snbt", self.folder_prefix())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonRegionKind {
    /// `.dat`/`.nbt`: re-translate to SNBT under `data/`.
    Translate,
    /// `.json`/`.txt`: copy verbatim under `misc/`.
    Copy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NonRegionDelta {
    /// Save-relative source path.
    pub rel_path: String,
    pub kind: NonRegionKind,
    pub deleted: bool,
}

impl NonRegionDelta {
    /// Where this file's projection lives in the core tree.
    pub fn core_path(&self) -> String {
        match self.kind {
            NonRegionKind::Translate => format!("data/{}.snbt", self.rel_path),
            NonRegionKind::Copy => format!("misc/{}", self.rel_path),
        }
    }
}

/// Everything the detector decided. `errors` carries per-region failures;
/// the caller surfaces them without aborting the other regions.
#[derive(Debug, Default)]
pub struct ChangeSet {
    pub regions: Vec<RegionDelta>,
    pub non_region: Vec<NonRegionDelta>,
    /// Core-relative SNBT paths the user edited by hand.
    pub core_edited: Vec<String>,
    pub errors: Vec<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty() && self.non_region.is_empty() && self.core_edited.is_empty()
    }

    pub fn changed_chunks(&self) -> usize {
        self.regions.iter().map(|r| r.changed.len()).sum()
    }

    pub fn deleted_chunks(&self) -> usize {
        self.regions.iter().map(|r| r.deleted.len()).sum()
    }
}

/// Recursively drop volatile members before content comparison. The set
/// is closed: only `LastUpdate` qualifies.
pub fn strip_volatile(value: &mut Value) {
    match value {
        Value::Compound(compound) => {
            compound.shift_remove("LastUpdate");
            for (_, member) in compound.iter_mut() {
                strip_volatile(member);
            }
        }
        Value::List(list) => {
            for item in list.items_mut() {
                strip_volatile(item);
            }
        }
        _ => {}
    }
}

/// Classify the save's and core's VCS status into the set of chunks and
/// files whose content really changed. `since` prefilters candidate
/// region files by mtime.
pub fn detect(
    save: &Path,
    config: &Config,
    vcs: &dyn Vcs,
    manifest: &Manifest,
    since: Option<DateTime<Utc>>,
) -> Result<ChangeSet> {
    let core_dir = config.core_dir(save);
    let status = vcs.status(save)?;
    let head = vcs.current_hash(save)?;

    let mut out = ChangeSet::default();
    let mut candidates: BTreeSet<String> = BTreeSet::new();
    let mut deleted_regions: BTreeSet<String> = BTreeSet::new();

    for rel in status.modified.iter().chain(status.untracked.iter()) {
        if let Some(mca) = region_candidate(rel) {
            candidates.insert(mca);
        } else if let Some(delta) = classify_non_region(rel, &config.core_dir_name, false) {
            out.non_region.push(delta);
        }
    }
    for rel in &status.deleted {
        if let Some(mca) = region_candidate(rel) {
            if rel.ends_with(".mca") {
                deleted_regions.insert(mca);
            } else {
                // A deleted .mcc means its region shrank back inline.
                candidates.insert(mca);
            }
        } else if let Some(delta) = classify_non_region(rel, &config.core_dir_name, true) {
            out.non_region.push(delta);
        }
    }
    for gone in &deleted_regions {
        candidates.remove(gone);
    }

    if let Some(since) = since {
        candidates.retain(|rel| match fs::metadata(save.join(rel)).and_then(|m| m.modified()) {
            Ok(mtime) => DateTime::<Utc>::from(mtime) > since,
            // Keep the candidate when the mtime cannot be read; the hash
            // gate below still decides.
            Err(_) => true,
        });
    }

    // Whole-file hash gate: Minecraft re-stamps region files on open
    // without content change, and those must not count.
    let gate: Vec<(String, std::result::Result<bool, String>)> = candidates
        .par_iter()
        .map(|rel| {
            let changed = mca_content_changed(save, rel, head.as_deref(), vcs)
                .map_err(|e| e.to_string());
            (rel.clone(), changed)
        })
        .collect();

    let mut changed_regions = Vec::new();
    for (rel, outcome) in gate {
        match outcome {
            Ok(true) => changed_regions.push(rel),
            Ok(false) => debug!("{rel}: bytes unchanged, skipping"),
            Err(e) => out.errors.push(format!("{rel}: {e}")),
        }
    }

    for rel in changed_regions {
        match region_delta(save, &core_dir, &rel, vcs, manifest, &mut out.errors) {
            Ok(delta) => {
                if !delta.changed.is_empty() || !delta.deleted.is_empty() {
                    out.regions.push(delta);
                }
            }
            Err(e) => out.errors.push(format!("{rel}: {e}")),
        }
    }

    for rel in deleted_regions {
        if let Some(delta) = removed_region_delta(&rel, manifest) {
            out.regions.push(delta);
        }
    }

    // User edits in the core tree; the textual side wins ties.
    let core_status = vcs.status(&core_dir)?;
    out.core_edited = core_status
        .modified
        .iter()
        .chain(core_status.untracked.iter())
        .filter(|p| p.ends_with(".snbt"))
        .cloned()
        .collect();
    out.core_edited.sort();

    let edited: BTreeSet<&str> = out.core_edited.iter().map(String::as_str).collect();
    for delta in &mut out.regions {
        let prefix = delta.folder_prefix();
        delta
            .changed
            .retain(|&(cx, cz)| !edited.contains(format!("{prefix}chunk_{cx}_{cz}.snbt").as_str()));
    }
    out.regions
        .retain(|d| !d.changed.is_empty() || !d.deleted.is_empty());

    Ok(out)
}

/// Map a save-relative path to the region file responsible for it, if it
/// is a region or external-chunk file directly under a dimension dir.
fn region_candidate(rel: &str) -> Option<String> {
    let (dim, rest) = rel.split_once('/')?;
    if !DIMENSION_DIRS.contains(&dim) || rest.contains('/') {
        return None;
    }
    if rest.ends_with(".mca") {
        coords_from_region_path(Path::new(rest)).ok()?;
        return Some(rel.to_string());
    }
    if let Some(stem) = rest.strip_prefix("c.").and_then(|r| r.strip_suffix(".mcc")) {
        let mut parts = stem.split('.');
        let cx: i32 = parts.next()?.parse().ok()?;
        let cz: i32 = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        let name = region_file_name(CCoord(cx).region(), CCoord(cz).region());
        return Some(format!("{dim}/{name}"));
    }
    None
}

pub(crate) fn classify_non_region(
    rel: &str,
    core_dir_name: &str,
    deleted: bool,
) -> Option<NonRegionDelta> {
    if let Some((first, _)) = rel.split_once('/') {
        if DIMENSION_DIRS.contains(&first) || first == core_dir_name {
            return None;
        }
    } else if rel == core_dir_name {
        return None;
    }
    let ext = Path::new(rel).extension()?.to_str()?;
    let kind = match ext {
        "dat" | "nbt" => NonRegionKind::Translate,
        "json" | "txt" => NonRegionKind::Copy,
        _ => return None,
    };
    Some(NonRegionDelta {
        rel_path: rel.to_string(),
        kind,
        deleted,
    })
}

fn mca_content_changed(
    save: &Path,
    rel: &str,
    head: Option<&str>,
    vcs: &dyn Vcs,
) -> Result<bool> {
    let current = fs::read(save.join(rel))?;
    let head = match head {
        Some(head) => head,
        None => return Ok(true),
    };
    let committed = match vcs.show_at(save, rel, head)? {
        Some(bytes) => bytes,
        None => return Ok(true),
    };
    Ok(Sha256::digest(&current) != Sha256::digest(&committed))
}

fn region_delta(
    save: &Path,
    core_dir: &Path,
    rel: &str,
    vcs: &dyn Vcs,
    manifest: &Manifest,
    errors: &mut Vec<String>,
) -> Result<RegionDelta> {
    let path = save.join(rel);
    let (rx, rz) = coords_from_region_path(&path)?;
    let dim = rel.split('/').next().unwrap_or_default().to_string();
    let mut delta = RegionDelta {
        rel_path: rel.to_string(),
        dim,
        rx: rx.0,
        rz: rz.0,
        changed: Vec::new(),
        deleted: Vec::new(),
    };

    let mut region = open_region(&path)?;
    let infos = region.chunks();

    let mut present: BTreeSet<(i32, i32)> = BTreeSet::new();
    for info in infos {
        let cx = rx.chunk(info.x);
        let cz = rz.chunk(info.z);
        present.insert((cx.0, cz.0));

        let doc = match region.read_chunk_document(info.x, info.z) {
            Ok(Some(doc)) => doc,
            Ok(None) => continue,
            Err(e) => {
                // Fatal for this chunk only; the codec keeps serving the
                // rest of the region.
                errors.push(format!("{rel} chunk ({}, {}): {e}", cx.0, cz.0));
                continue;
            }
        };
        let mut value = doc.root;
        strip_volatile(&mut value);
        let current = gitmc_snbt::to_string(&value, &SnbtOptions::compact());

        let chunk_rel = delta.chunk_rel_path(cx.0, cz.0);
        if chunk_content_changed(&chunk_rel, &current, core_dir, vcs, manifest)? {
            delta.changed.push((cx.0, cz.0));
        }
    }

    for (entry_path, state) in manifest.iter_under(&delta.folder_prefix()) {
        if state.deleted {
            continue;
        }
        if let Ok((cx, cz)) = coords_from_chunk_path(Path::new(entry_path)) {
            if !present.contains(&(cx.0, cz.0)) {
                delta.deleted.push((cx.0, cz.0));
            }
        }
    }
    Ok(delta)
}

/// The whole `.mca` disappeared: everything the manifest still considers
/// live in that region is now deleted.
fn removed_region_delta(rel: &str, manifest: &Manifest) -> Option<RegionDelta> {
    let (rx, rz) = coords_from_region_path(Path::new(rel)).ok()?;
    let dim = rel.split('/').next()?.to_string();
    let mut delta = RegionDelta {
        rel_path: rel.to_string(),
        dim,
        rx: rx.0,
        rz: rz.0,
        changed: Vec::new(),
        deleted: Vec::new(),
    };
    for (entry_path, state) in manifest.iter_under(&delta.folder_prefix()) {
        if state.deleted {
            continue;
        }
        if let Ok((cx, cz)) = coords_from_chunk_path(Path::new(entry_path)) {
            delta.deleted.push((cx.0, cz.0));
        }
    }
    if delta.deleted.is_empty() {
        None
    } else {
        Some(delta)
    }
}

/// Compare a chunk's current Compact rendering against its last-written
/// textual form: the committed blob for resolved entries, the working
/// file for pending ones.
fn chunk_content_changed(
    chunk_rel: &str,
    current_compact: &str,
    core_dir: &Path,
    vcs: &dyn Vcs,
    manifest: &Manifest,
) -> Result<bool> {
    let state = match manifest.get(chunk_rel) {
        Some(state) => state,
        None => return Ok(true),
    };
    if state.deleted {
        return Ok(true);
    }
    let baseline = match &state.commit {
        CommitRef::Pending => fs::read(core_dir.join(chunk_rel)).ok(),
        CommitRef::Hash(hash) => vcs.show_at(core_dir, chunk_rel, hash)?,
    };
    let baseline = match baseline {
        Some(bytes) => bytes,
        None => return Ok(true),
    };
    let text = match String::from_utf8(baseline) {
        Ok(text) => text,
        Err(_) => return Ok(true),
    };
    let mut value = match gitmc_snbt::from_str(&text) {
        Ok(value) => value,
        Err(e) => {
            warn!("{chunk_rel}: stored snbt does not parse ({e}); treating as changed");
            return Ok(true);
        }
    };
    strip_volatile(&mut value);
    Ok(gitmc_snbt::to_string(&value, &SnbtOptions::compact()) != current_compact)
}
