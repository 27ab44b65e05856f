use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use gitmc_anvil::folder::{combine_region, explode_chunks, explode_region};
use gitmc_anvil::{region_file_name, scan_region_files, RCoord};
use gitmc_snbt::SnbtOptions;
use log::{info, warn};
use rayon::prelude::*;

use crate::atomic;
use crate::config::Config;
use crate::detect::{
    classify_non_region, detect, ChangeSet, NonRegionDelta, NonRegionKind, DIMENSION_DIRS,
};
use crate::error::{Error, Result};
use crate::manifest::{CommitRef, Manifest, MANIFEST_FILE};
use crate::ops::{OpKind, OperationManager};
use crate::progress::{CancelToken, ProgressEvent, ProgressSink};
use crate::vcs::Vcs;

/// Top-level directories never mirrored into the core tree. They churn on
/// every play session without carrying world content worth versioning.
const VOLATILE_DIRS: [&str; 4] = ["logs", "playerdata", "stats", "advancements"];

fn save_gitignore(core_dir_name: &str) -> String {
    format!(
        "/{core_dir_name}/\nsession.lock\nlogs/\nplayerdata/\nstats/\nadvancements/\n*.tmp\n"
    )
}

const CORE_GITIGNORE: &str = "*.tmp\n*.bak\n*.chunk_mode\n";

/// Outcome of Initialize, Translate or Commit.
#[derive(Debug, Default)]
pub struct WorkflowReport {
    /// The core repository commit this run produced, if any.
    pub commit: Option<String>,
    /// SNBT/misc files written into the core tree.
    pub exported: usize,
    pub warnings: Vec<String>,
    /// Per-file format/integrity failures. They do not abort the other
    /// files, but a run that produced any counts as failed.
    pub errors: Vec<String>,
}

impl WorkflowReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Core-relative paths an export phase touched, for selective staging.
#[derive(Debug, Default)]
struct ExportOutcome {
    written: Vec<String>,
    removed: Vec<String>,
}

#[derive(Debug, Default)]
pub struct ReconstructReport {
    pub written: usize,
    pub missing: Vec<String>,
}

#[derive(Debug, Default)]
pub struct StatusSummary {
    pub pending: usize,
    pub changed_chunks: usize,
    pub deleted_chunks: usize,
    pub changed_files: usize,
    pub core_edited: usize,
}

/// The single entry point for every workflow on one save. Workflows are
/// sequenced, never concurrent for the same save; the operation manager
/// enforces that.
pub struct Orchestrator {
    save: PathBuf,
    config: Config,
    vcs: Box<dyn Vcs>,
    ops: OperationManager,
    progress: ProgressSink,
    cancel: CancelToken,
}

impl Orchestrator {
    pub fn new(
        save: PathBuf,
        config: Config,
        vcs: Box<dyn Vcs>,
        ops: OperationManager,
    ) -> Orchestrator {
        Orchestrator {
            save,
            config,
            vcs,
            ops,
            progress: Box::new(|_| {}),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressSink) -> Orchestrator {
        self.progress = progress;
        self
    }

    /// A handle another task can use to cancel this orchestrator's
    /// running workflow.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn save_path(&self) -> &Path {
        &self.save
    }

    fn core_dir(&self) -> PathBuf {
        self.config.core_dir(&self.save)
    }

    fn emit(&self, step_name: &str, current: usize, total: usize, message: &str) {
        (self.progress)(&ProgressEvent {
            step_name: step_name.to_string(),
            current,
            total,
            message: message.to_string(),
        });
    }

    fn step(&self, op: u64, current: usize, total: usize, name: &str, message: &str) {
        self.ops.update(op, current, message);
        self.emit(name, current, total, message);
    }

    fn finish(&self, op: u64, result: &Result<WorkflowReport>) {
        match result {
            Ok(report) => {
                let message = match (&report.commit, report.warnings.len()) {
                    (Some(hash), 0) => format!("committed {hash}"),
                    (Some(hash), n) => format!("committed {hash} ({n} warnings)"),
                    (None, 0) => format!("{} files exported", report.exported),
                    (None, n) => format!("{} files exported ({n} warnings)", report.exported),
                };
                if report.is_clean() {
                    self.ops.complete(op, true, &message);
                } else {
                    let message =
                        format!("{message}; {} files failed", report.errors.len());
                    self.ops.complete(op, false, &message);
                }
            }
            Err(e) => self.ops.complete(op, false, &e.to_string()),
        }
    }

    // ---- Initialize -----------------------------------------------------

    pub fn initialize(&self) -> Result<WorkflowReport> {
        let op = self.ops.start(&self.save, OpKind::Initialize, 6)?;
        let result = self.initialize_inner(op);
        self.finish(op, &result);
        result
    }

    fn initialize_inner(&self, op: u64) -> Result<WorkflowReport> {
        let core_dir = self.core_dir();

        self.step(op, 1, 6, "verify", "checking identity and save layout");
        if !self.vcs.has_identity() {
            return Err(Error::IdentityMissing);
        }
        if !self.save.join("level.dat").exists() {
            return Err(Error::NotASave(self.save.clone()));
        }
        if core_dir.exists() {
            return Err(Error::AlreadyInitialized(core_dir));
        }

        self.step(op, 2, 6, "repositories", "creating save and core repositories");
        fs::create_dir_all(&core_dir)?;
        atomic::write_atomic(
            &self.save.join(".gitignore"),
            save_gitignore(&self.config.core_dir_name).as_bytes(),
        )?;
        atomic::write_atomic(&core_dir.join(".gitignore"), CORE_GITIGNORE.as_bytes())?;
        // Two repositories on purpose: the save repo tracks the binary
        // files the game reads, the core repo the textual projection.
        self.vcs.init(&self.save)?;
        self.vcs.init(&core_dir)?;

        let mut report = WorkflowReport::default();
        let mut manifest = Manifest::new();

        self.step(op, 3, 6, "regions", "exploding region files");
        let mut jobs: Vec<(PathBuf, PathBuf)> = Vec::new();
        for dim in DIMENSION_DIRS {
            for mca in scan_region_files(&self.save.join(dim))? {
                let name = match mca.file_name().and_then(|n| n.to_str()) {
                    Some(name) => name.to_string(),
                    None => continue,
                };
                jobs.push((mca.clone(), core_dir.join(dim).join(name)));
            }
        }
        let total = jobs.len();
        let done = AtomicUsize::new(0);
        let failures = std::sync::Mutex::new(Vec::new());
        let outcomes: Vec<Result<Option<gitmc_anvil::folder::ExplodeOutcome>>> = jobs
            .par_iter()
            .map(|(mca, dest)| {
                self.cancel.check()?;
                let started = Instant::now();
                // A region that fails to translate is recorded and does
                // not stop the rest of the import.
                let outcome = match explode_region(mca, dest) {
                    Ok(outcome) => Some(outcome),
                    Err(e) => {
                        failures
                            .lock()
                            .unwrap_or_else(|e| e.into_inner())
                            .push(format!("{}: {e}", mca.display()));
                        None
                    }
                };
                if started.elapsed() > self.config.chunk_time_budget {
                    warn!("{}: translation exceeded time budget", mca.display());
                }
                let current = done.fetch_add(1, Ordering::SeqCst) + 1;
                self.emit("regions", current, total, &mca.display().to_string());
                Ok(outcome)
            })
            .collect();
        report
            .errors
            .extend(failures.into_inner().unwrap_or_else(|e| e.into_inner()));
        for outcome in outcomes {
            let outcome = match outcome? {
                Some(outcome) => outcome,
                None => continue,
            };
            report.warnings.extend(outcome.warnings);
            for path in outcome.written {
                manifest.put(core_rel(&core_dir, &path), CommitRef::Pending);
                report.exported += 1;
            }
        }

        self.step(op, 4, 6, "data", "translating data files");
        let mut scratch = ExportOutcome::default();
        for rel in self.collect_data_files()? {
            self.cancel.check()?;
            if let Some(delta) = classify_non_region(&rel, &self.config.core_dir_name, false) {
                self.project_non_region(&delta, &mut manifest, &mut report, &mut scratch)?;
            }
        }

        self.step(op, 5, 6, "commit", "committing initial import");
        manifest.save(&core_dir)?;
        self.vcs.stage_all(&core_dir)?;
        let first = self.vcs.commit(&core_dir, "Initial import")?;
        manifest.resolve_pending(&first)?;
        manifest.save(&core_dir)?;
        self.vcs.stage(&core_dir, MANIFEST_FILE)?;
        let hash = self.vcs.amend(&core_dir, None)?;
        info!("initial import committed as {hash}");
        report.commit = Some(hash);

        self.step(op, 6, 6, "finalize", "cleaning working tree, committing save");
        for (path, state) in manifest.iter() {
            if state.deleted {
                continue;
            }
            let disk = core_dir.join(path);
            if disk.is_file() {
                fs::remove_file(disk)?;
            }
        }
        if !self.vcs.stage_all(&self.save)?.is_empty() {
            match self.vcs.commit(&self.save, "Initialize GitMC") {
                Ok(_) | Err(Error::NothingToCommit) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }

    // ---- Translate ------------------------------------------------------

    pub fn translate(&self) -> Result<WorkflowReport> {
        self.translate_entry(None)
    }

    pub fn translate_since(&self, since: DateTime<Utc>) -> Result<WorkflowReport> {
        self.translate_entry(Some(since))
    }

    fn translate_entry(&self, since: Option<DateTime<Utc>>) -> Result<WorkflowReport> {
        let op = self.ops.start(&self.save, OpKind::Translate, 3)?;
        let result = self.translate_inner(op, since);
        self.finish(op, &result);
        result
    }

    fn translate_inner(&self, op: u64, since: Option<DateTime<Utc>>) -> Result<WorkflowReport> {
        let core_dir = self.core_dir();
        if !core_dir.exists() {
            return Err(Error::NotInitialized(core_dir));
        }
        atomic::clean_stale_tmp(&core_dir)?;
        let mut manifest = Manifest::load_or_default(&core_dir)?;

        self.step(op, 1, 3, "detect", "detecting changed chunks");
        let changes = detect(&self.save, &self.config, self.vcs.as_ref(), &manifest, since)?;
        let mut report = WorkflowReport {
            errors: changes.errors.clone(),
            ..WorkflowReport::default()
        };
        if changes.is_empty() {
            return Ok(report);
        }

        self.step(op, 2, 3, "export", "exporting changed chunks");
        self.export_changes(&changes, &mut manifest, &mut report)?;

        self.step(op, 3, 3, "manifest", "recording pending entries");
        manifest.save(&core_dir)?;
        Ok(report)
    }

    // ---- Commit ---------------------------------------------------------

    pub fn commit(&self, message: &str) -> Result<WorkflowReport> {
        let op = self.ops.start(&self.save, OpKind::Commit, 6)?;
        let result = self.commit_inner(op, message);
        self.finish(op, &result);
        result
    }

    fn commit_inner(&self, op: u64, message: &str) -> Result<WorkflowReport> {
        let core_dir = self.core_dir();
        if !core_dir.exists() {
            return Err(Error::NotInitialized(core_dir));
        }
        atomic::clean_stale_tmp(&core_dir)?;
        let mut manifest = Manifest::load_or_default(&core_dir)?;

        self.step(op, 1, 6, "detect", "detecting changed chunks");
        let changes = detect(&self.save, &self.config, self.vcs.as_ref(), &manifest, None)?;
        let mut report = WorkflowReport {
            errors: changes.errors.clone(),
            ..WorkflowReport::default()
        };

        self.step(op, 2, 6, "export", "exporting changed chunks");
        let exported = self.export_changes(&changes, &mut manifest, &mut report)?;
        // The user's textual edits are committed as they stand.
        for rel in &changes.core_edited {
            manifest.put(rel.clone(), CommitRef::Pending);
        }

        self.step(op, 3, 6, "stage", "staging core changes");
        manifest.save(&core_dir)?;
        // Stage exactly the changed SNBT and the manifest. The working
        // tree is deliberately missing files from earlier commits; a
        // stage-everything here would commit their deletion.
        let mut staged: BTreeSet<String> = BTreeSet::new();
        staged.extend(exported.written);
        staged.extend(exported.removed);
        staged.extend(changes.core_edited.iter().cloned());
        // Pending entries recorded by an earlier translate run (including
        // tombstones, whose files are already gone) still await staging.
        for (path, state) in manifest.iter() {
            if state.commit.is_pending() {
                staged.insert(path.to_string());
            }
        }
        staged.insert(MANIFEST_FILE.to_string());
        for rel in &staged {
            self.vcs.stage(&core_dir, rel)?;
        }

        self.step(op, 4, 6, "commit", message);
        let first = self.vcs.commit(&core_dir, message)?;
        let resolved = manifest.resolve_pending(&first)?;
        manifest.save(&core_dir)?;
        self.vcs.stage(&core_dir, MANIFEST_FILE)?;
        let hash = self.vcs.amend(&core_dir, None)?;
        info!("committed {hash}, resolved {resolved} pending entries");
        report.commit = Some(hash);

        self.step(op, 5, 6, "rebuild", "rebuilding regions from edited snbt");
        self.rebuild_edited_regions(&changes, &manifest, &mut report)?;

        if !self.vcs.stage_all(&self.save)?.is_empty() {
            match self.vcs.commit(&self.save, message) {
                Ok(_) | Err(Error::NothingToCommit) => {}
                Err(e) => return Err(e),
            }
        }

        self.step(op, 6, 6, "cleanup", "trimming the core working tree");
        for rel in &staged {
            if rel.as_str() == MANIFEST_FILE {
                continue;
            }
            let path = core_dir.join(rel);
            if path.is_file() {
                fs::remove_file(path)?;
            }
        }
        Ok(report)
    }

    // ---- Reconstruct ----------------------------------------------------

    /// Materialize the core tree as of `hash` into `out`. Paths whose
    /// content is unavailable are reported, not fatal for the others.
    pub fn reconstruct(&self, hash: &str, out: &Path) -> Result<ReconstructReport> {
        let core_dir = self.core_dir();
        if !core_dir.exists() {
            return Err(Error::NotInitialized(core_dir));
        }

        let (manifest, fallback) = match self.vcs.show_at(&core_dir, MANIFEST_FILE, hash)? {
            Some(bytes) => (Manifest::from_json(&bytes)?, false),
            None => (Manifest::load_or_default(&core_dir)?, true),
        };

        // From the manifest as of `hash`, every entry is live state. From
        // the fallback manifest, entries written after `hash` must be
        // filtered out by ancestry.
        let targets: Vec<(String, CommitRef)> = if fallback {
            manifest
                .active_paths_at(hash, self.vcs.as_ref(), &core_dir)?
                .into_iter()
                .map(|a| (a.path, a.commit))
                .collect()
        } else {
            manifest
                .iter()
                .filter(|(_, state)| !state.deleted)
                .map(|(path, state)| (path.to_string(), state.commit.clone()))
                .collect()
        };

        let mut report = ReconstructReport::default();
        let total = targets.len();
        for (i, (path, commit)) in targets.iter().enumerate() {
            self.cancel.check()?;
            // A pending entry inside a committed manifest snapshot was
            // resolved by that very commit.
            let at = commit.as_hash().unwrap_or(hash);
            match self.vcs.show_at(&core_dir, path, at) {
                Ok(Some(bytes)) => {
                    atomic::write_atomic(&out.join(path), &bytes)?;
                    report.written += 1;
                }
                Ok(None) => report.missing.push(path.clone()),
                Err(Error::CommitNotFound(_)) => report.missing.push(path.clone()),
                Err(e) => return Err(e),
            }
            self.emit("reconstruct", i + 1, total, path);
        }
        Ok(report)
    }

    // ---- Status ---------------------------------------------------------

    /// Pending and detected-change counts, for the CLI status verb.
    pub fn status(&self) -> Result<StatusSummary> {
        let core_dir = self.core_dir();
        if !core_dir.exists() {
            return Err(Error::NotInitialized(core_dir));
        }
        let manifest = Manifest::load_or_default(&core_dir)?;
        let changes = detect(&self.save, &self.config, self.vcs.as_ref(), &manifest, None)?;
        Ok(StatusSummary {
            pending: manifest.pending_count(),
            changed_chunks: changes.changed_chunks(),
            deleted_chunks: changes.deleted_chunks(),
            changed_files: changes.non_region.len(),
            core_edited: changes.core_edited.len(),
        })
    }

    // ---- Shared phases --------------------------------------------------

    fn export_changes(
        &self,
        changes: &ChangeSet,
        manifest: &mut Manifest,
        report: &mut WorkflowReport,
    ) -> Result<ExportOutcome> {
        let core_dir = self.core_dir();
        let mut outcome = ExportOutcome::default();
        let total = changes.regions.len();
        for (i, delta) in changes.regions.iter().enumerate() {
            self.cancel.check()?;
            let started = Instant::now();

            if !delta.changed.is_empty() {
                let folder = core_dir
                    .join(&delta.dim)
                    .join(region_file_name(RCoord(delta.rx), RCoord(delta.rz)));
                let exploded =
                    explode_chunks(&self.save.join(&delta.rel_path), &folder, &delta.changed)?;
                report.warnings.extend(exploded.warnings);
                for path in exploded.written {
                    let rel = core_rel(&core_dir, &path);
                    manifest.put(rel.clone(), CommitRef::Pending);
                    outcome.written.push(rel);
                    report.exported += 1;
                }
            }
            for &(cx, cz) in &delta.deleted {
                let rel = delta.chunk_rel_path(cx, cz);
                let disk = core_dir.join(&rel);
                if disk.is_file() {
                    fs::remove_file(disk)?;
                }
                manifest.put_deleted(rel.clone(), CommitRef::Pending);
                outcome.removed.push(rel);
            }

            if started.elapsed() > self.config.chunk_time_budget {
                report
                    .warnings
                    .push(format!("{}: translation exceeded time budget", delta.rel_path));
            }
            self.emit("export", i + 1, total, &delta.rel_path);
        }

        for delta in &changes.non_region {
            self.cancel.check()?;
            self.project_non_region(delta, manifest, report, &mut outcome)?;
        }
        Ok(outcome)
    }

    /// Project one non-region file into the core tree: `.dat`/`.nbt` as
    /// SNBT under `data/`, `.json`/`.txt` verbatim under `misc/`.
    fn project_non_region(
        &self,
        delta: &NonRegionDelta,
        manifest: &mut Manifest,
        report: &mut WorkflowReport,
        outcome: &mut ExportOutcome,
    ) -> Result<()> {
        let core_dir = self.core_dir();
        let target_rel = delta.core_path();
        let target = core_dir.join(&target_rel);

        if delta.deleted {
            if target.is_file() {
                fs::remove_file(&target)?;
            }
            if manifest.get(&target_rel).is_some() {
                manifest.put_deleted(target_rel.clone(), CommitRef::Pending);
                outcome.removed.push(target_rel);
            }
            return Ok(());
        }

        match delta.kind {
            NonRegionKind::Translate => {
                let doc = match gitmc_nbt::read_nbt_file(&self.save.join(&delta.rel_path)) {
                    Ok(doc) => doc,
                    Err(e) => {
                        report.errors.push(format!("{}: {e}", delta.rel_path));
                        return Ok(());
                    }
                };
                let text = gitmc_snbt::to_string(&doc.root, &SnbtOptions::expanded());
                atomic::write_atomic(&target, text.as_bytes())?;
            }
            NonRegionKind::Copy => {
                let bytes = fs::read(self.save.join(&delta.rel_path))?;
                atomic::write_atomic(&target, &bytes)?;
            }
        }
        manifest.put(target_rel.clone(), CommitRef::Pending);
        outcome.written.push(target_rel);
        report.exported += 1;
        Ok(())
    }

    /// Rebuild every region whose chunk SNBT was edited by hand, so the
    /// game sees the textual change. The working tree is lean, so sibling
    /// chunks are materialized from history first, then tidied away.
    fn rebuild_edited_regions(
        &self,
        changes: &ChangeSet,
        manifest: &Manifest,
        report: &mut WorkflowReport,
    ) -> Result<()> {
        let core_dir = self.core_dir();

        let mut folders: BTreeSet<(String, String)> = BTreeSet::new();
        for rel in &changes.core_edited {
            let mut parts = rel.split('/');
            if let (Some(dim), Some(folder), Some(file), None) =
                (parts.next(), parts.next(), parts.next(), parts.next())
            {
                if DIMENSION_DIRS.contains(&dim)
                    && file.starts_with("chunk_")
                    && file.ends_with(".snbt")
                {
                    folders.insert((dim.to_string(), folder.to_string()));
                }
            }
        }

        for (dim, folder_name) in folders {
            self.cancel.check()?;
            let folder = core_dir.join(&dim).join(&folder_name);
            let prefix = format!("{dim}/{folder_name}/");

            let mut materialized: Vec<PathBuf> = Vec::new();
            for (path, state) in manifest.iter_under(&prefix) {
                if state.deleted {
                    continue;
                }
                let disk = core_dir.join(path);
                if disk.exists() {
                    continue;
                }
                let hash = match state.commit.as_hash() {
                    Some(hash) => hash,
                    None => continue,
                };
                match self.vcs.show_at(&core_dir, path, hash)? {
                    Some(bytes) => {
                        atomic::write_atomic(&disk, &bytes)?;
                        materialized.push(disk);
                    }
                    None => report
                        .warnings
                        .push(format!("{path}: content missing at {hash}")),
                }
            }

            let dest = self.save.join(&dim).join(&folder_name);
            match combine_region(&folder, &dest) {
                Ok(outcome) => {
                    report.warnings.extend(outcome.warnings);
                    info!(
                        "rebuilt {} from {} chunk files",
                        dest.display(),
                        outcome.chunks
                    );
                }
                Err(e) => {
                    // The commit already exists; leave the region for the
                    // next run to reconcile rather than failing it all.
                    report.errors.push(format!("{prefix}: {e}"));
                }
            }

            for path in materialized {
                if path.is_file() {
                    fs::remove_file(path)?;
                }
            }
        }
        Ok(())
    }

    /// Save-relative candidate data files, walking around the region
    /// subtrees, the core directory and the volatile directories.
    fn collect_data_files(&self) -> Result<Vec<String>> {
        let mut out = Vec::new();
        self.walk_data_dir(&self.save, "", &mut out)?;
        out.sort();
        Ok(out)
    }

    fn walk_data_dir(&self, dir: &Path, rel: &str, out: &mut Vec<String>) -> Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };
            let child_rel = if rel.is_empty() {
                name.clone()
            } else {
                format!("{rel}/{name}")
            };
            if path.is_dir() {
                if name == ".git" {
                    continue;
                }
                if rel.is_empty()
                    && (DIMENSION_DIRS.contains(&name.as_str())
                        || VOLATILE_DIRS.contains(&name.as_str())
                        || name == self.config.core_dir_name)
                {
                    continue;
                }
                self.walk_data_dir(&path, &child_rel, out)?;
            } else if matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("dat") | Some("nbt") | Some("json") | Some("txt")
            ) {
                out.push(child_rel);
            }
        }
        Ok(())
    }
}

/// Core-relative forward-slash form of a path under the core directory.
fn core_rel(core_dir: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(core_dir).unwrap_or(path);
    rel.to_string_lossy().replace('\\', "/")
}
