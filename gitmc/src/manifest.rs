use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::atomic;
use crate::error::{Error, Result};
use crate::vcs::Vcs;

/// File name of the manifest inside the core directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// The commit a manifest entry points at. `Pending` means the file has
/// been written or changed but not yet committed; a single commit
/// transition per workflow run resolves every pending entry to the same
/// concrete hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitRef {
    Pending,
    Hash(String),
}

impl CommitRef {
    /// A validated concrete hash: 40 lowercase hex characters.
    pub fn hash(s: impl Into<String>) -> Result<CommitRef> {
        let s = s.into();
        if !is_valid_hash(&s) {
            return Err(Error::ManifestSchema(format!(
                "not a commit hash: {s:?}"
            )));
        }
        Ok(CommitRef::Hash(s))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, CommitRef::Pending)
    }

    pub fn as_hash(&self) -> Option<&str> {
        match self {
            CommitRef::Hash(h) => Some(h),
            CommitRef::Pending => None,
        }
    }
}

impl fmt::Display for CommitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitRef::Pending => f.write_str("pending"),
            CommitRef::Hash(h) => f.write_str(h),
        }
    }
}

fn is_valid_hash(s: &str) -> bool {
    s.len() == 40
        && s.bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

impl Serialize for CommitRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            CommitRef::Pending => serializer.serialize_str("pending"),
            CommitRef::Hash(h) => serializer.serialize_str(h),
        }
    }
}

impl<'de> Deserialize<'de> for CommitRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s == "pending" {
            Ok(CommitRef::Pending)
        } else if is_valid_hash(&s) {
            Ok(CommitRef::Hash(s))
        } else {
            Err(D::Error::custom(format!(
                "commit must be \"pending\" or 40 lowercase hex chars, got {s:?}"
            )))
        }
    }
}

/// One manifest entry as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub path: String,
    pub commit: CommitRef,
    pub deleted: bool,
}

/// The in-memory state of one path.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryState {
    pub commit: CommitRef,
    pub deleted: bool,
}

/// An active path resolved by [`Manifest::active_paths_at`].
#[derive(Debug, Clone, PartialEq)]
pub struct ActivePath {
    pub path: String,
    pub commit: CommitRef,
}

#[derive(Serialize, Deserialize)]
struct ManifestFile {
    entries: Vec<ManifestEntry>,
}

/// Insertion-ordered mapping from a relative SNBT path (forward slashes,
/// rooted at the core directory) to the commit that last wrote it. Stored
/// on disk as an ordered array so the order survives hosts whose native
/// maps are unordered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    entries: IndexMap<String, EntryState>,
}

impl Manifest {
    pub fn new() -> Manifest {
        Manifest::default()
    }

    pub fn get(&self, path: &str) -> Option<&EntryState> {
        self.entries.get(path)
    }

    /// Insert or replace a live entry.
    pub fn put(&mut self, path: impl Into<String>, commit: CommitRef) {
        self.entries.insert(
            path.into(),
            EntryState {
                commit,
                deleted: false,
            },
        );
    }

    /// Insert or replace a tombstone.
    pub fn put_deleted(&mut self, path: impl Into<String>, commit: CommitRef) {
        self.entries.insert(
            path.into(),
            EntryState {
                commit,
                deleted: true,
            },
        );
    }

    /// Resolve every pending entry to the given hash, returning how many
    /// entries changed.
    pub fn resolve_pending(&mut self, hash: &str) -> Result<usize> {
        let commit = CommitRef::hash(hash)?;
        let mut count = 0;
        for state in self.entries.values_mut() {
            if state.commit.is_pending() {
                state.commit = commit.clone();
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn pending_count(&self) -> usize {
        self.entries
            .values()
            .filter(|s| s.commit.is_pending())
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EntryState)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Entries whose path lives under the given forward-slash prefix.
    pub fn iter_under<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a EntryState)> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.as_str(), v))
    }

    /// The set of live paths as of `commit`: entries whose recorded
    /// commit equals it or is one of its ancestors, skipping tombstones
    /// and unresolved entries. Ancestry is the VCS backend's call.
    pub fn active_paths_at(
        &self,
        commit: &str,
        vcs: &dyn Vcs,
        dir: &Path,
    ) -> Result<Vec<ActivePath>> {
        let mut out = Vec::new();
        for (path, state) in &self.entries {
            if state.deleted {
                continue;
            }
            let hash = match state.commit.as_hash() {
                Some(h) => h,
                None => continue,
            };
            if hash == commit || vcs.is_ancestor(dir, hash, commit)? {
                out.push(ActivePath {
                    path: path.clone(),
                    commit: state.commit.clone(),
                });
            }
        }
        Ok(out)
    }

    /// Parse the persisted JSON form, rejecting duplicate paths.
    pub fn from_json(bytes: &[u8]) -> Result<Manifest> {
        let file: ManifestFile = serde_json::from_slice(bytes)
            .map_err(|e| Error::ManifestSchema(e.to_string()))?;
        let mut entries = IndexMap::with_capacity(file.entries.len());
        for entry in file.entries {
            let state = EntryState {
                commit: entry.commit,
                deleted: entry.deleted,
            };
            if entries.insert(entry.path.clone(), state).is_some() {
                return Err(Error::ManifestSchema(format!(
                    "duplicate path: {}",
                    entry.path
                )));
            }
        }
        Ok(Manifest { entries })
    }

    /// Pretty-printed JSON, human-diffable.
    pub fn to_json(&self) -> String {
        let file = ManifestFile {
            entries: self
                .entries
                .iter()
                .map(|(path, state)| ManifestEntry {
                    path: path.clone(),
                    commit: state.commit.clone(),
                    deleted: state.deleted,
                })
                .collect(),
        };
        // Serialization of this shape cannot fail.
        serde_json::to_string_pretty(&file).unwrap_or_else(|_| "{\"entries\":[]}".to_string())
    }

    /// Load `manifest.json` from the core directory.
    pub fn load(core_dir: &Path) -> Result<Manifest> {
        let bytes = std::fs::read(core_dir.join(MANIFEST_FILE))?;
        Manifest::from_json(&bytes)
    }

    /// Load, or start empty when the file does not exist yet.
    pub fn load_or_default(core_dir: &Path) -> Result<Manifest> {
        match std::fs::read(core_dir.join(MANIFEST_FILE)) {
            Ok(bytes) => Manifest::from_json(&bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Manifest::new()),
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Persist to the core directory through the atomic writer.
    pub fn save(&self, core_dir: &Path) -> Result<()> {
        let mut text = self.to_json();
        text.push('\n');
        atomic::write_atomic(&core_dir.join(MANIFEST_FILE), text.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const HASH_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    #[test]
    fn put_and_resolve_pending() {
        let mut m = Manifest::new();
        m.put("region/r.0.0.mca/chunk_0_0.snbt", CommitRef::Pending);
        m.put("data/level.dat.snbt", CommitRef::Pending);
        m.put("data/raids.dat.snbt", CommitRef::hash(HASH_A).unwrap());
        assert_eq!(m.pending_count(), 2);

        let resolved = m.resolve_pending(HASH_B).unwrap();
        assert_eq!(resolved, 2);
        assert_eq!(m.pending_count(), 0);
        assert_eq!(
            m.get("data/level.dat.snbt").unwrap().commit.as_hash(),
            Some(HASH_B)
        );
        assert_eq!(
            m.get("data/raids.dat.snbt").unwrap().commit.as_hash(),
            Some(HASH_A)
        );
    }

    #[test]
    fn json_round_trip_preserves_order() {
        let mut m = Manifest::new();
        m.put("zebra.snbt", CommitRef::hash(HASH_A).unwrap());
        m.put("apple.snbt", CommitRef::Pending);
        m.put_deleted("gone.snbt", CommitRef::hash(HASH_B).unwrap());

        let json = m.to_json();
        let back = Manifest::from_json(json.as_bytes()).unwrap();
        assert_eq!(back, m);
        let paths: Vec<&str> = back.iter().map(|(p, _)| p).collect();
        assert_eq!(paths, vec!["zebra.snbt", "apple.snbt", "gone.snbt"]);
    }

    #[test]
    fn json_shape_matches_contract() {
        let mut m = Manifest::new();
        m.put(
            "region/r.0.-1.mca/chunk_12_-47.snbt",
            CommitRef::hash(HASH_A).unwrap(),
        );
        let json = m.to_json();
        assert!(json.contains("\"entries\""));
        assert!(json.contains("\"path\": \"region/r.0.-1.mca/chunk_12_-47.snbt\""));
        assert!(json.contains(&format!("\"commit\": \"{HASH_A}\"")));
        assert!(json.contains("\"deleted\": false"));
    }

    #[test]
    fn pending_serializes_as_the_sentinel() {
        let mut m = Manifest::new();
        m.put("a.snbt", CommitRef::Pending);
        assert!(m.to_json().contains("\"commit\": \"pending\""));
    }

    #[test]
    fn bad_hashes_are_rejected() {
        assert!(CommitRef::hash("short").is_err());
        assert!(CommitRef::hash("G".repeat(40)).is_err());
        assert!(CommitRef::hash(HASH_A.to_uppercase()).is_err());
        assert!(CommitRef::hash(HASH_A).is_ok());

        let json = format!(
            "{{\"entries\":[{{\"path\":\"a\",\"commit\":\"{}\",\"deleted\":false}}]}}",
            "Z".repeat(40)
        );
        assert!(Manifest::from_json(json.as_bytes()).is_err());
    }

    #[test]
    fn duplicate_paths_are_rejected() {
        let json = format!(
            "{{\"entries\":[\
             {{\"path\":\"a.snbt\",\"commit\":\"{HASH_A}\",\"deleted\":false}},\
             {{\"path\":\"a.snbt\",\"commit\":\"{HASH_B}\",\"deleted\":false}}]}}"
        );
        assert!(matches!(
            Manifest::from_json(json.as_bytes()),
            Err(Error::ManifestSchema(_))
        ));
    }

    #[test]
    fn save_and_load(){
        let dir = tempfile::tempdir().unwrap();
        let mut m = Manifest::new();
        m.put("data/level.dat.snbt", CommitRef::hash(HASH_A).unwrap());
        m.save(dir.path()).unwrap();
        assert_eq!(Manifest::load(dir.path()).unwrap(), m);
        assert!(Manifest::load_or_default(&dir.path().join("missing")).unwrap().is_empty());
    }
}
