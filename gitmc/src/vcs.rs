use std::path::Path;

use git2::{BranchType, ErrorCode, IndexAddOption, Oid, Repository, Signature, StatusOptions};

use crate::error::{Error, Result};

/// Working-tree status, paths forward-slash and relative to the
/// repository root.
#[derive(Debug, Clone, Default)]
pub struct VcsStatus {
    pub modified: Vec<String>,
    pub untracked: Vec<String>,
    pub deleted: Vec<String>,
    pub staged: Vec<String>,
    pub branch: Option<String>,
    pub ahead: usize,
    pub behind: usize,
}

impl VcsStatus {
    pub fn is_clean(&self) -> bool {
        self.modified.is_empty()
            && self.untracked.is_empty()
            && self.deleted.is_empty()
            && self.staged.is_empty()
    }
}

/// The narrow surface the core depends on. Every call takes the working
/// directory of the repository it addresses; the save repository and the
/// core repository must never leak into each other.
pub trait Vcs: Send + Sync {
    fn init(&self, dir: &Path) -> Result<()>;
    fn status(&self, dir: &Path) -> Result<VcsStatus>;
    fn stage(&self, dir: &Path, path: &str) -> Result<()>;
    /// Stage everything, returning the paths newly staged.
    fn stage_all(&self, dir: &Path) -> Result<Vec<String>>;
    fn unstage(&self, dir: &Path, path: &str) -> Result<()>;
    fn commit(&self, dir: &Path, message: &str) -> Result<String>;
    /// Rewrite HEAD with the current index; a `None` message preserves
    /// the original message and authorship.
    fn amend(&self, dir: &Path, message: Option<&str>) -> Result<String>;
    /// `None` only for an unborn branch.
    fn current_hash(&self, dir: &Path) -> Result<Option<String>>;
    /// The bytes of `path` as of `hash`, or `None` if the path did not
    /// exist at that commit.
    fn show_at(&self, dir: &Path, path: &str, hash: &str) -> Result<Option<Vec<u8>>>;
    fn is_ancestor(&self, dir: &Path, ancestor: &str, descendant: &str) -> Result<bool>;
    /// Whether commits can be authored at all.
    fn has_identity(&self) -> bool;
}

/// libgit2-backed implementation.
///
/// Identity normally comes from git configuration; tests (or embedders)
/// can inject one so they do not depend on host configuration.
#[derive(Default)]
pub struct GitBackend {
    identity: Option<(String, String)>,
}

impl GitBackend {
    pub fn new() -> GitBackend {
        GitBackend::default()
    }

    pub fn with_identity(name: impl Into<String>, email: impl Into<String>) -> GitBackend {
        GitBackend {
            identity: Some((name.into(), email.into())),
        }
    }

    fn open(dir: &Path) -> Result<Repository> {
        Ok(Repository::open(dir)?)
    }

    fn signature(&self, repo: &Repository) -> Result<Signature<'static>> {
        match &self.identity {
            Some((name, email)) => Ok(Signature::now(name, email)?),
            None => repo.signature().map_err(|_| Error::IdentityMissing),
        }
    }

    fn parse_oid(hash: &str) -> Result<Oid> {
        Oid::from_str(hash).map_err(|_| Error::CommitNotFound(hash.to_string()))
    }
}

impl Vcs for GitBackend {
    fn init(&self, dir: &Path) -> Result<()> {
        Repository::init(dir)?;
        Ok(())
    }

    fn status(&self, dir: &Path) -> Result<VcsStatus> {
        let repo = Self::open(dir)?;
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .exclude_submodules(true);

        let mut out = VcsStatus::default();
        for entry in repo.statuses(Some(&mut opts))?.iter() {
            let path = match entry.path() {
                Some(p) => p.to_string(),
                None => continue,
            };
            let s = entry.status();
            if s.contains(git2::Status::WT_NEW) {
                out.untracked.push(path.clone());
            }
            if s.contains(git2::Status::WT_MODIFIED) {
                out.modified.push(path.clone());
            }
            if s.contains(git2::Status::WT_DELETED) {
                out.deleted.push(path.clone());
            }
            if s.intersects(
                git2::Status::INDEX_NEW
                    | git2::Status::INDEX_MODIFIED
                    | git2::Status::INDEX_DELETED,
            ) {
                out.staged.push(path);
            }
        }

        if let Ok(head) = repo.head() {
            out.branch = head.shorthand().map(String::from);
            if let (Some(name), Some(local)) = (head.shorthand(), head.target()) {
                if let Ok(branch) = repo.find_branch(name, BranchType::Local) {
                    if let Some(upstream) =
                        branch.upstream().ok().and_then(|u| u.get().target())
                    {
                        let (ahead, behind) = repo.graph_ahead_behind(local, upstream)?;
                        out.ahead = ahead;
                        out.behind = behind;
                    }
                }
            }
        }
        Ok(out)
    }

    fn stage(&self, dir: &Path, path: &str) -> Result<()> {
        let repo = Self::open(dir)?;
        let mut index = repo.index()?;
        if dir.join(path).exists() {
            index.add_path(Path::new(path))?;
        } else {
            // Staging the removal of a path the index never held is a
            // no-op, not an error.
            match index.remove_path(Path::new(path)) {
                Ok(()) => {}
                Err(e) if e.code() == ErrorCode::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        index.write()?;
        Ok(())
    }

    fn stage_all(&self, dir: &Path) -> Result<Vec<String>> {
        let repo = Self::open(dir)?;
        let mut index = repo.index()?;
        let mut staged = Vec::new();
        {
            let mut record = |path: &Path, _pathspec: &[u8]| -> i32 {
                if let Some(p) = path.to_str() {
                    staged.push(p.to_string());
                }
                0
            };
            index.add_all(["*"].iter(), IndexAddOption::DEFAULT, Some(&mut record))?;
            // add_all covers new and changed files; update_all records
            // modifications and deletions of already tracked paths.
            index.update_all(["*"].iter(), Some(&mut record))?;
        }
        index.write()?;
        staged.sort();
        staged.dedup();
        Ok(staged)
    }

    fn unstage(&self, dir: &Path, path: &str) -> Result<()> {
        let repo = Self::open(dir)?;
        let staged = repo.status_file(Path::new(path)).map(|s| {
            s.intersects(
                git2::Status::INDEX_NEW
                    | git2::Status::INDEX_MODIFIED
                    | git2::Status::INDEX_DELETED,
            )
        });
        if !staged.unwrap_or(false) {
            return Err(Error::NotStaged(path.to_string()));
        }

        match repo.head() {
            Ok(head) => {
                let target = head.peel(git2::ObjectType::Commit)?;
                repo.reset_default(Some(&target), [path])?;
            }
            Err(_) => {
                let mut index = repo.index()?;
                index.remove_path(Path::new(path))?;
                index.write()?;
            }
        }
        Ok(())
    }

    fn commit(&self, dir: &Path, message: &str) -> Result<String> {
        let repo = Self::open(dir)?;
        let sig = self.signature(&repo)?;
        let mut index = repo.index()?;
        let tree_id = index.write_tree()?;
        let tree = repo.find_tree(tree_id)?;

        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        match &parent {
            Some(parent) if parent.tree_id() == tree_id => return Err(Error::NothingToCommit),
            None if tree.iter().next().is_none() => return Err(Error::NothingToCommit),
            _ => {}
        }

        let parents: Vec<&git2::Commit> = parent.iter().collect();
        let oid = repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?;
        Ok(oid.to_string())
    }

    fn amend(&self, dir: &Path, message: Option<&str>) -> Result<String> {
        let repo = Self::open(dir)?;
        let head = repo
            .head()
            .map_err(|_| Error::Vcs("cannot amend: no parent commit".to_string()))?
            .peel_to_commit()?;
        let mut index = repo.index()?;
        let tree_id = index.write_tree()?;
        let tree = repo.find_tree(tree_id)?;
        let oid = head.amend(Some("HEAD"), None, None, None, message, Some(&tree))?;
        Ok(oid.to_string())
    }

    fn current_hash(&self, dir: &Path) -> Result<Option<String>> {
        let repo = Self::open(dir)?;
        let result = match repo.head() {
            Ok(head) => Ok(head.target().map(|oid| oid.to_string())),
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        };
        result
    }

    fn show_at(&self, dir: &Path, path: &str, hash: &str) -> Result<Option<Vec<u8>>> {
        let repo = Self::open(dir)?;
        let oid = Self::parse_oid(hash)?;
        let commit = repo
            .find_commit(oid)
            .map_err(|_| Error::CommitNotFound(hash.to_string()))?;
        let tree = commit.tree()?;
        let entry = match tree.get_path(Path::new(path)) {
            Ok(entry) => entry,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let object = entry.to_object(&repo)?;
        match object.as_blob() {
            Some(blob) => Ok(Some(blob.content().to_vec())),
            None => Ok(None),
        }
    }

    fn is_ancestor(&self, dir: &Path, ancestor: &str, descendant: &str) -> Result<bool> {
        let repo = Self::open(dir)?;
        let ancestor = Self::parse_oid(ancestor)?;
        let descendant = Self::parse_oid(descendant)?;
        if ancestor == descendant {
            return Ok(true);
        }
        Ok(repo.graph_descendant_of(descendant, ancestor)?)
    }

    fn has_identity(&self) -> bool {
        if self.identity.is_some() {
            return true;
        }
        git2::Config::open_default()
            .map(|config| {
                config.get_string("user.name").is_ok()
                    && config.get_string("user.email").is_ok()
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn backend() -> GitBackend {
        GitBackend::with_identity("Test User", "test@example.invalid")
    }

    #[test]
    fn init_commit_and_show_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let vcs = backend();
        vcs.init(dir.path()).unwrap();
        assert_eq!(vcs.current_hash(dir.path()).unwrap(), None);

        fs::write(dir.path().join("a.txt"), "one\n").unwrap();
        let staged = vcs.stage_all(dir.path()).unwrap();
        assert_eq!(staged, vec!["a.txt".to_string()]);

        let hash = vcs.commit(dir.path(), "first").unwrap();
        assert_eq!(vcs.current_hash(dir.path()).unwrap(), Some(hash.clone()));
        assert_eq!(
            vcs.show_at(dir.path(), "a.txt", &hash).unwrap().unwrap(),
            b"one\n"
        );
        assert!(vcs
            .show_at(dir.path(), "missing.txt", &hash)
            .unwrap()
            .is_none());
    }

    #[test]
    fn status_classifies_changes() {
        let dir = tempfile::tempdir().unwrap();
        let vcs = backend();
        vcs.init(dir.path()).unwrap();
        fs::write(dir.path().join("tracked.txt"), "v1").unwrap();
        vcs.stage_all(dir.path()).unwrap();
        vcs.commit(dir.path(), "base").unwrap();

        fs::write(dir.path().join("tracked.txt"), "v2").unwrap();
        fs::write(dir.path().join("new.txt"), "new").unwrap();

        let status = vcs.status(dir.path()).unwrap();
        assert_eq!(status.modified, vec!["tracked.txt".to_string()]);
        assert_eq!(status.untracked, vec!["new.txt".to_string()]);
        assert!(status.deleted.is_empty());

        fs::remove_file(dir.path().join("tracked.txt")).unwrap();
        let status = vcs.status(dir.path()).unwrap();
        assert_eq!(status.deleted, vec!["tracked.txt".to_string()]);
    }

    #[test]
    fn empty_index_refuses_to_commit() {
        let dir = tempfile::tempdir().unwrap();
        let vcs = backend();
        vcs.init(dir.path()).unwrap();
        assert!(matches!(
            vcs.commit(dir.path(), "nothing"),
            Err(Error::NothingToCommit)
        ));

        fs::write(dir.path().join("a.txt"), "x").unwrap();
        vcs.stage_all(dir.path()).unwrap();
        vcs.commit(dir.path(), "first").unwrap();
        assert!(matches!(
            vcs.commit(dir.path(), "again"),
            Err(Error::NothingToCommit)
        ));
    }

    #[test]
    fn amend_rewrites_head_and_preserves_message() {
        let dir = tempfile::tempdir().unwrap();
        let vcs = backend();
        vcs.init(dir.path()).unwrap();
        fs::write(dir.path().join("a.txt"), "x").unwrap();
        vcs.stage_all(dir.path()).unwrap();
        let first = vcs.commit(dir.path(), "message kept").unwrap();

        fs::write(dir.path().join("b.txt"), "y").unwrap();
        vcs.stage_all(dir.path()).unwrap();
        let amended = vcs.amend(dir.path(), None).unwrap();

        assert_ne!(first, amended);
        assert_eq!(vcs.current_hash(dir.path()).unwrap(), Some(amended.clone()));
        // Both files are in the amended commit.
        assert!(vcs.show_at(dir.path(), "b.txt", &amended).unwrap().is_some());
        // The pre-amend commit still resolves in the object store.
        assert!(vcs.show_at(dir.path(), "a.txt", &first).unwrap().is_some());
    }

    #[test]
    fn ancestry_is_reflexive_and_transitive() {
        let dir = tempfile::tempdir().unwrap();
        let vcs = backend();
        vcs.init(dir.path()).unwrap();
        fs::write(dir.path().join("a.txt"), "1").unwrap();
        vcs.stage_all(dir.path()).unwrap();
        let first = vcs.commit(dir.path(), "one").unwrap();

        fs::write(dir.path().join("a.txt"), "2").unwrap();
        vcs.stage_all(dir.path()).unwrap();
        let second = vcs.commit(dir.path(), "two").unwrap();

        assert!(vcs.is_ancestor(dir.path(), &first, &second).unwrap());
        assert!(vcs.is_ancestor(dir.path(), &first, &first).unwrap());
        assert!(!vcs.is_ancestor(dir.path(), &second, &first).unwrap());
    }

    #[test]
    fn unstage_requires_a_staged_path() {
        let dir = tempfile::tempdir().unwrap();
        let vcs = backend();
        vcs.init(dir.path()).unwrap();
        fs::write(dir.path().join("a.txt"), "x").unwrap();
        assert!(matches!(
            vcs.unstage(dir.path(), "a.txt"),
            Err(Error::NotStaged(_))
        ));

        vcs.stage(dir.path(), "a.txt").unwrap();
        vcs.unstage(dir.path(), "a.txt").unwrap();
        let status = vcs.status(dir.path()).unwrap();
        assert!(status.staged.is_empty());
        assert_eq!(status.untracked, vec!["a.txt".to_string()]);
    }

    #[test]
    fn stage_all_reports_newly_staged_paths() {
        let dir = tempfile::tempdir().unwrap();
        let vcs = backend();
        vcs.init(dir.path()).unwrap();
        fs::write(dir.path().join("a.txt"), "x").unwrap();
        fs::write(dir.path().join("b.txt"), "y").unwrap();
        let staged = vcs.stage_all(dir.path()).unwrap();
        assert_eq!(staged, vec!["a.txt".to_string(), "b.txt".to_string()]);
        vcs.commit(dir.path(), "base").unwrap();

        fs::remove_file(dir.path().join("b.txt")).unwrap();
        let staged = vcs.stage_all(dir.path()).unwrap();
        assert_eq!(staged, vec!["b.txt".to_string()]);
    }
}
