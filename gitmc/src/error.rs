use std::path::PathBuf;

use thiserror::Error;

/// Convenience type for Result.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors across the orchestrator and its collaborators. Per-file format
/// and integrity problems are usually aggregated as warnings instead and
/// only the ones that abort a workflow surface here.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Nbt(#[from] gitmc_nbt::Error),

    #[error(transparent)]
    Snbt(#[from] gitmc_snbt::Error),

    #[error(transparent)]
    Anvil(#[from] gitmc_anvil::Error),

    #[error("vcs identity missing: configure user.name and user.email")]
    IdentityMissing,

    #[error("not a minecraft save: {0:?} has no level.dat")]
    NotASave(PathBuf),

    #[error("already initialized: {0:?} exists")]
    AlreadyInitialized(PathBuf),

    #[error("not initialized: {0:?} does not exist")]
    NotInitialized(PathBuf),

    #[error("manifest schema violation: {0}")]
    ManifestSchema(String),

    #[error("a {running} operation is already running for {save:?}")]
    WorkflowActive { running: &'static str, save: PathBuf },

    #[error("vcs: {0}")]
    Vcs(String),

    #[error("nothing to commit")]
    NothingToCommit,

    #[error("path not staged: {0}")]
    NotStaged(String),

    #[error("commit not found: {0}")]
    CommitNotFound(String),

    #[error("reconstruction incomplete: {missing} of {total} paths unavailable")]
    PartialReconstruct { missing: usize, total: usize },

    #[error("cancelled")]
    Cancelled,
}

impl From<git2::Error> for Error {
    fn from(e: git2::Error) -> Error {
        Error::Vcs(e.message().to_string())
    }
}
