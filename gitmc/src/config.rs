use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default name of the hidden directory holding the textual projection.
pub const DEFAULT_CORE_DIR_NAME: &str = "GitMC";

/// Overrides the core directory name.
pub const ENV_CORE_DIR: &str = "GITMC_CORE_DIR";

/// Controls log verbosity, in `env_logger` filter syntax.
pub const ENV_LOG_LEVEL: &str = "GITMC_LOG_LEVEL";

/// Orchestrator configuration. One record, no per-flag indirection.
#[derive(Debug, Clone)]
pub struct Config {
    pub core_dir_name: String,
    /// Soft per-region translation budget. Exceeding it records a warning
    /// for that region; the workflow continues.
    pub chunk_time_budget: Duration,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            core_dir_name: DEFAULT_CORE_DIR_NAME.to_string(),
            chunk_time_budget: Duration::from_secs(30),
        }
    }
}

impl Config {
    /// The default configuration with environment overrides applied.
    pub fn from_env() -> Config {
        let mut config = Config::default();
        if let Ok(name) = std::env::var(ENV_CORE_DIR) {
            if !name.trim().is_empty() {
                config.core_dir_name = name;
            }
        }
        config
    }

    /// The core directory of a given save.
    pub fn core_dir(&self, save: &Path) -> PathBuf {
        save.join(&self.core_dir_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_core_dir() {
        let config = Config::default();
        assert_eq!(
            config.core_dir(Path::new("/saves/world")),
            Path::new("/saves/world/GitMC")
        );
    }
}
