//! Configuration management for jarsign-cache

pub mod schema;

pub use schema::Config;

use crate::cache::cache_root_for;
use crate::error::{JarsignError, JarsignResult};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "jarsign.toml";

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_FILE),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Load configuration, using defaults if the file does not exist
    pub async fn load(&self) -> JarsignResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> JarsignResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| JarsignError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| JarsignError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Expand a leading `~/` to the user's home directory
pub fn expand_home(path: impl AsRef<str>) -> PathBuf {
    let path = path.as_ref();
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

impl Config {
    /// The cache namespace id, validated as a single path component
    pub fn cache_id(&self) -> JarsignResult<&str> {
        let id = self
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(JarsignError::ConfigMissing("id"))?;

        let mut components = Path::new(id).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(id),
            _ => Err(JarsignError::OptionInvalid {
                option: "id",
                reason: format!("'{}' must be a plain directory name", id),
            }),
        }
    }

    /// The archive directory, with `~/` expanded and relative paths
    /// resolved against `base`
    pub fn jar_directory_in(&self, base: &Path) -> JarsignResult<PathBuf> {
        let dir = self
            .jar_directory
            .as_ref()
            .ok_or(JarsignError::ConfigMissing("jar_directory"))?;
        let dir = expand_home(dir.to_string_lossy());
        Ok(if dir.is_absolute() { dir } else { base.join(dir) })
    }

    /// Artifact repository root, defaulting to `~/.m2/repository`
    pub fn repository_root(&self) -> PathBuf {
        match &self.repository {
            Some(repo) => expand_home(repo.to_string_lossy()),
            None => dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".m2")
                .join("repository"),
        }
    }

    /// Root directory holding all cache namespaces
    pub fn cache_root(&self) -> PathBuf {
        cache_root_for(&self.repository_root())
    }

    /// Number of verification workers
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    }

    /// Copy of the configuration safe to print
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        for secret in [&mut config.identity.storepass, &mut config.identity.keypass] {
            if secret.is_some() {
                *secret = Some("***".to_string());
            }
        }
        config
    }
}
