//! Persisted API key.
//!
//! The key is kept in a single file so the console can start without
//! prompting. Any non-empty key the user supplies is written back.

use crate::integration::ConsoleConfig;
use crate::{Result, VoxdraftError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config_dir>/voxdraft/api_key`
    pub fn default_location() -> Result<Self> {
        let dir = dirs::config_dir().ok_or_else(|| {
            VoxdraftError::ConfigError("No configuration directory on this platform".to_string())
        })?;
        Ok(Self::new(dir.join("voxdraft").join("api_key")))
    }

    /// Store at the configured override, or the default location
    pub fn for_config(config: &ConsoleConfig) -> Result<Self> {
        match &config.credential_path {
            Some(path) => Ok(Self::new(path)),
            None => Self::default_location(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored key; `None` when missing or blank
    pub fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let key = fs::read_to_string(&self.path)?;
        let key = key.trim();
        Ok((!key.is_empty()).then(|| key.to_string()))
    }

    /// Persist `key`; blank keys are ignored
    pub fn store(&self, key: &str) -> Result<()> {
        let key = key.trim();
        if key.is_empty() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, key)?;
        debug!("Stored API key at {}", self.path.display());
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
            info!("Removed stored API key");
        }
        Ok(())
    }
}

/// Pick the key to use: `env_key` first, then the stored key, then
/// `prompt`. A prompted key is stored. Returns `None` when nothing was
/// supplied.
pub fn resolve_api_key<F>(
    store: &CredentialStore,
    env_key: Option<String>,
    prompt: F,
) -> Result<Option<String>>
where
    F: FnOnce() -> Result<String>,
{
    if let Some(key) = env_key.filter(|k| !k.trim().is_empty()) {
        debug!("Using API key from {}", API_KEY_ENV);
        return Ok(Some(key.trim().to_string()));
    }
    if let Some(key) = store.load()? {
        debug!("Using stored API key");
        return Ok(Some(key));
    }

    let key = prompt()?;
    let key = key.trim();
    if key.is_empty() {
        return Ok(None);
    }
    store.store(key)?;
    Ok(Some(key.to_string()))
}
