//! # Configuration
//!
//! Where the backing file lives and how it is accessed.
//!
//! Backing path precedence:
//! 1. `--file` (or `MNEMOGRAPH_FILE_PATH`, read by clap)
//! 2. `[store] path` in the TOML config, relative to the config file
//! 3. `memory.jsonl` in the working directory
//!
//! The config file is `--config` when given, otherwise `mnemograph.toml` in
//! the working directory if it exists.

use mnemograph_core::primitives::{
    DEFAULT_FILE_NAME, DEFAULT_IO_RETRIES, DEFAULT_LOCK_TIMEOUT, LEGACY_FILE_NAME,
};
use mnemograph_core::{EndpointStamping, JsonlStore, Session, StoreOptions, SystemClock};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "mnemograph.toml";

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to migrate {from} to {to}: {source}")]
    Migrate {
        from: String,
        to: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

// =============================================================================
// FILE FORMAT
// =============================================================================

/// Top-level TOML document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub store: StoreSection,
}

/// `[store]` table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSection {
    pub path: Option<PathBuf>,
    pub lock_timeout_ms: u64,
    pub io_retries: u32,
    pub relation_delete_stamping: EndpointStamping,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: None,
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT.as_millis() as u64,
            io_retries: DEFAULT_IO_RETRIES,
            relation_delete_stamping: EndpointStamping::default(),
        }
    }
}

impl ConfigFile {
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }
}

// =============================================================================
// RESOLVED SETTINGS
// =============================================================================

/// Everything needed to open a session.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub file_path: PathBuf,
    pub options: StoreOptions,
    pub endpoint_stamping: EndpointStamping,
}

impl Settings {
    /// Resolve settings from the explicit file path (flag or environment),
    /// an optional explicit config path, and the working directory.
    pub fn resolve(
        explicit_file: Option<PathBuf>,
        config_path: Option<&Path>,
        working_dir: &Path,
    ) -> Result<Self> {
        let discovered = working_dir.join(DEFAULT_CONFIG_FILE);
        let config_path = match config_path {
            Some(path) => Some(working_dir.join(path)),
            None => discovered.is_file().then_some(discovered),
        };

        let (config, config_dir) = match &config_path {
            Some(path) => {
                tracing::debug!(config = %path.display(), "Loading config");
                let dir = path.parent().map_or_else(|| working_dir.to_path_buf(), Path::to_path_buf);
                (ConfigFile::load(path)?, dir)
            }
            None => (ConfigFile::default(), working_dir.to_path_buf()),
        };
        let store = config.store;

        let file_path = match (explicit_file, store.path) {
            (Some(path), _) => working_dir.join(path),
            (None, Some(path)) => config_dir.join(path),
            (None, None) => working_dir.join(DEFAULT_FILE_NAME),
        };

        Ok(Self {
            file_path,
            options: StoreOptions {
                lock_timeout: Duration::from_millis(store.lock_timeout_ms),
                io_retries: store.io_retries,
            },
            endpoint_stamping: store.relation_delete_stamping,
        })
    }

    /// Open a wall-clock session over the resolved backing file.
    #[must_use]
    pub fn open_session(&self) -> Session<JsonlStore> {
        Session::with_store(
            JsonlStore::with_options(&self.file_path, self.options),
            Arc::new(SystemClock),
        )
        .with_endpoint_stamping(self.endpoint_stamping)
    }
}

// =============================================================================
// LEGACY MIGRATION
// =============================================================================

/// Rename a legacy `memory.json` next to `file_path` to `file_path` when the
/// latter does not exist yet. Returns whether a rename happened.
pub fn migrate_legacy_file(file_path: &Path) -> Result<bool> {
    if file_path.exists() {
        return Ok(false);
    }
    let legacy = file_path
        .parent()
        .map_or_else(|| PathBuf::from(LEGACY_FILE_NAME), |dir| dir.join(LEGACY_FILE_NAME));
    if legacy == file_path || !legacy.is_file() {
        return Ok(false);
    }

    fs::rename(&legacy, file_path).map_err(|source| ConfigError::Migrate {
        from: legacy.display().to_string(),
        to: file_path.display().to_string(),
        source,
    })?;
    tracing::info!(
        from = %legacy.display(),
        to = %file_path.display(),
        "Migrated legacy backing file"
    );
    Ok(true)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = Settings::resolve(None, None, dir.path()).expect("resolve");

        assert_eq!(settings.file_path, dir.path().join("memory.jsonl"));
        assert_eq!(settings.options, StoreOptions::default());
        assert_eq!(settings.endpoint_stamping, EndpointStamping::OnChange);
    }

    #[test]
    fn discovered_config_path_is_relative_to_config_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join(DEFAULT_CONFIG_FILE),
            "[store]\npath = \"data/graph.jsonl\"\nio_retries = 7\nrelation_delete_stamping = \"always\"\n",
        )
        .expect("write config");

        let settings = Settings::resolve(None, None, dir.path()).expect("resolve");
        assert_eq!(settings.file_path, dir.path().join("data/graph.jsonl"));
        assert_eq!(settings.options.io_retries, 7);
        assert_eq!(settings.endpoint_stamping, EndpointStamping::Always);
    }

    #[test]
    fn explicit_file_beats_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config_dir = dir.path().join("conf");
        fs::create_dir_all(&config_dir).expect("mkdir");
        let config_path = config_dir.join("custom.toml");
        fs::write(&config_path, "[store]\npath = \"from-config.jsonl\"\nlock_timeout_ms = 250\n")
            .expect("write config");

        let from_config =
            Settings::resolve(None, Some(&config_path), dir.path()).expect("resolve");
        assert_eq!(from_config.file_path, config_dir.join("from-config.jsonl"));
        assert_eq!(from_config.options.lock_timeout, Duration::from_millis(250));

        let explicit = Settings::resolve(
            Some(PathBuf::from("flag.jsonl")),
            Some(&config_path),
            dir.path(),
        )
        .expect("resolve");
        assert_eq!(explicit.file_path, dir.path().join("flag.jsonl"));
        assert_eq!(explicit.options.lock_timeout, Duration::from_millis(250));
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = Settings::resolve(None, Some(Path::new("absent.toml")), dir.path());
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = ConfigFile::from_toml("[store]\nbogus = 1\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn legacy_file_is_renamed_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let legacy = dir.path().join("memory.json");
        let target = dir.path().join("memory.jsonl");
        fs::write(&legacy, "{\"type\":\"entity\",\"name\":\"A\",\"entityType\":\"x\"}\n")
            .expect("write legacy");

        assert!(migrate_legacy_file(&target).expect("migrate"));
        assert!(target.is_file());
        assert!(!legacy.exists());

        assert!(!migrate_legacy_file(&target).expect("migrate again"));
    }

    #[test]
    fn migration_leaves_existing_target_alone() {
        let dir = tempfile::tempdir().expect("tempdir");
        let legacy = dir.path().join("memory.json");
        let target = dir.path().join("memory.jsonl");
        fs::write(&legacy, "old").expect("write legacy");
        fs::write(&target, "new").expect("write target");

        assert!(!migrate_legacy_file(&target).expect("migrate"));
        assert_eq!(fs::read_to_string(&target).expect("read"), "new");
        assert!(legacy.exists());
    }
}
