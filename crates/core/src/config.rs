//! Configuration management
//!
//! This module handles loading, saving, and migrating the sh3 configuration file.
//! The file is TOML, stored at `$SH3_CONFIG_DIR/config.toml` when that variable
//! is set and at `~/.config/sh3/config.toml` otherwise.
//!
//! Changes to schema_version require migration support.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::session::{DEFAULT_HOST, DEFAULT_PROMPT, MAX_THREADS, Session};
use crate::timing::TimingMode;

/// Current configuration schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "SH3_CONFIG_DIR";

const DEFAULT_REGION: &str = "us-east-1";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Schema version for migration support
    pub schema_version: u32,

    /// Session defaults
    #[serde(default)]
    pub defaults: Defaults,

    /// Stored account, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<StoredCredentials>,
}

/// Defaults applied to every new session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defaults {
    /// Storage host, optionally with port
    #[serde(default = "default_host")]
    pub host: String,

    /// Signing region
    #[serde(default = "default_region")]
    pub region: String,

    /// Use https for the endpoint
    #[serde(default = "default_true")]
    pub secure: bool,

    #[serde(default = "default_prompt")]
    pub prompt: String,

    /// Workers for batch commands (1..=20)
    #[serde(default = "default_threads")]
    pub threads: usize,

    #[serde(default)]
    pub timing: TimingMode,

    /// Per-request list limit for bulk operations; unset leaves it to the service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<i32>,
}

/// Account stored in the configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,

    /// Bucket selected at startup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_prompt() -> String {
    DEFAULT_PROMPT.to_string()
}

fn default_threads() -> usize {
    1
}

fn default_true() -> bool {
    true
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            host: default_host(),
            region: default_region(),
            secure: true,
            prompt: default_prompt(),
            threads: default_threads(),
            timing: TimingMode::default(),
            page_size: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            defaults: Defaults::default(),
            credentials: None,
        }
    }
}

impl Config {
    /// Build the initial session from the file values
    pub fn seed_session(&self) -> Result<Session> {
        let mut session = Session::default();
        session.host = Some(self.defaults.host.clone()).filter(|h| !h.is_empty());
        session.prompt = self.defaults.prompt.clone();
        session.timing = self.defaults.timing;
        session.set_threads(self.defaults.threads).map_err(|_| {
            Error::Config(format!(
                "threads must be between 1 and {MAX_THREADS}, got {}",
                self.defaults.threads
            ))
        })?;

        if let Some(creds) = &self.credentials {
            session.access_key = creds.access_key.clone();
            session.secret_key = creds.secret_key.clone();
            session.bucket = creds.bucket.clone();
        }

        Ok(session)
    }
}

/// Configuration manager handles loading and saving config
#[derive(Debug)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager for `$SH3_CONFIG_DIR` or the platform config directory
    pub fn new() -> Result<Self> {
        let config_dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::config_dir()
                .ok_or_else(|| Error::Config("Could not determine config directory".into()))?
                .join("sh3"),
        };
        Ok(Self {
            config_path: config_dir.join("config.toml"),
        })
    }

    /// Create a ConfigManager with a custom path (useful for testing)
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load configuration from disk
    ///
    /// A missing file yields the default configuration. Older schema versions
    /// are migrated; newer ones are rejected.
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&self.config_path)?;
        let config: Config = toml::from_str(&content)?;

        if config.schema_version < SCHEMA_VERSION {
            return self.migrate(config);
        }
        if config.schema_version > SCHEMA_VERSION {
            return Err(Error::Config(format!(
                "Configuration file version {} is newer than supported version {}. Please upgrade sh3.",
                config.schema_version, SCHEMA_VERSION
            )));
        }

        Ok(config)
    }

    /// Save configuration to disk
    ///
    /// Creates parent directories and restricts the file to its owner, since
    /// it may hold a secret key.
    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(config)?;
        std::fs::write(&self.config_path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.config_path, permissions)?;
        }

        Ok(())
    }

    fn migrate(&self, mut config: Config) -> Result<Config> {
        // Version 0 files predate the schema field; their layout is identical.
        config.schema_version = SCHEMA_VERSION;
        self.save(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let manager = ConfigManager::with_path(config_path);
        (manager, temp_dir)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.schema_version, SCHEMA_VERSION);
        assert_eq!(config.defaults.host, "s3.amazonaws.com");
        assert_eq!(config.defaults.threads, 1);
        assert_eq!(config.defaults.timing, TimingMode::Long);
        assert!(config.credentials.is_none());
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let (manager, _temp_dir) = temp_config_manager();
        let config = manager.load().unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let (manager, _temp_dir) = temp_config_manager();

        let mut config = Config::default();
        config.defaults.host = "localhost:9000".into();
        config.defaults.timing = TimingMode::All;
        config.credentials = Some(StoredCredentials {
            access_key: Some("ak".into()),
            secret_key: Some("sk".into()),
            bucket: None,
        });

        manager.save(&config).unwrap();
        let loaded = manager.load().unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let (manager, _temp_dir) = temp_config_manager();
        std::fs::write(
            manager.config_path(),
            "schema_version = 1\n[defaults]\nthreads = 8\ntiming = \"all\"\n",
        )
        .unwrap();

        let config = manager.load().unwrap();
        assert_eq!(config.defaults.threads, 8);
        assert_eq!(config.defaults.timing, TimingMode::All);
        assert_eq!(config.defaults.prompt, "sh3> ");
    }

    #[test]
    fn test_schema_version_too_new() {
        let (manager, _temp_dir) = temp_config_manager();

        let content = format!("schema_version = {}\n", SCHEMA_VERSION + 1);
        std::fs::write(manager.config_path(), content).unwrap();

        let result = manager.load();
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("newer than supported")
        );
    }

    #[test]
    fn test_old_schema_is_migrated() {
        let (manager, _temp_dir) = temp_config_manager();
        std::fs::write(manager.config_path(), "schema_version = 0\n").unwrap();

        let config = manager.load().unwrap();
        assert_eq!(config.schema_version, SCHEMA_VERSION);
        let on_disk = std::fs::read_to_string(manager.config_path()).unwrap();
        assert!(on_disk.contains("schema_version = 1"));
    }

    #[test]
    fn test_seed_session() {
        let mut config = Config::default();
        config.defaults.threads = 4;
        config.credentials = Some(StoredCredentials {
            access_key: Some("ak".into()),
            secret_key: Some("sk".into()),
            bucket: Some("b1".into()),
        });

        let session = config.seed_session().unwrap();
        assert!(session.is_connected());
        assert_eq!(session.threads(), 4);
        assert_eq!(session.bucket.as_deref(), Some("b1"));
    }

    #[test]
    fn test_seed_session_rejects_bad_threads() {
        let mut config = Config::default();
        config.defaults.threads = 64;
        assert!(matches!(config.seed_session(), Err(Error::Config(_))));
    }
}
