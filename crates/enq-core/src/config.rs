//! Configuration management for enq.
//!
//! Loads configuration from ${ENQ_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

pub mod paths {
    //! Path resolution for enq configuration and session data.
    //!
    //! ENQ_HOME resolution order:
    //! 1. ENQ_HOME environment variable (if set)
    //! 2. ~/.config/enq (default)

    use std::path::PathBuf;

    /// Returns the enq home directory.
    ///
    /// Checks ENQ_HOME env var first, falls back to ~/.config/enq
    pub fn enq_home() -> PathBuf {
        if let Ok(home) = std::env::var("ENQ_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("enq"))
            .expect("Could not determine home directory")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        enq_home().join("config.toml")
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the enquiries backend
    pub base_url: String,

    /// Request timeout in seconds (applies to every API call)
    pub request_timeout_secs: u64,
}

impl Config {
    /// The backend's default address during development.
    pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
    const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Writes a default config template to `path`.
    ///
    /// Fails if the file already exists (no silent overwrite).
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            bail!("Config file already exists at {}", path.display());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        fs::write(path, default_config_template())
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    /// Returns the effective base URL.
    ///
    /// Resolution order: `ENQ_BASE_URL` env var > config file > default.
    pub fn effective_base_url(&self) -> Result<String> {
        if let Ok(env_url) = std::env::var("ENQ_BASE_URL") {
            let trimmed = env_url.trim();
            if !trimmed.is_empty() {
                validate_url(trimmed)?;
                return Ok(trimmed.trim_end_matches('/').to_string());
            }
        }

        let trimmed = self.base_url.trim();
        if trimmed.is_empty() {
            return Ok(Self::DEFAULT_BASE_URL.to_string());
        }
        validate_url(trimmed)?;
        Ok(trimmed.trim_end_matches('/').to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: Self::DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Validates that a URL is well-formed.
fn validate_url(url: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid base URL: {url}"))?;
    Ok(())
}

fn default_config_template() -> &'static str {
    r#"# enq configuration

# Base URL of the enquiries backend.
# Can be overridden with the ENQ_BASE_URL environment variable.
base_url = "http://localhost:5000"

# Request timeout in seconds, applied to every API call.
# request_timeout_secs = 30
"#
}
