//! # Client Configuration
//!
//! Settings are read from an optional TOML file, then overridden by
//! environment variables:
//!
//! - `PSYNTH_URL`: service root (default: `https://psynth.psymphonic.com/`)
//! - `PSYNTH_USER`: account name
//! - `PSYNTH_KEY`: account key
//! - `PSYNTH_TIMEOUT_SECS`: per-request timeout (default: 30)

use psynth_core::{Identity, PsynthError};
use reqwest::Url;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Default service root.
pub const DEFAULT_URL: &str = "https://psynth.psymphonic.com/";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum config file size (64 KiB).
const MAX_CONFIG_FILE_SIZE: u64 = 64 * 1024;

#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub url: String,
    pub username: String,
    pub key: String,
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            username: String::new(),
            key: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("key", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ClientConfig {
    /// File (if any), then process environment, then normalization.
    pub fn load(path: Option<&Path>) -> Result<Self, PsynthError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.normalized()
    }

    pub fn from_file(path: &Path) -> Result<Self, PsynthError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            PsynthError::IoError(format!("Cannot read config '{}': {e}", path.display()))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(PsynthError::ConfigError(format!(
                "Config file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            PsynthError::IoError(format!("Cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, PsynthError> {
        toml::from_str(text).map_err(|e| PsynthError::ConfigError(e.to_string()))
    }

    /// Apply `PSYNTH_*` overrides read through `lookup`.
    ///
    /// Empty values are ignored.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), PsynthError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(url) = get("PSYNTH_URL") {
            self.url = url;
        }
        if let Some(username) = get("PSYNTH_USER") {
            self.username = username;
        }
        if let Some(key) = get("PSYNTH_KEY") {
            self.key = key;
        }
        if let Some(timeout) = get("PSYNTH_TIMEOUT_SECS") {
            self.timeout_secs = timeout.trim().parse().map_err(|_| {
                PsynthError::ConfigError(format!("PSYNTH_TIMEOUT_SECS is not a number: {timeout}"))
            })?;
        }
        Ok(())
    }

    /// Check the URL and give it a trailing `/`.
    pub fn normalized(mut self) -> Result<Self, PsynthError> {
        let url = Url::parse(self.url.trim())
            .map_err(|e| PsynthError::ConfigError(format!("invalid url '{}': {e}", self.url)))?;
        if url.cannot_be_a_base() {
            return Err(PsynthError::ConfigError(format!(
                "url '{}' cannot be used as a service root",
                self.url
            )));
        }
        self.url = url.to_string();
        if !self.url.ends_with('/') {
            self.url.push('/');
        }
        if self.timeout_secs == 0 {
            return Err(PsynthError::ConfigError(
                "timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(self)
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Credentials for tagging requests; both must be set.
    pub fn identity(&self) -> Result<Identity, PsynthError> {
        if self.username.trim().is_empty() {
            return Err(PsynthError::ConfigError(
                "username is not set (config file or PSYNTH_USER)".to_string(),
            ));
        }
        if self.key.trim().is_empty() {
            return Err(PsynthError::ConfigError(
                "key is not set (config file or PSYNTH_KEY)".to_string(),
            ));
        }
        Ok(Identity::new(&self.username, &self.key))
    }
}

// =============================================================================
// TESTS
// =============================================================================
