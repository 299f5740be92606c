//! Client options and on-disk configuration

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::auth::{AuthEndpoints, Credentials, GrantKind, Token};

/// Behavior switches for the request execution core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Cache idempotent responses
    pub use_cache: bool,
    /// Maximum cached responses; `None` never evicts
    #[serde(with = "bound")]
    pub cache_limit: Option<usize>,
    /// Refresh an expired token before sending instead of failing
    pub automatic_refresh: bool,
    /// Wait out HTTP 429 and resend instead of failing
    pub retry_when_rate_limited: bool,
    /// Resends allowed after HTTP 5xx; `None` retries forever
    #[serde(with = "bound")]
    pub retry_on_internal_server_error_times: Option<u32>,
    /// Per-send timeout; `None` waits indefinitely
    #[serde(with = "bound")]
    pub request_timeout_millis: Option<u64>,
    /// Split over-ceiling bulk requests into chunks instead of rejecting them
    pub allow_bulk_requests: bool,
    /// Page size used by endpoint methods when the caller gives none
    pub default_page_limit: u32,
    /// Base delay between 5xx retries, doubled per retry; 0 resends at once
    pub server_error_backoff_millis: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            cache_limit: Some(200),
            automatic_refresh: true,
            retry_when_rate_limited: true,
            retry_on_internal_server_error_times: Some(5),
            request_timeout_millis: None,
            allow_bulk_requests: true,
            default_page_limit: 50,
            server_error_backoff_millis: 200,
        }
    }
}

impl ClientOptions {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_millis.map(Duration::from_millis)
    }

    /// Delay before the `retry`-th resend (1-based).
    pub fn server_error_backoff(&self, retry: u32) -> Duration {
        let shift = retry.saturating_sub(1).min(8);
        Duration::from_millis(self.server_error_backoff_millis).saturating_mul(1 << shift)
    }
}

/// Optional numeric limits, written as a number or `"unbounded"` in TOML.
mod bound {
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    const UNBOUNDED: &str = "unbounded";

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw<T> {
        Limit(T),
        Word(String),
    }

    pub fn serialize<T: Serialize, S: Serializer>(
        value: &Option<T>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => v.serialize(serializer),
            None => serializer.serialize_str(UNBOUNDED),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        match Raw::<T>::deserialize(deserializer)? {
            Raw::Limit(v) => Ok(Some(v)),
            Raw::Word(w) if w == UNBOUNDED => Ok(None),
            Raw::Word(w) => Err(de::Error::custom(format!(
                "expected a number or \"{UNBOUNDED}\", got \"{w}\""
            ))),
        }
    }
}

/// Persisted CLI configuration: credentials, last token, options.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    pub credentials: Credentials,
    #[serde(default)]
    pub grant: GrantKind,
    /// Stored bearer token (from the last login or refresh)
    pub token: Option<Token>,
    /// Overrides for the authorization server endpoints
    pub endpoints: Option<AuthEndpoints>,
    /// Override for the API base URL
    pub api_base: Option<String>,
    #[serde(default)]
    pub options: ClientOptions,
}

impl Config {
    /// Get config directory path
    fn config_dir() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "catalog-client", "catalog-client")
            .context("Could not determine config directory")?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }

    /// Get config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).context("Failed to read config file")?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;

        // Set restrictive permissions on config file (contains tokens)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(path, perms).context("Failed to set config permissions")?;
        }

        Ok(())
    }

    pub fn clear_token(&mut self) {
        self.token = None;
    }
}
