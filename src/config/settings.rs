//! Application settings and configuration types.
//!
//! Settings are persisted to `~/.config/unified-inbox/settings.json` (or the
//! platform equivalent) and can be overridden per field with
//! `UNIFIED_INBOX_*` environment variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::providers::email::{GmailEndpoints, OutlookEndpoints, PageSize};

/// Prefix shared by every environment override.
pub const ENV_PREFIX: &str = "UNIFIED_INBOX";

/// Errors that can occur while loading or saving settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Top-level application settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Google OAuth client and endpoints.
    pub gmail: GmailSettings,
    /// Microsoft OAuth client and endpoints.
    pub outlook: OutlookSettings,
    /// Aggregation behavior.
    pub inbox: InboxSettings,
}

/// OAuth client registration for one provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings<E> {
    /// OAuth client ID issued by the provider.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Redirect URI registered for the client.
    pub redirect_uri: String,
    /// Requested scopes. Empty selects the provider defaults.
    pub scopes: Vec<String>,
    /// API and identity endpoints.
    pub endpoints: E,
}

impl<E> ProviderSettings<E> {
    /// True when the client ID and redirect URI needed for sign-in are set.
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.redirect_uri.is_empty()
    }
}

pub type GmailSettings = ProviderSettings<GmailEndpoints>;
pub type OutlookSettings = ProviderSettings<OutlookEndpoints>;

/// Aggregation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InboxSettings {
    /// Unread messages requested per provider. Clamped to 1..=100 on use.
    pub max_results: f64,
}

impl Default for InboxSettings {
    fn default() -> Self {
        Self {
            max_results: f64::from(PageSize::DEFAULT),
        }
    }
}

impl InboxSettings {
    /// The clamped page size to request from providers.
    pub fn page_size(&self) -> PageSize {
        PageSize::clamped(self.max_results)
    }
}

impl Settings {
    /// Default settings file location for the current user.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "unified-inbox")
            .map(|dirs| dirs.config_dir().join("settings.json"))
    }

    /// Loads settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads settings, falling back to defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Writes settings as pretty-printed JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, json).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies `UNIFIED_INBOX_*` overrides read through `lookup`.
    ///
    /// Recognized variables: `{GMAIL,OUTLOOK}_CLIENT_ID`,
    /// `{GMAIL,OUTLOOK}_CLIENT_SECRET`, `{GMAIL,OUTLOOK}_REDIRECT_URI`,
    /// `{GMAIL,OUTLOOK}_SCOPES` (space-separated), `GMAIL_API_BASE`,
    /// `OUTLOOK_API_BASE`, and `MAX_RESULTS`. Unparseable `MAX_RESULTS`
    /// values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}_{name}"));

        apply_provider_env(&mut self.gmail, "GMAIL", &var);
        if let Some(base) = var("GMAIL_API_BASE") {
            self.gmail.endpoints.api_base = base;
        }

        apply_provider_env(&mut self.outlook, "OUTLOOK", &var);
        if let Some(base) = var("OUTLOOK_API_BASE") {
            self.outlook.endpoints.api_base = base;
        }

        if let Some(raw) = var("MAX_RESULTS") {
            match raw.trim().parse::<f64>() {
                Ok(value) => self.inbox.max_results = value,
                Err(_) => tracing::warn!(value = %raw, "Ignoring invalid MAX_RESULTS override"),
            }
        }
    }
}

fn apply_provider_env<E>(
    settings: &mut ProviderSettings<E>,
    provider: &str,
    var: &impl Fn(&str) -> Option<String>,
) {
    if let Some(value) = var(&format!("{provider}_CLIENT_ID")) {
        settings.client_id = value;
    }
    if let Some(value) = var(&format!("{provider}_CLIENT_SECRET")) {
        settings.client_secret = value;
    }
    if let Some(value) = var(&format!("{provider}_REDIRECT_URI")) {
        settings.redirect_uri = value;
    }
    if let Some(value) = var(&format!("{provider}_SCOPES")) {
        settings.scopes = value.split_whitespace().map(str::to_string).collect();
    }
}
