//! Shared configuration.
//!
//! Loaded from `~/.procesal/config.toml` when present; every key is optional.
//!
//! ```toml
//! lookup-url = "https://consultaprocesos.ramajudicial.gov.co:448/api/v2"
//! gemini-model = "gemini-2.5-flash-preview-04-17"
//! timeout-secs = 30
//! store-dir = "/var/lib/procesal"
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_LOOKUP_URL: &str = "https://consultaprocesos.ramajudicial.gov.co:448/api/v2";
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-preview-04-17";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("invalid config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Settings {
    /// Base URL of the case-lookup service (no trailing slash needed).
    pub lookup_url: String,
    /// Credential for the enrichment service. Absent disables enrichment.
    pub api_key: Option<String>,
    pub gemini_endpoint: String,
    pub gemini_model: String,
    pub timeout_secs: u64,
    /// Directory holding the cached corpus. Defaults to `~/.procesal`.
    pub store_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            lookup_url: DEFAULT_LOOKUP_URL.to_string(),
            api_key: None,
            gemini_endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            store_dir: None,
        }
    }
}

impl Settings {
    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `~/.procesal`, if the home directory can be determined.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".procesal"))
    }

    /// `~/.procesal/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        Self::default_dir().map(|d| d.join("config.toml"))
    }

    /// The configured credential, ignoring blank values.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}
