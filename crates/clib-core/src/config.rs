//! Client configuration.
//!
//! The configuration is a JSON document. Only `api_endpoints` is required for
//! remote resolution; without it endpoint discovery is disabled and every
//! slug fails to resolve.
//!
//! ```json
//! {
//!   "api_endpoints": ["https://api.github.com/"],
//!   "default_owner": "clibs",
//!   "default_version": "master",
//!   "max_concurrency": 16
//! }
//! ```

use std::path::{Path, PathBuf};

use clib_schema::{DEFAULT_OWNER, DEFAULT_VERSION, Defaults};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;

/// Errors that can occur when loading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The text is not a valid configuration document.
    #[error("Unable to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Settings shared by every resolution and install in a process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Candidate API base URLs, probed in order. Each ends with `/`.
    pub api_endpoints: Vec<String>,
    /// Owner assumed for slugs without `owner/`.
    pub default_owner: String,
    /// Branch assumed for slugs without `@version` and for `*`.
    pub default_version: String,
    /// Upper bound on in-flight requests per fan-out burst. `None` is unbounded.
    pub max_concurrency: Option<usize>,
    /// Remember discovered endpoints per repository for the process lifetime.
    pub cache_endpoints: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_endpoints: Vec::new(),
            default_owner: DEFAULT_OWNER.to_string(),
            default_version: DEFAULT_VERSION.to_string(),
            max_concurrency: None,
            cache_endpoints: true,
        }
    }
}

impl Config {
    /// Parse a configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is not a JSON object of the
    /// expected shape.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(text)?;
        Ok(config.normalized())
    }

    /// Load and parse a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_json(&content)
    }

    /// Like [`Config::load`], but a missing file yields `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load_optional(path: &Path) -> Result<Option<Self>, ConfigError> {
        match Self::load(path).await {
            Ok(config) => Ok(Some(config)),
            Err(ConfigError::Io { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Append candidate endpoints after the configured ones.
    pub fn with_endpoints<I, S>(mut self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.api_endpoints
            .extend(endpoints.into_iter().map(Into::into));
        self.normalized()
    }

    /// Slug defaults derived from this configuration.
    pub fn defaults(&self) -> Defaults {
        Defaults {
            owner: self.default_owner.clone(),
            version: self.default_version.clone(),
        }
    }

    /// Whether endpoint discovery can succeed at all.
    pub fn has_endpoints(&self) -> bool {
        !self.api_endpoints.is_empty()
    }

    fn normalized(mut self) -> Self {
        for endpoint in &mut self.api_endpoints {
            if !endpoint.ends_with('/') {
                endpoint.push('/');
            }
        }
        self.api_endpoints.retain(|e| e != "/");
        if self.max_concurrency == Some(0) {
            self.max_concurrency = None;
        }
        self
    }
}
