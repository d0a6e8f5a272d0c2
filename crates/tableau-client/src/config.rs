//! Configuration for the session client.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Body format requested from the REST API via the `Accept` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// `application/xml` (the server default).
    #[default]
    Xml,
    /// `application/json`.
    Json,
}

impl ResponseFormat {
    /// Returns the MIME type sent in the `Accept` header.
    #[must_use]
    pub const fn accept(self) -> &'static str {
        match self {
            Self::Xml => "application/xml",
            Self::Json => "application/json",
        }
    }
}

/// Configuration for a `SessionClient`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server address without trailing slash, e.g. "https://tableau.example.com".
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// REST API version used in `/api/{version}/...` (default: "3.19").
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Format requested for REST responses (default: xml).
    #[serde(default)]
    pub response_format: ResponseFormat,

    /// Bytes per append call during a chunked publish (default: 100,000).
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Largest file published in a single request (default: 64 MiB).
    #[serde(default = "default_single_request_limit")]
    pub single_request_limit: u64,

    /// Per-request timeout in seconds (default: 60).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// `User-Agent` header value.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_server_url() -> String {
    "http://localhost".to_string()
}

fn default_api_version() -> String {
    "3.19".to_string()
}

fn default_chunk_size() -> usize {
    100_000
}

fn default_single_request_limit() -> u64 {
    64 * 1024 * 1024 // 64MB
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_user_agent() -> String {
    format!("tableau-client/{}", env!("CARGO_PKG_VERSION"))
}

/// Errors that can occur while loading or validating a `ClientConfig`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The server URL is empty.
    #[error("Invalid server URL: must not be empty")]
    EmptyServerUrl,

    /// The server URL does not start with http:// or https://.
    #[error("Invalid server URL '{0}': must start with http:// or https://")]
    InvalidScheme(String),

    /// The API version is empty.
    #[error("Invalid API version: must not be empty")]
    EmptyApiVersion,

    /// Invalid chunk size (must be > 0).
    #[error("Invalid chunk size: must be greater than 0")]
    InvalidChunkSize,

    /// The chunk size exceeds the single-request limit.
    #[error("Invalid chunk size {chunk_size}: exceeds single request limit {limit}")]
    ChunkExceedsLimit {
        /// Configured chunk size.
        chunk_size: usize,
        /// Configured single-request limit.
        limit: u64,
    },

    /// Invalid timeout (must be > 0).
    #[error("Invalid timeout: must be greater than 0")]
    InvalidTimeout,

    /// A required environment variable is not set.
    #[error("{0} environment variable not set")]
    MissingEnvVar(&'static str),

    /// The configuration file could not be read.
    #[error("Failed to read config file: {0}")]
    Io(String),

    /// The configuration text is not valid TOML for this schema.
    #[error("Failed to parse config: {0}")]
    Parse(String),
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            api_version: default_api_version(),
            response_format: ResponseFormat::default(),
            chunk_size: default_chunk_size(),
            single_request_limit: default_single_request_limit(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl ClientConfig {
    /// Creates a configuration for the given server with defaults for everything else.
    #[must_use]
    pub fn new(server_url: impl Into<String>) -> Self {
        Self { server_url: server_url.into(), ..Self::default() }
    }

    #[must_use]
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    #[must_use]
    pub fn with_response_format(mut self, response_format: ResponseFormat) -> Self {
        self.response_format = response_format;
        self
    }

    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    #[must_use]
    pub fn with_single_request_limit(mut self, limit: u64) -> Self {
        self.single_request_limit = limit;
        self
    }

    #[must_use]
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Parses a configuration from TOML text. Missing keys take their defaults.
    ///
    /// # Errors
    /// Returns `ConfigError::Parse` if the text is not valid TOML for this schema.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Reads a TOML configuration file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Builds a configuration from `TABLEAU_SERVER_URL` and the optional `TABLEAU_API_VERSION`.
    ///
    /// # Errors
    /// Returns `ConfigError::MissingEnvVar` if `TABLEAU_SERVER_URL` is not set.
    #[allow(clippy::disallowed_methods)] // env::var is needed for server discovery
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_url =
            lookup("TABLEAU_SERVER_URL").ok_or(ConfigError::MissingEnvVar("TABLEAU_SERVER_URL"))?;
        let mut config = Self::new(server_url);
        if let Some(version) = lookup("TABLEAU_API_VERSION") {
            config.api_version = version;
        }
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    /// Returns `ConfigError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_url.trim().is_empty() {
            return Err(ConfigError::EmptyServerUrl);
        }

        if !(self.server_url.starts_with("http://") || self.server_url.starts_with("https://")) {
            return Err(ConfigError::InvalidScheme(self.server_url.clone()));
        }

        if self.api_version.trim().is_empty() {
            return Err(ConfigError::EmptyApiVersion);
        }

        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize);
        }

        if self.chunk_size as u64 > self.single_request_limit {
            return Err(ConfigError::ChunkExceedsLimit {
                chunk_size: self.chunk_size,
                limit: self.single_request_limit,
            });
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        Ok(())
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns the server URL without trailing slashes.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.server_url.trim_end_matches('/')
    }
}
