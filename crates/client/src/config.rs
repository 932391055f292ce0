//! Client configuration (environment driven).

use std::path::PathBuf;

use thiserror::Error;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8888/api";

const API_URL_VAR: &str = "ORI_API_URL";
const SESSION_FILE_VAR: &str = "ORI_SESSION_FILE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the REST API, without trailing slash.
    pub api_url: String,
    /// File backing the persisted session entries.
    pub session_file: PathBuf,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid API URL '{0}': expected http:// or https://")]
    InvalidApiUrl(String),

    #[error("no platform data directory; set ORI_SESSION_FILE")]
    NoDataDir,
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>, session_file: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: normalize_api_url(api_url.into())?,
            session_file: session_file.into(),
        })
    }

    /// Read `ORI_API_URL` and `ORI_SESSION_FILE`, with defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = lookup(API_URL_VAR).unwrap_or_else(|| {
            tracing::warn!("{API_URL_VAR} not set; using {DEFAULT_API_URL}");
            DEFAULT_API_URL.to_string()
        });

        let session_file = match lookup(SESSION_FILE_VAR) {
            Some(path) => PathBuf::from(path),
            None => default_session_file()?,
        };

        Self::new(api_url, session_file)
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Result<Self, ConfigError> {
        self.api_url = normalize_api_url(api_url.into())?;
        Ok(self)
    }

    pub fn with_session_file(mut self, session_file: impl Into<PathBuf>) -> Self {
        self.session_file = session_file.into();
        self
    }
}

fn normalize_api_url(raw: String) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidApiUrl(raw));
    }
    Ok(trimmed.to_string())
}

fn default_session_file() -> Result<PathBuf, ConfigError> {
    let dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
    Ok(dir.join("ori").join("session.json"))
}
