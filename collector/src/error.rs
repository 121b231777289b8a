use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StatsError>;

/// Failure of a single HTTP attempt. The fetcher retries all of these.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid JSON body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Network(e.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Request to {endpoint} failed after {attempts} attempts: {source}")]
    Fetch {
        endpoint: String,
        attempts: u32,
        #[source]
        source: TransportError,
    },

    #[error("YouTube API error: {message}")]
    Api { message: String },

    #[error("Unexpected API response: {0}")]
    Response(String),

    #[error("IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed history {path} at line {line}: {details}")]
    MalformedHistory {
        path: PathBuf,
        line: usize,
        details: String,
    },

    #[error("History log {path} is locked by another run")]
    Locked { path: PathBuf },

    #[error("Chart rendering failed: {0}")]
    Chart(String),

    #[error("Secret provisioning failed: {0}")]
    Provision(String),
}

impl StatsError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        StatsError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<image::ImageError> for StatsError {
    fn from(e: image::ImageError) -> Self {
        StatsError::Chart(e.to_string())
    }
}
