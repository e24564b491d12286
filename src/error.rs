//! Error types

use std::path::PathBuf;
use thiserror::Error;

/// Host-level failures: window setup and configuration
#[derive(Debug, Error)]
pub enum SkyError {
    /// SDL reports its failures as plain strings
    #[error("display error: {0}")]
    Display(String),
    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl From<String> for SkyError {
    fn from(s: String) -> Self {
        SkyError::Display(s)
    }
}

/// Why a single cloud texture could not be used. Always recovered with a fallback.
#[derive(Debug, Error)]
pub enum TextureError {
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("{path} has no pixels")]
    Empty { path: PathBuf },
}
