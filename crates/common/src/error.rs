//! Error types shared across PoseWatch crates.

use std::path::PathBuf;

/// Top-level error type for PoseWatch operations.
#[derive(Debug, thiserror::Error)]
pub enum PosewatchError {
    #[error("Frame source error: {message}")]
    FrameSource { message: String },

    #[error("Processing error: {message}")]
    Processing { message: String },

    #[error("Report error: {message}")]
    Report { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using PosewatchError.
pub type PosewatchResult<T> = Result<T, PosewatchError>;

impl PosewatchError {
    pub fn frame_source(msg: impl Into<String>) -> Self {
        Self::FrameSource {
            message: msg.into(),
        }
    }

    pub fn processing(msg: impl Into<String>) -> Self {
        Self::Processing {
            message: msg.into(),
        }
    }

    pub fn report(msg: impl Into<String>) -> Self {
        Self::Report {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    /// Map an I/O error on `path` to `FileNotFound` when appropriate.
    pub fn from_io_at(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound { path: path.into() }
        } else {
            Self::Io(err)
        }
    }
}
