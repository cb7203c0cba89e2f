use thiserror::Error;

use super::{CaptureError, ReplayError, ValidationError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("CLI error: {source}")]
    Clap {
        #[from]
        source: clap::Error,
    },
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
    #[error("HTTP client error: {source}")]
    Reqwest {
        #[from]
        source: reqwest::Error,
    },
    #[error("Join error: {source}")]
    Join {
        #[from]
        source: tokio::task::JoinError,
    },
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),
    #[error("Replay error: {0}")]
    Replay(#[from] ReplayError),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation<E>(error: E) -> Self
    where
        E: Into<ValidationError>,
    {
        error.into().into()
    }

    pub fn capture<E>(error: E) -> Self
    where
        E: Into<CaptureError>,
    {
        error.into().into()
    }

    pub fn replay<E>(error: E) -> Self
    where
        E: Into<ReplayError>,
    {
        error.into().into()
    }
}
