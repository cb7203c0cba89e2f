use std::path::PathBuf;

use http::StatusCode;
use thiserror::Error;

/// Why a single replayed request did not complete successfully.
#[derive(Debug, Error)]
pub enum ReplayFailure {
    /// The target answered, but with a non-success status.
    #[error("target responded with {status}")]
    Status { status: StatusCode, body: String },
    /// No response object exists (connect refused, reset, DNS, ...).
    #[error("transport failure: {source}")]
    Transport {
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("Failed to read replay input '{path}': {source}")]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse replay input '{path}': {source}")]
    ParseInput {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Record {index} has invalid method '{method}'.")]
    InvalidMethod { index: usize, method: String },
    #[error("Record {index} has invalid url '{url}': {source}")]
    InvalidRecordUrl {
        index: usize,
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Failed to build HTTP client: {source}")]
    BuildClient {
        #[source]
        source: reqwest::Error,
    },
    #[error("Replay aborted at record {index} ({url}): {source}")]
    Aborted {
        index: usize,
        url: String,
        #[source]
        source: Box<ReplayFailure>,
    },
    #[cfg(test)]
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
    #[cfg(test)]
    #[error("Test expectation failed: {message}: {value}")]
    TestExpectationValue {
        message: &'static str,
        value: String,
    },
}
