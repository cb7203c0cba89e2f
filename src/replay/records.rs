use std::path::Path;

use reqwest::Method;
use url::Url;

use crate::error::{AppError, AppResult, ReplayError, ValidationError};
use crate::record::CapturedRequest;

/// A record checked and resolved against the replay target, ready to send.
#[derive(Debug, Clone)]
pub struct ReplayRequest {
    /// Position in the input file, zero based.
    pub index: usize,
    pub method: Method,
    pub url: Url,
    pub body: String,
}

/// Read a capture file (or a hand-written fixture) in file order.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a JSON array of
/// records.
pub async fn read_records(path: &Path) -> AppResult<Vec<CapturedRequest>> {
    let bytes = tokio::fs::read(path).await.map_err(|err| {
        AppError::replay(ReplayError::ReadInput {
            path: path.to_path_buf(),
            source: err,
        })
    })?;
    serde_json::from_slice(&bytes).map_err(|err| {
        AppError::replay(ReplayError::ParseInput {
            path: path.to_path_buf(),
            source: err,
        })
    })
}

/// Parse the replay target base URL.
///
/// # Errors
///
/// Returns an error if the URL is malformed or not http(s).
pub fn parse_target(target: &str) -> AppResult<Url> {
    let url = Url::parse(target).map_err(|err| {
        AppError::validation(ValidationError::InvalidTargetUrl {
            url: target.to_owned(),
            source: err,
        })
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(AppError::validation(
            ValidationError::UnsupportedTargetScheme {
                url: target.to_owned(),
            },
        )),
    }
}

/// Resolve every record against `target`. The recorded url is appended to the
/// target verbatim, so a target with a path prefix keeps it.
///
/// # Errors
///
/// Returns an error for the first record whose method or url is unusable;
/// nothing is sent for a file that fails here.
pub fn build_requests(
    records: Vec<CapturedRequest>,
    target: &Url,
) -> AppResult<Vec<ReplayRequest>> {
    let base = target.as_str().trim_end_matches('/');
    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let method = Method::from_bytes(record.method.to_ascii_uppercase().as_bytes())
                .map_err(|_invalid| {
                    AppError::replay(ReplayError::InvalidMethod {
                        index,
                        method: record.method.clone(),
                    })
                })?;
            let joined = format!("{}{}", base, record.url);
            let url = Url::parse(&joined).map_err(|err| {
                AppError::replay(ReplayError::InvalidRecordUrl {
                    index,
                    url: record.url.clone(),
                    source: err,
                })
            })?;
            Ok(ReplayRequest {
                index,
                method,
                url,
                body: record.data,
            })
        })
        .collect()
}
