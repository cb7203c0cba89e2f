use std::path::Path;

use http::StatusCode;
use http::header::CONTENT_TYPE;
use reqwest::Client;

use crate::args::{FailurePolicy, ReplayArgs};
use crate::error::{AppError, AppResult, ReplayError, ReplayFailure};

use super::records::{ReplayRequest, build_requests, parse_target, read_records};

const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayOptions {
    /// Log `end` once every record has been processed.
    pub end_marker: bool,
    pub on_transport_error: FailurePolicy,
    pub on_http_error: FailurePolicy,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            end_marker: true,
            on_transport_error: FailurePolicy::Abort,
            on_http_error: FailurePolicy::Continue,
        }
    }
}

impl From<&ReplayArgs> for ReplayOptions {
    fn from(args: &ReplayArgs) -> Self {
        Self {
            end_marker: !args.no_end_marker,
            on_transport_error: args.on_transport_error,
            on_http_error: args.on_http_error,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub total: usize,
    pub delivered: usize,
    pub http_errors: usize,
    pub transport_errors: usize,
}

/// Send one request and wait for the complete response.
///
/// # Errors
///
/// Returns [`ReplayFailure::Transport`] when no response arrived and
/// [`ReplayFailure::Status`] when the status is not 2xx.
pub async fn send_request(
    client: &Client,
    request: &ReplayRequest,
) -> Result<StatusCode, ReplayFailure> {
    let response = client
        .request(request.method.clone(), request.url.clone())
        .header(CONTENT_TYPE, NDJSON_CONTENT_TYPE)
        .body(request.body.clone())
        .send()
        .await
        .map_err(|err| ReplayFailure::Transport { source: err })?;

    let status = response.status();
    if status.is_success() {
        // Read the body so the connection can be reused for the next record.
        if let Err(err) = response.bytes().await {
            tracing::debug!("Failed to read response body for {}: {}", request.url, err);
        }
        return Ok(status);
    }

    let body = match response.text().await {
        Ok(body) => body,
        Err(err) => {
            tracing::warn!("Failed to read error response body: {}", err);
            String::new()
        }
    };
    Err(ReplayFailure::Status { status, body })
}

/// Replay `requests` strictly in order, one at a time.
///
/// # Errors
///
/// Returns [`ReplayError::Aborted`] when a failure's policy is
/// [`FailurePolicy::Abort`]; records after it are not sent.
pub async fn replay_requests(
    client: &Client,
    requests: &[ReplayRequest],
    options: ReplayOptions,
) -> AppResult<ReplaySummary> {
    let mut summary = ReplaySummary {
        total: requests.len(),
        ..ReplaySummary::default()
    };

    for request in requests {
        tracing::info!("{}", request.url);
        let failure = match send_request(client, request).await {
            Ok(status) => {
                summary.delivered = summary.delivered.saturating_add(1);
                tracing::info!(status = status.as_u16(), "done");
                continue;
            }
            Err(failure) => failure,
        };

        let policy = match &failure {
            ReplayFailure::Status { status, body } => {
                summary.http_errors = summary.http_errors.saturating_add(1);
                tracing::error!("error {} {}: {}", request.method, request.url, status);
                tracing::error!("{}", body);
                options.on_http_error
            }
            ReplayFailure::Transport { source } => {
                summary.transport_errors = summary.transport_errors.saturating_add(1);
                tracing::error!("error {} {}: {}", request.method, request.url, source);
                options.on_transport_error
            }
        };

        if policy.aborts() {
            tracing::warn!(
                "Stopping replay at record {} of {}",
                request.index,
                summary.total
            );
            return Err(AppError::replay(ReplayError::Aborted {
                index: request.index,
                url: request.url.to_string(),
                source: Box::new(failure),
            }));
        }
    }

    if options.end_marker {
        tracing::info!("end");
    }
    Ok(summary)
}

/// Load `args.input` and replay it against `args.target`.
///
/// # Errors
///
/// Returns an error if the input cannot be loaded or the run aborts.
pub async fn run_replay(args: &ReplayArgs) -> AppResult<ReplaySummary> {
    let target = parse_target(&args.target)?;
    let records = read_records(Path::new(&args.input)).await?;
    let requests = build_requests(records, &target)?;
    tracing::info!(
        "Replaying {} requests from {} to {}",
        requests.len(),
        args.input,
        target
    );

    let client = Client::builder()
        .build()
        .map_err(|err| AppError::replay(ReplayError::BuildClient { source: err }))?;
    let summary = replay_requests(&client, &requests, ReplayOptions::from(args)).await?;
    tracing::info!(
        "Replay finished: {} delivered, {} HTTP errors, {} transport errors",
        summary.delivered,
        summary.http_errors,
        summary.transport_errors
    );
    Ok(summary)
}
