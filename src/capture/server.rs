use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use http::StatusCode;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{Instant, MissedTickBehavior};

use crate::args::CaptureArgs;
use crate::error::{AppError, AppResult, CaptureError};
use crate::record::CapturedRequest;
use crate::shutdown::{ShutdownReceiver, setup_signal_shutdown_handler, shutdown_channel};

use super::body::{decode_content, is_ndjson};
use super::buffer::CaptureBuffer;
use super::request::{
    HttpRequest, RequestError, discard_remaining, read_http_request, write_empty_response,
};

/// How long a rejected client gets to stop sending before the socket closes.
const REJECT_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Route {
    Health,
    Capture,
    NotFound,
}

pub(super) fn route(request: &HttpRequest) -> Route {
    match (request.method.as_str(), request.path()) {
        ("GET" | "HEAD", "/") => Route::Health,
        ("POST", _) => Route::Capture,
        _ => Route::NotFound,
    }
}

/// Turn a POST into a record. Bodies that are not NDJSON are acknowledged
/// but stored empty, the same as a raw body parser that skips them.
pub(super) fn capture_record(
    request: HttpRequest,
    max_bytes: usize,
) -> Result<CapturedRequest, RequestError> {
    let content_type = request.header("content-type").map(str::to_owned);
    let encoding = request.header("content-encoding").map(str::to_owned);
    let HttpRequest {
        method,
        target,
        body,
        ..
    } = request;
    let data = if is_ndjson(content_type.as_deref()) {
        let decoded = decode_content(encoding.as_deref(), body, max_bytes)?;
        String::from_utf8_lossy(&decoded).into_owned()
    } else {
        tracing::debug!(
            "Ignoring body of {} with content type {:?}",
            target,
            content_type
        );
        String::new()
    };
    Ok(CapturedRequest {
        url: target,
        method,
        data,
    })
}

pub struct CaptureServer {
    listener: TcpListener,
    buffer: CaptureBuffer,
    output: PathBuf,
    flush_interval: Duration,
    max_request_bytes: usize,
}

impl CaptureServer {
    /// Bind the listener described by `args`.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be resolved or bound.
    pub async fn bind(args: &CaptureArgs) -> AppResult<Self> {
        let listener = TcpListener::bind((args.host.as_str(), args.port))
            .await
            .map_err(|err| {
                AppError::capture(CaptureError::Bind {
                    host: args.host.clone(),
                    port: args.port,
                    source: err,
                })
            })?;
        Ok(Self {
            listener,
            buffer: CaptureBuffer::new(),
            output: PathBuf::from(&args.output),
            flush_interval: args.flush_interval,
            max_request_bytes: args.max_body_bytes.get(),
        })
    }

    /// # Errors
    ///
    /// Returns an error if the socket address cannot be read.
    pub fn local_addr(&self) -> AppResult<SocketAddr> {
        self.listener.local_addr().map_err(|err| {
            AppError::capture(CaptureError::Io {
                context: "read listener address",
                source: err,
            })
        })
    }

    #[must_use]
    pub fn buffer(&self) -> CaptureBuffer {
        self.buffer.clone()
    }

    /// Accept requests and flush on every interval tick until shutdown, then
    /// flush one last time. Periodic flush failures are only logged.
    ///
    /// # Errors
    ///
    /// Returns an error if the final flush fails.
    pub async fn run(self, mut shutdown_rx: ShutdownReceiver) -> AppResult<()> {
        let first_tick = Instant::now()
            .checked_add(self.flush_interval)
            .unwrap_or_else(Instant::now);
        let mut ticker = tokio::time::interval_at(first_tick, self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                _ = ticker.tick() => {
                    flush_logged(&self.buffer, &self.output).await;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((socket, peer)) => {
                        tracing::debug!("Accepted connection from {}", peer);
                        let buffer = self.buffer.clone();
                        let max_bytes = self.max_request_bytes;
                        tokio::spawn(handle_connection(socket, buffer, max_bytes));
                    }
                    Err(err) => {
                        tracing::warn!("Failed to accept connection: {}", err);
                    }
                },
            }
        }

        tracing::info!("Shutdown requested, flushing captured requests");
        let count = flush_to_file(&self.buffer, &self.output).await?;
        tracing::info!("Persisted {} items to {}", count, self.output.display());
        Ok(())
    }
}

/// Run the capture server until Ctrl-C or SIGTERM.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the final flush fails.
pub async fn run_capture(args: &CaptureArgs) -> AppResult<()> {
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let signal_handle = setup_signal_shutdown_handler(&shutdown_tx);

    let server = CaptureServer::bind(args).await?;
    tracing::info!("Running on http://{}", server.local_addr()?);
    tracing::info!(
        "Flushing every {:?} to {}",
        args.flush_interval,
        server.output.display()
    );

    let result = server.run(shutdown_rx).await;
    drop(shutdown_tx.send(()));
    signal_handle.await?;
    result
}

/// Overwrite `path` with the full contents of `buffer`.
///
/// # Errors
///
/// Returns an error if serialization or the file write fails.
pub async fn flush_to_file(buffer: &CaptureBuffer, path: &Path) -> AppResult<usize> {
    let (count, payload) = buffer
        .to_json()
        .map_err(|err| AppError::capture(CaptureError::Serialize { source: err }))?;
    tracing::info!("Persisting {} items", count);
    tokio::fs::write(path, payload).await.map_err(|err| {
        AppError::capture(CaptureError::WriteOutput {
            path: path.to_path_buf(),
            source: err,
        })
    })?;
    Ok(count)
}

async fn flush_logged(buffer: &CaptureBuffer, path: &Path) {
    match flush_to_file(buffer, path).await {
        Ok(count) => tracing::info!("Persisted {} items to {}", count, path.display()),
        Err(err) => tracing::error!("Failed to persist captured requests: {}", err),
    }
}

async fn handle_connection(mut socket: TcpStream, buffer: CaptureBuffer, max_bytes: usize) {
    let request = match read_http_request(&mut socket, max_bytes).await {
        Ok(request) => request,
        Err(err) => {
            reject(&mut socket, &err).await;
            return;
        }
    };

    let status = match route(&request) {
        Route::Health => StatusCode::ACCEPTED,
        Route::NotFound => StatusCode::NOT_FOUND,
        Route::Capture => match capture_record(request, max_bytes) {
            Ok(record) => {
                tracing::info!("{} {}", record.url, record.method);
                buffer.push(record);
                StatusCode::ACCEPTED
            }
            Err(err) => {
                reject(&mut socket, &err).await;
                return;
            }
        },
    };

    if write_empty_response(&mut socket, status).await.is_err() {
        // Socket closed while writing response.
    }
}

async fn reject(socket: &mut TcpStream, err: &RequestError) {
    tracing::debug!("Rejecting request ({}): {}", err.status, err.message);
    if write_empty_response(socket, err.status).await.is_err() {
        // Socket closed while writing error response.
        return;
    }
    if socket.shutdown().await.is_err() {
        return;
    }
    if tokio::time::timeout(REJECT_DRAIN_TIMEOUT, discard_remaining(socket))
        .await
        .is_err()
    {
        // Peer kept sending; drop the connection anyway.
    }
}
