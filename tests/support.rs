use std::ffi::OsStr;
use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::process::{Child, Command, Output, Stdio};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

/// Request line and body as seen by a [`RecordingServer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenRequest {
    pub method: String,
    pub target: String,
    pub content_type: Option<String>,
    pub body: String,
}

pub struct RecordingServer {
    pub url: String,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
    shutdown: mpsc::Sender<()>,
    thread: Option<thread::JoinHandle<()>>,
}

impl RecordingServer {
    #[must_use]
    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen
            .lock()
            .map_or_else(|poisoned| poisoned.into_inner().clone(), |seen| seen.clone())
    }
}

impl Drop for RecordingServer {
    fn drop(&mut self) {
        let _send_result = self.shutdown.send(());
        if let Some(handle) = self.thread.take() {
            drop(handle.join());
        }
    }
}

/// Spawn a server that records every request and answers with `status_line`
/// (for example `"202 Accepted"`) and `body`.
///
/// # Errors
///
/// Returns an error if the listener cannot be created or configured.
pub fn spawn_recording_server(
    status_line: &'static str,
    body: &'static str,
) -> Result<RecordingServer, String> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .map_err(|err| format!("bind test server failed: {}", err))?;
    let addr = listener
        .local_addr()
        .map_err(|err| format!("server addr failed: {}", err))?;
    listener
        .set_nonblocking(true)
        .map_err(|err| format!("set_nonblocking failed: {}", err))?;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    let recorded = Arc::clone(&seen);

    let handle = thread::spawn(move || {
        loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }

            match listener.accept() {
                Ok((stream, _)) => {
                    // Handled inline so records keep arrival order.
                    handle_client(stream, &recorded, status_line, body);
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(10));
                }
                Err(_) => break,
            }
        }
    });

    Ok(RecordingServer {
        url: format!("http://{}", addr),
        seen,
        shutdown: shutdown_tx,
        thread: Some(handle),
    })
}

/// Like [`spawn_recording_server`], but skips when sockets are not permitted.
///
/// # Errors
///
/// Returns an error if the server fails for any other reason.
pub fn spawn_recording_server_or_skip(
    status_line: &'static str,
    body: &'static str,
) -> Result<Option<RecordingServer>, String> {
    match spawn_recording_server(status_line, body) {
        Ok(server) => Ok(Some(server)),
        Err(err) if err.contains("Operation not permitted") => {
            eprintln!("Skipping e2e test: {}", err);
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

fn handle_client(
    mut stream: TcpStream,
    recorded: &Mutex<Vec<SeenRequest>>,
    status_line: &str,
    body: &str,
) {
    if stream.set_nonblocking(false).is_err() {
        return;
    }
    let Some(request) = read_request(&mut stream) else {
        return;
    };
    if let Ok(mut seen) = recorded.lock() {
        seen.push(request);
    }
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_line,
        body.len(),
        body
    );
    if stream.write_all(response.as_bytes()).is_err() {
        return;
    }
    if stream.flush().is_err() {
        return;
    }
    drop(stream.shutdown(Shutdown::Both));
}

fn read_request(stream: &mut TcpStream) -> Option<SeenRequest> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        let bytes = stream.read(&mut chunk).ok()?;
        if bytes == 0 {
            return None;
        }
        buffer.extend_from_slice(chunk.get(..bytes)?);
        if let Some(pos) = buffer.windows(4).position(|window| window == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(buffer.get(..header_end)?).into_owned();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_owned();
    let target = request_line.next()?.to_owned();

    let mut content_length = 0usize;
    let mut content_type = None;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case("content-length") {
            content_length = value.trim().parse().ok()?;
        } else if name.trim().eq_ignore_ascii_case("content-type") {
            content_type = Some(value.trim().to_owned());
        }
    }

    let body_start = header_end.checked_add(4)?;
    let body_end = body_start.checked_add(content_length)?;
    while buffer.len() < body_end {
        let bytes = stream.read(&mut chunk).ok()?;
        if bytes == 0 {
            return None;
        }
        buffer.extend_from_slice(chunk.get(..bytes)?);
    }

    Some(SeenRequest {
        method,
        target,
        content_type,
        body: String::from_utf8_lossy(buffer.get(body_start..body_end)?).into_owned(),
    })
}

/// Run the `apm-server-proxy` binary to completion and capture output.
///
/// # Errors
///
/// Returns an error if the binary cannot be executed.
pub fn run_proxy<I, S>(args: I) -> Result<Output, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = proxy_bin()?;
    Command::new(bin)
        .args(args)
        .env("APM_PROXY_LOG", "info")
        .output()
        .map_err(|err| format!("run apm-server-proxy failed: {}", err))
}

/// Start the `apm-server-proxy` binary in the background.
///
/// # Errors
///
/// Returns an error if the binary cannot be started.
pub fn spawn_proxy<I, S>(args: I) -> Result<Child, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = proxy_bin()?;
    Command::new(bin)
        .args(args)
        .env("APM_PROXY_LOG", "error")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|err| format!("spawn apm-server-proxy failed: {}", err))
}

/// Reserve a local port by binding and releasing it.
///
/// # Errors
///
/// Returns an error if no port can be bound.
pub fn free_port() -> Result<u16, String> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .map_err(|err| format!("bind probe failed: {}", err))?;
    let port = listener
        .local_addr()
        .map_err(|err| format!("probe addr failed: {}", err))?
        .port();
    drop(listener);
    Ok(port)
}

/// Send one request over a fresh connection and return the status code.
///
/// # Errors
///
/// Returns an error if the exchange fails or the status line is malformed.
pub fn send_request(
    addr: &str,
    method: &str,
    target: &str,
    content_type: &str,
    body: &str,
) -> Result<u16, String> {
    let mut stream =
        TcpStream::connect(addr).map_err(|err| format!("connect {} failed: {}", addr, err))?;
    let request = format!(
        "{} {} HTTP/1.1\r\nHost: {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        method,
        target,
        addr,
        content_type,
        body.len(),
        body
    );
    stream
        .write_all(request.as_bytes())
        .map_err(|err| format!("write request failed: {}", err))?;
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .map_err(|err| format!("read response failed: {}", err))?;
    response
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| format!("malformed response: {:?}", response))
}

/// Retry `connect` until the server at `addr` is listening.
///
/// # Errors
///
/// Returns an error if the server does not come up within `timeout`.
pub fn wait_for_listener(addr: &str, timeout: Duration) -> Result<(), String> {
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if TcpStream::connect(addr).is_ok() {
            return Ok(());
        }
        thread::sleep(Duration::from_millis(20));
    }
    Err(format!("server at {} did not start", addr))
}

fn proxy_bin() -> Result<String, String> {
    option_env!("CARGO_BIN_EXE_apm-server-proxy").map_or_else(
        || Err("CARGO_BIN_EXE_apm-server-proxy missing at compile time.".to_owned()),
        |path| Ok(path.to_owned()),
    )
}
