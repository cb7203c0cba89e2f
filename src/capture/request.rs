use std::collections::HashMap;

use http::StatusCode;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::body::{read_chunked_body, read_more};

/// A request that could not be accepted, with the status to answer it with.
#[derive(Debug)]
pub(super) struct RequestError {
    pub(super) status: StatusCode,
    pub(super) message: String,
}

impl RequestError {
    pub(super) fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub(super) fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub(super) fn too_large() -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, "Request too large")
    }
}

#[derive(Debug)]
pub(super) struct HttpRequest {
    pub(super) method: String,
    /// Request target exactly as sent: path plus query string.
    pub(super) target: String,
    pub(super) headers: HashMap<String, String>,
    /// Body with transfer framing removed but content encoding intact.
    pub(super) body: Vec<u8>,
}

impl HttpRequest {
    pub(super) fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub(super) fn path(&self) -> &str {
        self.target
            .split_once('?')
            .map_or(self.target.as_str(), |(path, _)| path)
    }
}

pub(super) async fn read_http_request<R>(
    socket: &mut R,
    max_bytes: usize,
) -> Result<HttpRequest, RequestError>
where
    R: AsyncRead + Unpin,
{
    let mut buffer: Vec<u8> = Vec::with_capacity(1024);
    let header_end = loop {
        if let Some(pos) = find_header_end(&buffer) {
            break pos;
        }
        if buffer.len() > max_bytes {
            return Err(RequestError::too_large());
        }
        let bytes = read_more(socket, &mut buffer).await?;
        if bytes == 0 {
            return Err(RequestError::bad_request(if buffer.is_empty() {
                "Empty request"
            } else {
                "Incomplete request headers"
            }));
        }
    };

    let header_bytes = buffer
        .get(..header_end)
        .ok_or_else(|| RequestError::bad_request("Malformed request headers"))?;
    let header_text = std::str::from_utf8(header_bytes).map_err(|err| {
        RequestError::bad_request(format!("Invalid request encoding: {}", err))
    })?;
    let mut lines = header_text.split("\r\n");
    let request_line = lines
        .next()
        .ok_or_else(|| RequestError::bad_request("Missing request line"))?;
    let mut parts = request_line.split_whitespace();
    let method = parts
        .next()
        .ok_or_else(|| RequestError::bad_request("Missing HTTP method"))?;
    let target = parts
        .next()
        .ok_or_else(|| RequestError::bad_request("Missing request path"))?;

    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            return Err(RequestError::bad_request("Malformed header"));
        };
        headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_owned());
    }

    let body_start = header_end
        .checked_add(4)
        .ok_or_else(|| RequestError::bad_request("Malformed request headers"))?;
    let pending = buffer.get(body_start..).unwrap_or_default().to_vec();

    let chunked = headers
        .get("transfer-encoding")
        .is_some_and(|value| value.to_ascii_lowercase().contains("chunked"));
    let body = if chunked {
        read_chunked_body(socket, pending, max_bytes).await?
    } else {
        let content_length = match headers.get("content-length") {
            Some(value) => value
                .parse::<usize>()
                .map_err(|_parse| RequestError::bad_request("Invalid Content-Length"))?,
            None => 0,
        };
        read_sized_body(socket, pending, content_length, max_bytes).await?
    };

    Ok(HttpRequest {
        method: method.to_owned(),
        target: target.to_owned(),
        headers,
        body,
    })
}

async fn read_sized_body<R>(
    socket: &mut R,
    mut body: Vec<u8>,
    content_length: usize,
    max_bytes: usize,
) -> Result<Vec<u8>, RequestError>
where
    R: AsyncRead + Unpin,
{
    if content_length > max_bytes {
        return Err(RequestError::too_large());
    }
    while body.len() < content_length {
        let bytes = read_more(socket, &mut body).await?;
        if bytes == 0 {
            return Err(RequestError::bad_request("Request body ended early"));
        }
    }
    body.truncate(content_length);
    Ok(body)
}

fn find_header_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|window| window == b"\r\n\r\n")
}

/// Write a bodiless response and close the exchange.
pub(super) async fn write_empty_response<W>(
    socket: &mut W,
    status: StatusCode,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown")
    );
    socket.write_all(response.as_bytes()).await?;
    socket.flush().await
}

/// Drain whatever the peer still sends so closing the socket does not reset
/// a connection the client is still writing to.
pub(super) async fn discard_remaining<R>(socket: &mut R)
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; 1024];
    while let Ok(bytes) = socket.read(&mut chunk).await {
        if bytes == 0 {
            break;
        }
    }
}
