use std::io::Read;

use flate2::read::{GzDecoder, ZlibDecoder};
use http::StatusCode;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::request::RequestError;

const READ_CHUNK_BYTES: usize = 4096;
const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Append one read worth of bytes to `buffer`, returning how many arrived.
pub(super) async fn read_more<R>(
    socket: &mut R,
    buffer: &mut Vec<u8>,
) -> Result<usize, RequestError>
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; READ_CHUNK_BYTES];
    let bytes = socket
        .read(&mut chunk)
        .await
        .map_err(|err| RequestError::bad_request(format!("Failed to read request: {}", err)))?;
    let read_slice = chunk
        .get(..bytes)
        .ok_or_else(|| RequestError::bad_request("Invalid read length"))?;
    buffer.extend_from_slice(read_slice);
    Ok(bytes)
}

/// Decode a `Transfer-Encoding: chunked` body. `pending` holds whatever was
/// already read past the header block.
pub(super) async fn read_chunked_body<R>(
    socket: &mut R,
    mut pending: Vec<u8>,
    max_bytes: usize,
) -> Result<Vec<u8>, RequestError>
where
    R: AsyncRead + Unpin,
{
    let mut body = Vec::new();
    loop {
        let line_end = fill_line(socket, &mut pending, max_bytes).await?;
        let size = parse_chunk_size(pending.get(..line_end).unwrap_or_default())?;
        consume(&mut pending, line_end, 2)?;

        if size == 0 {
            // Trailer section ends with an empty line.
            loop {
                let trailer_end = fill_line(socket, &mut pending, max_bytes).await?;
                consume(&mut pending, trailer_end, 2)?;
                if trailer_end == 0 {
                    return Ok(body);
                }
            }
        }

        if body.len().saturating_add(size) > max_bytes {
            return Err(RequestError::too_large());
        }
        let framed = size.checked_add(2).ok_or_else(RequestError::too_large)?;
        while pending.len() < framed {
            if read_more(socket, &mut pending).await? == 0 {
                return Err(RequestError::bad_request("Chunked body ended early"));
            }
        }
        let data = pending
            .get(..size)
            .ok_or_else(|| RequestError::bad_request("Malformed chunk"))?;
        body.extend_from_slice(data);
        if pending.get(size..framed) != Some(b"\r\n".as_slice()) {
            return Err(RequestError::bad_request("Chunk missing terminator"));
        }
        consume(&mut pending, size, 2)?;
    }
}

/// Read until `pending` holds a CRLF, returning the index where it starts.
async fn fill_line<R>(
    socket: &mut R,
    pending: &mut Vec<u8>,
    max_bytes: usize,
) -> Result<usize, RequestError>
where
    R: AsyncRead + Unpin,
{
    loop {
        if let Some(pos) = pending.windows(2).position(|window| window == b"\r\n") {
            return Ok(pos);
        }
        if pending.len() > max_bytes {
            return Err(RequestError::too_large());
        }
        if read_more(socket, pending).await? == 0 {
            return Err(RequestError::bad_request("Chunked body ended early"));
        }
    }
}

fn consume(pending: &mut Vec<u8>, len: usize, terminator: usize) -> Result<(), RequestError> {
    let end = len
        .checked_add(terminator)
        .filter(|end| *end <= pending.len())
        .ok_or_else(|| RequestError::bad_request("Malformed chunk"))?;
    pending.drain(..end);
    Ok(())
}

fn parse_chunk_size(line: &[u8]) -> Result<usize, RequestError> {
    let text = std::str::from_utf8(line)
        .map_err(|err| RequestError::bad_request(format!("Invalid chunk size: {}", err)))?;
    // Chunk extensions after ';' carry nothing we need.
    let digits = text.split(';').next().unwrap_or_default().trim();
    usize::from_str_radix(digits, 16).map_err(|err| {
        RequestError::bad_request(format!("Invalid chunk size '{}': {}", digits, err))
    })
}

pub(super) fn is_ndjson(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|value| value.split(';').next())
        .is_some_and(|media| media.trim().eq_ignore_ascii_case(NDJSON_CONTENT_TYPE))
}

/// Undo `Content-Encoding`, capping the inflated size at `max_bytes`.
pub(super) fn decode_content(
    encoding: Option<&str>,
    body: Vec<u8>,
    max_bytes: usize,
) -> Result<Vec<u8>, RequestError> {
    let encoding = encoding
        .map(|value| value.trim().to_ascii_lowercase())
        .unwrap_or_default();
    match encoding.as_str() {
        "" | "identity" => Ok(body),
        "gzip" | "x-gzip" => inflate(GzDecoder::new(body.as_slice()), max_bytes),
        "deflate" => inflate(ZlibDecoder::new(body.as_slice()), max_bytes),
        other => Err(RequestError::new(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            format!("Unsupported content encoding '{}'", other),
        )),
    }
}

fn inflate<D: Read>(decoder: D, max_bytes: usize) -> Result<Vec<u8>, RequestError> {
    let limit = u64::try_from(max_bytes)
        .unwrap_or(u64::MAX)
        .saturating_add(1);
    let mut inflated = Vec::new();
    decoder
        .take(limit)
        .read_to_end(&mut inflated)
        .map_err(|err| RequestError::bad_request(format!("Invalid compressed body: {}", err)))?;
    if inflated.len() > max_bytes {
        return Err(RequestError::too_large());
    }
    Ok(inflated)
}
