//! `Content-Length` framing for LSP messages.
//!
//! Every message on the wire is a header block terminated by `\r\n\r\n`
//! followed by exactly `Content-Length` bytes of UTF-8 JSON:
//!
//! ```text
//! Content-Length: 52\r\n
//! \r\n
//! {"jsonrpc":"2.0","id":1,"method":"shutdown"}
//! ```
//!
//! [`split`] finds frame boundaries in a growing buffer, [`decode`] turns one
//! frame into a [`Message`] and [`encode`] produces a frame from any
//! serializable payload. [`FrameReader`] and [`FrameWriter`] drive these over
//! async byte streams.

use crate::error::{LspError, Result};
use crate::protocol::Message;
use bytes::{Bytes, BytesMut};
use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Maximum body size (64 MiB); larger declared lengths are malformed.
pub const MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;

/// Maximum header block size (8 KiB), separator excluded.
pub const MAX_HEADER_BYTES: usize = 8 * 1024;

const SEPARATOR: &[u8] = b"\r\n\r\n";
const CONTENT_LENGTH: &str = "Content-Length";
const READ_CHUNK: usize = 8 * 1024;

/// A header block that cannot be parsed. Fatal to the stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FramingError {
    #[error("missing header separator")]
    MissingSeparator,

    #[error("header block is not valid UTF-8")]
    InvalidHeaderEncoding,

    #[error("missing Content-Length header")]
    MissingContentLength,

    #[error("invalid Content-Length value {0:?}")]
    InvalidContentLength(String),

    #[error("Content-Length {0} exceeds maximum {MAX_FRAME_BYTES}")]
    FrameTooLarge(usize),

    #[error("no header separator within {MAX_HEADER_BYTES} bytes")]
    HeaderTooLarge,

    #[error("body has {actual} bytes but Content-Length declares {declared}")]
    TruncatedBody { declared: usize, actual: usize },
}

/// Finds the first complete frame at the start of `buffer`.
///
/// Returns `Ok(Some(n))` when the first `n` bytes (header, separator and
/// body) form a complete frame, and `Ok(None)` when more data is needed.
/// Only a malformed header is an error, including a header block that runs
/// past [`MAX_HEADER_BYTES`] without a separator.
///
/// # Examples
///
/// ```
/// use scl_lsp::codec::split;
///
/// assert_eq!(split(b"Content-Length: 5\r\n\r\nHello").unwrap(), Some(26));
/// assert_eq!(split(b"Content-Length: 5\r\n\r\nHel").unwrap(), None);
/// assert_eq!(split(b"Content-Len").unwrap(), None);
/// ```
pub fn split(buffer: &[u8]) -> std::result::Result<Option<usize>, FramingError> {
    let Some(header_end) = find_header_end(buffer)? else {
        return Ok(None);
    };

    let body_len = parse_header(&buffer[..header_end])?;
    let frame_len = header_end + SEPARATOR.len() + body_len;

    if buffer.len() < frame_len {
        return Ok(None);
    }
    Ok(Some(frame_len))
}

/// Decodes one complete frame into a [`Message`].
///
/// Bytes past the declared body length are ignored.
pub fn decode(frame: &[u8]) -> Result<Message> {
    let header_end = find_header_end(frame)?.ok_or(FramingError::MissingSeparator)?;
    let body_len = parse_header(&frame[..header_end])?;

    let body = &frame[header_end + SEPARATOR.len()..];
    if body.len() < body_len {
        return Err(FramingError::TruncatedBody {
            declared: body_len,
            actual: body.len(),
        }
        .into());
    }

    decode_body(&body[..body_len])
}

/// Decodes a bare JSON body. The body must be a JSON object.
pub fn decode_body(body: &[u8]) -> Result<Message> {
    let object: serde_json::Map<String, serde_json::Value> =
        serde_json::from_slice(body).map_err(LspError::PayloadDecode)?;
    serde_json::from_value(serde_json::Value::Object(object)).map_err(LspError::PayloadDecode)
}

/// Serializes `payload` and prepends a matching `Content-Length` header.
///
/// # Examples
///
/// ```
/// use scl_lsp::codec::encode;
///
/// let frame = encode(&serde_json::json!({"id": 1})).unwrap();
/// assert_eq!(frame, b"Content-Length: 8\r\n\r\n{\"id\":1}");
/// ```
pub fn encode(payload: &impl Serialize) -> Result<Vec<u8>> {
    let body = serde_json::to_vec(payload).map_err(LspError::Encode)?;
    let header = format!("{CONTENT_LENGTH}: {}\r\n\r\n", body.len());

    let mut frame = Vec::with_capacity(header.len() + body.len());
    frame.extend_from_slice(header.as_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Offset of the header separator, searched only within the header limit.
fn find_header_end(buffer: &[u8]) -> std::result::Result<Option<usize>, FramingError> {
    let window = &buffer[..buffer.len().min(MAX_HEADER_BYTES + SEPARATOR.len())];
    match find_separator(window) {
        Some(end) => Ok(Some(end)),
        None if window.len() == MAX_HEADER_BYTES + SEPARATOR.len() => {
            Err(FramingError::HeaderTooLarge)
        }
        None => Ok(None),
    }
}

fn find_separator(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(SEPARATOR.len())
        .position(|window| window == SEPARATOR)
}

/// Parses a header block (without the trailing separator) into the body length.
fn parse_header(header: &[u8]) -> std::result::Result<usize, FramingError> {
    let header = std::str::from_utf8(header).map_err(|_| FramingError::InvalidHeaderEncoding)?;

    let mut content_length = None;
    for line in header.split("\r\n") {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        // Other headers (e.g. Content-Type) are ignored.
        if name.trim().eq_ignore_ascii_case(CONTENT_LENGTH) {
            let value = value.trim();
            let len: usize = value
                .parse()
                .map_err(|_| FramingError::InvalidContentLength(value.to_string()))?;
            content_length = Some(len);
        }
    }

    match content_length {
        Some(len) if len > MAX_FRAME_BYTES => Err(FramingError::FrameTooLarge(len)),
        Some(len) => Ok(len),
        None => Err(FramingError::MissingContentLength),
    }
}

/// Reads complete frames from an async byte stream.
///
/// Input is accumulated in a [`BytesMut`] buffer and cut at the boundaries
/// reported by [`split`], so a frame may arrive in any number of reads and
/// one read may carry several frames.
pub struct FrameReader<R> {
    reader: R,
    buffer: BytesMut,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: BytesMut::with_capacity(READ_CHUNK),
        }
    }

    /// Reads the next complete frame, header included.
    ///
    /// Returns `Ok(None)` on EOF between frames; EOF inside a frame is an
    /// I/O error.
    pub async fn read_frame(&mut self) -> Result<Option<Bytes>> {
        loop {
            if let Some(frame_len) = split(&self.buffer)? {
                return Ok(Some(self.buffer.split_to(frame_len).freeze()));
            }

            self.buffer.reserve(READ_CHUNK);
            if self.reader.read_buf(&mut self.buffer).await? == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("stream closed inside a frame ({} bytes buffered)", self.buffer.len()),
                )
                .into());
            }
        }
    }
}

/// Writes frames to an async byte stream, flushing after each one.
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Encodes and writes one message.
    pub async fn send(&mut self, payload: &impl Serialize) -> Result<()> {
        let frame = encode(payload)?;
        self.writer.write_all(&frame).await?;
        self.writer.flush().await?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
