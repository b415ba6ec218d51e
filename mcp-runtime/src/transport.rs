//! Message framing for the stdio session.
//!
//! Hosts speak either newline-delimited JSON or `Content-Length` framed JSON.
//! The framing is detected per message and replies use the same framing.

use bakul_core::validation::DATASET_DATA_MAX_BYTES;
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    Lines,
    ContentLength,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    Message(Value, Framing),
    /// Payload that is not JSON; answered with a parse error.
    Malformed(String, Framing),
}

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("Failed to read MCP message: {0}")]
    Read(#[source] std::io::Error),
    #[error("Failed to write MCP response: {0}")]
    Write(#[source] std::io::Error),
}

/// Largest accepted message body: a maximal dataset payload plus envelope headroom.
pub const MAX_FRAME_BYTES: usize = DATASET_DATA_MAX_BYTES + 1024 * 1024;

enum RawLine {
    Eof,
    Line(Vec<u8>),
    /// Longer than [`MAX_FRAME_BYTES`]; the rest of the line was discarded.
    Oversized,
}

/// Reads the next message. `Ok(None)` on a clean EOF.
pub async fn read_message<R>(reader: &mut R) -> Result<Option<Incoming>, std::io::Error>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let raw = match read_raw_line(reader).await? {
            RawLine::Eof => return Ok(None),
            RawLine::Oversized => {
                return Ok(Some(Incoming::Malformed(
                    format!("message exceeds {MAX_FRAME_BYTES} bytes"),
                    Framing::Lines,
                )));
            }
            RawLine::Line(raw) => raw,
        };
        let line = match std::str::from_utf8(&raw) {
            Ok(line) => line,
            Err(e) => {
                return Ok(Some(Incoming::Malformed(
                    format!("message is not valid UTF-8: {e}"),
                    Framing::Lines,
                )));
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(length) = parse_content_length(trimmed)? {
            return read_framed_body(reader, length).await.map(Some);
        }

        return Ok(Some(match serde_json::from_str(trimmed) {
            Ok(value) => Incoming::Message(value, Framing::Lines),
            Err(e) => Incoming::Malformed(e.to_string(), Framing::Lines),
        }));
    }
}

async fn read_raw_line<R>(reader: &mut R) -> Result<RawLine, std::io::Error>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let read = (&mut *reader)
        .take(MAX_FRAME_BYTES as u64 + 1)
        .read_until(b'\n', &mut buf)
        .await?;
    if read == 0 {
        return Ok(RawLine::Eof);
    }
    if buf.len() > MAX_FRAME_BYTES && buf.last() != Some(&b'\n') {
        discard_line_rest(reader).await?;
        return Ok(RawLine::Oversized);
    }
    Ok(RawLine::Line(buf))
}

async fn discard_line_rest<R>(reader: &mut R) -> Result<(), std::io::Error>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let (consumed, done) = {
            let available = reader.fill_buf().await?;
            if available.is_empty() {
                return Ok(());
            }
            match available.iter().position(|b| *b == b'\n') {
                Some(pos) => (pos + 1, true),
                None => (available.len(), false),
            }
        };
        reader.consume(consumed);
        if done {
            return Ok(());
        }
    }
}

fn parse_content_length(line: &str) -> Result<Option<usize>, std::io::Error> {
    let Some((name, raw_len)) = line.split_once(':') else {
        return Ok(None);
    };
    if !name.trim().eq_ignore_ascii_case("content-length") {
        return Ok(None);
    }
    let length = raw_len.trim().parse::<usize>().map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "Invalid Content-Length header",
        )
    })?;
    if length > MAX_FRAME_BYTES {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Content-Length {length} exceeds the {MAX_FRAME_BYTES} byte limit"),
        ));
    }
    Ok(Some(length))
}

async fn read_framed_body<R>(reader: &mut R, length: usize) -> Result<Incoming, std::io::Error>
where
    R: AsyncBufRead + Unpin,
{
    // Skip remaining headers up to the blank separator line.
    loop {
        match read_raw_line(reader).await? {
            RawLine::Eof => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "Unexpected EOF while reading MCP headers",
                ));
            }
            RawLine::Line(raw) if raw.trim_ascii().is_empty() => break,
            RawLine::Line(_) | RawLine::Oversized => {}
        }
    }

    let mut payload = vec![0_u8; length];
    reader.read_exact(&mut payload).await?;
    Ok(match serde_json::from_slice(&payload) {
        Ok(value) => Incoming::Message(value, Framing::ContentLength),
        Err(e) => Incoming::Malformed(e.to_string(), Framing::ContentLength),
    })
}

pub async fn write_message<W>(
    writer: &mut W,
    value: &Value,
    framing: Framing,
) -> Result<(), std::io::Error>
where
    W: AsyncWrite + Unpin,
{
    let body = serde_json::to_vec(value).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Failed to serialize JSON: {e}"),
        )
    })?;
    match framing {
        Framing::Lines => {
            writer.write_all(&body).await?;
            writer.write_all(b"\n").await?;
        }
        Framing::ContentLength => {
            let header = format!(
                "Content-Length: {}\r\nContent-Type: application/json\r\n\r\n",
                body.len()
            );
            writer.write_all(header.as_bytes()).await?;
            writer.write_all(&body).await?;
        }
    }
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn reads_newline_delimited_messages() {
        let mut input: &[u8] = b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n\n{\"a\":2}\n";
        let first = read_message(&mut input).await.unwrap();
        assert_eq!(
            first,
            Some(Incoming::Message(
                json!({ "jsonrpc": "2.0", "id": 1, "method": "ping" }),
                Framing::Lines
            ))
        );
        let second = read_message(&mut input).await.unwrap();
        assert_eq!(second, Some(Incoming::Message(json!({ "a": 2 }), Framing::Lines)));
        assert_eq!(read_message(&mut input).await.unwrap(), None);
    }

    #[tokio::test]
    async fn reads_content_length_frames() {
        let body = r#"{"id":7}"#;
        let raw = format!(
            "Content-Length: {}\r\nContent-Type: application/json\r\n\r\n{body}",
            body.len()
        );
        let mut input = raw.as_bytes();
        let message = read_message(&mut input).await.unwrap();
        assert_eq!(
            message,
            Some(Incoming::Message(json!({ "id": 7 }), Framing::ContentLength))
        );
    }

    #[tokio::test]
    async fn invalid_json_line_is_malformed_not_fatal() {
        let mut input: &[u8] = b"not json\n";
        let message = read_message(&mut input).await.unwrap();
        assert!(matches!(message, Some(Incoming::Malformed(_, Framing::Lines))));
    }

    #[tokio::test]
    async fn bad_content_length_is_an_error() {
        let mut input: &[u8] = b"Content-Length: abc\r\n\r\n{}";
        assert!(read_message(&mut input).await.is_err());
    }

    #[tokio::test]
    async fn non_utf8_line_is_malformed_and_reading_continues() {
        let mut input: &[u8] = b"\xff\xfe not json\n{\"id\":3}\n";
        let first = read_message(&mut input).await.unwrap();
        assert!(matches!(first, Some(Incoming::Malformed(_, Framing::Lines))));
        let second = read_message(&mut input).await.unwrap();
        assert_eq!(second, Some(Incoming::Message(json!({ "id": 3 }), Framing::Lines)));
    }

    #[tokio::test]
    async fn huge_content_length_is_rejected_without_allocating() {
        let mut input: &[u8] = b"Content-Length: 18446744073709551615\r\n\r\n{}";
        let err = read_message(&mut input).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);

        let raw = format!("Content-Length: {}\r\n\r\n{{}}", MAX_FRAME_BYTES + 1);
        let mut input = raw.as_bytes();
        assert!(read_message(&mut input).await.is_err());
    }

    #[tokio::test]
    async fn overlong_line_is_skipped() {
        let mut raw = vec![b'a'; MAX_FRAME_BYTES + 10];
        raw.extend_from_slice(b"\n{\"id\":4}\n");
        let mut input = raw.as_slice();
        let first = read_message(&mut input).await.unwrap();
        assert!(matches!(first, Some(Incoming::Malformed(_, Framing::Lines))));
        let second = read_message(&mut input).await.unwrap();
        assert_eq!(second, Some(Incoming::Message(json!({ "id": 4 }), Framing::Lines)));
    }

    #[tokio::test]
    async fn truncated_headers_are_an_error() {
        let mut input: &[u8] = b"Content-Length: 2\r\n";
        let err = read_message(&mut input).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn writes_with_requested_framing() {
        let mut lines = Vec::new();
        write_message(&mut lines, &json!({ "ok": true }), Framing::Lines)
            .await
            .unwrap();
        assert_eq!(lines, b"{\"ok\":true}\n");

        let mut framed = Vec::new();
        write_message(&mut framed, &json!({ "ok": true }), Framing::ContentLength)
            .await
            .unwrap();
        assert_eq!(
            String::from_utf8(framed).unwrap(),
            "Content-Length: 11\r\nContent-Type: application/json\r\n\r\n{\"ok\":true}"
        );
    }
}
