use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// How a stdio client frames its messages. Replies use the same framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// One JSON document per line.
    Ndjson,
    /// `Content-Length` header block followed by the body.
    ContentLength,
}

#[derive(Debug)]
pub struct Frame {
    pub framing: Framing,
    pub body: Vec<u8>,
}

/// Read the next frame, or `None` on a clean EOF.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Frame>, std::io::Error>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length: Option<usize> = None;
    let mut in_headers = false;

    loop {
        let mut line = String::new();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            if !in_headers {
                return Ok(None);
            }
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "Unexpected EOF while reading MCP headers",
            ));
        }

        let trimmed = line.trim();
        if !in_headers {
            if trimmed.is_empty() {
                continue;
            }
            // Anything that is not a `Name: value` header is a line of JSON.
            if trimmed.starts_with('{') || trimmed.starts_with('[') || !trimmed.contains(':') {
                return Ok(Some(Frame {
                    framing: Framing::Ndjson,
                    body: trimmed.as_bytes().to_vec(),
                }));
            }
            in_headers = true;
        }

        if trimmed.is_empty() {
            break;
        }
        if let Some((name, raw_len)) = trimmed.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                let parsed = raw_len.trim().parse::<usize>().map_err(|_| {
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        "Invalid Content-Length header",
                    )
                })?;
                content_length = Some(parsed);
            }
        }
    }

    let content_length = content_length.ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "Missing Content-Length header",
        )
    })?;
    let mut body = vec![0_u8; content_length];
    reader.read_exact(&mut body).await?;
    Ok(Some(Frame {
        framing: Framing::ContentLength,
        body,
    }))
}

pub async fn write_frame<W>(
    writer: &mut W,
    framing: Framing,
    value: &Value,
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
        Framing::Ndjson => {
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
