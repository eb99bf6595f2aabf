//! Minimal HTTP/1.1 plumbing: request parsing from a buffered stream and a
//! response writer that knows whether headers have already gone out.

use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// A parsed request head: method, raw target and headers, nothing more.
#[derive(Debug)]
pub struct Request {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
}

impl Request {
    /// Case-insensitive header lookup. Returns the first match.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_length(&self) -> Option<usize> {
        self.header("Content-Length").and_then(|v| v.parse().ok())
    }
}

/// Reads the request line and headers. `Ok(None)` means the client closed
/// the connection before sending anything.
pub async fn read_request<R>(reader: &mut R) -> io::Result<Option<Request>>
where
    R: AsyncBufRead + Unpin,
{
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).await? == 0 {
        return Ok(None);
    }

    let mut parts = request_line.split_whitespace();
    let (method, target) = match (parts.next(), parts.next()) {
        (Some(m), Some(t)) => (m.to_string(), t.to_string()),
        _ => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("malformed request line: {}", request_line.trim()),
            ))
        }
    };

    let mut headers = Vec::new();
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            break;
        }
        if let Some((name, value)) = trimmed.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    Ok(Some(Request {
        method,
        target,
        headers,
    }))
}

/// Reads exactly `len` body bytes (e.g. for an artifact PUT).
pub async fn read_body<R>(reader: &mut R, len: usize) -> io::Result<Vec<u8>>
where
    R: AsyncBufRead + Unpin,
{
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(body)
}

/// Per-request view of the bits the handlers care about. Built once after
/// parsing and dropped when the response completes.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: String,
    /// Raw request target as sent by the client, still percent-encoded.
    pub target: String,
    pub host: Option<String>,
    pub if_none_match: Option<String>,
    pub content_type: Option<String>,
}

impl RequestContext {
    pub fn new(request: &Request) -> Self {
        RequestContext {
            method: request.method.clone(),
            target: request.target.clone(),
            host: request.header("Host").map(str::to_string),
            if_none_match: request.header("If-None-Match").map(str::to_string),
            content_type: request.header("Content-Type").map(str::to_string),
        }
    }

    /// Reconstructs the absolute URI the client requested, used for
    /// `Location` and `Content-Location` headers.
    pub fn absolute_uri(&self) -> String {
        format!(
            "http://{}{}",
            self.host.as_deref().unwrap_or("localhost"),
            self.target
        )
    }
}

/// Wraps the response sink and tracks whether the status line and headers
/// have been written. Once they are out, failures can no longer be turned
/// into an error status; the caller drops the connection instead.
pub struct ResponseWriter<W> {
    sink: W,
    headers_sent: bool,
    status: u16,
}

impl<W: AsyncWrite + Unpin> ResponseWriter<W> {
    pub fn new(sink: W) -> Self {
        ResponseWriter {
            sink,
            headers_sent: false,
            status: 0,
        }
    }

    pub fn headers_sent(&self) -> bool {
        self.headers_sent
    }

    /// Status of the response, 0 if nothing has been written yet.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Writes the status line and headers. Must be called at most once.
    pub async fn send_headers(
        &mut self,
        status: u16,
        reason: &str,
        headers: &[(&str, &str)],
    ) -> io::Result<()> {
        let mut head = format!("HTTP/1.1 {} {}\r\n", status, reason);
        for (name, value) in headers {
            head.push_str(name);
            head.push_str(": ");
            head.push_str(value);
            head.push_str("\r\n");
        }
        head.push_str("\r\n");

        self.sink.write_all(head.as_bytes()).await?;
        self.headers_sent = true;
        self.status = status;
        Ok(())
    }

    pub async fn write_body(&mut self, data: &[u8]) -> io::Result<()> {
        self.sink.write_all(data).await
    }

    pub async fn flush(&mut self) -> io::Result<()> {
        self.sink.flush().await
    }

    /// Direct access to the underlying sink for streaming transfers.
    pub fn sink_mut(&mut self) -> &mut W {
        &mut self.sink
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    async fn send_text(&mut self, status: u16, reason: &str, body: &str) -> io::Result<()> {
        let length = body.len().to_string();
        self.send_headers(
            status,
            reason,
            &[
                ("Content-Type", "text/plain"),
                ("Content-Length", length.as_str()),
            ],
        )
        .await?;
        self.write_body(body.as_bytes()).await?;
        self.flush().await
    }

    pub async fn send_not_found(&mut self) -> io::Result<()> {
        self.send_text(404, "Not Found", "Not found").await
    }

    pub async fn send_bad_request(&mut self) -> io::Result<()> {
        self.send_text(400, "Bad Request", "Bad request").await
    }

    pub async fn send_server_error(&mut self) -> io::Result<()> {
        self.send_text(500, "Internal Server Error", "Internal server error")
            .await
    }

    /// 304 has no body by definition.
    pub async fn send_not_modified(&mut self) -> io::Result<()> {
        self.send_headers(304, "Not Modified", &[]).await?;
        self.flush().await
    }

    pub async fn send_redirect(&mut self, location: &str) -> io::Result<()> {
        let body = "Moved Permanently";
        let length = body.len().to_string();
        self.send_headers(
            301,
            "Moved Permanently",
            &[("Location", location), ("Content-Length", length.as_str())],
        )
        .await?;
        self.write_body(body.as_bytes()).await?;
        self.flush().await
    }
}
