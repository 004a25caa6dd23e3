//! Minimal HTTP/1.1 request/response types.
//!
//! Parses exactly the subset the gateway needs: a request line, headers,
//! and an optional `Content-Length` body. Responses always carry
//! `Content-Length` and `Connection: close`; the server handles one
//! request per connection.

use std::collections::HashMap;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on request-line + header bytes
pub const MAX_HEADER_BYTES: usize = 64 * 1024;
/// Upper bound on request body bytes
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// HTTP request method
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    /// Anything the gateway has no routes for
    Other(String),
}

impl Method {
    fn parse(token: &str) -> Method {
        match token {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            other => Method::Other(other.to_string()),
        }
    }
}

/// A parsed HTTP request
#[derive(Debug, Clone)]
pub struct Request {
    /// Request method
    pub method: Method,
    /// Percent-decoded path, without the query string
    pub path: String,
    /// Percent-decoded query parameters
    pub query: HashMap<String, String>,
    /// Raw body bytes
    pub body: Vec<u8>,
}

impl Request {
    /// Build a request from a method and a target like
    /// `/api/products?limit=2`. Used by the server after parsing and by
    /// tests to drive the gateway without sockets.
    pub fn new(method: Method, target: &str, body: Vec<u8>) -> Self {
        let (raw_path, raw_query) = match target.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (target, None),
        };

        let mut query = HashMap::new();
        if let Some(raw_query) = raw_query {
            for pair in raw_query.split('&').filter(|p| !p.is_empty()) {
                let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
                query.insert(percent_decode(name), percent_decode(value));
            }
        }

        Request {
            method,
            path: percent_decode(raw_path),
            query,
            body,
        }
    }

    /// Look up a query parameter
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(|s| s.as_str())
    }

    /// Path split on `/`, empty segments dropped
    pub fn path_segments(&self) -> Vec<&str> {
        self.path.split('/').filter(|s| !s.is_empty()).collect()
    }
}

/// Why reading a request off a connection failed
#[derive(Debug)]
pub enum ReadError {
    /// Connection closed cleanly before a request started
    Closed,
    /// Transport failure mid-request
    Io(std::io::Error),
    /// Syntactically invalid request
    Malformed(String),
    /// Headers or body exceed the configured bounds
    TooLarge(String),
}

/// Read and parse one request from a stream.
pub async fn read_request<R>(stream: &mut R) -> Result<Request, ReadError>
where
    R: AsyncRead + Unpin,
{
    let mut buffer: Vec<u8> = Vec::with_capacity(1024);
    let mut chunk = [0u8; 4096];

    // Accumulate until the blank line ending the header block
    let head_end = loop {
        if let Some(pos) = find_subsequence(&buffer, b"\r\n\r\n") {
            break pos + 4;
        }
        if buffer.len() > MAX_HEADER_BYTES {
            return Err(ReadError::TooLarge("header block too large".to_string()));
        }
        let n = stream.read(&mut chunk).await.map_err(ReadError::Io)?;
        if n == 0 {
            return if buffer.is_empty() {
                Err(ReadError::Closed)
            } else {
                Err(ReadError::Malformed(
                    "connection closed mid-headers".to_string(),
                ))
            };
        }
        buffer.extend_from_slice(&chunk[..n]);
    };

    let head = std::str::from_utf8(&buffer[..head_end])
        .map_err(|_| ReadError::Malformed("headers are not valid UTF-8".to_string()))?;
    let mut lines = head.split("\r\n");

    let request_line = lines
        .next()
        .ok_or_else(|| ReadError::Malformed("empty request".to_string()))?;
    let mut parts = request_line.split_whitespace();
    let method = parts
        .next()
        .map(Method::parse)
        .ok_or_else(|| ReadError::Malformed("missing method".to_string()))?;
    let target = parts
        .next()
        .ok_or_else(|| ReadError::Malformed("missing request target".to_string()))?;
    let version = parts
        .next()
        .ok_or_else(|| ReadError::Malformed("missing HTTP version".to_string()))?;
    if version != "HTTP/1.1" && version != "HTTP/1.0" {
        return Err(ReadError::Malformed(format!(
            "unsupported HTTP version '{}'",
            version
        )));
    }

    let mut content_length = 0usize;
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            return Err(ReadError::Malformed(format!("bad header line '{}'", line)));
        };
        if name.trim().eq_ignore_ascii_case("content-length") {
            content_length = value
                .trim()
                .parse()
                .map_err(|_| ReadError::Malformed("invalid Content-Length".to_string()))?;
        }
    }
    if content_length > MAX_BODY_BYTES {
        return Err(ReadError::TooLarge(format!(
            "body of {} bytes exceeds limit",
            content_length
        )));
    }

    // Whatever followed the header block is the body's prefix
    let mut body = buffer[head_end..].to_vec();
    if body.len() > content_length {
        body.truncate(content_length);
    }
    while body.len() < content_length {
        let n = stream.read(&mut chunk).await.map_err(ReadError::Io)?;
        if n == 0 {
            return Err(ReadError::Malformed(
                "connection closed mid-body".to_string(),
            ));
        }
        let want = content_length - body.len();
        body.extend_from_slice(&chunk[..n.min(want)]);
    }

    Ok(Request::new(method, target, body))
}

/// An HTTP response ready for serialization
#[derive(Debug, Clone)]
pub struct Response {
    /// Status code
    pub status: u16,
    /// Content-Type header value
    pub content_type: &'static str,
    /// Body bytes
    pub body: Vec<u8>,
}

impl Response {
    /// JSON response from a serializable value
    pub fn json(status: u16, value: &serde_json::Value) -> Response {
        Response {
            status,
            content_type: "application/json",
            body: serde_json::to_vec(value).unwrap_or_default(),
        }
    }

    /// The error shape: `{"message": ...}`
    pub fn message(status: u16, message: &str) -> Response {
        Response::json(status, &serde_json::json!({ "message": message }))
    }

    /// Plain-text response
    pub fn text(status: u16, body: &str) -> Response {
        Response {
            status,
            content_type: "text/plain; charset=utf-8",
            body: body.as_bytes().to_vec(),
        }
    }

    /// Serialize status line, headers and body
    pub fn to_bytes(&self) -> Vec<u8> {
        let head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            self.status,
            reason_phrase(self.status),
            self.content_type,
            self.body.len()
        );
        let mut out = head.into_bytes();
        out.extend_from_slice(&self.body);
        out
    }

    /// Write the full response to a stream
    pub async fn write<W>(&self, stream: &mut W) -> std::io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        stream.write_all(&self.to_bytes()).await?;
        stream.flush().await
    }

    /// Parse the body as JSON (test helper and client convenience)
    pub fn body_json(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        500 => "Internal Server Error",
        _ => "",
    }
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Decode `%XX` escapes and `+` as space; invalid escapes pass through.
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => match (hex_val(bytes.get(i + 1)), hex_val(bytes.get(i + 2))) {
                (Some(hi), Some(lo)) => {
                    out.push(hi * 16 + lo);
                    i += 3;
                }
                _ => {
                    out.push(b'%');
                    i += 1;
                }
            },
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_val(byte: Option<&u8>) -> Option<u8> {
    match *byte? {
        b @ b'0'..=b'9' => Some(b - b'0'),
        b @ b'a'..=b'f' => Some(b - b'a' + 10),
        b @ b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
