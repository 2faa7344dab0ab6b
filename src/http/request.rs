//! Request parsing
//!
//! Reads one HTTP/1.1 request from a buffered stream.

use std::io::{BufRead, Read};

use serde_json::Value;

use crate::error::{Result, StageError};

/// Request methods the service routes on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
    Other(String),
}

impl Method {
    fn parse(token: &str) -> Self {
        match token {
            "GET" => Method::Get,
            "POST" => Method::Post,
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

    /// Request target (path, query stripped)
    pub target: String,

    /// Content-Type header, if present
    pub content_type: Option<String>,

    /// Raw body bytes (Content-Length worth)
    pub body: Vec<u8>,
}

impl Request {
    /// The target with every '/' removed — the operation name for a
    /// single-level path ("/set" → "set")
    pub fn op(&self) -> String {
        self.target.replace('/', "")
    }

    /// Whether the target is a single-level path ("/key", not "/a/b")
    pub fn is_single_level(&self) -> bool {
        self.target.matches('/').count() == 1
    }

    /// Parse the body as a JSON object
    ///
    /// Only attempted when the Content-Type is `application/json`; any other
    /// content type, a non-object body, or malformed JSON is a processing
    /// failure.
    pub fn json_object(&self) -> Result<serde_json::Map<String, Value>> {
        let is_json = self
            .content_type
            .as_deref()
            .map(|ct| ct.split(';').next().unwrap_or("").trim() == "application/json")
            .unwrap_or(false);

        if !is_json {
            return Err(StageError::Processing(
                "expected an application/json body".to_string(),
            ));
        }

        let value: Value = serde_json::from_slice(&self.body)
            .map_err(|e| StageError::Processing(format!("invalid JSON body: {}", e)))?;

        match value {
            Value::Object(map) => Ok(map),
            other => Err(StageError::Processing(format!(
                "expected a JSON object body, got {}",
                json_type_name(&other)
            ))),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Read one complete request from a stream
///
/// Blocks until the request line, headers, and body have arrived or an
/// error occurs. Bodies larger than `max_body` are rejected.
pub fn read_request<R: BufRead>(reader: &mut R, max_body: usize) -> Result<Request> {
    // Request line: METHOD SP target SP version
    let line = read_line(reader)?;
    let mut parts = line.split_whitespace();

    let method = parts
        .next()
        .map(Method::parse)
        .ok_or_else(|| StageError::Http("empty request line".to_string()))?;
    let raw_target = parts
        .next()
        .ok_or_else(|| StageError::Http("request line missing target".to_string()))?;
    let version = parts
        .next()
        .ok_or_else(|| StageError::Http("request line missing version".to_string()))?;

    if !version.starts_with("HTTP/1.") {
        return Err(StageError::Http(format!(
            "unsupported protocol version: {}",
            version
        )));
    }

    // Query string is irrelevant to routing
    let target = raw_target
        .split('?')
        .next()
        .unwrap_or(raw_target)
        .to_string();

    // Headers until the blank line
    let mut content_type = None;
    let mut content_length = 0usize;

    loop {
        let line = read_line(reader)?;
        if line.is_empty() {
            break;
        }

        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| StageError::Http(format!("malformed header line: {}", line)))?;
        let name = name.trim().to_ascii_lowercase();
        let value = value.trim();

        match name.as_str() {
            "content-type" => content_type = Some(value.to_string()),
            "content-length" => {
                content_length = value.parse().map_err(|_| {
                    StageError::Http(format!("invalid Content-Length: {}", value))
                })?;
            }
            _ => {}
        }
    }

    if content_length > max_body {
        return Err(StageError::Http(format!(
            "body too large: {} bytes (max {})",
            content_length, max_body
        )));
    }

    // Body
    let mut body = vec![0u8; content_length];
    if content_length > 0 {
        reader.read_exact(&mut body)?;
    }

    Ok(Request {
        method,
        target,
        content_type,
        body,
    })
}

/// Read a CRLF-terminated line, returning it without the terminator
fn read_line<R: BufRead>(reader: &mut R) -> Result<String> {
    let mut line = String::new();
    let n = reader.read_line(&mut line)?;

    if n == 0 {
        return Err(StageError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "connection closed mid-request",
        )));
    }

    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }

    Ok(line)
}
