//! Response formatting
//!
//! Builds and writes one HTTP/1.1 response.

use std::io::Write;

use serde_json::Value;

use crate::error::Result;

/// Status codes the service emits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum StatusCode {
    Ok = 200,
    Created = 201,
    NoContent = 204,
    BadRequest = 400,
    NotFound = 404,
}

impl StatusCode {
    /// Numeric code
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Reason phrase
    pub fn reason(self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::NoContent => "No Content",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
        }
    }
}

/// A response to send to the client
#[derive(Debug, Clone)]
pub struct Response {
    /// Status code
    pub status: StatusCode,

    /// Optional JSON body
    pub body: Option<Vec<u8>>,
}

impl Response {
    /// Create a bodyless response
    pub fn empty(status: StatusCode) -> Self {
        Self { status, body: None }
    }

    /// Create a response carrying a JSON value
    pub fn json(status: StatusCode, value: &Value) -> Self {
        Self {
            status,
            body: Some(value.to_string().into_bytes()),
        }
    }

    /// Create a NOT_FOUND response
    pub fn not_found() -> Self {
        Self::empty(StatusCode::NotFound)
    }

    /// Create a BAD_REQUEST response
    pub fn bad_request() -> Self {
        Self::empty(StatusCode::BadRequest)
    }
}

/// Write a response to a stream
///
/// One response per connection: `Connection: close` is always sent.
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let body = response.body.as_deref().unwrap_or(&[]);

    write!(
        writer,
        "HTTP/1.1 {} {}\r\n",
        response.status.code(),
        response.status.reason()
    )?;
    if !body.is_empty() {
        write!(writer, "Content-Type: application/json\r\n")?;
    }
    write!(writer, "Content-Length: {}\r\n", body.len())?;
    write!(writer, "Connection: close\r\n\r\n")?;
    writer.write_all(body)?;
    writer.flush()?;

    Ok(())
}
