//! HTTP Module
//!
//! Minimal HTTP/1.1 subset for the request layer: enough to parse one
//! request and write one response per connection.
//!
//! ## Request Format (accepted subset)
//! ```text
//! METHOD SP target SP HTTP/1.1 CRLF
//! Header-Name: value CRLF
//! ...
//! CRLF
//! body (Content-Length bytes)
//! ```
//!
//! Bodies are only interpreted as JSON when the Content-Type is
//! `application/json`; anything else is treated as no data.
//!
//! ## Status Codes Used
//! - 200 OK           — committed read, staged update, staged delete
//! - 201 Created      — staged insert of a new key
//! - 204 No Content   — commit ran
//! - 400 Bad Request  — more than one key in a stage call
//! - 404 Not Found    — absent key, unknown route, processing failure

mod request;
mod response;

pub use request::{read_request, Method, Request};
pub use response::{write_response, Response, StatusCode};
