//! Connection Handler
//!
//! Handles a single client connection: one request in, one response out.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::engine::{Engine, StageOutcome};
use crate::error::{Result, StageError};
use crate::http::{read_request, write_response, Method, Request, Response, StatusCode};
use crate::store::PersistentMap;

/// Path segment for the staging endpoint
const SET_OP: &str = "set";

/// Path segment for the commit endpoint
const COMMIT_OP: &str = "commit";

/// Handles a single client connection
pub struct Connection<S: PersistentMap> {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Reference to the datastore engine
    engine: Arc<Engine<S>>,

    /// Request body size cap
    max_body: usize,

    /// Peer address for logging
    peer_addr: String,
}

impl<S: PersistentMap> Connection<S> {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O around the stream
    pub fn new(stream: TcpStream, engine: Arc<Engine<S>>) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let write_stream = stream;
        let max_body = engine.config().max_body_bytes;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            engine,
            max_body,
            peer_addr,
        })
    }

    /// Configure connection timeouts
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        let read_stream = self.reader.get_ref();
        let write_stream = self.writer.get_ref();

        if read_ms > 0 {
            read_stream.set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            write_stream.set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }

        Ok(())
    }

    /// Handle the connection: read one request, send one response
    ///
    /// Returns when the response has been written or the client went away.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        let request = match read_request(&mut self.reader, self.max_body) {
            Ok(req) => req,
            Err(StageError::Io(ref e))
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::UnexpectedEof
                        | std::io::ErrorKind::ConnectionReset
                        | std::io::ErrorKind::ConnectionAborted
                        | std::io::ErrorKind::WouldBlock
                        | std::io::ErrorKind::TimedOut
                ) =>
            {
                // Client disconnected or went quiet before sending a request
                tracing::debug!("Client {} disconnected: {}", self.peer_addr, e);
                return Ok(());
            }
            Err(e) => {
                tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                let _ = self.send_response(Response::bad_request());
                return Err(e);
            }
        };

        tracing::info!(
            "Received a {:?} request from {}: {}",
            request.method,
            self.peer_addr,
            request.target
        );

        let response = self.route(&request);

        if let Err(e) = self.send_response(response) {
            // A client that vanished before the response is not a server error
            if let StageError::Io(ref io_err) = e {
                match io_err.kind() {
                    std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::BrokenPipe => {
                        tracing::debug!(
                            "Client {} disconnected before response could be sent: {}",
                            self.peer_addr,
                            e
                        );
                        return Ok(());
                    }
                    _ => {}
                }
            }
            tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
            return Err(e);
        }

        Ok(())
    }

    /// Route a request to the engine and build the response
    fn route(&self, request: &Request) -> Response {
        match &request.method {
            Method::Get => self.handle_get(request),
            Method::Post => match request.op().as_str() {
                SET_OP => self.handle_stage_set(request),
                COMMIT_OP => self.handle_commit(),
                op => {
                    tracing::warn!("Invalid POST operation '{}' was received", op);
                    Response::not_found()
                }
            },
            Method::Delete => {
                if request.op() == SET_OP {
                    self.handle_stage_delete(request)
                } else {
                    tracing::warn!("Invalid DELETE operation '{}' was received", request.op());
                    Response::not_found()
                }
            }
            Method::Other(m) => {
                tracing::warn!("Unsupported method '{}' from {}", m, self.peer_addr);
                Response::not_found()
            }
        }
    }

    /// GET /{key} — committed read
    fn handle_get(&self, request: &Request) -> Response {
        // Only single-level paths name keys; the operation endpoints are
        // not readable
        if !request.is_single_level() {
            return Response::not_found();
        }

        let key = request.op();
        if key == SET_OP || key == COMMIT_OP {
            return Response::not_found();
        }

        match self.engine.get(&key) {
            Ok(value) => Response::json(StatusCode::Ok, &value),
            Err(e) => self.error_response(e),
        }
    }

    /// POST /set — stage a single key/value pair
    fn handle_stage_set(&self, request: &Request) -> Response {
        let data = match request.json_object() {
            Ok(data) => data,
            Err(e) => return self.error_response(e),
        };

        match self.engine.stage_set(&data) {
            Ok(StageOutcome::Inserted) => Response::empty(StatusCode::Created),
            Ok(StageOutcome::Updated) => Response::empty(StatusCode::Ok),
            Err(e) => self.error_response(e),
        }
    }

    /// POST /commit — apply all pending mutations
    ///
    /// Fire-and-forget from the client's perspective: 204 as long as the
    /// commit attempt ran, regardless of count.
    fn handle_commit(&self) -> Response {
        match self.engine.commit() {
            Ok(count) => {
                tracing::debug!("Commit applied {} mutations", count);
                Response::empty(StatusCode::NoContent)
            }
            Err(e) => self.error_response(e),
        }
    }

    /// DELETE /set — stage a delete; the body's single key names the target
    fn handle_stage_delete(&self, request: &Request) -> Response {
        let data = match request.json_object() {
            Ok(data) => data,
            Err(e) => return self.error_response(e),
        };

        if data.len() > 1 {
            return self.error_response(StageError::TooManyKeys);
        }

        let key = match data.keys().next() {
            Some(key) => key,
            None => {
                return self.error_response(StageError::Processing(
                    "empty delete payload".to_string(),
                ))
            }
        };

        match self.engine.stage_delete(key) {
            Ok(value) => Response::json(StatusCode::Ok, &value),
            Err(e) => self.error_response(e),
        }
    }

    /// Map an engine error to a response
    ///
    /// Processing and internal failures fall through to 404, the protocol's
    /// catch-all code.
    fn error_response(&self, error: StageError) -> Response {
        match error {
            StageError::KeyNotFound => Response::not_found(),
            StageError::TooManyKeys => Response::bad_request(),
            StageError::Processing(msg) => {
                tracing::error!("Unable to process request from {}: {}", self.peer_addr, msg);
                Response::not_found()
            }
            e => {
                tracing::error!("Request from {} failed: {}", self.peer_addr, e);
                Response::not_found()
            }
        }
    }

    /// Send a response to the client
    fn send_response(&mut self, response: Response) -> Result<()> {
        write_response(&mut self.writer, &response)?;
        Ok(())
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}
