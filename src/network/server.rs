//! HTTP Server
//!
//! Accepts connections and handles each one fully before the next.

use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::Config;
use crate::engine::Engine;
use crate::error::Result;
use crate::store::PersistentMap;

use super::Connection;

/// Poll interval for the non-blocking accept loop
const ACCEPT_POLL_MS: u64 = 25;

/// HTTP server for StageKV
pub struct Server<S: PersistentMap> {
    /// Server configuration
    config: Config,

    /// Shared engine instance
    engine: Arc<Engine<S>>,

    /// Bound listener (non-blocking, polled with the shutdown flag)
    listener: TcpListener,

    /// Set to stop the accept loop
    shutdown: Arc<AtomicBool>,
}

impl<S: PersistentMap> Server<S> {
    /// Bind the listener for the given config and engine
    pub fn bind(config: Config, engine: Arc<Engine<S>>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr)?;
        listener.set_nonblocking(true)?;

        Ok(Self {
            config,
            engine,
            listener,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// The address the listener is actually bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle for signalling shutdown from another thread
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Signal the server to stop accepting connections
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Run the accept loop (blocking)
    ///
    /// Each connection is handled to completion before the next accept —
    /// request-level sequential processing. Returns once the shutdown flag
    /// is set.
    pub fn run(&self) -> Result<()> {
        tracing::info!("Listening on {}", self.local_addr()?);

        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                tracing::info!("Shutdown requested, stopping accept loop");
                return Ok(());
            }

            match self.listener.accept() {
                Ok((stream, _)) => {
                    // The listener is non-blocking; the accepted stream
                    // must not be
                    if let Err(e) = stream.set_nonblocking(false) {
                        tracing::warn!("Unable to configure accepted stream: {}", e);
                        continue;
                    }

                    match Connection::new(stream, Arc::clone(&self.engine)) {
                        Ok(mut connection) => {
                            if let Err(e) = connection.set_timeouts(
                                self.config.read_timeout_ms,
                                self.config.write_timeout_ms,
                            ) {
                                tracing::warn!("Unable to set connection timeouts: {}", e);
                            }

                            if let Err(e) = connection.handle() {
                                tracing::warn!(
                                    "Connection from {} failed: {}",
                                    connection.peer_addr(),
                                    e
                                );
                            }
                        }
                        Err(e) => {
                            tracing::warn!("Unable to set up connection: {}", e);
                        }
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(ACCEPT_POLL_MS));
                }
                Err(e) => {
                    tracing::error!("Accept failed: {}", e);
                    return Err(e.into());
                }
            }
        }
    }
}
