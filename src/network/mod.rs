//! Network Module
//!
//! HTTP server and per-connection handling.
//!
//! ## Architecture
//! - Single acceptor loop, one connection handled fully at a time
//! - One request per connection (`Connection: close`)
//! - Requests routed through the Engine
//!
//! The engine's two-lock design means a worker pool could be dropped in
//! without changing the staging or commit paths.

mod server;
mod connection;

pub use server::Server;
pub use connection::Connection;
