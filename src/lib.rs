//! # StageKV
//!
//! A minimal key-value store exposed over HTTP, with a two-phase write model:
//! - Mutations are staged ("pending") per key
//! - An explicit commit drains the staging buffer into durable storage
//! - Reads reflect committed state only
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      HTTP Server                             │
//! │        GET /{key}   POST /set   POST /commit   DELETE /set   │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Engine                                 │
//! │          (staging lock / apply lock separation)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Staging   │  commit  │ Persistent  │
//!   │   Buffer    │ ───────▶ │    Map      │
//!   │  (pending)  │  drain   │ (FileStore) │
//!   └─────────────┘          └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod store;
pub mod staging;
pub mod engine;
pub mod http;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, StageError};
pub use config::Config;
pub use engine::{Engine, StageOutcome};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of StageKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
