//! StageKV Server Binary
//!
//! Starts the HTTP service for StageKV.

use std::sync::Arc;

use clap::Parser;
use stagekv::network::Server;
use stagekv::{Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

/// StageKV Server
#[derive(Parser, Debug)]
#[command(name = "stagekv-server")]
#[command(about = "Staged-write key-value store over HTTP")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./stagekv_data")]
    data_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:4000")]
    listen: String,

    /// Discard pending mutations on shutdown instead of committing them
    #[arg(long)]
    discard_pending_on_close: bool,

    /// Maximum request body size in KiB
    #[arg(short = 'b', long, default_value = "1024")]
    max_body_kb: usize,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stagekv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("StageKV Server v{}", stagekv::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .listen_addr(&args.listen)
        .commit_on_close(!args.discard_pending_on_close)
        .max_body_bytes(args.max_body_kb * 1024)
        .build();

    // Startup failures are the only fatal ones
    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Engine initialized successfully");

    let server = match Server::bind(config.clone(), Arc::clone(&engine)) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", config.listen_addr, e);
            std::process::exit(1);
        }
    };

    let serve_failed = if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        true
    } else {
        false
    };

    // Release the server's engine reference so close can consume it
    drop(server);

    match Arc::try_unwrap(engine) {
        Ok(engine) => {
            if let Err(e) = engine.close(config.commit_on_close) {
                tracing::error!("Failed to close engine: {}", e);
            }
        }
        Err(_) => {
            tracing::warn!("Engine still shared at shutdown; skipping close");
        }
    }

    tracing::info!("Server stopped");

    if serve_failed {
        std::process::exit(1);
    }
}
