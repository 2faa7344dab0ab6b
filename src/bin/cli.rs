//! StageKV CLI Client
//!
//! Command-line interface for talking to a running StageKV server.

use std::io::{Read, Write};
use std::net::TcpStream;

use clap::{Parser, Subcommand};

/// StageKV CLI
#[derive(Parser, Debug)]
#[command(name = "stagekv-cli")]
#[command(about = "CLI for the StageKV key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:4000")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get the committed value for a key
    Get {
        /// The key to get
        key: String,
    },

    /// Stage a key/value pair (value parsed as JSON, else sent as a string)
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Stage a delete for a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Commit all pending mutations
    Commit,
}

fn main() {
    let args = Args::parse();

    let request = match &args.command {
        Commands::Get { key } => format!(
            "GET /{} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
            key, args.server
        ),
        Commands::Set { key, value } => {
            // Accept raw JSON values; fall back to treating the input as a
            // plain string
            let value: serde_json::Value = serde_json::from_str(value)
                .unwrap_or_else(|_| serde_json::Value::String(value.clone()));
            format_json_request("POST", "/set", &args.server, &single(key, value))
        }
        Commands::Del { key } => {
            format_json_request("DELETE", "/set", &args.server, &single(key, serde_json::Value::Null))
        }
        Commands::Commit => format!(
            "POST /commit HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
            args.server
        ),
    };

    match send(&args.server, &request) {
        Ok(response) => print_response(&response),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Build a single-key JSON object body
fn single(key: &str, value: serde_json::Value) -> String {
    let mut data = serde_json::Map::new();
    data.insert(key.to_string(), value);
    serde_json::Value::Object(data).to_string()
}

/// Build a request with a JSON body
fn format_json_request(method: &str, path: &str, host: &str, body: &str) -> String {
    format!(
        "{} {} HTTP/1.1\r\nHost: {}\r\nContent-Type: application/json\r\n\
         Content-Length: {}\r\nConnection: close\r\n\r\n{}",
        method,
        path,
        host,
        body.len(),
        body
    )
}

/// Send a raw request and collect the full response
fn send(addr: &str, request: &str) -> std::io::Result<String> {
    let mut stream = TcpStream::connect(addr)?;
    stream.write_all(request.as_bytes())?;
    stream.flush()?;

    let mut response = String::new();
    stream.read_to_string(&mut response)?;
    Ok(response)
}

/// Print the status line and body of a response
fn print_response(response: &str) {
    let mut parts = response.splitn(2, "\r\n\r\n");
    let head = parts.next().unwrap_or("");
    let body = parts.next().unwrap_or("");

    if let Some(status_line) = head.lines().next() {
        println!("{}", status_line);
    }
    if !body.is_empty() {
        println!("{}", body);
    }
}
