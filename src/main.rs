//! Multi-room Chat Server - Entry Point
//!
//! Starts the TCP listener and hands every accepted connection to the server.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chat_rooms::{Server, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chat_rooms=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chat_rooms=info")),
        )
        .init();

    // Bind address from command line, CHAT_ADDR, or default
    let config = ServerConfig::from_env();

    let listener = TcpListener::bind(&config.addr).await?;
    info!("Chat server listening on {}", config.addr);

    let server = Arc::new(Server::new(config));
    server.serve(listener).await;

    Ok(())
}
