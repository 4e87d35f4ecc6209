//! Multi-room line-based chat server library
//!
//! Clients connect over any byte stream, type space-separated commands and
//! chat with the other members of a named room.
//!
//! # Commands
//! - `nick [name]` - show or change your nickname
//! - `join <room>` - join a room (created on first join) and get its history
//! - `rooms` - list all rooms
//! - `send <text>` - post a single-word message to your current room
//! - `quit` - leave
//!
//! # Architecture
//! One tokio task per session, no central dispatcher:
//! - `Server` owns the user and room registries, shared behind an `Arc`
//! - Each room owns its message log and its own membership registry
//! - Sessions queue output on each other's `Client` channels; a per-session
//!   writer task drains the channel onto the socket
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use chat_rooms::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig::default();
//!     let listener = TcpListener::bind(&config.addr).await.unwrap();
//!     Arc::new(Server::new(config)).serve(listener).await;
//! }
//! ```

pub mod client;
pub mod command;
pub mod config;
pub mod error;
pub mod message;
pub mod registry;
pub mod room;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use client::Client;
pub use command::Command;
pub use config::ServerConfig;
pub use error::{ChatError, SendError};
pub use message::Message;
pub use registry::Registry;
pub use room::{Room, RoomRegistry};
pub use server::{Server, UserRegistry};
pub use session::{DoneSignal, Session};
pub use types::{RoomName, SessionId};
