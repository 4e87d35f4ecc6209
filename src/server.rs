//! Chat server
//!
//! Owns the user and room registries and runs one session per connection.
//! There is no central dispatcher: sessions share the registries and queue
//! output directly on each other's client channels.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::client::Client;
use crate::config::ServerConfig;
use crate::error::ChatError;
use crate::registry::Registry;
use crate::room::RoomRegistry;
use crate::session::{spawn_writer, Session};
use crate::types::SessionId;

/// Connected sessions, keyed by id
pub type UserRegistry = Registry<SessionId, Arc<Client>>;

/// The chat server
///
/// Shared behind an `Arc` by every session it spawns.
#[derive(Debug)]
pub struct Server {
    pub config: ServerConfig,
    pub users: UserRegistry,
    pub rooms: RoomRegistry,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            users: UserRegistry::new(),
            rooms: RoomRegistry::new(),
        }
    }

    /// Run one session over `stream` until it ends
    ///
    /// The session is registered for its whole lifetime and removed from the
    /// user registry (and its room) before this returns, whatever the reason
    /// it ended.
    pub async fn handle_connection<S>(self: Arc<Self>, stream: S) -> Result<(), ChatError>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);

        let id = SessionId::new();
        let (msg_tx, msg_rx) = mpsc::channel::<String>(self.config.outbound_capacity);
        let client = Arc::new(Client::new(id, msg_tx));
        let session = Session::new(self.clone(), client.clone());
        let write_task = spawn_writer(writer, msg_rx, session.done().subscribe());

        self.users.insert(id, client).await;
        info!("Session {} started", id);
        debug!("Total sessions: {}", self.users.len().await);

        let result = session.run(reader).await;

        self.users.remove(&id).await;
        if let Err(e) = write_task.await {
            warn!("Writer task for {} failed: {}", id, e);
        }

        match &result {
            Ok(()) => info!("Session {} closed", id),
            Err(e) => info!("Session {} terminated: {}", id, e),
        }
        debug!("Total sessions: {}", self.users.len().await);

        result
    }

    /// Accept TCP connections forever, one task per connection
    ///
    /// Accept failures are logged and the loop keeps going.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    info!("New connection from {}", addr);
                    let server = self.clone();

                    tokio::spawn(async move {
                        if let Err(e) = server.handle_connection(stream).await {
                            error!("Connection handler error for {}: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    }
}
