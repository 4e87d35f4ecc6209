//! Client handle definition
//!
//! The peer-visible half of a session: its id and the channel feeding its
//! writer task. Rooms and the user registry store these handles, never the
//! session itself.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::SendError;
use crate::types::SessionId;

/// Connected client handle
///
/// Cheap to share behind an `Arc`. Sending never waits on the peer: output
/// is queued on a bounded channel and written by the session's writer task.
/// A client that stops reading fills its queue and further output for it is
/// refused with `SendError::QueueFull`.
#[derive(Debug)]
pub struct Client {
    /// Unique identifier for this client
    pub id: SessionId,
    /// Server → Client output channel
    sender: mpsc::Sender<String>,
}

impl Client {
    /// Create a new client with the given ID and sender channel
    pub fn new(id: SessionId, sender: mpsc::Sender<String>) -> Self {
        Self { id, sender }
    }

    /// Queue one newline-terminated line for this client
    ///
    /// Returns an error if the channel is closed (client disconnected) or full.
    pub fn send_line(&self, line: impl AsRef<str>) -> Result<(), SendError> {
        self.send_raw(format!("{}\n", line.as_ref()))
    }

    /// Queue raw output (no terminator appended)
    pub fn send_raw(&self, text: impl Into<String>) -> Result<(), SendError> {
        self.sender.try_send(text.into()).map_err(|e| match e {
            TrySendError::Full(_) => SendError::QueueFull,
            TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }

    /// Check whether the writer side has gone away
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Resolves once the writer side has gone away
    pub async fn closed(&self) {
        self.sender.closed().await
    }
}
