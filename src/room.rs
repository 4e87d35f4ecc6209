//! Room and room registry
//!
//! A room is a named broadcast group with an append-only message log and
//! its own membership registry. Rooms are created on first join and live
//! for the rest of the process.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::client::Client;
use crate::error::ChatError;
use crate::message::Message;
use crate::registry::Registry;
use crate::types::{RoomName, SessionId};

/// Chat room
///
/// Lock order is log first, then membership. Posting and entering both hold
/// the log lock across their membership access, which is what keeps history
/// replay and live delivery from overlapping.
#[derive(Debug)]
pub struct Room {
    /// Room name for identification
    name: RoomName,
    /// Messages in send order
    log: Mutex<Vec<Message>>,
    /// Current members
    members: Registry<SessionId, Arc<Client>>,
}

impl Room {
    pub fn new(name: RoomName) -> Self {
        Self {
            name,
            log: Mutex::new(Vec::new()),
            members: Registry::new(),
        }
    }

    pub fn name(&self) -> &RoomName {
        &self.name
    }

    /// Add a member and hand it the history as of the moment it joined
    ///
    /// `on_history` runs while the log is locked, so anything it queues for
    /// the client lands before any message posted after the join.
    pub async fn enter<T>(&self, client: Arc<Client>, on_history: impl FnOnce(&[Message]) -> T) -> T {
        let log = self.log.lock().await;
        let id = client.id;
        self.members.insert(id, client).await;
        debug!("Client {} entered room {}", id, self.name);
        on_history(&log)
    }

    /// Remove a member, returning whether it was present
    pub async fn leave(&self, id: SessionId) -> bool {
        let removed = self.members.remove(&id).await.is_some();
        if removed {
            debug!("Client {} left room {}", id, self.name);
        }
        removed
    }

    /// Append a message and deliver it to every member except `sender`
    ///
    /// Append and fan-out happen as one step with respect to other posts in
    /// this room. A recipient whose queue is closed or full is skipped.
    /// Returns the number of members the message was delivered to.
    pub async fn post(&self, sender: SessionId, message: Message) -> usize {
        let mut log = self.log.lock().await;
        let line = message.to_string();
        log.push(message);

        let mut delivered = 0;
        for member in self.members.values().await {
            if member.id == sender {
                continue;
            }
            match member.send_line(&line) {
                Ok(()) => delivered += 1,
                Err(e) => warn!(
                    "Failed to deliver message in room {} to {}: {}",
                    self.name, member.id, e
                ),
            }
        }
        delivered
    }

    pub async fn contains(&self, id: SessionId) -> bool {
        self.members.contains_key(&id).await
    }

    pub async fn member_count(&self) -> usize {
        self.members.len().await
    }

    /// Snapshot of the message log
    pub async fn messages(&self) -> Vec<Message> {
        self.log.lock().await.clone()
    }
}

/// All rooms, keyed by name
///
/// The registry is the single authority for name uniqueness.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: Registry<RoomName, Arc<Room>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, name: &RoomName) -> Option<Arc<Room>> {
        self.rooms.get(name).await
    }

    /// Create a room, failing if the name is taken
    pub async fn create(&self, name: RoomName) -> Result<Arc<Room>, ChatError> {
        let room = Arc::new(Room::new(name.clone()));
        self.rooms
            .try_insert(name.clone(), room)
            .await
            .map_err(|_| ChatError::RoomExists(name.to_string()))
    }

    /// Look a room up, creating it if absent
    ///
    /// Concurrent callers racing on a new name all get the same room.
    pub async fn get_or_create(&self, name: &RoomName) -> Arc<Room> {
        let (room, created) = self
            .rooms
            .get_or_insert_with(name.clone(), || Arc::new(Room::new(name.clone())))
            .await;
        if created {
            debug!("Room {} created", name);
        }
        room
    }

    /// Names of all rooms, sorted
    pub async fn names(&self) -> Vec<RoomName> {
        let mut names = self.rooms.keys().await;
        names.sort();
        names
    }

    pub async fn len(&self) -> usize {
        self.rooms.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.rooms.is_empty().await
    }
}
