//! Chat message and reply text
//!
//! Everything the server writes back to a client is a plain text line.
//! The builders here keep the wording in one place.

use std::fmt;

use crate::error::ChatError;
use crate::types::RoomName;

/// Greeting written when a session starts
pub const GREETING: &str = "hello, let's get started!";

/// Prompt written before each expected input (no newline)
pub const PROMPT: &str = " > ";

/// A message posted to a room
///
/// The nickname is captured at send time; renaming later does not touch
/// messages already in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub nickname: String,
    pub text: String,
}

impl Message {
    pub fn new(nickname: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            nickname: nickname.into(),
            text: text.into(),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.nickname, self.text)
    }
}

pub fn current_nickname(nickname: &str) -> String {
    format!("your nickname is {nickname:?}")
}

pub fn nickname_changed(nickname: &str) -> String {
    format!("your nickname changed to {nickname:?}")
}

/// Join confirmation followed by the room history, one line per message
pub fn joined(room: &RoomName, history: &[Message]) -> String {
    let mut reply = format!("joined room {:?}", room.as_str());
    for message in history {
        reply.push('\n');
        reply.push_str(&message.to_string());
    }
    reply
}

pub fn room_list(names: &[RoomName]) -> String {
    if names.is_empty() {
        return "no rooms yet".to_string();
    }
    let names: Vec<&str> = names.iter().map(RoomName::as_str).collect();
    format!("rooms: {}", names.join(", "))
}

pub fn farewell() -> &'static str {
    "bye"
}

/// Convert a non-fatal ChatError into the line reported to the client
pub fn error(err: &ChatError) -> String {
    format!("error: {err}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_display() {
        let msg = Message::new("alice", "hi");
        assert_eq!(msg.to_string(), "alice: hi");
    }

    #[test]
    fn test_joined_renders_one_line_per_message() {
        let history = vec![Message::new("alice", "hi"), Message::new("bob", "yo")];
        let reply = joined(&RoomName::from("lobby"), &history);

        let lines: Vec<&str> = reply.lines().collect();
        assert_eq!(lines, vec!["joined room \"lobby\"", "alice: hi", "bob: yo"]);
    }

    #[test]
    fn test_joined_empty_room() {
        let reply = joined(&RoomName::from("lobby"), &[]);
        assert_eq!(reply, "joined room \"lobby\"");
    }

    #[test]
    fn test_room_list() {
        assert_eq!(room_list(&[]), "no rooms yet");
        let names = vec![RoomName::from("dev"), RoomName::from("lobby")];
        assert_eq!(room_list(&names), "rooms: dev, lobby");
    }

    #[test]
    fn test_error_line() {
        assert_eq!(
            error(&ChatError::NotInRoom),
            "error: you must join a room before sending messages"
        );
    }
}
