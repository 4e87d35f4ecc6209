//! Error types for the chat server
//!
//! Defines session-level errors and outbound send errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Session-level errors
///
/// Covers parse errors and execution errors (replied to the issuing
/// session) as well as transport errors (fatal to that session only).
#[derive(Debug, Error)]
pub enum ChatError {
    /// IO error on the session's own transport (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The session's outbound channel is gone (fatal)
    #[error("failed to deliver reply: {0}")]
    Send(#[from] SendError),

    /// First token is not a known command
    #[error("unknown command {0:?}")]
    UnknownCommand(String),

    /// Input line is not valid UTF-8
    #[error("input is not valid UTF-8")]
    InvalidEncoding,

    /// Input line exceeds the configured maximum
    #[error("line too long (max {max} bytes)")]
    LineTooLong { max: usize },

    /// Known command with the wrong number of arguments
    #[error("invalid {command:?} command: {expected}")]
    InvalidArguments {
        command: &'static str,
        expected: &'static str,
    },

    /// `send` issued before joining a room
    #[error("you must join a room before sending messages")]
    NotInRoom,

    /// A room with this name is already registered
    #[error("room {0:?} already exists")]
    RoomExists(String),
}

impl ChatError {
    /// Whether this error must terminate the session
    ///
    /// Parse and execution errors are reported back to the client and the
    /// session keeps running.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ChatError::Io(_) | ChatError::Send(_))
    }
}

/// Message send errors
///
/// Occurs when a client's output queue cannot take another message.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("channel closed")]
    ChannelClosed,

    /// The client is not reading and its queue is at capacity
    #[error("output queue full")]
    QueueFull,
}
