//! Command protocol
//!
//! Parses one input line into a typed `Command` and executes it against the
//! issuing session. Parsing never touches shared state.

use tracing::{debug, info};

use crate::error::ChatError;
use crate::message::{self, Message};
use crate::session::Session;
use crate::types::RoomName;

pub const CMD_NICK: &str = "nick";
pub const CMD_JOIN: &str = "join";
pub const CMD_ROOMS: &str = "rooms";
pub const CMD_SEND: &str = "send";
pub const CMD_QUIT: &str = "quit";

/// A validated client command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show (`None`) or change the nickname
    Nick(Option<String>),
    /// Join a room, creating it if needed
    Join(RoomName),
    /// List all rooms
    Rooms,
    /// Post a message to the current room
    Send(String),
    /// End the session
    Quit,
}

impl Command {
    /// Parse a raw input line
    ///
    /// Trailing line terminators are trimmed and the rest is split on single
    /// spaces; surrounding whitespace is dropped from the command name only.
    /// Returns `Ok(None)` for a blank line.
    pub fn parse(input: &str) -> Result<Option<Self>, ChatError> {
        let line = input.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return Ok(None);
        }

        let mut tokens = line.split(' ');
        let name = tokens.next().unwrap_or_default().trim();
        let args: Vec<&str> = tokens.collect();

        let command = match name {
            CMD_NICK => match args.as_slice() {
                [] => Command::Nick(None),
                [nickname] => Command::Nick(Some(nickname.to_string())),
                _ => return Err(invalid(CMD_NICK, "expected 0 or 1 arguments")),
            },
            CMD_JOIN => match args.as_slice() {
                [room] => Command::Join(RoomName::new(*room)),
                _ => return Err(invalid(CMD_JOIN, "expected exactly 1 argument")),
            },
            CMD_ROOMS => {
                if !args.is_empty() {
                    return Err(invalid(CMD_ROOMS, "expected no arguments"));
                }
                Command::Rooms
            }
            CMD_SEND => match args.as_slice() {
                [text] => Command::Send(text.to_string()),
                _ => {
                    return Err(invalid(
                        CMD_SEND,
                        "expected exactly 1 argument (message text cannot contain spaces)",
                    ))
                }
            },
            CMD_QUIT => Command::Quit,
            other => return Err(ChatError::UnknownCommand(other.to_string())),
        };
        Ok(Some(command))
    }

    /// Execute the command on behalf of `session`
    pub async fn execute(self, session: &mut Session) -> Result<(), ChatError> {
        match self {
            Command::Nick(None) => {
                session.reply(message::current_nickname(session.nickname()))?;
            }
            Command::Nick(Some(nickname)) => {
                let previous = session.set_nickname(nickname);
                if let Err(e) = session.reply(message::nickname_changed(session.nickname())) {
                    session.set_nickname(previous);
                    return Err(e.into());
                }
                info!("Client {} changed nickname to {:?}", session.id(), session.nickname());
            }
            Command::Join(name) => {
                let room = session.server().rooms.get_or_create(&name).await;
                if let Some(previous) = session.take_room() {
                    previous.leave(session.id()).await;
                }
                let client = session.client().clone();
                let reply = room
                    .enter(client, |history| {
                        session.reply(message::joined(&name, history))
                    })
                    .await;
                session.set_room(room);
                info!("Client {} joined room {}", session.id(), name);
                reply?;
            }
            Command::Rooms => {
                let names = session.server().rooms.names().await;
                session.reply(message::room_list(&names))?;
            }
            Command::Send(text) => {
                let room = session.room().cloned().ok_or(ChatError::NotInRoom)?;
                let delivered = room
                    .post(session.id(), Message::new(session.nickname(), text))
                    .await;
                debug!(
                    "Client {} posted to room {} ({} recipients)",
                    session.id(),
                    room.name(),
                    delivered
                );
            }
            Command::Quit => {
                if let Err(e) = session.reply(message::farewell()) {
                    debug!("Failed to say goodbye to {}: {}", session.id(), e);
                }
                session.done().fire();
            }
        }
        Ok(())
    }
}

fn invalid(command: &'static str, expected: &'static str) -> ChatError {
    ChatError::InvalidArguments { command, expected }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::mpsc;

    use super::*;
    use crate::client::Client;
    use crate::config::ServerConfig;
    use crate::server::Server;
    use crate::types::SessionId;

    fn parse(input: &str) -> Command {
        Command::parse(input).unwrap().unwrap()
    }

    fn session(server: &Arc<Server>) -> (Session, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(16);
        let client = Arc::new(Client::new(SessionId::new(), tx));
        (Session::new(server.clone(), client), rx)
    }

    fn drain(rx: &mut mpsc::Receiver<String>) -> String {
        let mut out = String::new();
        while let Ok(chunk) = rx.try_recv() {
            out.push_str(&chunk);
        }
        out
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse("nick"), Command::Nick(None));
        assert_eq!(parse("nick bob\r\n"), Command::Nick(Some("bob".to_string())));
        assert_eq!(parse("join lobby\n"), Command::Join(RoomName::from("lobby")));
        assert_eq!(parse("rooms"), Command::Rooms);
        assert_eq!(parse("send hi"), Command::Send("hi".to_string()));
        assert_eq!(parse("quit"), Command::Quit);
        assert_eq!(parse("quit now"), Command::Quit);
    }

    #[test]
    fn test_parse_blank_line() {
        assert_eq!(Command::parse("\r\n").unwrap(), None);
        assert_eq!(Command::parse("").unwrap(), None);
    }

    #[test]
    fn test_parse_arity_errors() {
        for input in ["nick a b", "join", "join a b", "rooms x", "send", "send hello world"] {
            let err = Command::parse(input).unwrap_err();
            assert!(
                matches!(err, ChatError::InvalidArguments { .. }),
                "{input}: {err}"
            );
        }
    }

    #[test]
    fn test_parse_unknown_command() {
        let err = Command::parse("foo bar").unwrap_err();
        assert!(matches!(err, ChatError::UnknownCommand(ref name) if name == "foo"));
        assert!(err.to_string().contains("foo"));
    }

    #[test]
    fn test_parse_trims_command_token() {
        assert_eq!(parse("rooms\t"), Command::Rooms);
        assert_eq!(parse("nick\t"), Command::Nick(None));
        assert_eq!(parse("\tquit"), Command::Quit);
    }

    #[test]
    fn test_parse_splits_on_single_spaces() {
        // Two spaces produce an empty token, so this is two arguments.
        assert!(Command::parse("nick  bob").is_err());
    }

    #[tokio::test]
    async fn test_nick_show_and_change() {
        let server = Arc::new(Server::new(ServerConfig::default()));
        let (mut s, mut rx) = session(&server);

        parse("nick").execute(&mut s).await.unwrap();
        assert_eq!(drain(&mut rx), "your nickname is \"anonymous\"\n");

        parse("nick bob").execute(&mut s).await.unwrap();
        parse("nick carol").execute(&mut s).await.unwrap();
        drain(&mut rx);

        parse("nick").execute(&mut s).await.unwrap();
        assert_eq!(drain(&mut rx), "your nickname is \"carol\"\n");
    }

    #[tokio::test]
    async fn test_nick_rolls_back_when_reply_fails() {
        let server = Arc::new(Server::new(ServerConfig::default()));
        let (mut s, rx) = session(&server);
        drop(rx);

        let err = parse("nick bob").execute(&mut s).await.unwrap_err();

        assert!(err.is_fatal());
        assert_eq!(s.nickname(), "anonymous");
    }

    #[tokio::test]
    async fn test_join_moves_membership() {
        let server = Arc::new(Server::new(ServerConfig::default()));
        let (mut s, _rx) = session(&server);

        parse("join r1").execute(&mut s).await.unwrap();
        parse("join r2").execute(&mut s).await.unwrap();

        let r1 = server.rooms.get(&RoomName::from("r1")).await.unwrap();
        let r2 = server.rooms.get(&RoomName::from("r2")).await.unwrap();
        assert!(!r1.contains(s.id()).await);
        assert!(r2.contains(s.id()).await);
        assert_eq!(s.room().unwrap().name().as_str(), "r2");
    }

    #[tokio::test]
    async fn test_send_without_room_fails() {
        let server = Arc::new(Server::new(ServerConfig::default()));
        let (mut other, _other_rx) = session(&server);
        parse("join lobby").execute(&mut other).await.unwrap();
        let (mut s, _rx) = session(&server);

        let err = parse("send hi").execute(&mut s).await.unwrap_err();

        assert!(matches!(err, ChatError::NotInRoom));
        let lobby = server.rooms.get(&RoomName::from("lobby")).await.unwrap();
        assert!(lobby.messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_send_delivers_to_others_once() {
        let server = Arc::new(Server::new(ServerConfig::default()));
        let (mut alice, mut alice_rx) = session(&server);
        let (mut bob, mut bob_rx) = session(&server);
        let (mut carol, mut carol_rx) = session(&server);
        parse("nick alice").execute(&mut alice).await.unwrap();
        parse("join lobby").execute(&mut alice).await.unwrap();
        parse("join lobby").execute(&mut bob).await.unwrap();
        parse("join elsewhere").execute(&mut carol).await.unwrap();
        drain(&mut alice_rx);
        drain(&mut bob_rx);
        drain(&mut carol_rx);

        parse("send hi").execute(&mut alice).await.unwrap();

        assert_eq!(drain(&mut bob_rx), "alice: hi\n");
        assert_eq!(drain(&mut alice_rx), "");
        assert_eq!(drain(&mut carol_rx), "");
    }

    #[tokio::test]
    async fn test_log_keeps_nickname_at_send_time() {
        let server = Arc::new(Server::new(ServerConfig::default()));
        let (mut s, _rx) = session(&server);
        parse("join lobby").execute(&mut s).await.unwrap();
        parse("send one").execute(&mut s).await.unwrap();
        parse("nick bob").execute(&mut s).await.unwrap();
        parse("send two").execute(&mut s).await.unwrap();

        let lobby = server.rooms.get(&RoomName::from("lobby")).await.unwrap();
        assert_eq!(
            lobby.messages().await,
            vec![Message::new("anonymous", "one"), Message::new("bob", "two")]
        );
    }

    #[tokio::test]
    async fn test_rooms_lists_names() {
        let server = Arc::new(Server::new(ServerConfig::default()));
        let (mut s, mut rx) = session(&server);

        parse("rooms").execute(&mut s).await.unwrap();
        assert_eq!(drain(&mut rx), "no rooms yet\n");

        parse("join lobby").execute(&mut s).await.unwrap();
        parse("join dev").execute(&mut s).await.unwrap();
        drain(&mut rx);

        parse("rooms").execute(&mut s).await.unwrap();
        assert_eq!(drain(&mut rx), "rooms: dev, lobby\n");
    }

    #[tokio::test]
    async fn test_quit_fires_done_signal() {
        let server = Arc::new(Server::new(ServerConfig::default()));
        let (mut s, mut rx) = session(&server);
        assert!(!s.done().is_fired());

        parse("quit").execute(&mut s).await.unwrap();

        assert!(s.done().is_fired());
        assert_eq!(drain(&mut rx), "bye\n");
    }
}
