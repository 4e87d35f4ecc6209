//! Per-connection session
//!
//! A session reads lines from its transport, runs them through the command
//! protocol and replies through its own `Client` handle. Output to the
//! transport is done by a separate writer task so that peers can queue
//! messages for this client without waiting on its socket.
//!
//! Termination is cooperative: the done-signal is checked once per loop
//! iteration, so a session blocked in a read is only released by the
//! transport closing or erroring.

use std::io;
use std::sync::Arc;

use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::client::Client;
use crate::command::Command;
use crate::error::{ChatError, SendError};
use crate::message::{self, GREETING, PROMPT};
use crate::room::Room;
use crate::server::Server;
use crate::types::SessionId;

/// Single-shot termination signal
///
/// Fired by `quit` and by teardown. Once fired it stays fired.
#[derive(Debug, Clone)]
pub struct DoneSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl DoneSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn fire(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_fired(&self) -> bool {
        *self.tx.borrow()
    }

    /// Receiver that observes the next `fire`
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for DoneSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Server-side state of one connected client
pub struct Session {
    client: Arc<Client>,
    server: Arc<Server>,
    nickname: String,
    room: Option<Arc<Room>>,
    done: DoneSignal,
}

impl Session {
    pub fn new(server: Arc<Server>, client: Arc<Client>) -> Self {
        let nickname = server.config.default_nickname.clone();
        Self {
            client,
            server,
            nickname,
            room: None,
            done: DoneSignal::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.client.id
    }

    pub fn client(&self) -> &Arc<Client> {
        &self.client
    }

    pub fn server(&self) -> &Arc<Server> {
        &self.server
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    /// Replace the nickname, returning the previous one
    pub fn set_nickname(&mut self, nickname: String) -> String {
        std::mem::replace(&mut self.nickname, nickname)
    }

    pub fn room(&self) -> Option<&Arc<Room>> {
        self.room.as_ref()
    }

    pub fn set_room(&mut self, room: Arc<Room>) {
        self.room = Some(room);
    }

    pub fn take_room(&mut self) -> Option<Arc<Room>> {
        self.room.take()
    }

    pub fn done(&self) -> &DoneSignal {
        &self.done
    }

    /// Queue a reply line for this session's own client
    pub fn reply(&self, text: impl AsRef<str>) -> Result<(), SendError> {
        self.client.send_line(text)
    }

    /// Run the control loop until quit, EOF or a transport failure
    ///
    /// On return the session has left its room and the done-signal has fired.
    pub async fn run<R>(mut self, reader: R) -> Result<(), ChatError>
    where
        R: AsyncRead + Unpin,
    {
        let result = self.read_loop(reader).await;
        self.teardown().await;
        result
    }

    async fn read_loop<R>(&mut self, reader: R) -> Result<(), ChatError>
    where
        R: AsyncRead + Unpin,
    {
        self.reply(GREETING)?;

        let max_line_len = self.server.config.max_line_len;
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();

        while !self.done.is_fired() {
            if let Err(e) = self.client.send_raw(PROMPT) {
                debug!("Failed to write prompt for {}: {}", self.id(), e);
            }

            let input = tokio::select! {
                input = read_input(&mut reader, &mut buf, max_line_len) => input?,
                _ = self.client.closed() => return Err(SendError::ChannelClosed.into()),
            };
            let line = match input {
                Input::Line(line) => line,
                Input::Eof => {
                    debug!("Client {} closed the connection", self.id());
                    break;
                }
                Input::Rejected(e) => {
                    debug!("Rejected input from {}: {}", self.id(), e);
                    self.reply(message::error(&e))?;
                    continue;
                }
            };

            let command = match Command::parse(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(e) => {
                    debug!("Rejected input from {}: {}", self.id(), e);
                    self.reply(message::error(&e))?;
                    continue;
                }
            };

            debug!("Client {} issued {:?}", self.id(), command);
            if let Err(e) = command.execute(self).await {
                if e.is_fatal() {
                    return Err(e);
                }
                self.reply(message::error(&e))?;
            }
        }

        Ok(())
    }

    async fn teardown(&mut self) {
        if let Some(room) = self.room.take() {
            room.leave(self.id()).await;
        }
        self.done.fire();
        info!("Session {} ({}) ended", self.id(), self.nickname);
    }
}

/// One read from the transport
enum Input {
    Line(String),
    /// Line was unusable; the session replies with the error and carries on
    Rejected(ChatError),
    Eof,
}

/// Read one newline-terminated line of at most `max` bytes
///
/// An over-long line is consumed up to and including its newline and
/// reported as `LineTooLong`. Bytes that are not UTF-8 are reported as
/// `InvalidEncoding`. Only transport failures are returned as `Err`.
async fn read_input<R>(reader: &mut R, buf: &mut Vec<u8>, max: usize) -> io::Result<Input>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let read = (&mut *reader).take(max as u64).read_until(b'\n', buf).await?;
    if read == 0 {
        return Ok(Input::Eof);
    }

    if buf.last() != Some(&b'\n') && read >= max {
        loop {
            let (used, found) = {
                let available = reader.fill_buf().await?;
                match available.iter().position(|&b| b == b'\n') {
                    Some(i) => (i + 1, true),
                    None => (available.len(), false),
                }
            };
            reader.consume(used);
            if found || used == 0 {
                break;
            }
        }
        return Ok(Input::Rejected(ChatError::LineTooLong { max }));
    }

    match std::str::from_utf8(buf) {
        Ok(line) => Ok(Input::Line(line.to_owned())),
        Err(_) => Ok(Input::Rejected(ChatError::InvalidEncoding)),
    }
}

/// Spawn the task that drains a session's outbound channel onto `writer`
///
/// The task stops on the first write error (which closes the channel and
/// lets the session notice), or once `done` fires, after flushing whatever
/// was already queued.
pub fn spawn_writer<W>(
    mut writer: W,
    mut outbound: mpsc::Receiver<String>,
    mut done: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                chunk = outbound.recv() => {
                    let Some(chunk) = chunk else { break };
                    if let Err(e) = write_chunk(&mut writer, &chunk).await {
                        debug!("Write failed, ending writer task: {}", e);
                        return;
                    }
                }
                _ = done.changed() => break,
            }
        }

        while let Ok(chunk) = outbound.try_recv() {
            if write_chunk(&mut writer, &chunk).await.is_err() {
                return;
            }
        }
        let _ = writer.shutdown().await;
    })
}

async fn write_chunk<W>(writer: &mut W, chunk: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(chunk.as_bytes()).await?;
    writer.flush().await
}
