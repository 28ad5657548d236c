//! TCP connection handler
//!
//! Handles individual client sessions: line framing, command parsing, and
//! bidirectional communication with the ChatServer. A session never touches
//! server state; it only enqueues commands and writes what it is sent.

use std::sync::Arc;

use futures_util::{SinkExt, Stream, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::{debug, info, warn};

use crate::client::Outbox;
use crate::command::{parse_line, Command, CommandKind};
use crate::config::Config;
use crate::decorate::{decorator_for, Decorator};
use crate::error::AppError;
use crate::message::ServerMessage;
use crate::server::ServerCommand;
use crate::types::ClientId;

/// Per-connection settings shared by every session
#[derive(Clone)]
pub struct SessionSettings {
    pub decorator: Arc<dyn Decorator>,
    pub max_line_length: usize,
    pub outbox_capacity: usize,
}

impl From<&Config> for SessionSettings {
    fn from(config: &Config) -> Self {
        Self {
            decorator: decorator_for(!config.no_color),
            max_line_length: config.max_line_length,
            outbox_capacity: config.outbox_capacity,
        }
    }
}

/// How a session's read loop finished
#[derive(Debug, PartialEq, Eq)]
pub enum ReadEnd {
    /// Client sent `/quit`; the dispatcher already has the command
    Quit,
    /// Peer closed the connection
    Eof,
    /// The dispatcher is gone
    ServerGone,
}

/// Handle a new TCP connection
///
/// Registers the client, runs the read loop until it ends, and makes sure the
/// dispatcher gets a Quit for every connection that goes away.
pub async fn handle_connection(
    stream: TcpStream,
    cmd_tx: mpsc::UnboundedSender<ServerCommand>,
    settings: SessionSettings,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    let client_id = ClientId::new();
    info!("Client {} connected from {}", client_id, peer_addr);

    let framed = Framed::new(stream, LinesCodec::new_with_max_length(settings.max_line_length));
    let (mut sink, mut lines) = framed.split();

    // Server -> client messages
    let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(settings.outbox_capacity);
    let outbox = Outbox::new(msg_tx);
    let local = outbox.clone();

    cmd_tx
        .send(ServerCommand::Connect { client_id, outbox })
        .map_err(|_| AppError::ChannelSend)?;

    // Write task: ends once every outbox handle is dropped
    let decorator = settings.decorator.clone();
    let write_task = tokio::spawn(async move {
        while let Some(msg) = msg_rx.recv().await {
            if let Err(e) = sink.send(msg.render(decorator.as_ref())).await {
                debug!("Write to {} failed: {}", client_id, e);
                break;
            }
        }
        let _ = sink.close().await;
        debug!("Write task ended for {}", client_id);
    });

    let end = read_loop(&mut lines, client_id, &cmd_tx, &local).await;

    // Only the dispatcher may hold our outbox from here on
    drop(local);

    let synthesize_quit = match end {
        Ok(ReadEnd::Quit) | Ok(ReadEnd::ServerGone) => false,
        Ok(ReadEnd::Eof) => {
            debug!("Client {} closed the connection", client_id);
            true
        }
        Err(e) => {
            warn!("Read error for {}: {}", client_id, e);
            true
        }
    };
    if synthesize_quit
        && cmd_tx
            .send(ServerCommand::Client(Command::quit(client_id)))
            .is_err()
    {
        debug!("Server closed, could not deliver quit for {}", client_id);
    }

    let _ = write_task.await;
    info!("Client {} disconnected", client_id);

    Ok(())
}

/// Read lines until the client quits or the connection ends
///
/// Unknown keywords are answered on `local` and never reach the dispatcher.
/// Everything else, plain lines included, is enqueued in the order read.
pub async fn read_loop<S>(
    lines: &mut S,
    client_id: ClientId,
    cmd_tx: &mpsc::UnboundedSender<ServerCommand>,
    local: &Outbox,
) -> Result<ReadEnd, AppError>
where
    S: Stream<Item = Result<String, LinesCodecError>> + Unpin,
{
    while let Some(line) = lines.next().await {
        let line = line?;
        match parse_line(&line, client_id) {
            Ok(Some(cmd)) => {
                let is_quit = cmd.kind() == CommandKind::Quit;
                if cmd_tx.send(ServerCommand::Client(cmd)).is_err() {
                    debug!("Server closed, ending read loop for {}", client_id);
                    return Ok(ReadEnd::ServerGone);
                }
                if is_quit {
                    return Ok(ReadEnd::Quit);
                }
            }
            Ok(None) => {}
            Err(e) => {
                debug!("Rejected input from {}: {}", client_id, e);
                if let Err(e) = local.send(e.into()) {
                    warn!("Could not report input error to {}: {}", client_id, e);
                }
            }
        }
    }

    Ok(ReadEnd::Eof)
}
