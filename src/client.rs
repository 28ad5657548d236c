//! Client struct definition
//!
//! Represents a connected client with their state and communication channels.
//! Only the dispatcher holds `Client` values; the session task keeps the
//! receiving end of the outbox.

use tokio::sync::mpsc;
use tracing::warn;

use crate::error::SendError;
use crate::message::ServerMessage;
use crate::types::{ClientId, RoomName};

/// Nick every client starts with
pub const DEFAULT_NICK: &str = "Anonymous";

/// Write handle for one client's connection
///
/// Sends never wait: a closed or full outbox is reported and the message is
/// dropped, so one stuck connection cannot hold up the dispatcher.
#[derive(Debug, Clone)]
pub struct Outbox {
    sender: mpsc::Sender<ServerMessage>,
}

impl Outbox {
    pub fn new(sender: mpsc::Sender<ServerMessage>) -> Self {
        Self { sender }
    }

    /// Queue a message for this connection
    pub fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::Full,
            mpsc::error::TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }
}

/// Connected client information
///
/// Holds the client's nick, the name of the room it occupies and its outbox.
/// `current_room` is only a lookup key into the dispatcher's registry.
#[derive(Debug)]
pub struct Client {
    /// Unique identifier for this client
    pub id: ClientId,
    /// Display name
    pub nick: String,
    /// Room the client currently occupies
    current_room: Option<RoomName>,
    /// Server → Client message channel
    outbox: Outbox,
}

impl Client {
    /// Create a new client with the given ID and outbox
    pub fn new(id: ClientId, outbox: Outbox) -> Self {
        Self {
            id,
            nick: DEFAULT_NICK.to_string(),
            current_room: None,
            outbox,
        }
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    pub fn current_room(&self) -> Option<&RoomName> {
        self.current_room.as_ref()
    }

    pub fn set_room(&mut self, room: Option<RoomName>) {
        self.current_room = room;
    }

    /// Send a message to this client, best effort
    pub fn notify(&self, msg: ServerMessage) {
        if let Err(e) = self.outbox.send(msg) {
            warn!("Dropped message for client {}: {}", self.id, e);
        }
    }
}
