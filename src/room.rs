//! Room struct definition
//!
//! Represents a named chat room and its current members.

use std::collections::HashMap;

use tracing::warn;

use crate::client::Outbox;
use crate::message::ServerMessage;
use crate::types::{ClientId, RoomName};

/// Named broadcast group
///
/// Members are keyed by `ClientId`; each entry holds a clone of the member's
/// outbox so broadcasting needs nothing but the room itself.
#[derive(Debug)]
pub struct Room {
    /// Room name, unique within the registry
    pub name: RoomName,
    /// Current members: ClientId -> Outbox
    members: HashMap<ClientId, Outbox>,
}

impl Room {
    /// Create an empty room
    pub fn new(name: RoomName) -> Self {
        Self {
            name,
            members: HashMap::new(),
        }
    }

    /// Add a member, replacing any previous entry for the same client
    pub fn add_member(&mut self, client_id: ClientId, outbox: Outbox) {
        self.members.insert(client_id, outbox);
    }

    /// Remove a member
    ///
    /// Returns true if the client was in the room.
    pub fn remove_member(&mut self, client_id: ClientId) -> bool {
        self.members.remove(&client_id).is_some()
    }

    /// Check if a client is in this room
    pub fn contains(&self, client_id: ClientId) -> bool {
        self.members.contains_key(&client_id)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Write `msg` to every member except `exclude`
    ///
    /// Each delivery is independent: a failed send is logged and skipped.
    /// Returns the number of members the message was queued for.
    pub fn broadcast(&self, exclude: Option<ClientId>, msg: &ServerMessage) -> usize {
        let mut delivered = 0;
        for (member_id, outbox) in &self.members {
            if Some(*member_id) == exclude {
                continue;
            }
            match outbox.send(msg.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => warn!(
                    "Broadcast in room {} to {} failed: {}",
                    self.name, member_id, e
                ),
            }
        }
        delivered
    }
}
