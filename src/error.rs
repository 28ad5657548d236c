//! Error types for the chat server
//!
//! Defines application-level errors and outbox send errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Covers both fatal errors (connection termination) and
/// validation errors (reported back to the originating client only).
#[derive(Debug, Error)]
pub enum AppError {
    /// Line framing error on a client connection (fatal for that session)
    #[error("Line codec error: {0}")]
    Codec(#[from] tokio_util::codec::LinesCodecError),

    /// Channel send error (fatal - dispatcher is gone)
    #[error("Channel send error")]
    ChannelSend,

    /// Explicit command keyword that is not known
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Plain text sent while not in a room
    #[error("command not recognized")]
    NotRecognized,

    /// `/nick` with no usable nickname
    #[error("nick required")]
    NickRequired,

    /// `/join` without exactly one room name
    #[error("room name required")]
    RoomNameRequired,

    /// `/msg` without any text
    #[error("message required")]
    MessageRequired,

    /// Client is not in any room
    #[error("not in room")]
    NotInRoom,
}

/// Outbox send errors
///
/// Occurs when a message cannot be queued for a client's connection.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,

    /// The client is not draining its outbox fast enough
    #[error("Outbox full")]
    Full,
}
