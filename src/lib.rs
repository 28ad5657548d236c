//! Multi-room line-based chat server library
//!
//! Clients connect over TCP, send one command per line and chat inside named
//! rooms. Built on tokio using the Actor pattern for state management.
//!
//! # Commands
//! - `/nick <NAME>`: change nickname
//! - `/join <ROOM-NAME>`: join a room, creating it if needed
//! - `/rooms`: list rooms
//! - `/msg <MSG>`: send a message to the current room
//! - `/quit`: disconnect
//!
//! Any other text typed while in a room is sent as a message.
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `ChatServer` is the single actor owning clients and the room registry
//! - Each connection runs a `handler` session that parses lines into commands
//! - No locks needed - all state access goes through message passing
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use room_chat::{serve, Config};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::default();
//!     let listener = TcpListener::bind(config.bind_addr()).await.unwrap();
//!     serve(listener, config).await;
//! }
//! ```

pub mod client;
pub mod command;
pub mod config;
pub mod decorate;
pub mod error;
pub mod handler;
pub mod listener;
pub mod message;
pub mod room;
pub mod server;
pub mod types;

// Re-export main types for convenience
pub use client::{Client, Outbox};
pub use command::{parse_line, Command, CommandKind};
pub use config::Config;
pub use decorate::{AnsiDecorator, Decorator, PlainDecorator};
pub use error::{AppError, SendError};
pub use handler::{handle_connection, SessionSettings};
pub use listener::serve;
pub use message::ServerMessage;
pub use room::Room;
pub use server::{ChatServer, ServerCommand};
pub use types::{ClientId, RoomName};
