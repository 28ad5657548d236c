//! Outbound message definitions
//!
//! Everything the server writes to a client is a `ServerMessage`. The
//! dispatcher only picks the tone; turning it into bytes on the wire is the
//! session writer's job (see [`crate::decorate`]).

use crate::decorate::Decorator;
use crate::error::AppError;

/// Server → Client message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Something the client asked for went wrong
    Error(String),
    /// Confirmation of a state change the client requested
    Success(String),
    /// Notices: welcome, join/leave, room list, farewell
    Info(String),
    /// Chat line relayed from another member
    Chat(String),
}

impl ServerMessage {
    /// Text of the message without any decoration
    pub fn text(&self) -> &str {
        match self {
            ServerMessage::Error(text)
            | ServerMessage::Success(text)
            | ServerMessage::Info(text)
            | ServerMessage::Chat(text) => text,
        }
    }

    /// Render through a decorator and terminate with a blank line
    ///
    /// The line codec appends the final newline, so one `\n` here gives the
    /// double newline clients expect between messages.
    pub fn render(&self, decorator: &dyn Decorator) -> String {
        let body = match self {
            ServerMessage::Error(text) => decorator.error(text),
            ServerMessage::Success(text) => decorator.success(text),
            ServerMessage::Info(text) => decorator.info(text),
            ServerMessage::Chat(text) => decorator.plain(text),
        };
        format!("{body}\n")
    }
}

/// Convert AppError to ServerMessage for client notification
impl From<AppError> for ServerMessage {
    fn from(err: AppError) -> Self {
        let text = match &err {
            AppError::UnknownCommand(keyword) => format!("unknown command: {keyword}"),
            AppError::NotRecognized => {
                "command not recognized. join a room with /join <ROOM-NAME> to chat".to_string()
            }
            AppError::NickRequired => "you must provide a nick".to_string(),
            AppError::RoomNameRequired => {
                "room name is required. usage: /join <ROOM-NAME>".to_string()
            }
            AppError::MessageRequired => "message is required. usage: /msg <MSG>".to_string(),
            AppError::NotInRoom => {
                "you need to join a room before sending messages".to_string()
            }
            // Fatal errors are not typically converted (connection closes)
            AppError::Codec(_) | AppError::ChannelSend => "internal error".to_string(),
        };
        ServerMessage::Error(text)
    }
}
