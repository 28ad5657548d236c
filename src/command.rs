//! Client command model and line parsing
//!
//! Sessions turn raw input lines into [`Command`] values here. Parsing is
//! pure: it never touches server state and either produces a command for the
//! dispatcher or a syntax error the session reports to its own connection.

use crate::error::AppError;
use crate::types::ClientId;

/// Leading marker for explicit commands
pub const COMMAND_MARKER: char = '/';

/// Kind of client-initiated action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    SetNick,
    JoinRoom,
    ListRooms,
    SendMessage,
    Quit,
    /// Plain line without a keyword
    Chat,
}

impl CommandKind {
    /// Map an explicit keyword (marker included) to its kind
    ///
    /// Keywords are case-sensitive.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "/nick" => Some(CommandKind::SetNick),
            "/join" => Some(CommandKind::JoinRoom),
            "/rooms" => Some(CommandKind::ListRooms),
            "/msg" => Some(CommandKind::SendMessage),
            "/quit" => Some(CommandKind::Quit),
            _ => None,
        }
    }
}

/// One parsed client action awaiting the dispatcher
///
/// Immutable once constructed; `args` never includes the keyword itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    kind: CommandKind,
    origin: ClientId,
    args: Vec<String>,
}

impl Command {
    pub fn new(kind: CommandKind, origin: ClientId, args: Vec<String>) -> Self {
        Self { kind, origin, args }
    }

    /// Disconnect command synthesized when a connection goes away
    pub fn quit(origin: ClientId) -> Self {
        Self::new(CommandKind::Quit, origin, Vec::new())
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn origin(&self) -> ClientId {
        self.origin
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// Parse one input line
///
/// Returns `Ok(None)` for blank lines. Lines without the marker become
/// [`CommandKind::Chat`]; whether the client may chat is the dispatcher's call.
pub fn parse_line(line: &str, origin: ClientId) -> Result<Option<Command>, AppError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    if trimmed.starts_with(COMMAND_MARKER) {
        let mut tokens = trimmed.split_whitespace();
        let keyword = tokens.next().unwrap_or_default();

        let Some(kind) = CommandKind::from_keyword(keyword) else {
            return Err(AppError::UnknownCommand(keyword.to_string()));
        };

        let args = tokens.map(str::to_string).collect();
        return Ok(Some(Command::new(kind, origin, args)));
    }

    // Implicit message: keep the line as typed
    let text = line.trim_end_matches(['\r', '\n']).to_string();
    Ok(Some(Command::new(CommandKind::Chat, origin, vec![text])))
}
