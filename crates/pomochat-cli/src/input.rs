//! Line input parsing.

/// A parsed line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputCommand {
    /// Send the line as a chat message.
    Send(String),
    /// Switch the conversation to another peer.
    Peer(String),
    /// Leave the current conversation.
    Leave,
    /// Dismiss the displayed error.
    Clear,
    /// Print the command list.
    Help,
    /// Exit.
    Quit,
    /// Slash command that is not recognised.
    Unknown(String),
    /// Nothing to do.
    Empty,
}

/// Command list shown by `/help`.
pub const HELP: &str = "\
commands:
  /peer <id>   chat with <id>
  /leave       leave the conversation
  /clear       dismiss the current error
  /quit        exit
anything else is sent as a message";

/// Parse one line of input.
///
/// Message text is passed through untrimmed; blank lines are ignored.
pub fn parse(line: &str) -> InputCommand {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return InputCommand::Empty;
    }

    let Some(command) = trimmed.strip_prefix('/') else {
        return InputCommand::Send(line.to_string());
    };

    let mut parts = command.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or_default();
    let arg = parts.next().map(str::trim).unwrap_or_default();

    match (name, arg) {
        ("quit" | "q", _) => InputCommand::Quit,
        ("leave", _) => InputCommand::Leave,
        ("clear", _) => InputCommand::Clear,
        ("help", _) => InputCommand::Help,
        ("peer", peer) if !peer.is_empty() => InputCommand::Peer(peer.to_string()),
        _ => InputCommand::Unknown(trimmed.to_string()),
    }
}
