//! Parsing of REPL input lines.

use thiserror::Error;

/// One line of REPL input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Plain text to send to the selected conversation.
    Send(String),
    /// Create and select a new conversation.
    New,
    /// List conversations.
    List,
    /// Select the conversation at a 1-based list position.
    Select(usize),
    /// Delete the conversation at a 1-based list position.
    Delete(usize),
    /// Clear the selected conversation.
    Clear,
    /// Print the selected conversation.
    Show,
    /// Replace the text of the message at a 1-based position.
    Edit {
        /// Position of the message in the selected conversation.
        position: usize,
        /// New message text.
        text: String,
    },
    /// Print the system prompt, or replace it when text is given.
    System(Option<String>),
    /// Restore the default system prompt.
    SystemReset,
    /// Print the selected conversation as a plain-text transcript.
    Export,
    /// Print the command list.
    Help,
    /// Leave the REPL.
    Quit,
    /// Blank input.
    Empty,
}

/// Why a line could not be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    /// The slash command is not known.
    #[error("unknown command: /{0} (try /help)")]
    Unknown(String),
    /// A position argument is missing or not a positive number.
    #[error("/{0} expects a position (1, 2, ...)")]
    BadPosition(&'static str),
    /// `/edit` was given no replacement text.
    #[error("/edit expects a position followed by the new text")]
    MissingText,
}

/// Help text listing every command.
pub const HELP: &str = "\
Commands:
  <text>            send a message to the selected chat
  /new              start a new chat
  /list             list chats (newest first)
  /select <n>       select chat n
  /delete <n>       delete chat n
  /clear            clear the selected chat
  /show             print the selected chat
  /edit <n> <text>  edit your message n and regenerate the reply
  /system [text]    show or replace the system prompt
  /system reset     restore the default system prompt
  /export           print the selected chat as a transcript
  /help             show this help
  /quit             leave";

/// Parse one input line.
///
/// # Errors
/// Returns an error for unknown commands or malformed arguments.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Command::Empty);
    }
    let Some(body) = line.strip_prefix('/') else {
        return Ok(Command::Send(line.to_string()));
    };

    let (name, rest) = body
        .split_once(char::is_whitespace)
        .map_or((body, ""), |(name, rest)| (name, rest.trim()));

    match name {
        "new" => Ok(Command::New),
        "list" | "ls" => Ok(Command::List),
        "select" => parse_position(rest, "select").map(Command::Select),
        "delete" => parse_position(rest, "delete").map(Command::Delete),
        "clear" => Ok(Command::Clear),
        "show" => Ok(Command::Show),
        "edit" => parse_edit(rest),
        "system" => Ok(match rest {
            "" => Command::System(None),
            "reset" => Command::SystemReset,
            text => Command::System(Some(text.to_string())),
        }),
        "export" => Ok(Command::Export),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

fn parse_position(arg: &str, command: &'static str) -> Result<usize, CommandError> {
    match arg.parse::<usize>() {
        Ok(position) if position > 0 => Ok(position),
        _ => Err(CommandError::BadPosition(command)),
    }
}

fn parse_edit(rest: &str) -> Result<Command, CommandError> {
    let (position, text) = rest
        .split_once(char::is_whitespace)
        .ok_or(CommandError::MissingText)?;
    let position = parse_position(position, "edit")?;
    let text = text.trim();
    if text.is_empty() {
        return Err(CommandError::MissingText);
    }
    Ok(Command::Edit {
        position,
        text: text.to_string(),
    })
}
