//! Terminal front end: command parsing and the chat loop.

pub mod command;
pub mod repl;

pub use command::{Command, CommandError, parse_command};
pub use repl::{Flow, execute, run_repl};
