//! Binary entrypoint for the pocket-chat terminal client.

use std::process::ExitCode;

use pocket_chat::start_pocket_chat;

/// Open the chat store and run the interactive loop.
fn main() -> ExitCode {
    start_pocket_chat::run()
}
