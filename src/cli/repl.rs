//! Line-oriented chat loop over the conversation store.

use std::io::Write;

use anyhow::Result;
use chrono::Utc;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tracing::debug;

use crate::chat::core::conversation::Conversation;
use crate::chat::core::ids::MessageId;
use crate::chat::core::time_ago::time_ago;
use crate::chat::store::ChatStore;
use crate::cli::command::{Command, HELP, parse_command};

/// Whether the loop should keep reading.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Read the next line.
    Continue,
    /// Leave the loop.
    Quit,
}

/// Read commands from `input` until `/quit` or end of input.
///
/// Replies are awaited before the next prompt, so the loop behaves like a
/// turn-based chat even though the store answers in the background.
///
/// # Errors
/// Returns an error if reading input or writing output fails.
pub async fn run_repl<R, W>(store: &ChatStore, input: R, output: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(output, "pocket-chat ready. Type /help for commands.")?;
    print_selected_header(store, output).await?;

    let mut lines = input.lines();
    loop {
        write!(output, "> ")?;
        output.flush()?;

        let Some(line) = lines.next_line().await? else {
            writeln!(output)?;
            break;
        };

        match parse_command(&line) {
            Ok(command) => {
                if execute(store, command, output).await? == Flow::Quit {
                    break;
                }
            }
            Err(err) => writeln!(output, "{err}")?,
        }
    }

    store.wait_idle().await;
    Ok(())
}

/// Apply one command and print its outcome.
///
/// # Errors
/// Returns an error if writing output fails.
pub async fn execute<W: Write>(store: &ChatStore, command: Command, output: &mut W) -> Result<Flow> {
    debug!(?command, "Executing command");
    match command {
        Command::Empty => {}
        Command::Send(text) => send(store, &text, output).await?,
        Command::New => {
            store.create().await;
            writeln!(output, "Started a new chat.")?;
        }
        Command::List => print_list(store, output).await?,
        Command::Select(position) => {
            let conversations = store.conversations().await;
            match position.checked_sub(1).and_then(|index| conversations.get(index)) {
                Some(conversation) => {
                    store.select(conversation.id).await;
                    print_selected_header(store, output).await?;
                }
                None => writeln!(output, "No chat at position {position}.")?,
            }
        }
        Command::Delete(position) => {
            let conversations = store.conversations().await;
            match position.checked_sub(1).and_then(|index| conversations.get(index)) {
                Some(conversation) => {
                    store.delete(conversation.id).await;
                    writeln!(output, "Deleted \"{}\".", conversation.title)?;
                    if store.selected_id().await.is_none() {
                        writeln!(output, "No chats left. Use /new to start one.")?;
                    }
                }
                None => writeln!(output, "No chat at position {position}.")?,
            }
        }
        Command::Clear => {
            if store.clear().await {
                writeln!(output, "Chat cleared.")?;
            } else {
                writeln!(output, "No chat selected.")?;
            }
        }
        Command::Show => match store.selected_conversation().await {
            Some(conversation) => print_conversation(&conversation, output)?,
            None => writeln!(output, "No chat selected.")?,
        },
        Command::Edit { position, text } => edit(store, position, &text, output).await?,
        Command::System(None) => {
            writeln!(output, "System prompt: {}", store.system_prompt().await)?;
        }
        Command::System(Some(text)) => {
            store.update_system_prompt(&text).await;
            writeln!(output, "System prompt updated.")?;
        }
        Command::SystemReset => {
            store.reset_system_prompt().await;
            writeln!(output, "System prompt reset to: {}", store.system_prompt().await)?;
        }
        Command::Export => match store.selected_conversation().await {
            Some(conversation) => write!(output, "{}", conversation.transcript())?,
            None => writeln!(output, "No chat selected.")?,
        },
        Command::Help => writeln!(output, "{HELP}")?,
        Command::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

async fn send<W: Write>(store: &ChatStore, text: &str, output: &mut W) -> Result<()> {
    let Some(conversation_id) = store.selected_id().await else {
        writeln!(output, "No chat selected. Use /new to start one.")?;
        return Ok(());
    };
    let Some(message_id) = store.send(text).await else {
        return Ok(());
    };

    store.wait_idle().await;
    if let Some(conversation) = store.conversation(conversation_id).await {
        print_replies_after(&conversation, message_id, output)?;
    }
    Ok(())
}

async fn edit<W: Write>(store: &ChatStore, position: usize, text: &str, output: &mut W) -> Result<()> {
    let Some(conversation) = store.selected_conversation().await else {
        writeln!(output, "No chat selected.")?;
        return Ok(());
    };
    let Some(message) = position
        .checked_sub(1)
        .and_then(|index| conversation.messages.get(index))
    else {
        writeln!(output, "No message at position {position}.")?;
        return Ok(());
    };
    if !message.is_user {
        writeln!(output, "Message {position} is not one of yours.")?;
        return Ok(());
    }

    let message_id = message.id;
    if !store.edit(message_id, text).await {
        return Ok(());
    }

    store.wait_idle().await;
    if let Some(updated) = store.conversation(conversation.id).await {
        print_replies_after(&updated, message_id, output)?;
    }
    Ok(())
}

async fn print_list<W: Write>(store: &ChatStore, output: &mut W) -> Result<()> {
    let conversations = store.conversations().await;
    if conversations.is_empty() {
        writeln!(output, "No chats. Use /new to start one.")?;
        return Ok(());
    }

    let selected = store.selected_id().await;
    let now = Utc::now();
    for (index, conversation) in conversations.iter().enumerate() {
        let marker = if Some(conversation.id) == selected { '*' } else { ' ' };
        writeln!(
            output,
            "{marker} {}. {} ({} messages, {})",
            index + 1,
            conversation.title,
            conversation.messages.len(),
            time_ago(conversation.created_at, now)
        )?;
    }
    Ok(())
}

async fn print_selected_header<W: Write>(store: &ChatStore, output: &mut W) -> Result<()> {
    if let Some(conversation) = store.selected_conversation().await {
        writeln!(
            output,
            "Chat: {} ({} messages)",
            conversation.title,
            conversation.messages.len()
        )?;
    }
    Ok(())
}

fn print_conversation<W: Write>(conversation: &Conversation, output: &mut W) -> Result<()> {
    writeln!(output, "Chat: {}", conversation.title)?;
    if conversation.messages.is_empty() {
        writeln!(output, "(no messages yet)")?;
    }
    for (index, message) in conversation.messages.iter().enumerate() {
        let edited = if message.is_edited { " (edited)" } else { "" };
        writeln!(
            output,
            "[{}] {}{edited}: {}",
            index + 1,
            message.role_label(),
            message.content
        )?;
    }
    Ok(())
}

fn print_replies_after<W: Write>(
    conversation: &Conversation,
    message_id: MessageId,
    output: &mut W,
) -> Result<()> {
    let Some(index) = conversation.position_of(message_id) else {
        return Ok(());
    };
    for message in conversation.messages.iter().skip(index + 1) {
        if !message.is_user {
            writeln!(output, "{}", message.content)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::chat::core::config::StorageConfig;
    use crate::chat::inference::scripted::ScriptedGateway;
    use crate::chat::storage::kv_store::MemoryKeyValueStore;
    use crate::chat::storage::persistence::ConversationPersistence;
    use crate::chat::store::StoreSettings;

    async fn echo_store() -> ChatStore {
        let kv = Arc::new(MemoryKeyValueStore::new());
        ChatStore::open(
            ConversationPersistence::new(kv, &StorageConfig::default()),
            Arc::new(ScriptedGateway::echo()),
            StoreSettings::default(),
        )
        .await
    }

    async fn run_script(store: &ChatStore, script: &str) -> String {
        let mut output = Vec::new();
        run_repl(store, script.as_bytes(), &mut output).await.unwrap();
        String::from_utf8(output).unwrap()
    }

    #[tokio::test]
    async fn test_send_prints_reply() {
        let store = echo_store().await;
        let output = run_script(&store, "hello world\n/quit\n").await;

        assert!(output.contains("You said: hello world"));
        let conversation = store.selected_conversation().await.unwrap();
        assert_eq!(conversation.title, "hello world");
        assert_eq!(conversation.messages.len(), 2);
    }

    #[tokio::test]
    async fn test_list_and_select() {
        let store = echo_store().await;
        let output = run_script(&store, "first chat\n/new\nsecond chat\n/list\n/select 2\n").await;

        assert!(output.contains("* 1. second chat (2 messages, Just now)"));
        assert!(output.contains("  2. first chat (2 messages, Just now)"));
        assert_eq!(store.selected_conversation().await.unwrap().title, "first chat");
    }

    #[tokio::test]
    async fn test_edit_rejects_assistant_message() {
        let store = echo_store().await;
        let output = run_script(&store, "question\n/edit 2 rewrite\n/edit 1 better question\n/show\n").await;

        assert!(output.contains("Message 2 is not one of yours."));
        assert!(output.contains("[1] User (edited): better question"));
        assert!(output.contains("[2] Assistant: You said: better question"));
    }

    #[tokio::test]
    async fn test_delete_last_chat_then_send() {
        let store = echo_store().await;
        let output = run_script(&store, "/delete 1\nhello\n/list\n").await;

        assert!(output.contains("No chats left."));
        assert!(output.contains("No chat selected. Use /new to start one."));
        assert!(output.contains("No chats. Use /new to start one."));
    }

    #[tokio::test]
    async fn test_export_prints_transcript() {
        let store = echo_store().await;
        let output = run_script(&store, "ping\n/export\n").await;
        assert!(output.contains("Chat: ping\n\nUser: ping\n\nAssistant: You said: ping\n\n"));
    }

    #[tokio::test]
    async fn test_system_prompt_commands() {
        let store = echo_store().await;
        let output = run_script(&store, "/system Be terse.\n/system\n/system reset\n").await;

        assert!(output.contains("System prompt: Be terse."));
        assert!(output.contains("System prompt reset to: You are a helpful assistant."));
        assert_eq!(store.system_prompt().await, "You are a helpful assistant.");
    }

    #[tokio::test]
    async fn test_bad_input_reports_error() {
        let store = echo_store().await;
        let output = run_script(&store, "/nope\n/select 9\n").await;
        assert!(output.contains("unknown command: /nope"));
        assert!(output.contains("No chat at position 9."));
    }
}
