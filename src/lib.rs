//! Local chat client core with persisted conversations and a pluggable
//! completion backend, in a strictly linted crate.
//!
//! The [`chat::store::ChatStore`] owns all conversations. It saves every
//! change through [`chat::storage::ConversationPersistence`] and asks an
//! [`chat::inference::InferenceGateway`] for titles and replies in the
//! background.

// Strict bans on dangerous or non-idiomatic patterns
#![deny(unsafe_code)]
#![deny(missing_docs)] // every public item carries a doc comment
#![deny(non_camel_case_types)]
#![deny(unused_must_use)]
#![deny(non_snake_case)]
#![deny(non_upper_case_globals)]
#![deny(nonstandard_style)]
#![forbid(unsafe_op_in_unsafe_fn)]
// Clippy discipline
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::print_stdout)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::unwrap_in_result)]
#![deny(clippy::module_inception)]
#![deny(clippy::redundant_clone)]
#![deny(clippy::shadow_unrelated)]
#![deny(clippy::too_many_arguments)]
#![deny(clippy::cognitive_complexity)]
#![deny(overflowing_literals)]
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::too_many_lines
    )
)]

/// Conversation model, persistence, inference gateways and the store.
pub mod chat;
/// Terminal front end.
#[allow(clippy::missing_errors_doc)]
pub mod cli;
/// Entry helpers to start the pocket-chat client.
pub mod start_pocket_chat;

pub use chat::{ChatConfig, ChatStore, Conversation, ConversationId, Message, MessageId};
