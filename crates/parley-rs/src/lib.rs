//! Decision core for a conversational bot backend.
//!
//! Every inbound message goes through three decisions:
//!
//! 1. **Is it a command?** The [`CommandRouter`](commands::CommandRouter)
//!    matches the text against a fixed, ordered pattern table. Commands act
//!    on a small persistent [`ListStore`](lists::ListStore) and never touch
//!    the transcript.
//! 2. **Has it been seen before?** Webhook platforms retry. The
//!    [intake deduplicator](transcript::dedup) checks the message's external
//!    id against everything already recorded for the session.
//! 3. **What fits?** The [window selector](context::window) picks the
//!    persona preamble plus the longest recent suffix of the conversation
//!    whose estimated token cost stays strictly under the budget.
//!
//! The [`Bot`](bot::Bot) wires these together with a
//! [`Generator`](generation::Generator) into the per-message pipeline.
//!
//! # Getting started
//!
//! ```ignore
//! use parley_rs::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ParleyError> {
//!     let config = BotConfig::new("Buddy", "warm, curious, and a little goofy");
//!     let client = OpenRouterClient::new(std::env::var("OPENROUTER_KEY").unwrap_or_default())?;
//!     let generator = OpenRouterGenerator::from_config(client, &config);
//!
//!     let bot = Bot::new(
//!         config,
//!         Arc::new(MemoryTranscriptStore::new()),
//!         Arc::new(MemoryListStore::new()),
//!         Arc::new(generator),
//!         Arc::new(BpeEstimator::p50k()?),
//!     );
//!
//!     let inbound = InboundMessage::new("chat-42", "hi there").with_external_id("1");
//!     if let Some(reply) = bot.handle(&inbound).await.reply_text() {
//!         println!("{reply}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bot`] | Per-message pipeline: command routing, intake, window selection, generation |
//! | [`commands`] | Command table, parsing, and dispatch against the list store |
//! | [`context`] | Token estimation, budget derivation, and window selection |
//! | [`transcript`] | Transcript store contract, JSONL and in-memory stores, deduplication |
//! | [`lists`] | Named list store contract and stores |
//! | [`generation`] | Generation capability, OpenRouter client, timeouts |
//! | [`config`] | Persona and bot configuration |

pub mod bot;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod generation;
pub mod lists;
pub mod prelude;
pub mod transcript;

use serde::{Deserialize, Serialize};

pub use error::{ParleyError, Result};
pub use transcript::Message;

// ── Message types ──────────────────────────────────────────────────

/// Author of a transcript message.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A message as sent to the generation endpoint.
///
/// This is the wire shape: transcript bookkeeping (position, external id)
/// is stripped before submission.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

impl From<&Message> for ChatMessage {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role,
            content: msg.text.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_message_constructors() {
        let sys = ChatMessage::system("hello");
        assert_eq!(sys.role, Role::System);
        assert_eq!(sys.content, "hello");

        assert_eq!(ChatMessage::user("world").role, Role::User);
        assert_eq!(ChatMessage::assistant("hi").role, Role::Assistant);
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
        let parsed: Role = serde_json::from_str("\"system\"").unwrap();
        assert_eq!(parsed, Role::System);
    }

    #[test]
    fn chat_message_from_transcript_message_drops_bookkeeping() {
        let msg = Message {
            role: Role::User,
            text: "hi".into(),
            external_id: Some("7".into()),
            position: 3,
        };
        let wire = ChatMessage::from(&msg);
        assert_eq!(wire, ChatMessage::user("hi"));
        let json = serde_json::to_value(&wire).unwrap();
        assert!(json.get("external_id").is_none());
        assert!(json.get("position").is_none());
    }
}
