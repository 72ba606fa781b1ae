//! Convenience re-exports for common `parley-rs` types.
//!
//! ```ignore
//! use parley_rs::prelude::*;
//! ```
//!
//! Covers wiring a [`Bot`] end to end: configuration, stores, the
//! generator, and token estimation. Parsing internals and wire types stay in
//! their modules.

// ── Core types ──────────────────────────────────────────────────────
pub use crate::error::{ParleyError, Result};
pub use crate::{ChatMessage, Role};

// ── Pipeline ────────────────────────────────────────────────────────
pub use crate::bot::{Bot, InboundMessage, Outcome};
pub use crate::config::{BotConfig, Persona};

// ── Context management ──────────────────────────────────────────────
pub use crate::context::{
    BpeEstimator, CharRatioEstimator, TokenBudget, TokenEstimator, WindowSelection, select_window,
};

// ── Stores ──────────────────────────────────────────────────────────
pub use crate::lists::{JsonFileListStore, ListStore, MemoryListStore, NamedList};
pub use crate::transcript::{
    AppendOutcome, FileTranscriptStore, MemoryTranscriptStore, Message, NewMessage, Transcript,
    TranscriptStore,
};

// ── Commands and generation ─────────────────────────────────────────
pub use crate::commands::{Command, CommandKind, CommandRouter, parse_command};
pub use crate::generation::{
    GenerationFuture, GenerationInput, Generator, OpenRouterClient, OpenRouterGenerator,
};
