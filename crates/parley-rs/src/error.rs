//! Error taxonomy for the decision core.
//!
//! Duplicate deliveries are deliberately absent: a duplicate is a no-op
//! signal ([`Outcome::Discarded`](crate::bot::Outcome::Discarded) /
//! [`AppendOutcome::Duplicate`](crate::transcript::AppendOutcome::Duplicate)),
//! never an error.

use crate::commands::CommandKind;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by window selection, storage adapters, generation, and
/// command dispatch.
#[derive(Error, Debug)]
pub enum ParleyError {
    /// The persona preamble alone does not fit the token budget. This is a
    /// configuration fault, fatal to the invocation.
    #[error(
        "persona preamble needs {system_tokens} tokens but the budget is {budget} ({overflow} over)"
    )]
    BudgetExceeded {
        budget: usize,
        system_tokens: usize,
        overflow: usize,
    },

    /// The budget leaves no room for a single conversation message after the
    /// persona preamble.
    #[error(
        "no room for conversation context: budget is {budget} tokens and the persona preamble uses {system_tokens}"
    )]
    NoRoomForContext { budget: usize, system_tokens: usize },

    /// The generation provider rejected or failed the request. The message is
    /// the provider's, unmodified.
    #[error("{0}")]
    Generation(String),

    /// The generation call did not complete within the caller's timeout.
    #[error("generation timed out after {}s", .0.as_secs_f64())]
    GenerationTimeout(Duration),

    /// A command handler failed.
    #[error("{kind} command failed: {message}")]
    Command { kind: CommandKind, message: String },

    /// A storage adapter failed.
    #[error("storage error: {0}")]
    Store(String),

    /// The token encoder could not be loaded.
    #[error("tokenizer error: {0}")]
    Tokenizer(String),
}

impl ParleyError {
    /// Creates a `Command` error for the given kind.
    pub fn command(kind: CommandKind, message: impl Into<String>) -> Self {
        Self::Command {
            kind,
            message: message.into(),
        }
    }

    /// Creates a `Store` error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    /// Whether this error is a budget misconfiguration rather than a runtime
    /// failure.
    pub fn is_budget_fault(&self) -> bool {
        matches!(
            self,
            Self::BudgetExceeded { .. } | Self::NoRoomForContext { .. }
        )
    }
}

impl From<std::io::Error> for ParleyError {
    fn from(err: std::io::Error) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<serde_json::Error> for ParleyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Store(format!("serialization failed: {err}"))
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ParleyError>;
