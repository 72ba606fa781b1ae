//! Context window management: token estimation, budgets, and selection.
//!
//! The generation endpoint has a hard ceiling on total tokens: the model's
//! context window minus the tokens reserved for the reply. This module keeps
//! every submission under that ceiling:
//!
//! 1. **[`tokens`]**: [`TokenEstimator`] maps text to a token cost. The
//!    default [`BpeEstimator`] uses the same BPE encoding family as the
//!    generation model; [`CharRatioEstimator`] is a cheap deterministic
//!    approximation for tests and offline use.
//!
//! 2. **[`budget`]**: [`TokenBudget`] derives the per-call budget from a
//!    model's context window and the reserved output tokens.
//!
//! 3. **[`window`]**: [`select_window`] keeps the persona preamble, then
//!    walks the conversation backwards and keeps the longest suffix that fits.

pub mod budget;
pub mod tokens;
pub mod window;

// Re-export commonly used items at the module level.
pub use budget::{TokenBudget, context_window_for_model};
pub use tokens::{BpeEstimator, CharRatioEstimator, DEFAULT_CHARS_PER_TOKEN, TokenEstimator};
pub use window::{WindowSelection, select_window};
