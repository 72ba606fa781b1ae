//! Context window selection.
//!
//! Given a token budget and a transcript, choose which messages to submit:
//!
//! 1. Every `system` message is kept (the persona preamble is never evicted).
//!    If the preamble alone exceeds the budget, selection fails with
//!    [`ParleyError::BudgetExceeded`].
//! 2. Non-system messages are walked newest to oldest. A message is kept
//!    while `running_total + cost < budget`; the first message that does not
//!    fit stops the walk. Older messages are never considered past that
//!    point, so the kept conversation is always a contiguous recent suffix.
//! 3. If no conversation message fits, selection fails with
//!    [`ParleyError::NoRoomForContext`].
//!
//! The strict `<` leaves a one-token margin against counting differences.

use crate::Role;
use crate::context::tokens::TokenEstimator;
use crate::error::{ParleyError, Result};
use crate::transcript::Message;
use tracing::{debug, trace};

/// Result of a successful window selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSelection {
    /// Positions of the selected messages, in transcript order.
    pub positions: Vec<usize>,
    /// Estimated tokens of all system messages.
    pub system_tokens: usize,
    /// Estimated tokens of everything selected (system + conversation).
    pub total_tokens: usize,
    /// Number of non-system messages kept.
    pub conversation_count: usize,
}

impl WindowSelection {
    /// Pick the selected messages out of the transcript they were chosen
    /// from, preserving order.
    pub fn messages<'a>(&self, transcript: &'a [Message]) -> Vec<&'a Message> {
        transcript
            .iter()
            .filter(|m| self.positions.binary_search(&m.position).is_ok())
            .collect()
    }
}

/// Select the persona preamble plus the longest recent suffix of the
/// conversation that fits strictly under `budget` tokens.
///
/// `transcript` must be in insertion order. Returned positions are sorted
/// ascending.
pub fn select_window(
    budget: usize,
    transcript: &[Message],
    estimator: &dyn TokenEstimator,
) -> Result<WindowSelection> {
    let mut positions = Vec::new();
    let mut system_tokens = 0;

    for msg in transcript.iter().filter(|m| m.role == Role::System) {
        system_tokens += estimator.estimate(&msg.text);
        positions.push(msg.position);
    }

    if system_tokens > budget {
        return Err(ParleyError::BudgetExceeded {
            budget,
            system_tokens,
            overflow: system_tokens - budget,
        });
    }

    let mut total = system_tokens;
    let mut conversation_count = 0;

    for msg in transcript.iter().rev().filter(|m| m.role != Role::System) {
        let cost = estimator.estimate(&msg.text);
        if total + cost >= budget {
            trace!(
                "Stopping at position {} ({} tokens, {} already used of {})",
                msg.position, cost, total, budget
            );
            break;
        }
        total += cost;
        conversation_count += 1;
        positions.push(msg.position);
        trace!("Keeping position {} ({} tokens)", msg.position, cost);
    }

    if conversation_count == 0 {
        return Err(ParleyError::NoRoomForContext {
            budget,
            system_tokens,
        });
    }

    positions.sort_unstable();
    debug!(
        "Selected {} message(s), {} conversation, ~{} tokens of {}: positions {:?}",
        positions.len(),
        conversation_count,
        total,
        budget,
        positions
    );

    Ok(WindowSelection {
        positions,
        system_tokens,
        total_tokens: total,
        conversation_count,
    })
}
