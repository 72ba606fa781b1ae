//! Token budget derivation.
//!
//! The budget handed to [`select_window`](super::select_window) is the
//! model's context window minus the tokens reserved for the model's reply.
//! It is computed per invocation and never stored.

/// Context window used for GPT-4 class models. Slightly under the nominal
/// 8192 to absorb differences between our estimate and the provider's count.
pub const GPT4_CONTEXT_WINDOW: usize = 7800;

/// Context window used for GPT-3.5 class models.
pub const GPT35_CONTEXT_WINDOW: usize = 4097;

/// Context window assumed for models without a known profile.
pub const DEFAULT_CONTEXT_WINDOW: usize = GPT35_CONTEXT_WINDOW;

/// Look up the budgeting context window for a model id.
///
/// Matches on the model family anywhere in the id, so both `gpt-4` and
/// `openai/gpt-4` resolve.
pub fn context_window_for_model(model: &str) -> usize {
    let lower = model.to_lowercase();
    if lower.contains("gpt-4") {
        GPT4_CONTEXT_WINDOW
    } else if lower.contains("gpt-3.5") {
        GPT35_CONTEXT_WINDOW
    } else {
        DEFAULT_CONTEXT_WINDOW
    }
}

/// Context window minus reserved output tokens.
///
/// # Example
///
/// ```
/// use parley_rs::context::TokenBudget;
///
/// let budget = TokenBudget::for_model("openai/gpt-4").with_output_reserve(256);
/// assert_eq!(budget.tokens(), 7800 - 256);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBudget {
    context_window: usize,
    output_reserve: usize,
}

impl TokenBudget {
    /// A budget over an explicit context window with no output reserve.
    pub fn new(context_window: usize) -> Self {
        Self {
            context_window,
            output_reserve: 0,
        }
    }

    /// A budget over the profiled context window for `model`.
    pub fn for_model(model: &str) -> Self {
        Self::new(context_window_for_model(model))
    }

    /// Reserve tokens for the model's reply (the request's `max_tokens`).
    pub fn with_output_reserve(mut self, tokens: usize) -> Self {
        self.output_reserve = tokens;
        self
    }

    /// The context window in tokens.
    pub fn context_window(&self) -> usize {
        self.context_window
    }

    /// Tokens available for the submitted conversation. Saturates at zero.
    pub fn tokens(&self) -> usize {
        self.context_window.saturating_sub(self.output_reserve)
    }

    /// Format the budget against a used token count as a short log string.
    pub fn to_log_string(&self, used: usize) -> String {
        let available = self.tokens();
        let pct = if available > 0 {
            used as f64 / available as f64 * 100.0
        } else {
            100.0
        };
        format!(
            "context: ~{used} tokens ({pct:.0}% of {available}, window {}, reserve {})",
            self.context_window, self.output_reserve,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_model_windows() {
        assert_eq!(context_window_for_model("gpt-4"), 7800);
        assert_eq!(context_window_for_model("openai/GPT-4"), 7800);
        assert_eq!(context_window_for_model("openai/gpt-3.5-turbo"), 4097);
        assert_eq!(context_window_for_model("some/other-model"), 4097);
    }

    #[test]
    fn output_reserve_is_subtracted() {
        let budget = TokenBudget::for_model("gpt-3.5-turbo").with_output_reserve(256);
        assert_eq!(budget.context_window(), 4097);
        assert_eq!(budget.tokens(), 4097 - 256);
    }

    #[test]
    fn budget_saturates_at_zero() {
        let budget = TokenBudget::new(100).with_output_reserve(500);
        assert_eq!(budget.tokens(), 0);
        assert!(budget.to_log_string(10).contains("100%"));
    }

    #[test]
    fn log_string_format() {
        let budget = TokenBudget::new(1000);
        let log = budget.to_log_string(250);
        assert!(log.contains("~250 tokens"));
        assert!(log.contains("25%"));
    }
}
