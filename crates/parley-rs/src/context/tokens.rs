//! Token estimation for budget sizing.
//!
//! Estimates only need to be deterministic and consistent with the encoder
//! the generation side uses for its own limit; they are never exact. Both
//! estimators here are pure: the same text always costs the same.

use crate::error::{ParleyError, Result};
use tiktoken_rs::CoreBPE;

/// Default characters per token for [`CharRatioEstimator`] (conservative
/// estimate for English text).
pub const DEFAULT_CHARS_PER_TOKEN: f64 = 3.5;

/// Maps message text to an estimated token cost.
pub trait TokenEstimator: Send + Sync {
    /// Estimated token count of `text`. Never fails.
    fn estimate(&self, text: &str) -> usize;
}

/// BPE token counter backed by `tiktoken-rs`.
///
/// Loading an encoding builds its rank table, which is not free; build one
/// estimator and share it behind an `Arc`.
pub struct BpeEstimator {
    bpe: CoreBPE,
    encoding: &'static str,
}

impl BpeEstimator {
    /// The `p50k_base` encoding. Budgets in this crate are calibrated
    /// against it.
    pub fn p50k() -> Result<Self> {
        let bpe = tiktoken_rs::p50k_base().map_err(|e| ParleyError::Tokenizer(e.to_string()))?;
        Ok(Self {
            bpe,
            encoding: "p50k_base",
        })
    }

    /// The `cl100k_base` encoding used by GPT-3.5/GPT-4 chat models.
    pub fn cl100k() -> Result<Self> {
        let bpe =
            tiktoken_rs::cl100k_base().map_err(|e| ParleyError::Tokenizer(e.to_string()))?;
        Ok(Self {
            bpe,
            encoding: "cl100k_base",
        })
    }

    /// Name of the loaded encoding.
    pub fn encoding(&self) -> &'static str {
        self.encoding
    }
}

impl std::fmt::Debug for BpeEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BpeEstimator")
            .field("encoding", &self.encoding)
            .finish()
    }
}

impl TokenEstimator for BpeEstimator {
    fn estimate(&self, text: &str) -> usize {
        // Special-token markers in user text are counted as plain text.
        self.bpe.encode_ordinary(text).len()
    }
}

/// Character-ratio approximation: `ceil(chars / chars_per_token)`.
///
/// Rounds up so that any non-empty text costs at least one token.
#[derive(Debug, Clone, Copy)]
pub struct CharRatioEstimator {
    chars_per_token: f64,
}

impl CharRatioEstimator {
    /// Create an estimator with a calibrated ratio. Non-positive ratios fall
    /// back to [`DEFAULT_CHARS_PER_TOKEN`].
    pub fn new(chars_per_token: f64) -> Self {
        let chars_per_token = if chars_per_token > 0.0 {
            chars_per_token
        } else {
            DEFAULT_CHARS_PER_TOKEN
        };
        Self { chars_per_token }
    }
}

impl Default for CharRatioEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_CHARS_PER_TOKEN)
    }
}

impl TokenEstimator for CharRatioEstimator {
    fn estimate(&self, text: &str) -> usize {
        let chars = text.chars().count();
        (chars as f64 / self.chars_per_token).ceil() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_ratio_rounds_up() {
        let est = CharRatioEstimator::new(4.0);
        assert_eq!(est.estimate(""), 0);
        assert_eq!(est.estimate("a"), 1);
        assert_eq!(est.estimate("abcd"), 1);
        assert_eq!(est.estimate("abcde"), 2);
    }

    #[test]
    fn char_ratio_counts_chars_not_bytes() {
        let est = CharRatioEstimator::new(1.0);
        assert_eq!(est.estimate("héllo"), 5);
    }

    #[test]
    fn char_ratio_rejects_non_positive_ratio() {
        let est = CharRatioEstimator::new(0.0);
        assert_eq!(est.estimate(&"x".repeat(7)), 2);
    }

    #[test]
    fn bpe_is_deterministic() {
        let est = BpeEstimator::p50k().unwrap();
        let text = "Your name is Buddy. Your personality is cheerful.";
        let first = est.estimate(text);
        assert!(first > 0);
        assert_eq!(first, est.estimate(text));
        assert_eq!(est.estimate(""), 0);
    }

    #[test]
    fn bpe_grows_with_text() {
        let est = BpeEstimator::p50k().unwrap();
        let short = est.estimate("hello there");
        let long = est.estimate(&"hello there ".repeat(20));
        assert!(long > short);
    }

    #[test]
    fn bpe_reports_encoding() {
        assert_eq!(BpeEstimator::p50k().unwrap().encoding(), "p50k_base");
        assert_eq!(BpeEstimator::cl100k().unwrap().encoding(), "cl100k_base");
    }
}
