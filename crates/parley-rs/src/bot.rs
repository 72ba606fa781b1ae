//! The per-message pipeline.
//!
//! ```text
//! inbound ──► command? ──yes──► router reply (transcript untouched)
//!                │ no
//!                ▼
//!         seen external id? ──yes──► Discarded (no reply)
//!                │ no
//!                ▼
//!          append user message
//!                ▼
//!          select window under budget
//!                ▼
//!          generate (with timeout) ──err──► apology (user message stays)
//!                ▼
//!          append assistant reply
//! ```

use crate::ChatMessage;
use crate::commands::CommandRouter;
use crate::config::BotConfig;
use crate::context::{TokenEstimator, WindowSelection, select_window};
use crate::error::{ParleyError, Result};
use crate::generation::{GenerationInput, Generator, generate_with_timeout};
use crate::lists::ListStore;
use crate::transcript::{AppendOutcome, NewMessage, TranscriptStore};
use rand::rngs::StdRng;
use std::sync::Arc;
use tracing::{debug, debug_span, error, info, warn};

/// Session used by the chat widget when none is supplied.
pub const DEFAULT_SESSION: &str = "default";

/// One inbound message from a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub session_id: String,
    pub text: String,
    /// The platform's message id, used for deduplication.
    pub external_id: Option<String>,
}

impl InboundMessage {
    pub fn new(session_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            text: text.into(),
            external_id: None,
        }
    }

    pub fn with_external_id(mut self, id: impl Into<String>) -> Self {
        self.external_id = Some(id.into());
        self
    }

    /// A question from the web chat widget. A missing or blank session falls
    /// back to [`DEFAULT_SESSION`]. Widget messages carry no external id, so
    /// they are never deduplicated.
    pub fn from_chat_widget(question: impl Into<String>, session: Option<&str>) -> Self {
        let session_id = session
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SESSION);
        Self::new(session_id, question)
    }
}

/// What happened to an inbound message.
#[derive(Debug)]
pub enum Outcome {
    /// The text was a command; this is the router's reply.
    Command(String),
    /// Already processed. No reply should be sent.
    Discarded,
    /// The model answered and the answer was recorded.
    Responded {
        text: String,
        selection: WindowSelection,
    },
    /// The pipeline failed after intake. The user message is recorded;
    /// `apology` is what to send back.
    Failed { apology: String, error: ParleyError },
}

impl Outcome {
    /// The text to send back, if any.
    pub fn reply_text(&self) -> Option<&str> {
        match self {
            Outcome::Command(text) => Some(text.as_str()),
            Outcome::Discarded => None,
            Outcome::Responded { text, .. } => Some(text.as_str()),
            Outcome::Failed { apology, .. } => Some(apology.as_str()),
        }
    }

    pub fn is_discarded(&self) -> bool {
        matches!(self, Outcome::Discarded)
    }
}

/// Wires the command router, transcript intake, window selection, and
/// generation together.
pub struct Bot {
    config: BotConfig,
    transcripts: Arc<dyn TranscriptStore>,
    generator: Arc<dyn Generator>,
    estimator: Arc<dyn TokenEstimator>,
    router: CommandRouter,
}

impl Bot {
    pub fn new(
        config: BotConfig,
        transcripts: Arc<dyn TranscriptStore>,
        lists: Arc<dyn ListStore>,
        generator: Arc<dyn Generator>,
        estimator: Arc<dyn TokenEstimator>,
    ) -> Self {
        let router = CommandRouter::new(lists, generator.clone())
            .with_generation_timeout(config.generation_timeout);
        Self {
            config,
            transcripts,
            generator,
            estimator,
            router,
        }
    }

    /// Seed the command router's random source.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.router = self.router.with_rng(rng);
        self
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// Process one inbound message. Never fails: errors become
    /// [`Outcome::Failed`] with a user-facing apology.
    pub async fn handle(&self, inbound: &InboundMessage) -> Outcome {
        if let Some(reply) = self.router.try_handle(&inbound.text).await {
            return Outcome::Command(reply);
        }

        match self.chat(inbound).await {
            Ok(outcome) => outcome,
            Err(e) => {
                if e.is_budget_fault() {
                    error!(session = %inbound.session_id, "Budget misconfigured: {e}");
                } else {
                    error!(session = %inbound.session_id, "Response failed: {e}");
                }
                Outcome::Failed {
                    apology: format!(
                        "Sorry, I encountered an error while trying to think of a response: {e}"
                    ),
                    error: e,
                }
            }
        }
    }

    async fn chat(&self, inbound: &InboundMessage) -> Result<Outcome> {
        let session = inbound.session_id.as_str();
        let external_id = inbound.external_id.as_deref().filter(|id| !id.is_empty());

        if !self.transcripts.exists(session)? {
            self.transcripts
                .get_or_create(session, &self.config.persona.preamble())?;
        }
        if let Some(id) = external_id
            && self.transcripts.contains_external_id(session, id)?
        {
            warn!(session = %session, external_id = %id, "Discarding duplicate message");
            return Ok(Outcome::Discarded);
        }

        let entry = NewMessage::user(inbound.text.clone(), external_id.map(str::to_string));
        let appended = match self.transcripts.append(session, entry)? {
            AppendOutcome::Appended(msg) => msg,
            AppendOutcome::Duplicate => {
                warn!(session = %session, external_id = ?external_id, "Discarding duplicate message (concurrent delivery)");
                return Ok(Outcome::Discarded);
            }
        };
        info!(session = %session, position = appended.position, "Appended user message");

        let messages = self.transcripts.list(session)?;
        let budget = self.config.token_budget();
        let selection = {
            let _span = debug_span!("select_window", session = %session).entered();
            let selection = select_window(budget.tokens(), &messages, self.estimator.as_ref())?;
            debug!("{}", budget.to_log_string(selection.total_tokens));
            selection
        };

        let conversation: Vec<ChatMessage> = selection
            .messages(&messages)
            .into_iter()
            .map(ChatMessage::from)
            .collect();
        let text = generate_with_timeout(
            self.generator.as_ref(),
            GenerationInput::Conversation(conversation),
            self.config.generation_timeout,
        )
        .await?;

        if let AppendOutcome::Appended(reply) = self
            .transcripts
            .append(session, NewMessage::assistant(text.clone()))?
        {
            info!(session = %session, position = reply.position, "Appended response");
        }

        Ok(Outcome::Responded { text, selection })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_widget_defaults_session() {
        let msg = InboundMessage::from_chat_widget("hi", None);
        assert_eq!(msg.session_id, DEFAULT_SESSION);
        assert_eq!(msg.external_id, None);

        let msg = InboundMessage::from_chat_widget("hi", Some("  "));
        assert_eq!(msg.session_id, "default");

        let msg = InboundMessage::from_chat_widget("hi", Some("abc"));
        assert_eq!(msg.session_id, "abc");
    }

    #[test]
    fn reply_text_per_outcome() {
        assert_eq!(Outcome::Command("ok".into()).reply_text(), Some("ok"));
        assert_eq!(Outcome::Discarded.reply_text(), None);
        assert!(Outcome::Discarded.is_discarded());
        let failed = Outcome::Failed {
            apology: "sorry".into(),
            error: ParleyError::Generation("x".into()),
        };
        assert_eq!(failed.reply_text(), Some("sorry"));
    }
}
