//! Persona and bot configuration.

use crate::context::budget::{GPT4_CONTEXT_WINDOW, TokenBudget, context_window_for_model};
use std::time::Duration;

/// Default chat model.
pub const DEFAULT_MODEL: &str = "openai/gpt-3.5-turbo";

/// Model selected by [`BotConfig::with_gpt4`].
pub const GPT4_MODEL: &str = "openai/gpt-4";

/// Tokens reserved for the model's reply.
pub const DEFAULT_MAX_TOKENS: u32 = 256;

pub const DEFAULT_TEMPERATURE: f32 = 0.8;

pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Who the bot is. Rendered into the persona preamble that opens every
/// transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    pub name: String,
    pub personality: String,
    /// Additional system messages seeded after the identity line.
    pub extra: Vec<String>,
}

impl Persona {
    pub fn new(name: impl Into<String>, personality: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            personality: personality.into(),
            extra: Vec::new(),
        }
    }

    /// Append another system message to the preamble.
    pub fn with_extra(mut self, text: impl Into<String>) -> Self {
        self.extra.push(text.into());
        self
    }

    /// The identity line.
    pub fn system_prompt(&self) -> String {
        format!(
            "Your name is {}. Your personality is {}.",
            self.name, self.personality
        )
    }

    /// All system messages a new session is seeded with, in order.
    pub fn preamble(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(1 + self.extra.len());
        lines.push(self.system_prompt());
        lines.extend(self.extra.iter().cloned());
        lines
    }
}

impl Default for Persona {
    fn default() -> Self {
        Self::new("Parley", "friendly and helpful")
    }
}

/// Configuration for a [`Bot`](crate::bot::Bot).
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub persona: Persona,
    pub model: String,
    /// Context window used for budgeting, in tokens.
    pub context_window: usize,
    /// Output tokens requested from the model, reserved out of the window.
    pub max_tokens: u32,
    pub temperature: f32,
    /// Deadline for a single generation call. `None` waits indefinitely.
    pub generation_timeout: Option<Duration>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            persona: Persona::default(),
            model: DEFAULT_MODEL.to_string(),
            context_window: context_window_for_model(DEFAULT_MODEL),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            generation_timeout: Some(DEFAULT_GENERATION_TIMEOUT),
        }
    }
}

impl BotConfig {
    pub fn new(name: impl Into<String>, personality: impl Into<String>) -> Self {
        Self {
            persona: Persona::new(name, personality),
            ..Default::default()
        }
    }

    pub fn with_persona(mut self, persona: Persona) -> Self {
        self.persona = persona;
        self
    }

    /// Set the model. The context window follows the model's profile.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self.context_window = context_window_for_model(&self.model);
        self
    }

    /// Use the GPT-4 class model and its larger window.
    pub fn with_gpt4(mut self) -> Self {
        self.model = GPT4_MODEL.to_string();
        self.context_window = GPT4_CONTEXT_WINDOW;
        self
    }

    /// Override the budgeting context window.
    pub fn with_context_window(mut self, tokens: usize) -> Self {
        self.context_window = tokens;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_generation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.generation_timeout = timeout;
        self
    }

    /// Window minus reserved output tokens.
    pub fn token_budget(&self) -> TokenBudget {
        TokenBudget::new(self.context_window).with_output_reserve(self.max_tokens as usize)
    }
}
