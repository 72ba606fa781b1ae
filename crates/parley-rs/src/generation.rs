//! The generation capability and its OpenRouter-backed implementation.
//!
//! The core treats generation as opaque: it hands over either an ordered
//! conversation or a single freestanding prompt and gets text back. Provider
//! errors (moderation rejections, rate limits) come back as
//! [`ParleyError::Generation`] carrying the provider's message unmodified.
//! Nothing here retries.

use crate::ChatMessage;
use crate::config::BotConfig;
use crate::error::{ParleyError, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

// ── Constants ──────────────────────────────────────────────────────

pub const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Timeout on the HTTP client itself. Callers normally apply a tighter one
/// through [`generate_with_timeout`].
const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

// ── Capability ─────────────────────────────────────────────────────

/// Boxed future returned by [`Generator::generate`].
pub type GenerationFuture<'a> = Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;

/// What to generate from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GenerationInput {
    /// An ordered conversation, submitted as-is.
    Conversation(Vec<ChatMessage>),
    /// A single prompt with no transcript attached.
    Prompt(String),
}

impl GenerationInput {
    /// The input as wire messages. A prompt becomes one user message.
    pub fn into_messages(self) -> Vec<ChatMessage> {
        match self {
            GenerationInput::Conversation(messages) => messages,
            GenerationInput::Prompt(prompt) => vec![ChatMessage::user(prompt)],
        }
    }
}

/// Text generation capability.
///
/// ```ignore
/// struct Echo;
///
/// impl Generator for Echo {
///     fn generate(&self, input: GenerationInput) -> GenerationFuture<'_> {
///         Box::pin(async move {
///             let last = input.into_messages().pop().map(|m| m.content);
///             Ok(last.unwrap_or_default())
///         })
///     }
/// }
/// ```
pub trait Generator: Send + Sync {
    fn generate(&self, input: GenerationInput) -> GenerationFuture<'_>;
}

/// Run `generator` with an optional deadline.
///
/// On expiry the in-flight request is dropped and
/// [`ParleyError::GenerationTimeout`] is returned.
pub async fn generate_with_timeout(
    generator: &dyn Generator,
    input: GenerationInput,
    timeout: Option<Duration>,
) -> Result<String> {
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, generator.generate(input)).await {
            Ok(result) => result,
            Err(_) => Err(ParleyError::GenerationTimeout(limit)),
        },
        None => generator.generate(input).await,
    }
}

// ── Wire types ─────────────────────────────────────────────────────

/// Chat completions request body.
#[derive(Serialize, Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Deserialize, Debug)]
struct RawChatResponse {
    choices: Option<Vec<RawChoice>>,
    usage: Option<UsageInfo>,
    error: Option<ApiErrorResponse>,
}

#[derive(Deserialize, Debug)]
struct RawChoice {
    message: RawMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RawMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    message: String,
}

/// Clean return type from [`OpenRouterClient::chat`].
#[derive(Debug)]
pub struct ChatCompletion {
    pub content: Option<String>,
    pub usage: Option<UsageInfo>,
    pub finish_reason: Option<String>,
}

/// Token usage statistics.
#[derive(Deserialize, Debug, Clone)]
pub struct UsageInfo {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

// ── Client ─────────────────────────────────────────────────────────

/// Async HTTP client for the OpenRouter chat completions API.
pub struct OpenRouterClient {
    client: reqwest::Client,
    api_key: String,
    referer: String,
    title: String,
    url: String,
}

impl OpenRouterClient {
    /// Create a new client with the given API key and default headers.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_headers(api_key, "https://github.com/parley-rs", "parley-rs")
    }

    /// Create a new client with custom Referer and X-Title headers.
    pub fn with_headers(
        api_key: impl Into<String>,
        referer: impl Into<String>,
        title: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("parley-rs/0.1")
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| ParleyError::Generation(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            referer: referer.into(),
            title: title.into(),
            url: OPENROUTER_URL.to_string(),
        })
    }

    /// Point the client at another OpenAI-compatible endpoint.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Send a chat completion request.
    pub async fn chat(&self, body: &ChatRequest) -> Result<ChatCompletion> {
        debug!(
            "LLM request: model={}, messages={}, max_tokens={}, temp={}",
            body.model,
            body.messages.len(),
            body.max_tokens,
            body.temperature,
        );
        trace!(
            "Request payload size: {} bytes",
            serde_json::to_string(body).map_or(0, |s| s.len())
        );

        let start = Instant::now();

        let resp = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(body)
            .send()
            .await
            .map_err(|e| ParleyError::Generation(format!("request failed: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ParleyError::Generation(format!("failed to read response: {e}")))?;

        debug!(
            "LLM response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        parse_completion(status.is_success(), status.as_u16(), &text)
    }
}

/// Decode a response body. Provider error messages are passed through
/// untouched.
fn parse_completion(success: bool, status: u16, text: &str) -> Result<ChatCompletion> {
    let parsed = serde_json::from_str::<RawChatResponse>(text);

    if !success {
        return Err(match parsed {
            Ok(RawChatResponse {
                error: Some(err), ..
            }) => ParleyError::Generation(err.message),
            _ => ParleyError::Generation(format!("HTTP {status}: {text}")),
        });
    }

    let parsed = parsed
        .map_err(|e| ParleyError::Generation(format!("failed to parse response: {e}")))?;

    if let Some(err) = parsed.error {
        return Err(ParleyError::Generation(err.message));
    }

    if let Some(ref usage) = parsed.usage {
        debug!(
            "Token usage: prompt={}, completion={}, total={}",
            usage.prompt_tokens.unwrap_or(0),
            usage.completion_tokens.unwrap_or(0),
            usage.total_tokens.unwrap_or(0),
        );
    }

    let choice = parsed.choices.and_then(|c| c.into_iter().next());
    Ok(match choice {
        Some(c) => ChatCompletion {
            content: c.message.content,
            usage: parsed.usage,
            finish_reason: c.finish_reason,
        },
        None => ChatCompletion {
            content: None,
            usage: parsed.usage,
            finish_reason: None,
        },
    })
}

// ── Generator over OpenRouter ──────────────────────────────────────

/// [`Generator`] that submits to OpenRouter with fixed sampling settings.
pub struct OpenRouterGenerator {
    client: OpenRouterClient,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenRouterGenerator {
    pub fn new(client: OpenRouterClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            max_tokens: crate::config::DEFAULT_MAX_TOKENS,
            temperature: crate::config::DEFAULT_TEMPERATURE,
        }
    }

    /// Take model and sampling settings from a bot configuration.
    pub fn from_config(client: OpenRouterClient, config: &BotConfig) -> Self {
        Self {
            client,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Generator for OpenRouterGenerator {
    fn generate(&self, input: GenerationInput) -> GenerationFuture<'_> {
        Box::pin(async move {
            let body = ChatRequest {
                model: self.model.clone(),
                messages: input.into_messages(),
                max_tokens: self.max_tokens,
                temperature: self.temperature,
            };
            let completion = self.client.chat(&body).await?;
            match completion.content {
                Some(text) if !text.trim().is_empty() => Ok(text),
                _ => Err(ParleyError::Generation(format!(
                    "empty completion (finish_reason: {})",
                    completion.finish_reason.as_deref().unwrap_or("none")
                ))),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Slow;

    impl Generator for Slow {
        fn generate(&self, _input: GenerationInput) -> GenerationFuture<'_> {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok("late".to_string())
            })
        }
    }

    struct Fixed(&'static str);

    impl Generator for Fixed {
        fn generate(&self, _input: GenerationInput) -> GenerationFuture<'_> {
            let text = self.0.to_string();
            Box::pin(async move { Ok(text) })
        }
    }

    #[test]
    fn prompt_becomes_single_user_message() {
        let msgs = GenerationInput::Prompt("paint a cat".into()).into_messages();
        assert_eq!(msgs, vec![ChatMessage::user("paint a cat")]);
    }

    #[test]
    fn request_serializes_chat_shape() {
        let body = ChatRequest {
            model: "openai/gpt-4".into(),
            messages: vec![ChatMessage::system("p"), ChatMessage::user("hi")],
            max_tokens: 256,
            temperature: 0.8,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "openai/gpt-4");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert_eq!(json["max_tokens"], 256);
    }

    #[test]
    fn parses_successful_completion() {
        let body = r#"{"choices":[{"message":{"content":"Hello!"},"finish_reason":"stop"}],
                       "usage":{"prompt_tokens":10,"completion_tokens":2,"total_tokens":12}}"#;
        let completion = parse_completion(true, 200, body).unwrap();
        assert_eq!(completion.content.as_deref(), Some("Hello!"));
        assert_eq!(completion.finish_reason.as_deref(), Some("stop"));
        assert_eq!(completion.usage.unwrap().total_tokens, Some(12));
    }

    #[test]
    fn provider_error_message_is_verbatim() {
        let body = r#"{"error":{"message":"Your request was flagged by moderation","code":403}}"#;
        let err = parse_completion(false, 403, body).unwrap_err();
        assert_eq!(err.to_string(), "Your request was flagged by moderation");

        // Some providers return errors with a 200 status.
        let err = parse_completion(true, 200, body).unwrap_err();
        assert_eq!(err.to_string(), "Your request was flagged by moderation");
    }

    #[test]
    fn non_json_error_body_keeps_status() {
        let err = parse_completion(false, 429, "rate limited").unwrap_err();
        assert_eq!(err.to_string(), "HTTP 429: rate limited");
    }

    #[tokio::test]
    async fn timeout_maps_to_generation_timeout() {
        let err = generate_with_timeout(
            &Slow,
            GenerationInput::Prompt("x".into()),
            Some(Duration::from_millis(20)),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ParleyError::GenerationTimeout(d) if d == Duration::from_millis(20)));
    }

    #[tokio::test]
    async fn no_timeout_passes_result_through() {
        let text = generate_with_timeout(&Fixed("ok"), GenerationInput::Prompt("x".into()), None)
            .await
            .unwrap();
        assert_eq!(text, "ok");
    }
}
