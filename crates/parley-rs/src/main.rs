//! Talk to a parley bot from the terminal.
//!
//! Reads the API key from the `OPENROUTER_KEY` environment variable.
//! Transcripts and lists are kept under `--data-dir`.
//!
//! # Examples
//!
//! ```sh
//! # One message, printed reply
//! parley --name Buddy --personality "warm and curious" --message "hi there"
//!
//! # Replay a webhook delivery; a second run with the same id is discarded
//! parley --session chat-42 --message "hi" --message-id 1
//!
//! # Interactive: one message per line on stdin
//! parley --gpt4 --session sketchbook
//! ```

use clap::Parser;
use parley_rs::bot::{Bot, InboundMessage, Outcome};
use parley_rs::config::{BotConfig, Persona};
use parley_rs::context::BpeEstimator;
use parley_rs::generation::{OpenRouterClient, OpenRouterGenerator};
use parley_rs::lists::JsonFileListStore;
use parley_rs::transcript::FileTranscriptStore;
use parley_rs::{ParleyError, Result};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Chat with a persona-driven bot that keeps per-session transcripts and
/// named lists.
///
/// Reads the API key from the OPENROUTER_KEY environment variable.
#[derive(Parser)]
#[command(name = "parley")]
struct Cli {
    // ── Persona ────────────────────────────────────────────────
    /// The bot's name
    #[arg(long, default_value = "Parley")]
    name: String,

    /// The bot's personality, in a few words
    #[arg(long, default_value = "friendly and helpful")]
    personality: String,

    // ── Model ──────────────────────────────────────────────────
    /// Use the GPT-4 class model (larger context window)
    #[arg(long)]
    gpt4: bool,

    /// Explicit model id; overrides --gpt4
    #[arg(long)]
    model: Option<String>,

    /// Tokens reserved for the reply
    #[arg(long, default_value_t = parley_rs::config::DEFAULT_MAX_TOKENS)]
    max_tokens: u32,

    /// Sampling temperature
    #[arg(long, default_value_t = parley_rs::config::DEFAULT_TEMPERATURE)]
    temperature: f32,

    /// Generation timeout in seconds (0 disables it)
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,

    // ── Storage ────────────────────────────────────────────────
    /// Directory for transcripts and lists
    #[arg(long, default_value = ".parley")]
    data_dir: PathBuf,

    /// Session (conversation) key
    #[arg(long, default_value = "default")]
    session: String,

    // ── Input ──────────────────────────────────────────────────
    /// Send a single message and exit
    #[arg(long)]
    message: Option<String>,

    /// External id of --message, for deduplication
    #[arg(long, requires = "message")]
    message_id: Option<String>,

    /// Log at debug level
    #[arg(long, short)]
    verbose: bool,
}

impl Cli {
    fn config(&self) -> BotConfig {
        let mut config = BotConfig::default().with_persona(Persona::new(
            self.name.clone(),
            self.personality.clone(),
        ));
        if self.gpt4 {
            config = config.with_gpt4();
        }
        if let Some(model) = &self.model {
            config = config.with_model(model.clone());
        }
        let timeout = (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs));
        config
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature)
            .with_generation_timeout(timeout)
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(level)
        .init();
}

fn build_bot(cli: &Cli) -> Result<Bot> {
    let api_key = std::env::var("OPENROUTER_KEY")
        .map_err(|_| ParleyError::Generation("OPENROUTER_KEY not set".to_string()))?;

    let config = cli.config();
    let client = OpenRouterClient::new(api_key)?;
    let generator = OpenRouterGenerator::from_config(client, &config);
    let transcripts = FileTranscriptStore::new(cli.data_dir.join("transcripts"))?;
    let lists = JsonFileListStore::new(cli.data_dir.join("lists.json"))?;
    let estimator = BpeEstimator::p50k()?;

    info!(
        "Using {} (budget {} tokens, {} encoding), data in {}",
        config.model,
        config.token_budget().tokens(),
        estimator.encoding(),
        cli.data_dir.display()
    );

    Ok(Bot::new(
        config,
        Arc::new(transcripts),
        Arc::new(lists),
        Arc::new(generator),
        Arc::new(estimator),
    ))
}

fn print_outcome(outcome: &Outcome) {
    match outcome.reply_text() {
        Some(text) => println!("{text}"),
        None => eprintln!("  (duplicate message, ignored)"),
    }
}

/// Ids for interactive lines, unique across runs.
fn line_id(started: u64, n: usize) -> String {
    format!("{started}-{n}")
}

async fn run(cli: Cli) -> Result<()> {
    let bot = build_bot(&cli)?;

    if let Some(text) = &cli.message {
        let mut inbound = InboundMessage::new(cli.session.clone(), text.clone());
        if let Some(id) = &cli.message_id {
            inbound = inbound.with_external_id(id.clone());
        }
        let outcome = bot.handle(&inbound).await;
        print_outcome(&outcome);
        return match outcome {
            Outcome::Failed { error, .. } => Err(error),
            _ => Ok(()),
        };
    }

    let started = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs());
    let stdin = io::stdin();
    let mut n = 0;
    loop {
        eprint!("> ");
        io::stderr().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        n += 1;
        let inbound =
            InboundMessage::new(cli.session.clone(), text).with_external_id(line_id(started, n));
        print_outcome(&bot.handle(&inbound).await);
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
