//! Command dispatch over the list store.
//!
//! [`CommandRouter::try_handle`] is the boundary: a matched command always
//! produces a reply string. Handler failures are logged and turned into an
//! apology, never propagated to the caller.

use crate::commands::parse::{Command, CommandKind, parse_command};
use crate::error::{ParleyError, Result};
use crate::generation::{GenerationInput, Generator, generate_with_timeout};
use crate::lists::{ListStore, NamedList, normalize_name};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Usage text returned by `help`.
pub const HELP_TEXT: &str = "\
Here's what I can do besides chatting:
- add to list <name>: <item>, <item>, ...  add items to a list
- clear list <name>  remove a list (also: delete list, remove list)
- challenge me  pick one random item from every list
- magic challenge <verb>  turn a random pick into a creative prompt
- help  show this message";

/// Routes command text to its handler.
pub struct CommandRouter {
    lists: Arc<dyn ListStore>,
    generator: Arc<dyn Generator>,
    rng: Mutex<StdRng>,
    generation_timeout: Option<Duration>,
}

impl CommandRouter {
    pub fn new(lists: Arc<dyn ListStore>, generator: Arc<dyn Generator>) -> Self {
        Self {
            lists,
            generator,
            rng: Mutex::new(StdRng::from_os_rng()),
            generation_timeout: None,
        }
    }

    /// Replace the random source, e.g. with a seeded one for tests.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    /// Deadline for the `magic_challenge` generation call.
    pub fn with_generation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.generation_timeout = timeout;
        self
    }

    /// Handle `text` if it is a command.
    ///
    /// Returns `None` when no pattern matches; the caller should treat the
    /// text as chat. A matched command always yields a reply, even when the
    /// handler fails.
    pub async fn try_handle(&self, text: &str) -> Option<String> {
        let command = parse_command(text)?;
        let kind = command.kind;
        debug!("Matched {} command", kind);
        Some(match self.dispatch(command).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(command = %kind, "Command failed: {e}");
                apology(kind, &e)
            }
        })
    }

    /// Run a parsed command.
    pub async fn dispatch(&self, command: Command) -> Result<String> {
        match command.kind {
            CommandKind::Help => Ok(HELP_TEXT.to_string()),
            CommandKind::Add => self.add(command.arg1.as_deref(), command.arg2.as_deref()),
            CommandKind::Clear => self.clear(command.arg1.as_deref()),
            CommandKind::Challenge => self.challenge(),
            CommandKind::MagicChallenge => self.magic_challenge(command.arg1.as_deref()).await,
        }
    }

    /// Append comma-separated items to a list, creating it if needed.
    ///
    /// Items are trimmed and lowercased. Empty segments (`"red, , blue,"`)
    /// are dropped without comment, and the reply names only the items that
    /// were stored. If nothing is left the command fails and the list is
    /// not touched.
    fn add(&self, name: Option<&str>, items: Option<&str>) -> Result<String> {
        let key = list_key(CommandKind::Add, name)?;
        let added: Vec<String> = items
            .unwrap_or_default()
            .split(',')
            .map(|item| item.trim().to_lowercase())
            .filter(|item| !item.is_empty())
            .collect();
        if added.is_empty() {
            return Err(ParleyError::command(
                CommandKind::Add,
                format!("no items given for list {key}"),
            ));
        }

        let mut list = self.lists.get(&key)?.unwrap_or_default();
        list.items.extend(added.iter().cloned());
        let total = list.len();
        self.lists.set(&key, list)?;
        info!(list = %key, "Added {} item(s), {} total", added.len(), total);

        Ok(format!("Added to list {key}: {}", added.join(", ")))
    }

    fn clear(&self, name: Option<&str>) -> Result<String> {
        let key = list_key(CommandKind::Clear, name)?;
        self.lists.delete(&key)?;
        info!(list = %key, "Cleared list");
        Ok(format!("Cleared list {key}."))
    }

    /// One random `(name, item)` per non-empty list, in store order.
    fn pick_attributes(&self) -> Result<Vec<(String, String)>> {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        let picks: Vec<(String, String)> = self
            .lists
            .iterate()?
            .filter_map(|(name, list)| pick_one(&mut *rng, &list).map(|item| (name, item)))
            .collect();
        debug!("Picked attributes from {} list(s)", picks.len());
        Ok(picks)
    }

    fn challenge(&self) -> Result<String> {
        let picks = self.pick_attributes()?;
        if picks.is_empty() {
            return Ok(no_lists_reply());
        }
        Ok(format_picks(&picks))
    }

    async fn magic_challenge(&self, verb: Option<&str>) -> Result<String> {
        let verb = verb.map(str::trim).unwrap_or_default();
        if verb.is_empty() {
            return Err(ParleyError::command(
                CommandKind::MagicChallenge,
                "missing verb",
            ));
        }
        let picks = self.pick_attributes()?;
        if picks.is_empty() {
            return Ok(no_lists_reply());
        }

        let prompt = magic_prompt(verb, &picks);
        debug!("Magic challenge prompt: {} chars", prompt.len());
        generate_with_timeout(
            self.generator.as_ref(),
            GenerationInput::Prompt(prompt),
            self.generation_timeout,
        )
        .await
        .map_err(|e| ParleyError::command(CommandKind::MagicChallenge, e.to_string()))
    }
}

/// The user-facing reply for a failed command.
pub fn apology(kind: CommandKind, err: &ParleyError) -> String {
    let detail = match err {
        ParleyError::Command { message, .. } => message.clone(),
        other => other.to_string(),
    };
    format!("Sorry, I couldn't run the {kind} command: {detail}")
}

fn list_key(kind: CommandKind, name: Option<&str>) -> Result<String> {
    let key = normalize_name(name.unwrap_or_default());
    if key.is_empty() {
        return Err(ParleyError::command(kind, "missing list name"));
    }
    Ok(key)
}

fn pick_one(rng: &mut impl Rng, list: &NamedList) -> Option<String> {
    if list.is_empty() {
        return None;
    }
    Some(list.items[rng.random_range(0..list.len())].clone())
}

fn format_picks(picks: &[(String, String)]) -> String {
    picks
        .iter()
        .map(|(name, item)| format!("{name}: {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn magic_prompt(verb: &str, picks: &[(String, String)]) -> String {
    format!(
        "Write a short, fun creative challenge that asks me to {verb} something \
         using all of these attributes:\n{}\nReply with the challenge only.",
        format_picks(picks)
    )
}

fn no_lists_reply() -> String {
    "You don't have any lists with items yet. Try \"add to list <name>: <items>\" first."
        .to_string()
}
