//! Fixed-pattern command table.
//!
//! Matching is first-match-wins over [`COMMAND_TABLE`], case-insensitive,
//! and stateless: the same text always parses the same way. Arguments are
//! returned trimmed but otherwise raw; case-folding happens at dispatch.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Kinds of command the router understands.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Challenge,
    MagicChallenge,
    Add,
    Clear,
    Help,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Challenge => "challenge",
            CommandKind::MagicChallenge => "magic_challenge",
            CommandKind::Add => "add",
            CommandKind::Clear => "clear",
            CommandKind::Help => "help",
        }
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed command: `(kind, arg1?, arg2?)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    pub kind: CommandKind,
    pub arg1: Option<String>,
    pub arg2: Option<String>,
}

impl Command {
    fn new(kind: CommandKind) -> Self {
        Self {
            kind,
            arg1: None,
            arg2: None,
        }
    }
}

/// Ordered `(kind, pattern)` table. Earlier entries win.
pub static COMMAND_TABLE: LazyLock<Vec<(CommandKind, Regex)>> = LazyLock::new(|| {
    vec![
        (
            CommandKind::Challenge,
            Regex::new(r"(?is)^\s*challenge(?:\s+me)?\s*[.!?]*\s*$").unwrap(),
        ),
        (
            CommandKind::MagicChallenge,
            Regex::new(r"(?is)^\s*magic\s+challenge\s+(?P<arg1>.+?)\s*$").unwrap(),
        ),
        (
            CommandKind::Add,
            Regex::new(
                r"(?is)^\s*add\s+(?:to\s+)?list\s+(?P<arg1>[^:]+?)\s*:\s*(?P<arg2>.*?)\s*$",
            )
            .unwrap(),
        ),
        (
            CommandKind::Clear,
            Regex::new(r"(?is)^\s*(?:delete|clear|remove)\s+list\s+(?P<arg1>.+?)\s*[.!]*\s*$")
                .unwrap(),
        ),
        (CommandKind::Help, Regex::new(r"(?i)^\s*help\s*$").unwrap()),
    ]
});

/// Match `text` against the command table.
///
/// Returns `None` when nothing matches; the caller falls through to chat.
pub fn parse_command(text: &str) -> Option<Command> {
    for (kind, pattern) in COMMAND_TABLE.iter() {
        if let Some(caps) = pattern.captures(text) {
            let mut cmd = Command::new(*kind);
            cmd.arg1 = caps.name("arg1").map(|m| m.as_str().trim().to_string());
            cmd.arg2 = caps.name("arg2").map(|m| m.as_str().trim().to_string());
            return Some(cmd);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(text: &str) -> Option<(CommandKind, Option<String>, Option<String>)> {
        parse_command(text).map(|c| (c.kind, c.arg1, c.arg2))
    }

    #[test]
    fn add_with_items() {
        assert_eq!(
            parsed("Add to list location: outside, inside"),
            Some((
                CommandKind::Add,
                Some("location".into()),
                Some("outside, inside".into())
            ))
        );
        assert_eq!(
            parsed("Add to list medium: watercolor, oil"),
            Some((
                CommandKind::Add,
                Some("medium".into()),
                Some("watercolor, oil".into())
            ))
        );
    }

    #[test]
    fn add_without_to_and_with_spacing() {
        assert_eq!(
            parsed("  add list  Medium Size :  big  "),
            Some((
                CommandKind::Add,
                Some("Medium Size".into()),
                Some("big".into())
            ))
        );
    }

    #[test]
    fn clear_variants() {
        for text in [
            "Clear list location",
            "delete list location",
            "REMOVE LIST location",
        ] {
            assert_eq!(
                parsed(text),
                Some((CommandKind::Clear, Some("location".into()), None)),
                "{text}"
            );
        }
    }

    #[test]
    fn challenge_variants() {
        for text in ["challenge", "Challenge me", "CHALLENGE ME!", " challenge "] {
            assert_eq!(parsed(text), Some((CommandKind::Challenge, None, None)), "{text}");
        }
    }

    #[test]
    fn magic_challenge_captures_verb() {
        assert_eq!(
            parsed("Magic challenge paint"),
            Some((CommandKind::MagicChallenge, Some("paint".into()), None))
        );
        assert_eq!(
            parsed("magic challenge write a poem"),
            Some((
                CommandKind::MagicChallenge,
                Some("write a poem".into()),
                None
            ))
        );
    }

    #[test]
    fn help_must_be_exact() {
        assert_eq!(parsed("help"), Some((CommandKind::Help, None, None)));
        assert_eq!(parsed("HELP"), Some((CommandKind::Help, None, None)));
        assert_eq!(parsed("help me with my homework"), None);
    }

    #[test]
    fn chat_text_is_not_a_command() {
        for text in [
            "Hey, what's up",
            "",
            "I want a challenge today",
            "add milk to my list",
            "magic challenge",
        ] {
            assert_eq!(parsed(text), None, "{text}");
        }
    }

    #[test]
    fn parsing_is_deterministic() {
        let text = "Add to list medium: watercolor, oil";
        let first = parse_command(text);
        parse_command("Clear list medium");
        parse_command("Hey");
        assert_eq!(parse_command(text), first);
    }

    #[test]
    fn kind_display_is_snake_case() {
        assert_eq!(CommandKind::MagicChallenge.to_string(), "magic_challenge");
        assert_eq!(CommandKind::Add.to_string(), "add");
    }
}
