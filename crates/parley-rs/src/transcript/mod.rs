//! Per-session transcripts: the store contract and two implementations.
//!
//! A transcript is an append-only, ordered log of [`Message`]s for one
//! session. Insertion order is the only ordering; nothing in this crate
//! reorders or deletes messages. The first system message(s) form the
//! persona preamble, seeded when the session is created.
//!
//! - [`TranscriptStore`]: the capability the pipeline consumes.
//! - [`MemoryTranscriptStore`]: mutex-guarded in-process store.
//! - [`FileTranscriptStore`]: one JSONL file per session.
//! - [`dedup`]: external-id duplicate detection and the seen-id index.
//!
//! Stores must serialize appends per session and reject a second message
//! with an external id already recorded in that session
//! ([`AppendOutcome::Duplicate`]). That uniqueness check is what makes
//! concurrent redelivery of the same webhook safe.

pub mod dedup;
pub mod file;
pub mod memory;

use crate::Role;
use crate::error::Result;
use serde::{Deserialize, Serialize};

pub use dedup::{SeenIds, is_duplicate};
pub use file::FileTranscriptStore;
pub use memory::MemoryTranscriptStore;

// ── Message records ────────────────────────────────────────────────

/// A message recorded in a transcript.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub text: String,
    /// The originating platform's message id. Absent for system-authored
    /// and generated messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    /// Index in the transcript, assigned at append time.
    pub position: usize,
}

/// A message to append. The store assigns its position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewMessage {
    pub role: Role,
    pub text: String,
    pub external_id: Option<String>,
}

impl NewMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            text: text.into(),
            external_id: None,
        }
    }

    pub fn user(text: impl Into<String>, external_id: Option<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            external_id,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            external_id: None,
        }
    }

    /// Turn this entry into a recorded message at `position`.
    pub(crate) fn at(self, position: usize) -> Message {
        Message {
            role: self.role,
            text: self.text,
            external_id: self.external_id.filter(|id| !id.is_empty()),
            position,
        }
    }
}

/// Result of an append.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The message was recorded.
    Appended(Message),
    /// A message with the same external id is already recorded in this
    /// session; nothing was written.
    Duplicate,
}

impl AppendOutcome {
    /// The recorded message, if the append happened.
    pub fn message(&self) -> Option<&Message> {
        match self {
            AppendOutcome::Appended(msg) => Some(msg),
            AppendOutcome::Duplicate => None,
        }
    }
}

/// A snapshot of one session's transcript.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transcript {
    pub session_id: String,
    pub messages: Vec<Message>,
}

impl Transcript {
    /// Number of recorded messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Whether `external_id` is already recorded. Empty or absent ids are
    /// never duplicates.
    pub fn is_duplicate(&self, external_id: Option<&str>) -> bool {
        is_duplicate(&self.messages, external_id)
    }
}

// ── Store contract ─────────────────────────────────────────────────

/// Append-only, per-session message log.
///
/// Implementations must keep insertion order, assign `position` as the
/// message's index, and make [`append`](Self::append) atomic with respect to
/// the external-id uniqueness check within a session.
pub trait TranscriptStore: Send + Sync {
    /// Whether a transcript exists for `session_id`.
    fn exists(&self, session_id: &str) -> Result<bool>;

    /// Return the session's transcript, creating it with `preamble` as its
    /// leading system messages if it does not exist yet.
    fn get_or_create(&self, session_id: &str, preamble: &[String]) -> Result<Transcript>;

    /// Append a message to an existing or new session.
    fn append(&self, session_id: &str, entry: NewMessage) -> Result<AppendOutcome>;

    /// All messages for `session_id`, in insertion order. Empty for unknown
    /// sessions.
    fn list(&self, session_id: &str) -> Result<Vec<Message>>;

    /// Whether `external_id` is already recorded for `session_id`.
    ///
    /// The default scans [`list`](Self::list); stores with an index should
    /// override it.
    fn contains_external_id(&self, session_id: &str, external_id: &str) -> Result<bool> {
        Ok(is_duplicate(&self.list(session_id)?, Some(external_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_message_drops_empty_external_id() {
        let msg = NewMessage::user("hi", Some(String::new())).at(4);
        assert_eq!(msg.external_id, None);
        assert_eq!(msg.position, 4);
    }

    #[test]
    fn message_serde_omits_missing_external_id() {
        let msg = NewMessage::system("persona").at(0);
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("external_id"));
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn transcript_duplicate_check() {
        let transcript = Transcript {
            session_id: "s".into(),
            messages: vec![
                NewMessage::system("persona").at(0),
                NewMessage::user("hi", Some("1".into())).at(1),
            ],
        };
        assert_eq!(transcript.len(), 2);
        assert!(transcript.is_duplicate(Some("1")));
        assert!(!transcript.is_duplicate(Some("2")));
        assert!(!transcript.is_duplicate(None));
    }

    #[test]
    fn append_outcome_message_accessor() {
        let appended = AppendOutcome::Appended(NewMessage::assistant("ok").at(2));
        assert_eq!(appended.message().map(|m| m.position), Some(2));
        assert!(AppendOutcome::Duplicate.message().is_none());
    }
}
