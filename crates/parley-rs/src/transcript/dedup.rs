//! Intake deduplication by external message id.
//!
//! Webhook platforms redeliver on timeouts, and users double-send. A message
//! whose external id is already recorded in the session is discarded before
//! it reaches the transcript. Messages without an id (system-authored,
//! generated, or from sources without ids) always pass through.

use crate::transcript::Message;
use std::collections::HashSet;

/// Whether any message in `transcript` carries `external_id`.
///
/// Linear scan. Always `false` for an absent or empty id.
pub fn is_duplicate(transcript: &[Message], external_id: Option<&str>) -> bool {
    match external_id {
        Some(id) if !id.is_empty() => transcript
            .iter()
            .any(|m| m.external_id.as_deref() == Some(id)),
        _ => false,
    }
}

/// Index of external ids recorded in one session, for O(1) checks.
#[derive(Debug, Default, Clone)]
pub struct SeenIds {
    ids: HashSet<String>,
}

impl SeenIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index from an existing transcript.
    pub fn from_messages<'a>(messages: impl IntoIterator<Item = &'a Message>) -> Self {
        let mut seen = Self::new();
        for msg in messages {
            seen.record(msg);
        }
        seen
    }

    /// Same contract as [`is_duplicate`].
    pub fn contains(&self, external_id: Option<&str>) -> bool {
        match external_id {
            Some(id) if !id.is_empty() => self.ids.contains(id),
            _ => false,
        }
    }

    /// Record a message's external id, if it has one.
    pub fn record(&mut self, msg: &Message) {
        if let Some(id) = msg.external_id.as_deref()
            && !id.is_empty()
        {
            self.ids.insert(id.to_string());
        }
    }

    /// Number of distinct ids recorded.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether no ids are recorded.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
