//! In-process transcript store.

use crate::error::Result;
use crate::transcript::{
    AppendOutcome, Message, NewMessage, SeenIds, Transcript, TranscriptStore,
};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct SessionLog {
    messages: Vec<Message>,
    seen: SeenIds,
}

impl SessionLog {
    fn push(&mut self, entry: NewMessage) -> AppendOutcome {
        if self.seen.contains(entry.external_id.as_deref()) {
            return AppendOutcome::Duplicate;
        }
        let msg = entry.at(self.messages.len());
        self.seen.record(&msg);
        self.messages.push(msg.clone());
        AppendOutcome::Appended(msg)
    }
}

/// Transcript store held in memory behind a single mutex.
///
/// The mutex serializes every append, so the duplicate check and the write
/// are atomic per session. Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryTranscriptStore {
    sessions: Mutex<HashMap<String, SessionLog>>,
}

impl MemoryTranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, SessionLog>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TranscriptStore for MemoryTranscriptStore {
    fn exists(&self, session_id: &str) -> Result<bool> {
        Ok(self.lock().contains_key(session_id))
    }

    fn get_or_create(&self, session_id: &str, preamble: &[String]) -> Result<Transcript> {
        let mut sessions = self.lock();
        let log = sessions.entry(session_id.to_string()).or_insert_with(|| {
            let mut log = SessionLog::default();
            for text in preamble {
                log.push(NewMessage::system(text.clone()));
            }
            log
        });
        Ok(Transcript {
            session_id: session_id.to_string(),
            messages: log.messages.clone(),
        })
    }

    fn append(&self, session_id: &str, entry: NewMessage) -> Result<AppendOutcome> {
        let mut sessions = self.lock();
        Ok(sessions
            .entry(session_id.to_string())
            .or_default()
            .push(entry))
    }

    fn list(&self, session_id: &str) -> Result<Vec<Message>> {
        Ok(self
            .lock()
            .get(session_id)
            .map(|log| log.messages.clone())
            .unwrap_or_default())
    }

    fn contains_external_id(&self, session_id: &str, external_id: &str) -> Result<bool> {
        Ok(self
            .lock()
            .get(session_id)
            .is_some_and(|log| log.seen.contains(Some(external_id))))
    }
}
