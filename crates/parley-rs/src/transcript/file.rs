//! JSONL transcript store.
//!
//! Layout:
//! ```text
//! transcripts_dir/
//!   chat-42.jsonl
//!   user%40example.jsonl
//! ```
//!
//! One JSON [`Message`] per line, in insertion order. Session ids are
//! encoded into file names: `[A-Za-z0-9_-]` pass through, every other byte
//! becomes `%XX`.
//!
//! A record that fails to parse is only tolerated as the last line of the
//! file, where an interrupted append leaves it. That torn tail is ignored on
//! read and truncated before the next append. A bad record anywhere else is
//! a [`ParleyError::Store`], and the session can't be read or appended to
//! until the file is repaired.

use crate::error::{ParleyError, Result};
use crate::transcript::{
    AppendOutcome, Message, NewMessage, SeenIds, Transcript, TranscriptStore,
};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Parsed contents of one session file.
struct ParsedLog {
    messages: Vec<Message>,
    /// Byte offset where a torn final record starts, if there is one.
    torn_at: Option<u64>,
}

impl ParsedLog {
    /// Position the next append gets.
    fn next_position(&self) -> usize {
        self.messages
            .iter()
            .map(|m| m.position + 1)
            .max()
            .unwrap_or(0)
    }
}

/// Cached view of one session file.
#[derive(Debug)]
struct SessionIndex {
    len: usize,
    seen: SeenIds,
}

/// Transcript store backed by one JSONL file per session.
///
/// Appends are serialized through a process-wide lock, which also guards a
/// lazily built per-session index of seen external ids. Running several
/// processes against one directory is not supported.
pub struct FileTranscriptStore {
    dir: PathBuf,
    index: Mutex<HashMap<String, SessionIndex>>,
}

impl FileTranscriptStore {
    /// Create a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| ParleyError::store(format!("Failed to create transcript dir: {e}")))?;
        Ok(Self {
            dir,
            index: Mutex::new(HashMap::new()),
        })
    }

    /// Root directory of the store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path to a session's JSONL file.
    pub fn session_path(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{}.jsonl", encode_session_id(session_id)))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, SessionIndex>> {
        self.index.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn read_log(&self, session_id: &str) -> Result<ParsedLog> {
        let path = self.session_path(session_id);
        if !path.exists() {
            return Ok(ParsedLog {
                messages: Vec::new(),
                torn_at: None,
            });
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ParleyError::store(format!("Failed to read transcript: {e}")))?;

        let mut messages = Vec::new();
        let mut offset = 0usize;
        for (lineno, line) in content.split_inclusive('\n').enumerate() {
            let start = offset;
            offset += line.len();
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Message>(line.trim_end()) {
                Ok(msg) => messages.push(msg),
                Err(e) => {
                    let is_last = content
                        .get(offset..)
                        .is_none_or(|rest| rest.trim().is_empty());
                    if !is_last {
                        return Err(ParleyError::store(format!(
                            "Corrupt record at line {} in {}: {e}",
                            lineno + 1,
                            path.display()
                        )));
                    }
                    warn!(
                        "Ignoring torn final record at line {} in {}: {e}",
                        lineno + 1,
                        path.display()
                    );
                    return Ok(ParsedLog {
                        messages,
                        torn_at: Some(start as u64),
                    });
                }
            }
        }
        Ok(ParsedLog {
            messages,
            torn_at: None,
        })
    }

    fn read_messages(&self, session_id: &str) -> Result<Vec<Message>> {
        Ok(self.read_log(session_id)?.messages)
    }

    /// Load the session's index into the cache if it is not there yet.
    ///
    /// A torn final record is cut off here, so appends always start on a
    /// clean line.
    fn ensure_indexed<'a>(
        &self,
        index: &'a mut HashMap<String, SessionIndex>,
        session_id: &str,
    ) -> Result<&'a mut SessionIndex> {
        if !index.contains_key(session_id) {
            let log = self.read_log(session_id)?;
            if let Some(torn_at) = log.torn_at {
                let path = self.session_path(session_id);
                OpenOptions::new()
                    .write(true)
                    .open(&path)
                    .and_then(|file| file.set_len(torn_at))
                    .map_err(|e| {
                        ParleyError::store(format!("Failed to truncate torn transcript: {e}"))
                    })?;
                warn!(
                    "Truncated {} to {} bytes before appending",
                    path.display(),
                    torn_at
                );
            }
            debug!(
                "Indexed transcript for session {} ({} messages)",
                session_id,
                log.messages.len()
            );
            index.insert(
                session_id.to_string(),
                SessionIndex {
                    len: log.next_position(),
                    seen: SeenIds::from_messages(&log.messages),
                },
            );
        }
        index
            .get_mut(session_id)
            .ok_or_else(|| ParleyError::store("transcript index missing after load"))
    }

    fn write_lines(&self, session_id: &str, messages: &[Message]) -> Result<()> {
        let mut buf = String::new();
        for msg in messages {
            buf.push_str(&serde_json::to_string(msg)?);
            buf.push('\n');
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.session_path(session_id))
            .map_err(|e| ParleyError::store(format!("Failed to open transcript: {e}")))?;
        file.write_all(buf.as_bytes())
            .map_err(|e| ParleyError::store(format!("Failed to append transcript: {e}")))?;
        Ok(())
    }
}

impl TranscriptStore for FileTranscriptStore {
    fn exists(&self, session_id: &str) -> Result<bool> {
        Ok(self.session_path(session_id).exists())
    }

    fn get_or_create(&self, session_id: &str, preamble: &[String]) -> Result<Transcript> {
        let mut index = self.lock();
        if !self.session_path(session_id).exists() {
            let seeded: Vec<Message> = preamble
                .iter()
                .enumerate()
                .map(|(i, text)| NewMessage::system(text.clone()).at(i))
                .collect();
            self.write_lines(session_id, &seeded)?;
            index.insert(
                session_id.to_string(),
                SessionIndex {
                    len: seeded.len(),
                    seen: SeenIds::new(),
                },
            );
            debug!(
                "Created transcript for session {} with {} preamble message(s)",
                session_id,
                seeded.len()
            );
            return Ok(Transcript {
                session_id: session_id.to_string(),
                messages: seeded,
            });
        }
        drop(index);
        Ok(Transcript {
            session_id: session_id.to_string(),
            messages: self.read_messages(session_id)?,
        })
    }

    fn append(&self, session_id: &str, entry: NewMessage) -> Result<AppendOutcome> {
        let mut index = self.lock();
        let session = self.ensure_indexed(&mut index, session_id)?;
        if session.seen.contains(entry.external_id.as_deref()) {
            return Ok(AppendOutcome::Duplicate);
        }
        let msg = entry.at(session.len);
        self.write_lines(session_id, std::slice::from_ref(&msg))?;
        session.len += 1;
        session.seen.record(&msg);
        Ok(AppendOutcome::Appended(msg))
    }

    fn list(&self, session_id: &str) -> Result<Vec<Message>> {
        self.read_messages(session_id)
    }

    fn contains_external_id(&self, session_id: &str, external_id: &str) -> Result<bool> {
        let mut index = self.lock();
        let session = self.ensure_indexed(&mut index, session_id)?;
        Ok(session.seen.contains(Some(external_id)))
    }
}

/// Encode a session id as a file stem.
pub fn encode_session_id(session_id: &str) -> String {
    let mut out = String::with_capacity(session_id.len());
    for byte in session_id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}
