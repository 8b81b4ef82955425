//! JSONL-backed session store.
//!
//! Each session is one file: a scope record on the first line, then one line
//! per message in conversation order.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use super::SessionStore;
use crate::conversation::{ConversationState, Message};
use crate::error::{ResearchError, Result};

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Record {
    Scope {
        key: String,
        #[serde(default)]
        selected_documents: Vec<String>,
        saved_at: DateTime<Utc>,
    },
    Message {
        message: Message,
    },
}

/// One JSONL file per session key under a base directory.
pub struct JsonlSessionStore {
    base_path: PathBuf,
}

impl JsonlSessionStore {
    /// Create a store rooted at `base_path`, creating the directory if needed.
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    /// Get the file path for a session key.
    fn session_path(&self, key: &str) -> Result<PathBuf> {
        if key.trim().is_empty() {
            return Err(ResearchError::Storage("session key must not be empty".to_string()));
        }
        Ok(self.base_path.join(format!("{}.jsonl", file_stem(key))))
    }
}

/// Map a key onto a safe file name, one file per distinct key.
///
/// ASCII letters, digits and `-` pass through; every other byte, `_`
/// included, becomes `_` followed by two hex digits.
fn file_stem(key: &str) -> String {
    let mut stem = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("_{:02x}", byte));
        }
    }
    stem
}

impl SessionStore for JsonlSessionStore {
    fn load(&self, key: &str) -> Result<Option<ConversationState>> {
        let path = self.session_path(key)?;
        if !path.exists() {
            return Ok(None);
        }

        let reader = BufReader::new(File::open(&path)?);
        let mut stored_key = None;
        let mut selected_documents = None;
        let mut messages = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line)? {
                Record::Scope {
                    key: scope_key,
                    selected_documents: docs,
                    ..
                } => {
                    stored_key = Some(scope_key);
                    selected_documents = Some(docs);
                }
                Record::Message { message } => messages.push(message),
            }
        }

        let selected_documents = selected_documents.ok_or_else(|| {
            ResearchError::Storage(format!("session file {} has no scope record", path.display()))
        })?;
        if stored_key.as_deref() != Some(key) {
            return Err(ResearchError::Storage(format!(
                "session file {} belongs to another key",
                path.display()
            )));
        }

        debug!("Loaded session {} ({} messages)", key, messages.len());
        ConversationState::replay(messages, selected_documents).map(Some)
    }

    fn save(&self, key: &str, state: &ConversationState) -> Result<()> {
        let path = self.session_path(key)?;
        let tmp_path = path.with_extension("jsonl.tmp");

        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            let scope = Record::Scope {
                key: key.to_string(),
                selected_documents: state.selected_documents.clone(),
                saved_at: Utc::now(),
            };
            writeln!(writer, "{}", serde_json::to_string(&scope)?)?;

            for message in state.messages() {
                let record = Record::Message {
                    message: message.clone(),
                };
                writeln!(writer, "{}", serde_json::to_string(&record)?)?;
            }
            writer.flush()?;
        }

        fs::rename(&tmp_path, &path)?;
        debug!("Saved session {} ({} messages) to {}", key, state.len(), path.display());
        Ok(())
    }
}
