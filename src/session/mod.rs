//! Session persistence
//!
//! A session key (thread id) maps to one persisted conversation. The driver
//! loads it before a run and saves it after a successful one.

mod jsonl;

pub use jsonl::JsonlSessionStore;

use crate::conversation::ConversationState;
use crate::error::Result;

/// Keyed storage for finished conversations
pub trait SessionStore: Send + Sync {
    /// Load the conversation saved under `key`, if any
    fn load(&self, key: &str) -> Result<Option<ConversationState>>;

    /// Replace whatever is stored under `key`
    fn save(&self, key: &str, state: &ConversationState) -> Result<()>;
}
