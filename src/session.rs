// session.rs: The chat transcript and its durable mirror.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::store::{load_collection, persist_collection, DurableStore};

/// Who authored a turn. Stored as `"user"` / `"bot"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speaker {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "bot")]
    Assistant,
}

/// One message in the conversation. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    #[serde(rename = "from")]
    pub speaker: Speaker,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
        }
    }
}

/// Append-only list of turns, rewritten to the store after every change.
///
/// The store is only a mirror while the session is live; it becomes the
/// source of truth again on the next [`SessionModel::load`].
pub struct SessionModel {
    store: Arc<dyn DurableStore>,
    key: String,
    turns: Vec<Turn>,
}

impl SessionModel {
    /// Load the session stored under `key`. Missing or malformed data gives an
    /// empty session.
    pub fn load(store: Arc<dyn DurableStore>, key: impl Into<String>) -> Self {
        let key = key.into();
        let turns = load_collection::<Turn>(store.as_ref(), &key);
        log::info!("SessionModel: loaded {} turns from {}", turns.len(), key);
        Self { store, key, turns }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Push `turn` to the end and persist.
    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
        self.persist();
    }

    /// Drop every turn and persist the empty session.
    pub fn clear(&mut self) {
        self.turns.clear();
        self.persist();
    }

    /// Overwrite the stored copy with the full in-memory sequence.
    /// Failures are logged; the in-memory session stays authoritative.
    pub fn persist(&self) {
        if let Err(e) = persist_collection(self.store.as_ref(), &self.key, &self.turns) {
            log::error!("SessionModel: failed to persist {}: {}", self.key, e);
        }
    }
}
