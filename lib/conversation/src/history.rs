//! Conversation history store.
//!
//! The store owns every conversation's message sequence. Callers get
//! snapshots and issue appends; they never hold a reference into the map.
//! All locking happens here, and no lock is held across an `.await`.

use crate::key::ConversationKey;
use crate::message::Message;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct ConversationHistory {
    messages: Vec<Message>,
    /// Last thread id the support API returned for this conversation.
    upstream_thread: Option<String>,
}

/// Process-wide history keyed by conversation.
///
/// A key with no history reads as an empty sequence. Histories live for the
/// lifetime of the store; nothing is evicted.
#[derive(Debug, Default)]
pub struct HistoryStore {
    conversations: RwLock<HashMap<ConversationKey, ConversationHistory>>,
}

impl HistoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // Push is the only mutation, so a poisoned map is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<ConversationKey, ConversationHistory>> {
        self.conversations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ConversationKey, ConversationHistory>> {
        self.conversations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a snapshot of the history for `key`.
    #[must_use]
    pub fn get(&self, key: &ConversationKey) -> Vec<Message> {
        self.read()
            .get(key)
            .map(|history| history.messages.clone())
            .unwrap_or_default()
    }

    /// Appends one message to the history for `key`.
    pub fn append(&self, key: &ConversationKey, message: Message) {
        self.write()
            .entry(key.clone())
            .or_default()
            .messages
            .push(message);
    }

    /// Appends a user message and its reply as one unit.
    ///
    /// Another event's exchange on the same key can land before or after this
    /// one, never between the two messages.
    pub fn append_exchange(&self, key: &ConversationKey, user: Message, assistant: Message) {
        let mut conversations = self.write();
        let history = conversations.entry(key.clone()).or_default();
        history.messages.push(user);
        history.messages.push(assistant);
    }

    /// Returns the number of messages stored for `key`.
    #[must_use]
    pub fn len(&self, key: &ConversationKey) -> usize {
        self.read()
            .get(key)
            .map_or(0, |history| history.messages.len())
    }

    /// Returns the number of conversations with any recorded state.
    #[must_use]
    pub fn conversation_count(&self) -> usize {
        self.read().len()
    }

    /// Returns the remembered support API thread for `key`.
    #[must_use]
    pub fn upstream_thread(&self, key: &ConversationKey) -> Option<String> {
        self.read()
            .get(key)
            .and_then(|history| history.upstream_thread.clone())
    }

    /// Remembers the support API thread for `key`.
    pub fn set_upstream_thread(&self, key: &ConversationKey, thread_id: impl Into<String>) {
        self.write().entry(key.clone()).or_default().upstream_thread = Some(thread_id.into());
    }
}
