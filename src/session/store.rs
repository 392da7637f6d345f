use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::{
    common::types::{ChatId, Shared},
    session::context::ChatSession,
};

/// Owns every chat's session. Each session sits behind its own lock, created
/// on first access and never removed.
pub trait SessionStore: Send + Sync {
    /// Returns the chat's session, creating an idle one if needed.
    fn slot(&self, chat_id: ChatId) -> Shared<ChatSession>;

    fn get(&self, chat_id: ChatId) -> Option<Shared<ChatSession>>;

    fn chats(&self) -> Vec<ChatId>;
}

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: DashMap<ChatId, Shared<ChatSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn slot(&self, chat_id: ChatId) -> Shared<ChatSession> {
        self.sessions
            .entry(chat_id)
            .or_insert_with(|| Arc::new(Mutex::new(ChatSession::new(chat_id))))
            .value()
            .clone()
    }

    fn get(&self, chat_id: ChatId) -> Option<Shared<ChatSession>> {
        self.sessions.get(&chat_id).map(|s| s.value().clone())
    }

    fn chats(&self) -> Vec<ChatId> {
        self.sessions.iter().map(|e| *e.key()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_is_created_once() {
        let store = MemorySessionStore::new();
        assert!(store.get(ChatId(1)).is_none());

        let a = store.slot(ChatId(1));
        let b = store.slot(ChatId(1));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_chats_lists_every_slot() {
        let store = MemorySessionStore::new();
        store.slot(ChatId(1));
        store.slot(ChatId(-2));
        let mut chats = store.chats();
        chats.sort();
        assert_eq!(chats, [ChatId(-2), ChatId(1)]);
    }
}
