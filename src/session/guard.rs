use tokio::sync::OwnedMutexGuard;
use tracing::trace;

use crate::{
    common::types::ChatId,
    session::{context::ChatSession, store::SessionStore},
};

/// Exclusive access to one chat's session for a whole critical section.
pub type ChatGuard = OwnedMutexGuard<ChatSession>;

/// Locks the chat, creating its session on first use.
pub async fn lock_chat(store: &dyn SessionStore, chat_id: ChatId) -> ChatGuard {
    let slot = store.slot(chat_id);
    let guard = slot.lock_owned().await;
    trace!("[{}] lock acquired", chat_id);
    guard
}

/// Locks the chat only if a session already exists.
pub async fn lock_existing(store: &dyn SessionStore, chat_id: ChatId) -> Option<ChatGuard> {
    let slot = store.get(chat_id)?;
    Some(slot.lock_owned().await)
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;
    use crate::session::store::MemorySessionStore;

    #[tokio::test]
    async fn test_lock_existing_does_not_create() {
        let store = MemorySessionStore::new();
        assert!(lock_existing(&store, ChatId(9)).await.is_none());
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_chat_is_serialized_other_chats_are_not() {
        let store = Arc::new(MemorySessionStore::new());
        let held = lock_chat(store.as_ref(), ChatId(1)).await;

        // A different chat is free.
        let other = tokio::time::timeout(
            Duration::from_millis(10),
            lock_chat(store.as_ref(), ChatId(2)),
        )
        .await;
        assert!(other.is_ok());

        // The same chat waits.
        let same = tokio::time::timeout(
            Duration::from_millis(10),
            lock_chat(store.as_ref(), ChatId(1)),
        )
        .await;
        assert!(same.is_err());

        drop(held);
        assert!(lock_existing(store.as_ref(), ChatId(1)).await.is_some());
    }
}
