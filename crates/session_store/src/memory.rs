use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chat_provider::Message;

use crate::error::SessionStoreError;
use crate::schema::{sort_by_recency, Session};
use crate::store::{next_stamp, SessionStore};

/// Process-local store with the same contract as [`crate::FileSessionStore`].
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    sessions: HashMap<String, Session>,
    last_stamp: i64,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions across all owners.
    #[must_use]
    pub fn len(&self) -> usize {
        lock_unpoisoned(&self.state).sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn list(&self, owner_id: &str) -> Result<Vec<Session>, SessionStoreError> {
        let mut sessions: Vec<Session> = lock_unpoisoned(&self.state)
            .sessions
            .values()
            .filter(|session| session.owner_id == owner_id)
            .cloned()
            .collect();
        sort_by_recency(&mut sessions);
        Ok(sessions)
    }

    async fn get(&self, session_id: &str) -> Result<Option<Session>, SessionStoreError> {
        Ok(lock_unpoisoned(&self.state).sessions.get(session_id).cloned())
    }

    async fn create(
        &self,
        owner_id: &str,
        first_message: &Message,
    ) -> Result<Session, SessionStoreError> {
        let mut state = lock_unpoisoned(&self.state);
        let session = Session::create(owner_id, first_message, next_stamp(&mut state.last_stamp));
        state.sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn update(
        &self,
        session_id: &str,
        messages: &[Message],
    ) -> Result<(), SessionStoreError> {
        let mut state = lock_unpoisoned(&self.state);
        let now = next_stamp(&mut state.last_stamp);
        let session = state
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionStoreError::unknown_session(session_id))?;
        session.replace_messages(messages.to_vec(), now);
        let stamped = session.last_updated;
        state.last_stamp = stamped;
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<(), SessionStoreError> {
        lock_unpoisoned(&self.state).sessions.remove(session_id);
        Ok(())
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
