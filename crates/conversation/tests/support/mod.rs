use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chat_provider::{CompletionProvider, Message};
use chat_provider_mock::MockProvider;
use conversation::{Conversation, ConversationSettings};
use session_store::{MemorySessionStore, Session, SessionStore, SessionStoreError};
use tokio::sync::Notify;

/// Memory store that fails a configurable number of upcoming writes.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemorySessionStore,
    failing_creates: AtomicUsize,
    failing_updates: AtomicUsize,
    hold_deletes: AtomicBool,
    delete_gate: Notify,
}

impl FlakyStore {
    pub fn fail_next_creates(&self, count: usize) {
        self.failing_creates.store(count, Ordering::SeqCst);
    }

    pub fn fail_next_updates(&self, count: usize) {
        self.failing_updates.store(count, Ordering::SeqCst);
    }

    /// Parks every delete until [`FlakyStore::release_delete`].
    pub fn hold_deletes(&self) {
        self.hold_deletes.store(true, Ordering::SeqCst);
    }

    pub fn release_delete(&self) {
        self.delete_gate.notify_one();
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
    }
}

fn disk_full() -> SessionStoreError {
    SessionStoreError::io(
        "writing session document",
        Path::new("/sessions/s.json"),
        std::io::Error::other("disk full"),
    )
}

#[async_trait]
impl SessionStore for FlakyStore {
    async fn list(&self, owner_id: &str) -> Result<Vec<Session>, SessionStoreError> {
        self.inner.list(owner_id).await
    }

    async fn get(&self, session_id: &str) -> Result<Option<Session>, SessionStoreError> {
        self.inner.get(session_id).await
    }

    async fn create(
        &self,
        owner_id: &str,
        first_message: &Message,
    ) -> Result<Session, SessionStoreError> {
        if Self::take_failure(&self.failing_creates) {
            return Err(disk_full());
        }
        self.inner.create(owner_id, first_message).await
    }

    async fn update(
        &self,
        session_id: &str,
        messages: &[Message],
    ) -> Result<(), SessionStoreError> {
        if Self::take_failure(&self.failing_updates) {
            return Err(disk_full());
        }
        self.inner.update(session_id, messages).await
    }

    async fn delete(&self, session_id: &str) -> Result<(), SessionStoreError> {
        if self.hold_deletes.load(Ordering::SeqCst) {
            self.delete_gate.notified().await;
        }
        self.inner.delete(session_id).await
    }
}

pub struct Harness {
    pub provider: Arc<MockProvider>,
    pub store: Arc<FlakyStore>,
    pub conversation: Conversation,
}

pub fn harness(provider: MockProvider) -> Harness {
    let provider = Arc::new(provider);
    let store = Arc::new(FlakyStore::default());
    let conversation = Conversation::new(
        Arc::clone(&provider) as Arc<dyn CompletionProvider>,
        Arc::clone(&store) as Arc<dyn SessionStore>,
        ConversationSettings::default(),
    );

    Harness {
        provider,
        store,
        conversation,
    }
}

pub fn contents(messages: &[Message]) -> Vec<String> {
    messages
        .iter()
        .map(|message| message.content.clone())
        .collect()
}
