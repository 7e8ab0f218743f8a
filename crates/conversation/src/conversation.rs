use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use attachment_codec::EncodingError;
use chat_provider::{
    Attachment, CompletionProvider, Message, MessageId, ReasoningBudget,
};
use session_store::{Session, SessionStore, SessionStoreError};
use thiserror::Error;

use crate::engine::{Dispatch, Engine, Epoch, Reconciliation, Rejection, RequestId};
use crate::export::export_transcript;
use crate::modes::{ModeFlag, ModeSet};
use crate::prompt::{ModelCatalog, DEFAULT_REASONING_BUDGET};

#[derive(Debug, Error)]
pub enum ConversationError {
    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error(transparent)]
    Store(#[from] SessionStoreError),

    #[error(transparent)]
    Attachment(#[from] EncodingError),

    #[error("session '{0}' was not found")]
    SessionNotFound(String),

    #[error("request {0} was superseded before its reply arrived")]
    Superseded(RequestId),
}

/// Construction-time knobs for a [`Conversation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSettings {
    pub owner_id: String,
    pub base_instruction: Option<String>,
    pub reasoning_budget: ReasoningBudget,
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            owner_id: "local".to_string(),
            base_instruction: None,
            reasoning_budget: ReasoningBudget::bounded(DEFAULT_REASONING_BUDGET),
        }
    }
}

/// Drives an [`Engine`] against a completion provider and a session store.
///
/// The engine lock is never held across an await point; the only suspension
/// inside a turn is the completion call and the persistence writes.
pub struct Conversation {
    engine: Mutex<Engine>,
    provider: Arc<dyn CompletionProvider>,
    store: Arc<dyn SessionStore>,
    owner_id: String,
    // Held from reconciliation through the store write so writes land in order.
    persist_lock: tokio::sync::Mutex<()>,
}

impl Conversation {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        store: Arc<dyn SessionStore>,
        settings: ConversationSettings,
    ) -> Self {
        let catalog = ModelCatalog::from_profile(&provider.profile(), settings.reasoning_budget);
        Self {
            engine: Mutex::new(Engine::new(catalog, settings.base_instruction)),
            provider,
            store,
            owner_id: settings.owner_id,
            persist_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Runs `f` against the current engine state.
    pub fn inspect<R>(&self, f: impl FnOnce(&Engine) -> R) -> R {
        f(&self.lock_engine())
    }

    pub fn messages(&self) -> Vec<Message> {
        self.lock_engine().messages().to_vec()
    }

    pub fn set_input(&self, text: impl Into<String>) {
        self.lock_engine().set_input(text);
    }

    pub fn toggle_mode(&self, flag: ModeFlag) -> bool {
        self.lock_engine().toggle_mode(flag)
    }

    pub fn set_modes(&self, modes: ModeSet) {
        self.lock_engine().set_modes(modes);
    }

    pub fn stage_attachment(&self, attachment: Attachment) {
        self.lock_engine().stage_attachment(attachment);
    }

    /// Encodes a file and stages it for the next send.
    pub async fn attach_file(&self, path: &Path) -> Result<Attachment, ConversationError> {
        let attachment = attachment_codec::encode_path(path).await?;
        self.stage_attachment(attachment.clone());
        Ok(attachment)
    }

    pub fn remove_staged_attachment(&self, index: usize) -> Result<Attachment, ConversationError> {
        Ok(self.lock_engine().remove_staged_attachment(index)?)
    }

    pub fn new_chat(&self) -> Result<(), ConversationError> {
        Ok(self.lock_engine().new_chat()?)
    }

    /// Sends `text` with `attachments` and waits for the reconciled reply.
    pub async fn send(
        &self,
        text: &str,
        attachments: Vec<Attachment>,
    ) -> Result<Message, ConversationError> {
        let dispatch = self.lock_engine().send(text, attachments)?;
        self.drive(dispatch).await
    }

    /// Sends the input buffer and staged attachments.
    pub async fn submit(&self) -> Result<Message, ConversationError> {
        let dispatch = self.lock_engine().submit()?;
        self.drive(dispatch).await
    }

    pub async fn edit(
        &self,
        message_id: &MessageId,
        new_text: &str,
    ) -> Result<Message, ConversationError> {
        let dispatch = self.lock_engine().edit(message_id, new_text)?;
        self.drive(dispatch).await
    }

    /// The owner's sessions, most recent first.
    pub async fn sessions(&self) -> Result<Vec<Session>, ConversationError> {
        Ok(self.store.list(&self.owner_id).await?)
    }

    pub async fn load(&self, session_id: &str) -> Result<(), ConversationError> {
        if self.lock_engine().is_awaiting_response() {
            return Err(Rejection::Busy.into());
        }

        let session = self
            .store
            .get(session_id)
            .await?
            .ok_or_else(|| ConversationError::SessionNotFound(session_id.to_string()))?;
        Ok(self.lock_engine().load(session)?)
    }

    /// Deletes a stored session. Returns `true` when it was the active one.
    pub async fn delete_session(&self, session_id: &str) -> Result<bool, ConversationError> {
        self.lock_engine().begin_delete(session_id)?;
        let outcome = self.store.delete(session_id).await;
        let was_active = self
            .lock_engine()
            .finish_delete(session_id, outcome.is_ok());
        outcome?;
        Ok(was_active)
    }

    pub fn export(&self) -> String {
        export_transcript(self.lock_engine().messages())
    }

    async fn drive(&self, dispatch: Dispatch) -> Result<Message, ConversationError> {
        let Dispatch {
            request_id,
            epoch,
            request,
            create_session,
        } = dispatch;

        if let Some(first) = create_session {
            self.create_session(epoch, &first).await;
        }

        let result = self.provider.complete(request).await;
        if let Err(error) = &result {
            tracing::warn!(request_id, %error, "completion failed");
        }

        let _persist = self.persist_lock.lock().await;
        let reconciliation = self
            .lock_engine()
            .complete(request_id, result)
            .ok_or(ConversationError::Superseded(request_id))?;
        let reply = reconciliation.reply.clone();
        self.persist(reconciliation).await;
        Ok(reply)
    }

    async fn create_session(&self, epoch: Epoch, first: &Message) -> Option<String> {
        match self.store.create(&self.owner_id, first).await {
            Ok(session) => {
                self.lock_engine().bind_session(epoch, session.id.clone());
                Some(session.id)
            }
            Err(error) => {
                tracing::warn!(%error, "failed to create session");
                self.lock_engine()
                    .record_persistence(epoch, Err(error.to_string()));
                None
            }
        }
    }

    async fn persist(&self, reconciliation: Reconciliation) {
        let Reconciliation {
            epoch,
            session_id,
            messages,
            ..
        } = reconciliation;

        let session_id = match session_id {
            Some(session_id) => session_id,
            // Creation failed at send time; retry with the first message.
            None => {
                let Some(first) = messages.first() else {
                    return;
                };
                match self.create_session(epoch, first).await {
                    Some(session_id) => session_id,
                    None => return,
                }
            }
        };

        let outcome = self.store.update(&session_id, &messages).await;
        if let Err(error) = &outcome {
            tracing::warn!(session_id = %session_id, %error, "failed to persist conversation");
        }
        self.lock_engine()
            .record_persistence(epoch, outcome.map_err(|error| error.to_string()));
    }

    fn lock_engine(&self) -> MutexGuard<'_, Engine> {
        lock_unpoisoned(&self.engine)
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
