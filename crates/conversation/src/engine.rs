//! Synchronous conversation state machine.
//!
//! The engine owns the message sequence and every transition on it. It never
//! performs I/O: dispatching transitions hand back a [`Dispatch`] for the
//! caller to execute, and [`Engine::complete`] folds the outcome back in.

use chat_provider::{
    now_millis, Attachment, Completion, CompletionError, CompletionRequest, Message, MessageId,
    Role,
};
use session_store::Session;
use thiserror::Error;

use crate::modes::{ModeFlag, ModeSet};
use crate::prompt::{compose, sanitize_base_instruction, ModelCatalog};

pub type RequestId = u64;

/// Identifies one conversation lifetime. Bumped whenever the sequence is
/// replaced wholesale (load, new chat, active session deleted).
pub type Epoch = u64;

pub const MISSING_CREDENTIAL_REPLY: &str =
    "No API key is configured. Set GEMINI_API_KEY and try again.";
pub const FAILURE_REPLY: &str =
    "Sorry, something went wrong while generating a response. Please try again.";
pub const GREETING: &str = "Hi! Paste some code or attach a file, then ask away.";
pub const THINKING: &str = "Thinking...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingResponse { request_id: RequestId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceStatus {
    Synced,
    /// The last write failed; in-memory state is ahead of storage.
    Degraded(String),
}

/// Synchronous rejection of a transition. State is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("nothing to send: type a message or attach a file")]
    EmptyInput,
    #[error("still waiting for the previous response")]
    Busy,
    #[error("no message with id {0}")]
    UnknownMessage(MessageId),
    #[error("message {0} was not written by the user")]
    NotUserMessage(MessageId),
    #[error("no staged attachment at index {index} ({staged} staged)")]
    NoSuchAttachment { index: usize, staged: usize },
}

/// Work handed to the caller by `send`, `submit` and `edit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub request_id: RequestId,
    pub epoch: Epoch,
    pub request: CompletionRequest,
    /// Set when this send starts a fresh conversation that needs a session.
    pub create_session: Option<Message>,
}

/// Result of folding a completion into the sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub epoch: Epoch,
    pub session_id: Option<String>,
    /// Full sequence to persist, placeholders excluded.
    pub messages: Vec<Message>,
    pub reply: Message,
}

#[derive(Debug, Clone)]
pub struct Engine {
    phase: Phase,
    messages: Vec<Message>,
    session_id: Option<String>,
    // Active session whose store delete is in flight.
    deleting: Option<String>,
    epoch: Epoch,
    staged: Vec<Attachment>,
    input: String,
    modes: ModeSet,
    catalog: ModelCatalog,
    base_instruction: String,
    next_request_id: RequestId,
    last_timestamp: i64,
    persistence: PersistenceStatus,
}

impl Engine {
    #[must_use]
    pub fn new(catalog: ModelCatalog, base_instruction: Option<String>) -> Self {
        Self {
            phase: Phase::Idle,
            messages: Vec::new(),
            session_id: None,
            deleting: None,
            epoch: 0,
            staged: Vec::new(),
            input: String::new(),
            modes: ModeSet::default(),
            catalog,
            base_instruction: sanitize_base_instruction(base_instruction),
            next_request_id: 1,
            last_timestamp: 0,
            persistence: PersistenceStatus::Synced,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_awaiting_response(&self) -> bool {
        matches!(self.phase, Phase::AwaitingResponse { .. })
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn modes(&self) -> ModeSet {
        self.modes
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn base_instruction(&self) -> &str {
        &self.base_instruction
    }

    pub fn persistence(&self) -> &PersistenceStatus {
        &self.persistence
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn staged_attachments(&self) -> &[Attachment] {
        &self.staged
    }

    /// Messages for display: the sequence plus greeting/thinking placeholders.
    pub fn transcript(&self) -> Vec<Message> {
        let mut transcript = self.messages.clone();
        if transcript.is_empty() && !self.is_awaiting_response() {
            transcript.push(Message::placeholder(GREETING, self.last_timestamp));
        }
        if self.is_awaiting_response() {
            transcript.push(Message::placeholder(THINKING, self.last_timestamp));
        }
        transcript
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn stage_attachment(&mut self, attachment: Attachment) {
        self.staged.push(attachment);
    }

    pub fn remove_staged_attachment(&mut self, index: usize) -> Result<Attachment, Rejection> {
        if index >= self.staged.len() {
            return Err(Rejection::NoSuchAttachment {
                index,
                staged: self.staged.len(),
            });
        }

        Ok(self.staged.remove(index))
    }

    /// Flips `flag`; takes effect from the next dispatch.
    pub fn toggle_mode(&mut self, flag: ModeFlag) -> bool {
        self.modes.toggle(flag)
    }

    pub fn set_modes(&mut self, modes: ModeSet) {
        self.modes = modes;
    }

    /// Sends the input buffer together with the staged attachments.
    pub fn submit(&mut self) -> Result<Dispatch, Rejection> {
        let text = self.input.clone();
        let attachments = self.staged.clone();
        self.send(&text, attachments)
    }

    /// Optimistically appends a user message and starts a request.
    pub fn send(
        &mut self,
        text: &str,
        attachments: Vec<Attachment>,
    ) -> Result<Dispatch, Rejection> {
        self.ensure_idle()?;
        // Content is kept verbatim; whitespace-only text counts as no text.
        let text = if text.trim().is_empty() {
            if attachments.is_empty() {
                return Err(Rejection::EmptyInput);
            }
            ""
        } else {
            text
        };

        let fresh = self.session_id.is_none() && self.messages.is_empty();
        let request = compose(
            &self.base_instruction,
            &self.messages,
            text,
            &attachments,
            self.modes,
            &self.catalog,
        );

        let timestamp = self.next_timestamp();
        let message = Message::user(text, attachments, timestamp);
        self.messages.push(message.clone());
        self.staged.clear();
        self.input.clear();

        let request_id = self.begin_request();
        tracing::debug!(
            request_id,
            len = self.messages.len(),
            model = %request.model,
            "dispatching send"
        );

        Ok(Dispatch {
            request_id,
            epoch: self.epoch,
            request,
            create_session: fresh.then_some(message),
        })
    }

    /// Truncates the sequence at a user message, rewrites it, and regenerates.
    ///
    /// Regeneration is unconditional, even when `new_text` equals the old
    /// content.
    pub fn edit(&mut self, message_id: &MessageId, new_text: &str) -> Result<Dispatch, Rejection> {
        self.ensure_idle()?;
        if new_text.trim().is_empty() {
            return Err(Rejection::EmptyInput);
        }

        let index = self
            .messages
            .iter()
            .position(|message| &message.id == message_id)
            .ok_or_else(|| Rejection::UnknownMessage(message_id.clone()))?;
        if self.messages[index].role != Role::User {
            return Err(Rejection::NotUserMessage(message_id.clone()));
        }

        let discarded = self.messages.len() - (index + 1);
        self.messages.truncate(index + 1);
        self.messages[index].content = new_text.to_string();

        let (history, edited) = self.messages.split_at(index);
        let edited = &edited[0];
        let request = compose(
            &self.base_instruction,
            history,
            &edited.content,
            &edited.attachments,
            self.modes,
            &self.catalog,
        );

        let request_id = self.begin_request();
        tracing::debug!(
            request_id,
            len = self.messages.len(),
            discarded,
            "dispatching edit"
        );

        Ok(Dispatch {
            request_id,
            epoch: self.epoch,
            request,
            create_session: None,
        })
    }

    /// Appends the reply (or a synthetic error reply) for `request_id`.
    ///
    /// Returns `None` and changes nothing when `request_id` is not the
    /// request currently awaited.
    pub fn complete(
        &mut self,
        request_id: RequestId,
        result: Result<Completion, CompletionError>,
    ) -> Option<Reconciliation> {
        match self.phase {
            Phase::AwaitingResponse { request_id: active } if active == request_id => {}
            _ => {
                tracing::debug!(request_id, "ignoring stale completion");
                return None;
            }
        }

        let content = match result {
            Ok(completion) => completion.text,
            Err(error) => failure_reply(&error).to_string(),
        };
        let reply = Message::model(content, self.next_timestamp());
        self.messages.push(reply.clone());
        self.phase = Phase::Idle;

        tracing::debug!(request_id, len = self.messages.len(), "reconciled reply");
        Some(Reconciliation {
            epoch: self.epoch,
            session_id: self.session_id.clone(),
            messages: self.persistable_messages(),
            reply,
        })
    }

    /// Attaches a freshly created session to the current conversation.
    ///
    /// Returns `false` when the conversation has moved on or already has one.
    pub fn bind_session(&mut self, epoch: Epoch, session_id: impl Into<String>) -> bool {
        if epoch != self.epoch || self.session_id.is_some() {
            return false;
        }

        let session_id = session_id.into();
        tracing::info!(session_id = %session_id, "bound conversation to session");
        self.session_id = Some(session_id);
        true
    }

    pub fn record_persistence(&mut self, epoch: Epoch, outcome: Result<(), String>) {
        if epoch != self.epoch {
            return;
        }

        self.persistence = match outcome {
            Ok(()) => PersistenceStatus::Synced,
            Err(error) => PersistenceStatus::Degraded(error),
        };
    }

    /// Replaces the whole conversation with a stored session.
    pub fn load(&mut self, session: Session) -> Result<(), Rejection> {
        self.ensure_idle()?;

        self.last_timestamp = session
            .messages
            .iter()
            .map(|message| message.timestamp)
            .fold(self.last_timestamp, i64::max);
        self.messages = session.messages;
        tracing::info!(session_id = %session.id, len = self.messages.len(), "loaded session");
        self.session_id = Some(session.id);
        self.reset_lifetime();
        Ok(())
    }

    /// Starts a fresh, session-less conversation.
    pub fn new_chat(&mut self) -> Result<(), Rejection> {
        self.ensure_idle()?;
        self.messages.clear();
        self.session_id = None;
        self.reset_lifetime();
        Ok(())
    }

    /// Starts deleting `session_id`.
    ///
    /// Deleting the active session is rejected while a response is pending;
    /// once started, sends and edits are rejected until [`Engine::finish_delete`].
    pub fn begin_delete(&mut self, session_id: &str) -> Result<(), Rejection> {
        if self.session_id() == Some(session_id) {
            self.ensure_idle()?;
            self.deleting = Some(session_id.to_string());
        }
        Ok(())
    }

    /// Ends a delete started by [`Engine::begin_delete`]. Resets to a fresh
    /// conversation and returns `true` when the active session was removed.
    pub fn finish_delete(&mut self, session_id: &str, deleted: bool) -> bool {
        if self.deleting.as_deref() != Some(session_id) {
            return false;
        }
        self.deleting = None;

        if !deleted || self.session_id() != Some(session_id) {
            return false;
        }

        tracing::info!(session_id, "active session deleted");
        self.messages.clear();
        self.session_id = None;
        self.reset_lifetime();
        true
    }

    fn ensure_idle(&self) -> Result<(), Rejection> {
        if self.is_awaiting_response() || self.deleting.is_some() {
            return Err(Rejection::Busy);
        }
        Ok(())
    }

    fn begin_request(&mut self) -> RequestId {
        let request_id = self.next_request_id;
        self.next_request_id += 1;
        self.phase = Phase::AwaitingResponse { request_id };
        request_id
    }

    fn reset_lifetime(&mut self) {
        self.epoch += 1;
        self.phase = Phase::Idle;
        self.persistence = PersistenceStatus::Synced;
    }

    fn persistable_messages(&self) -> Vec<Message> {
        self.messages
            .iter()
            .filter(|message| !message.is_placeholder())
            .cloned()
            .collect()
    }

    // Keeps timestamps strictly increasing within the sequence.
    fn next_timestamp(&mut self) -> i64 {
        self.last_timestamp = now_millis().max(self.last_timestamp.saturating_add(1));
        self.last_timestamp
    }
}

/// User-facing text for a failed completion.
#[must_use]
pub fn failure_reply(error: &CompletionError) -> &'static str {
    if error.is_missing_credential() {
        MISSING_CREDENTIAL_REPLY
    } else {
        FAILURE_REPLY
    }
}
