//! Conversation state and regeneration engine.
//!
//! - [`Engine`] is the synchronous state machine over the message sequence.
//! - [`prompt`] composes system instructions, history, and the new turn.
//! - [`Conversation`] drives an engine against a [`chat_provider::CompletionProvider`]
//!   and a [`session_store::SessionStore`].
//!
//! A send appends the user message immediately, then appends exactly one model
//! message (the reply, or a synthetic error reply) when the call settles. An
//! edit truncates the sequence at the edited user message and regenerates.

mod conversation;
pub mod engine;
pub mod export;
pub mod modes;
pub mod prompt;

pub use conversation::{Conversation, ConversationError, ConversationSettings};
pub use engine::{
    Dispatch, Engine, Epoch, PersistenceStatus, Phase, Reconciliation, Rejection, RequestId,
};
pub use export::{export_transcript, export_with_offset};
pub use modes::{ModeFlag, ModeSet, UnknownModeFlag};
pub use prompt::{compose, derive_title, ModelCatalog};
