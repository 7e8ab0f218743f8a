//! Terminal front end for the cowrite assistant.
//!
//! Wires a [`chat_provider::CompletionProvider`] and a
//! [`session_store::SessionStore`] into a [`conversation::Conversation`] and
//! drives it from a line-oriented REPL with `/commands`.

pub mod commands;
pub mod config;
pub mod logging;
pub mod providers;
pub mod render;
pub mod repl;

pub use commands::{parse_slash_command, SlashCommand};
pub use config::{AppConfig, ConfigError};
pub use providers::{provider_for_id, provider_from_config};
pub use repl::{Flow, Repl};
