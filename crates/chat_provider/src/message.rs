//! Conversation data model shared by the engine, the composer, and session storage.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Opaque unique identifier for one message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Allocates a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for MessageId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

/// Encoded binary payload owned by exactly one message.
///
/// Fields are private: an attachment is immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Attachment {
    name: String,
    mime_type: String,
    data: String,
}

impl Attachment {
    /// Wraps an already-encoded (base64) payload.
    #[must_use]
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Returns the transport-safe encoded payload.
    #[must_use]
    pub fn data(&self) -> &str {
        &self.data
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Marks a locally rendered placeholder that is never sent to the model.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_thinking: bool,
    /// Creation time in epoch milliseconds.
    pub timestamp: i64,
}

impl Message {
    #[must_use]
    pub fn user(content: impl Into<String>, attachments: Vec<Attachment>, timestamp: i64) -> Self {
        Self {
            id: MessageId::generate(),
            role: Role::User,
            content: content.into(),
            attachments,
            is_thinking: false,
            timestamp,
        }
    }

    #[must_use]
    pub fn model(content: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: MessageId::generate(),
            role: Role::Model,
            content: content.into(),
            attachments: Vec::new(),
            is_thinking: false,
            timestamp,
        }
    }

    /// Builds a model-side placeholder (greeting, "thinking..." indicator).
    #[must_use]
    pub fn placeholder(content: impl Into<String>, timestamp: i64) -> Self {
        Self {
            is_thinking: true,
            ..Self::model(content, timestamp)
        }
    }

    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.is_thinking
    }
}

/// Current wall-clock time in epoch milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    i64::try_from(nanos).unwrap_or(i64::MAX)
}
