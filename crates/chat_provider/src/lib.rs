//! Minimal provider-agnostic contract for executing a single completion call.
//!
//! This crate defines the conversation data model and the one-shot completion
//! contract shared by the engine and every provider. It excludes provider
//! transport details, wire payloads, and conversation orchestration.

use std::fmt;

use async_trait::async_trait;

mod message;

pub use message::{now_millis, Attachment, Message, MessageId, Role};

/// Upper bound accepted for a deep-reasoning budget.
pub const MAX_REASONING_BUDGET: u32 = 32_768;

/// Error returned while constructing/configuring a provider before any call starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInitError {
    message: String,
}

impl ProviderInitError {
    /// Creates a new provider initialization error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the underlying error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ProviderInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ProviderInitError {}

impl From<String> for ProviderInitError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ProviderInitError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// One content part of a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    InlineBinary { mime_type: String, data: String },
}

impl Part {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

impl From<&Attachment> for Part {
    fn from(attachment: &Attachment) -> Self {
        Self::InlineBinary {
            mime_type: attachment.mime_type().to_string(),
            data: attachment.data().to_string(),
        }
    }
}

/// Provider-neutral model-facing history item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub parts: Vec<Part>,
}

/// Which model family a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelVariant {
    Default,
    DeepReasoning,
}

/// Token budget for extended reasoning, bounded by [`MAX_REASONING_BUDGET`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReasoningBudget(u32);

impl ReasoningBudget {
    /// Clamps `tokens` into `1..=MAX_REASONING_BUDGET`.
    #[must_use]
    pub fn bounded(tokens: u32) -> Self {
        Self(tokens.clamp(1, MAX_REASONING_BUDGET))
    }

    #[must_use]
    pub fn tokens(self) -> u32 {
        self.0
    }
}

/// Fully composed input for one completion call.
///
/// `reasoning_budget` is `Some` only for deep-reasoning requests; it is never
/// sent as zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub model: String,
    pub system_instruction: String,
    pub history: Vec<Turn>,
    pub new_turn: Vec<Part>,
    pub reasoning_budget: Option<ReasoningBudget>,
}

/// Successful completion output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
}

impl Completion {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Terminal failure of one completion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    /// No credential is configured; actionable by the user.
    MissingCredential,
    /// The request never produced a remote answer (connect, timeout, decode).
    Transport(String),
    /// The remote side answered with a failure.
    Remote {
        status: Option<u16>,
        message: String,
    },
}

impl CompletionError {
    #[must_use]
    pub fn is_missing_credential(&self) -> bool {
        matches!(self, Self::MissingCredential)
    }
}

impl fmt::Display for CompletionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredential => write!(f, "no API credential is configured"),
            Self::Transport(message) => write!(f, "transport error: {message}"),
            Self::Remote {
                status: Some(status),
                message,
            } => write!(f, "remote error (HTTP {status}): {message}"),
            Self::Remote {
                status: None,
                message,
            } => write!(f, "remote error: {message}"),
        }
    }
}

impl std::error::Error for CompletionError {}

/// Immutable metadata describing a completion provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub provider_id: String,
    pub default_model: String,
    pub deep_model: String,
}

/// Provider interface for executing one completion request.
#[async_trait]
pub trait CompletionProvider: Send + Sync + 'static {
    /// Returns provider/model identity metadata.
    fn profile(&self) -> ProviderProfile;

    /// Performs exactly one remote call. No retries, no partial output.
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, CompletionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoProvider;

    #[async_trait]
    impl CompletionProvider for EchoProvider {
        fn profile(&self) -> ProviderProfile {
            ProviderProfile {
                provider_id: "echo".to_string(),
                default_model: "echo-fast".to_string(),
                deep_model: "echo-deep".to_string(),
            }
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<Completion, CompletionError> {
            match request.new_turn.first() {
                Some(Part::Text(text)) => Ok(Completion::new(text.clone())),
                _ => Err(CompletionError::Transport("nothing to echo".to_string())),
            }
        }
    }

    fn request_with(parts: Vec<Part>) -> CompletionRequest {
        CompletionRequest {
            model: "echo-fast".to_string(),
            system_instruction: "sys".to_string(),
            history: Vec::new(),
            new_turn: parts,
            reasoning_budget: None,
        }
    }

    #[tokio::test]
    async fn provider_trait_objects_complete_requests() {
        let provider: Box<dyn CompletionProvider> = Box::new(EchoProvider);

        let completion = provider
            .complete(request_with(vec![Part::text("ping")]))
            .await
            .expect("echo should succeed");
        assert_eq!(completion, Completion::new("ping"));

        let error = provider
            .complete(request_with(Vec::new()))
            .await
            .expect_err("empty turn should fail");
        assert_eq!(
            error,
            CompletionError::Transport("nothing to echo".to_string())
        );
    }

    #[test]
    fn reasoning_budget_is_clamped_into_bounds() {
        assert_eq!(ReasoningBudget::bounded(0).tokens(), 1);
        assert_eq!(ReasoningBudget::bounded(1024).tokens(), 1024);
        assert_eq!(
            ReasoningBudget::bounded(u32::MAX).tokens(),
            MAX_REASONING_BUDGET
        );
    }

    #[test]
    fn attachment_converts_into_inline_binary_part() {
        let attachment = Attachment::new("diagram.png", "image/png", "AAAA");
        assert_eq!(
            Part::from(&attachment),
            Part::InlineBinary {
                mime_type: "image/png".to_string(),
                data: "AAAA".to_string(),
            }
        );
    }

    #[test]
    fn completion_error_display_distinguishes_failure_classes() {
        assert_eq!(
            CompletionError::MissingCredential.to_string(),
            "no API credential is configured"
        );
        assert!(CompletionError::MissingCredential.is_missing_credential());
        assert_eq!(
            CompletionError::Remote {
                status: Some(503),
                message: "overloaded".to_string(),
            }
            .to_string(),
            "remote error (HTTP 503): overloaded"
        );
        assert!(!CompletionError::Transport("reset".to_string()).is_missing_credential());
    }

    #[test]
    fn provider_init_error_preserves_message() {
        let error = ProviderInitError::new("invalid timeout");
        assert_eq!(error.message(), "invalid timeout");
        assert_eq!(error.to_string(), "invalid timeout");
    }
}
