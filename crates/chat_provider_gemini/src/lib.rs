//! Gemini-backed implementation of the shared `chat_provider` contract.
//!
//! This adapter maps provider-neutral [`CompletionRequest`]s onto the
//! `generateContent` wire shape and folds transport failures into the three
//! [`CompletionError`] classes the conversation engine distinguishes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chat_provider::{
    Completion, CompletionError, CompletionProvider, CompletionRequest, Part, ProviderInitError,
    ProviderProfile, Role, Turn,
};
use gemini_api::{
    response_text, Content, GeminiApiClient, GeminiApiConfig, GeminiApiError,
    GenerateContentRequest, GenerateContentResponse,
};

/// Stable provider identifier used by startup selection.
pub const GEMINI_PROVIDER_ID: &str = "gemini";

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_DEEP_MODEL: &str = "gemini-2.5-pro";

/// Runtime configuration for the Gemini provider.
#[derive(Clone, PartialEq, Eq)]
pub struct GeminiProviderConfig {
    /// `None` defers the failure to call time as [`CompletionError::MissingCredential`].
    pub api_key: Option<String>,
    pub default_model: String,
    pub deep_model: String,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
}

impl std::fmt::Debug for GeminiProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProviderConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("default_model", &self.default_model)
            .field("deep_model", &self.deep_model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for GeminiProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_model: DEFAULT_MODEL.to_string(),
            deep_model: DEFAULT_DEEP_MODEL.to_string(),
            base_url: None,
            timeout: None,
        }
    }
}

impl GeminiProviderConfig {
    #[must_use]
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_models(mut self, default_model: &str, deep_model: &str) -> Self {
        self.default_model = non_blank_or(default_model, DEFAULT_MODEL);
        self.deep_model = non_blank_or(deep_model, DEFAULT_DEEP_MODEL);
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn api_config(&self, api_key: &str) -> GeminiApiConfig {
        let mut config = GeminiApiConfig::new(api_key);

        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url.clone());
        }

        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }

        config
    }
}

#[async_trait]
trait GenerateClient: Send + Sync {
    async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GeminiApiError>;
}

#[async_trait]
impl GenerateClient for GeminiApiClient {
    async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GeminiApiError> {
        GeminiApiClient::generate(self, model, request).await
    }
}

/// `CompletionProvider` adapter backed by `gemini_api` transport primitives.
pub struct GeminiProvider {
    default_model: String,
    deep_model: String,
    // Absent when no credential is configured.
    client: Option<Arc<dyn GenerateClient>>,
}

impl GeminiProvider {
    /// Creates a provider using real Gemini transport.
    pub fn new(config: GeminiProviderConfig) -> Result<Self, ProviderInitError> {
        let client = match config.api_key.as_deref() {
            Some(api_key) => {
                let client = GeminiApiClient::new(config.api_config(api_key))
                    .map_err(map_init_error)?;
                Some(Arc::new(client) as Arc<dyn GenerateClient>)
            }
            None => {
                tracing::warn!("no Gemini API key configured; completions will fail until one is set");
                None
            }
        };

        Ok(Self {
            default_model: config.default_model,
            deep_model: config.deep_model,
            client,
        })
    }

    #[cfg(test)]
    fn with_client_for_tests(client: Option<Arc<dyn GenerateClient>>) -> Self {
        Self {
            default_model: DEFAULT_MODEL.to_string(),
            deep_model: DEFAULT_DEEP_MODEL.to_string(),
            client,
        }
    }
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: GEMINI_PROVIDER_ID.to_string(),
            default_model: self.default_model.clone(),
            deep_model: self.deep_model.clone(),
        }
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, CompletionError> {
        let Some(client) = self.client.as_ref() else {
            return Err(CompletionError::MissingCredential);
        };

        let model = request.model.clone();
        let payload = to_wire_request(request);
        tracing::debug!(
            model = %model,
            turns = payload.contents.len(),
            thinking = payload.generation_config.is_some(),
            "dispatching generateContent"
        );

        let response = client.generate(&model, &payload).await.map_err(map_error)?;
        let text = response_text(&response).map_err(map_error)?;
        Ok(Completion::new(text))
    }
}

/// Maps a provider-neutral request onto the Gemini wire shape.
fn to_wire_request(request: CompletionRequest) -> GenerateContentRequest {
    let mut contents: Vec<Content> = request.history.iter().map(turn_to_content).collect();
    contents.push(Content::new(
        Role::User.as_str(),
        request.new_turn.iter().map(part_to_wire).collect(),
    ));

    let mut payload = GenerateContentRequest::new(contents);
    if !request.system_instruction.trim().is_empty() {
        payload = payload.with_system_instruction(request.system_instruction);
    }
    if let Some(budget) = request.reasoning_budget {
        payload = payload.with_thinking_budget(budget.tokens());
    }
    payload
}

fn turn_to_content(turn: &Turn) -> Content {
    Content::new(
        turn.role.as_str(),
        turn.parts.iter().map(part_to_wire).collect(),
    )
}

fn part_to_wire(part: &Part) -> gemini_api::Part {
    match part {
        Part::Text(text) => gemini_api::Part::text(text.clone()),
        Part::InlineBinary { mime_type, data } => {
            gemini_api::Part::inline_data(mime_type.clone(), data.clone())
        }
    }
}

fn map_error(error: GeminiApiError) -> CompletionError {
    let mapped = match error {
        GeminiApiError::MissingApiKey => CompletionError::MissingCredential,
        GeminiApiError::Request(error) => CompletionError::Transport(error.to_string()),
        GeminiApiError::Serde(error) => {
            CompletionError::Transport(format!("malformed response: {error}"))
        }
        GeminiApiError::InvalidHeader(message) => CompletionError::Transport(message),
        GeminiApiError::Status(status, message) => CompletionError::Remote {
            status: Some(status.as_u16()),
            message,
        },
        error @ (GeminiApiError::Blocked { .. } | GeminiApiError::EmptyResponse { .. }) => {
            CompletionError::Remote {
                status: None,
                message: error.to_string(),
            }
        }
    };
    tracing::warn!(error = %mapped, "Gemini completion failed");
    mapped
}

fn map_init_error(error: GeminiApiError) -> ProviderInitError {
    ProviderInitError::new(format!("Failed to initialize gemini provider: {error}"))
}

fn non_blank_or(value: &str, fallback: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}
