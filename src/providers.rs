use std::sync::Arc;

use chat_provider::{CompletionProvider, ProviderInitError};
use chat_provider_gemini::{GeminiProvider, GeminiProviderConfig, GEMINI_PROVIDER_ID};
use chat_provider_mock::{MockProvider, MOCK_PROVIDER_ID};

use crate::config::AppConfig;

pub const DEFAULT_PROVIDER_ID: &str = GEMINI_PROVIDER_ID;

/// Resolves the configured provider, defaulting to Gemini.
pub fn provider_from_config(
    config: &AppConfig,
) -> Result<Arc<dyn CompletionProvider>, ProviderInitError> {
    provider_for_id(
        config.provider_id.as_deref().unwrap_or(DEFAULT_PROVIDER_ID),
        config,
    )
}

pub fn provider_for_id(
    provider_id: &str,
    config: &AppConfig,
) -> Result<Arc<dyn CompletionProvider>, ProviderInitError> {
    match provider_id {
        GEMINI_PROVIDER_ID => {
            let gemini = gemini_config(config);
            tracing::debug!(config = ?gemini, "initializing gemini provider");
            Ok(Arc::new(GeminiProvider::new(gemini)?))
        }
        MOCK_PROVIDER_ID => Ok(Arc::new(MockProvider::default())),
        unknown => Err(ProviderInitError::new(format!(
            "Unsupported provider '{unknown}'. Available providers: {GEMINI_PROVIDER_ID}, {MOCK_PROVIDER_ID}"
        ))),
    }
}

fn gemini_config(config: &AppConfig) -> GeminiProviderConfig {
    let mut gemini = GeminiProviderConfig::new(config.api_key.clone()).with_models(
        config.model.as_deref().unwrap_or_default(),
        config.deep_model.as_deref().unwrap_or_default(),
    );

    if let Some(base_url) = &config.base_url {
        gemini = gemini.with_base_url(base_url.trim());
    }

    if let Some(timeout) = config.timeout {
        gemini = gemini.with_timeout(timeout);
    }

    gemini
}
