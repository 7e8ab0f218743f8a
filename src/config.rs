//! Environment configuration.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chat_provider::ReasoningBudget;
use conversation::prompt::DEFAULT_REASONING_BUDGET;
use conversation::ConversationSettings;
use session_store::session_root;
use thiserror::Error;

pub const PROVIDER_ENV_VAR: &str = "COWRITE_PROVIDER";
pub const API_KEY_ENV_VAR: &str = "GEMINI_API_KEY";
pub const BASE_URL_ENV_VAR: &str = "COWRITE_GEMINI_BASE_URL";
pub const MODEL_ENV_VAR: &str = "COWRITE_MODEL";
pub const DEEP_MODEL_ENV_VAR: &str = "COWRITE_DEEP_MODEL";
pub const THINKING_BUDGET_ENV_VAR: &str = "COWRITE_THINKING_BUDGET";
pub const TIMEOUT_ENV_VAR: &str = "COWRITE_TIMEOUT_SEC";
pub const SESSION_DIR_ENV_VAR: &str = "COWRITE_SESSION_DIR";
pub const OWNER_ENV_VAR: &str = "COWRITE_OWNER_ID";
pub const SYSTEM_INSTRUCTIONS_ENV_VAR: &str = "COWRITE_SYSTEM_INSTRUCTIONS";

pub const DEFAULT_OWNER_ID: &str = "local";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{key} must be a whole number, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },

    #[error("COWRITE_TIMEOUT_SEC must be > 0")]
    NonPositiveTimeout,
}

#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub provider_id: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub deep_model: Option<String>,
    pub reasoning_budget: ReasoningBudget,
    pub timeout: Option<Duration>,
    pub session_dir: PathBuf,
    pub owner_id: String,
    pub system_instructions: Option<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("provider_id", &self.provider_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("deep_model", &self.deep_model)
            .field("reasoning_budget", &self.reasoning_budget)
            .field("timeout", &self.timeout)
            .field("session_dir", &self.session_dir)
            .field("owner_id", &self.owner_id)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    /// Reads every `COWRITE_*` variable plus the API key. Relative session
    /// directories resolve against `cwd`.
    pub fn from_env(cwd: &Path) -> Result<Self, ConfigError> {
        let reasoning_budget = match env_u64(THINKING_BUDGET_ENV_VAR)? {
            Some(tokens) => ReasoningBudget::bounded(u32::try_from(tokens).unwrap_or(u32::MAX)),
            None => ReasoningBudget::bounded(DEFAULT_REASONING_BUDGET),
        };

        let timeout = match env_u64(TIMEOUT_ENV_VAR)? {
            Some(0) => return Err(ConfigError::NonPositiveTimeout),
            Some(seconds) => Some(Duration::from_secs(seconds)),
            None => None,
        };

        let session_dir = match env_string_opt(SESSION_DIR_ENV_VAR) {
            Some(dir) => cwd.join(dir.trim()),
            None => session_root(cwd),
        };

        Ok(Self {
            provider_id: env_string_opt(PROVIDER_ENV_VAR).map(|value| value.trim().to_string()),
            api_key: env_string_opt(API_KEY_ENV_VAR).map(|value| value.trim().to_string()),
            base_url: env_string_opt(BASE_URL_ENV_VAR),
            model: env_string_opt(MODEL_ENV_VAR),
            deep_model: env_string_opt(DEEP_MODEL_ENV_VAR),
            reasoning_budget,
            timeout,
            session_dir,
            owner_id: env_string_opt(OWNER_ENV_VAR)
                .map(|value| value.trim().to_string())
                .unwrap_or_else(|| DEFAULT_OWNER_ID.to_string()),
            system_instructions: env_string_opt(SYSTEM_INSTRUCTIONS_ENV_VAR),
        })
    }

    #[must_use]
    pub fn conversation_settings(&self) -> ConversationSettings {
        ConversationSettings {
            owner_id: self.owner_id.clone(),
            base_instruction: self.system_instructions.clone(),
            reasoning_budget: self.reasoning_budget,
        }
    }
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}

fn env_u64(key: &'static str) -> Result<Option<u64>, ConfigError> {
    let Some(raw) = env_string_opt(key) else {
        return Ok(None);
    };

    raw.trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|_| ConfigError::InvalidNumber {
            key,
            value: raw.trim().to_string(),
        })
}
