//! Transport-only Gemini API client primitives.
//!
//! This crate owns request building, the `generateContent` wire payloads, and
//! response/error parsing. It intentionally contains no conversation state, no
//! retries, and no streaming: one call yields one full response or one error.

pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod payload;
pub mod url;

pub use client::{response_text, GeminiApiClient};
pub use config::GeminiApiConfig;
pub use error::GeminiApiError;
pub use payload::{
    Blob, Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part,
    ThinkingConfig,
};
pub use reqwest::StatusCode;
pub use url::generate_content_url;
