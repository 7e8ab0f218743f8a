/// Default base URL for Gemini transport requests.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// API version segment appended when the base URL does not carry one.
pub const DEFAULT_API_VERSION: &str = "v1beta";

/// Build the `generateContent` endpoint for `model`.
///
/// Normalization rules:
/// 1) blank base falls back to [`DEFAULT_GEMINI_BASE_URL`]
/// 2) keep an explicit `/v1` or `/v1beta` suffix, append `/v1beta` otherwise
/// 3) accept model ids with or without the `models/` prefix
pub fn generate_content_url(base_url: &str, model: &str) -> String {
    let base = if base_url.trim().is_empty() {
        DEFAULT_GEMINI_BASE_URL
    } else {
        base_url.trim()
    };

    let trimmed = base.trim_end_matches('/');
    let versioned = if trimmed.ends_with("/v1beta") || trimmed.ends_with("/v1") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/{DEFAULT_API_VERSION}")
    };

    let model = model.trim();
    let model = model.strip_prefix("models/").unwrap_or(model);
    format!("{versioned}/models/{model}:generateContent")
}
