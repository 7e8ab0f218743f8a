use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;

use crate::config::GeminiApiConfig;
use crate::error::{parse_error_message, GeminiApiError};
use crate::headers::build_headers;
use crate::payload::{GenerateContentRequest, GenerateContentResponse};
use crate::url::generate_content_url;

#[derive(Debug)]
pub struct GeminiApiClient {
    http: Client,
    config: GeminiApiConfig,
}

impl GeminiApiClient {
    pub fn new(config: GeminiApiConfig) -> Result<Self, GeminiApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(GeminiApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &GeminiApiConfig {
        &self.config
    }

    pub fn endpoint(&self, model: &str) -> String {
        generate_content_url(&self.config.base_url, model)
    }

    pub fn build_headers(&self) -> Result<HeaderMap, GeminiApiError> {
        let headers = build_headers(&self.config)?;
        let mut out = HeaderMap::new();
        for (key, value) in headers {
            out.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| GeminiApiError::InvalidHeader(format!("invalid key: {key}")))?,
                HeaderValue::from_str(&value).map_err(|_| {
                    GeminiApiError::InvalidHeader(format!("invalid value for {key}"))
                })?,
            );
        }
        Ok(out)
    }

    pub fn build_request(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<reqwest::RequestBuilder, GeminiApiError> {
        let headers = self.build_headers()?;
        Ok(self
            .http
            .post(self.endpoint(model))
            .headers(headers)
            .json(request))
    }

    /// Sends one `generateContent` call. Failures are returned as-is; there is
    /// no retry.
    pub async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GeminiApiError> {
        let response = self.build_request(model, request)?.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = parse_error_message(status, &body);
            tracing::debug!(%status, %message, "generateContent failed");
            return Err(GeminiApiError::Status(status, message));
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// Like [`Self::generate`], but reduces the response to its answer text.
    pub async fn generate_text(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<String, GeminiApiError> {
        let response = self.generate(model, request).await?;
        response_text(&response)
    }
}

/// Answer text of a response, or the reason there is none.
pub fn response_text(response: &GenerateContentResponse) -> Result<String, GeminiApiError> {
    if let Some(reason) = response.block_reason() {
        return Err(GeminiApiError::Blocked {
            reason: reason.to_string(),
        });
    }

    response
        .text()
        .ok_or_else(|| GeminiApiError::EmptyResponse {
            finish_reason: response.finish_reason().map(str::to_string),
        })
}
