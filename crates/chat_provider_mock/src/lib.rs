//! Deterministic mock implementation of the shared `chat_provider` contract.
//!
//! This crate contains no transport logic and is intended for local
//! development and contract-level integration testing.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chat_provider::{
    Completion, CompletionError, CompletionProvider, CompletionRequest, Part, ProviderProfile,
};
use tokio::sync::Notify;

/// Stable provider identifier used for explicit startup selection.
pub const MOCK_PROVIDER_ID: &str = "mock";

/// Scripted result of one `complete` call.
pub type MockOutcome = Result<String, CompletionError>;

/// Releases completions held by a gated [`MockProvider`].
#[derive(Debug, Clone, Default)]
pub struct MockGate {
    notify: Arc<Notify>,
}

impl MockGate {
    /// Lets exactly one held (or the next) completion finish.
    pub fn release_one(&self) {
        self.notify.notify_one();
    }
}

/// Deterministic provider used by conversation tests and local runs.
///
/// Scripted outcomes are consumed in order; once the script is exhausted every
/// call answers with an echo of the new turn.
#[derive(Debug)]
pub struct MockProvider {
    default_model: String,
    deep_model: String,
    script: Mutex<VecDeque<MockOutcome>>,
    requests: Mutex<Vec<CompletionRequest>>,
    gate: Option<MockGate>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl MockProvider {
    #[must_use]
    pub fn new(script: Vec<MockOutcome>) -> Self {
        Self {
            default_model: "mock".to_string(),
            deep_model: "mock-deep".to_string(),
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Scripts a run of successful replies.
    #[must_use]
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(replies.into_iter().map(|reply| Ok(reply.into())).collect())
    }

    /// Holds every completion until the returned gate releases it.
    #[must_use]
    pub fn gated(mut self) -> (Self, MockGate) {
        let gate = MockGate::default();
        self.gate = Some(gate.clone());
        (self, gate)
    }

    #[must_use]
    pub fn with_models(mut self, default_model: &str, deep_model: &str) -> Self {
        self.default_model = default_model.to_string();
        self.deep_model = deep_model.to_string();
        self
    }

    /// Appends an outcome to the script.
    pub fn push_outcome(&self, outcome: MockOutcome) {
        lock_unpoisoned(&self.script).push_back(outcome);
    }

    /// Every request received so far, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<CompletionRequest> {
        lock_unpoisoned(&self.requests).clone()
    }

    #[must_use]
    pub fn request_count(&self) -> usize {
        lock_unpoisoned(&self.requests).len()
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: MOCK_PROVIDER_ID.to_string(),
            default_model: self.default_model.clone(),
            deep_model: self.deep_model.clone(),
        }
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, CompletionError> {
        let fallback = echo_reply(&request);
        lock_unpoisoned(&self.requests).push(request);

        if let Some(gate) = &self.gate {
            gate.notify.notified().await;
        }

        let outcome = lock_unpoisoned(&self.script).pop_front();
        outcome.unwrap_or(Ok(fallback)).map(Completion::new)
    }
}

fn echo_reply(request: &CompletionRequest) -> String {
    let text: Vec<&str> = request
        .new_turn
        .iter()
        .filter_map(|part| match part {
            Part::Text(text) => Some(text.as_str()),
            Part::InlineBinary { .. } => None,
        })
        .collect();
    let attachments = request.new_turn.len() - text.len();

    match (text.is_empty(), attachments) {
        (false, 0) => format!("[{}] {}", request.model, text.join(" ")),
        (false, n) => format!("[{}] {} (+{n} attachment(s))", request.model, text.join(" ")),
        (true, n) => format!("[{}] received {n} attachment(s)", request.model),
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(parts: Vec<Part>) -> CompletionRequest {
        CompletionRequest {
            model: "mock".to_string(),
            system_instruction: "sys".to_string(),
            history: Vec::new(),
            new_turn: parts,
            reasoning_budget: None,
        }
    }

    #[test]
    fn profile_exposes_explicit_mock_provider_identity() {
        let profile = MockProvider::default().profile();

        assert_eq!(profile.provider_id, MOCK_PROVIDER_ID);
        assert_eq!(profile.default_model, "mock");
        assert_eq!(profile.deep_model, "mock-deep");
    }

    #[tokio::test]
    async fn scripted_outcomes_are_consumed_in_order_then_echo() {
        let provider = MockProvider::new(vec![
            Ok("first".to_string()),
            Err(CompletionError::MissingCredential),
        ]);

        let first = provider.complete(request(vec![Part::text("a")])).await;
        let second = provider.complete(request(vec![Part::text("b")])).await;
        let third = provider.complete(request(vec![Part::text("c")])).await;

        assert_eq!(first, Ok(Completion::new("first")));
        assert_eq!(second, Err(CompletionError::MissingCredential));
        assert_eq!(third, Ok(Completion::new("[mock] c")));
        assert_eq!(provider.request_count(), 3);
    }

    #[tokio::test]
    async fn echo_reports_attachment_only_turns() {
        let provider = MockProvider::default();
        let reply = provider
            .complete(request(vec![Part::InlineBinary {
                mime_type: "image/png".to_string(),
                data: "AAAA".to_string(),
            }]))
            .await
            .expect("echo");

        assert_eq!(reply.text, "[mock] received 1 attachment(s)");
    }

    #[tokio::test]
    async fn gated_provider_holds_completion_until_released() {
        let (provider, gate) = MockProvider::with_replies(["held"]).gated();
        let provider = Arc::new(provider);

        let task = tokio::spawn({
            let provider = Arc::clone(&provider);
            async move { provider.complete(request(vec![Part::text("q")])).await }
        });

        while provider.request_count() == 0 {
            tokio::task::yield_now().await;
        }
        assert!(!task.is_finished());

        gate.release_one();
        let reply = task.await.expect("task joins").expect("completion");
        assert_eq!(reply.text, "held");
    }
}
