use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use super::backend::{Completion, CompletionBackend, CompletionRequest};
use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub total_tokens: u64,
    pub requests: u64,
}

/// A backend bound to one model. Every successful call adds its reported
/// token cost to the running total.
pub struct ModelClient<B> {
    backend: B,
    model: String,
    total_tokens: AtomicU64,
    requests: AtomicU64,
}

impl<B> ModelClient<B> {
    pub fn new(backend: B, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
            total_tokens: AtomicU64::new(0),
            requests: AtomicU64::new(0),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn usage(&self) -> TokenUsage {
        TokenUsage {
            total_tokens: self.total_tokens.load(Ordering::Relaxed),
            requests: self.requests.load(Ordering::Relaxed),
        }
    }
}

impl<B: CompletionBackend> ModelClient<B> {
    pub async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        let start = Instant::now();
        let completion = self.backend.complete(&self.model, &request).await?;

        self.total_tokens
            .fetch_add(completion.total_tokens, Ordering::Relaxed);
        self.requests.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            operation = request.operation,
            tokens = completion.total_tokens,
            choices = completion.choices.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Completion received"
        );
        Ok(completion)
    }

    /// First choice, trimmed of surrounding spaces and newlines.
    pub async fn complete_one(&self, request: CompletionRequest) -> Result<String> {
        let operation = request.operation;
        let completion = self.complete(request).await?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.trim_matches([' ', '\n']).to_string())
            .ok_or_else(|| Error::Decode {
                operation: operation.to_string(),
                reason: "response carries no choices".to_string(),
            })
    }
}
