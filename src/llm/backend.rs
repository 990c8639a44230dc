use std::future::Future;

use crate::error::Result;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    System,
    User,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// One chat completion call. Unset sampling parameters fall back to the
/// provider defaults.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    /// Name used in logs and errors, never sent.
    pub operation: &'static str,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub n: Option<u8>,
    pub frequency_penalty: Option<f32>,
    pub presence_penalty: Option<f32>,
}

impl CompletionRequest {
    pub fn new(operation: &'static str, messages: Vec<ChatMessage>) -> Self {
        Self {
            operation,
            messages,
            temperature: None,
            max_tokens: None,
            top_p: None,
            n: None,
            frequency_penalty: None,
            presence_penalty: None,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn choices(mut self, n: u8) -> Self {
        self.n = Some(n);
        self
    }

    pub fn penalties(mut self, frequency: f32, presence: f32) -> Self {
        self.frequency_penalty = Some(frequency);
        self.presence_penalty = Some(presence);
        self
    }

    pub fn user_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == Role::User)
            .map(|message| message.content.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Completion {
    pub choices: Vec<String>,
    pub total_tokens: u64,
}

/// The remote model, as far as this crate is concerned.
pub trait CompletionBackend: Send + Sync {
    fn complete(
        &self,
        model: &str,
        request: &CompletionRequest,
    ) -> impl Future<Output = Result<Completion>> + Send;
}
