use std::time::Duration;

use async_openai::{
    Client,
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestUserMessage, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
    },
};
use backoff::ExponentialBackoffBuilder;

use super::backend::{ChatMessage, Completion, CompletionBackend, CompletionRequest, Role};
use crate::error::{Error, Result};

/// Chat completions through the OpenAI client. Failed calls are returned
/// as they are, never retried.
#[derive(Clone, Debug)]
pub struct OpenAiChatBackend {
    client: Client<OpenAIConfig>,
}

impl OpenAiChatBackend {
    pub fn new(api_key: &str) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        let no_retries = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(Duration::ZERO))
            .build();
        Self {
            client: Client::with_config(config).with_backoff(no_retries),
        }
    }
}

impl CompletionBackend for OpenAiChatBackend {
    async fn complete(&self, model: &str, request: &CompletionRequest) -> Result<Completion> {
        let body = build_request(model, request)?;
        let response = self
            .client
            .chat()
            .create(body)
            .await
            .map_err(|err| into_error(err, request.operation))?;
        into_completion(response, request.operation)
    }
}

fn to_message(message: &ChatMessage) -> ChatCompletionRequestMessage {
    match message.role {
        Role::System => {
            ChatCompletionRequestSystemMessage::from(message.content.as_str()).into()
        }
        Role::User => ChatCompletionRequestUserMessage::from(message.content.as_str()).into(),
    }
}

// Sent as `max_tokens`, which async-openai marks deprecated.
#[allow(deprecated)]
fn build_request(model: &str, request: &CompletionRequest) -> Result<CreateChatCompletionRequest> {
    let mut args = CreateChatCompletionRequestArgs::default();
    args.model(model)
        .messages(request.messages.iter().map(to_message).collect::<Vec<_>>());
    if let Some(temperature) = request.temperature {
        args.temperature(temperature);
    }
    if let Some(max_tokens) = request.max_tokens {
        args.max_tokens(max_tokens);
    }
    if let Some(top_p) = request.top_p {
        args.top_p(top_p);
    }
    if let Some(n) = request.n {
        args.n(n);
    }
    if let Some(penalty) = request.frequency_penalty {
        args.frequency_penalty(penalty);
    }
    if let Some(penalty) = request.presence_penalty {
        args.presence_penalty(penalty);
    }
    args.build().map_err(|err| into_error(err, request.operation))
}

fn into_error(err: OpenAIError, operation: &str) -> Error {
    let operation = operation.to_string();
    match err {
        OpenAIError::ApiError(api) => Error::RemoteService {
            operation,
            code: api.code,
            message: api.message,
        },
        OpenAIError::Reqwest(err) => match err.status() {
            Some(status) => Error::RemoteService {
                operation,
                code: Some(status.as_u16().to_string()),
                message: err.to_string(),
            },
            None => Error::Transport {
                operation,
                reason: err.to_string(),
            },
        },
        OpenAIError::InvalidArgument(reason) => {
            Error::Configuration(format!("Invalid {operation} request: {reason}"))
        }
        other => Error::Decode {
            operation,
            reason: other.to_string(),
        },
    }
}

fn into_completion(response: CreateChatCompletionResponse, operation: &str) -> Result<Completion> {
    let usage = response.usage.ok_or_else(|| Error::Decode {
        operation: operation.to_string(),
        reason: "response carries no token usage".to_string(),
    })?;
    let choices = response
        .choices
        .into_iter()
        .map(|choice| choice.message.content.unwrap_or_default())
        .collect();
    Ok(Completion {
        choices,
        total_tokens: u64::from(usage.total_tokens),
    })
}
