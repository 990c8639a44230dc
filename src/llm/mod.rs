pub mod augment;
pub mod backend;
pub mod chat;
pub mod client;
pub mod model;
pub mod secrets;
#[cfg(test)]
pub mod testing;

pub use augment::{Augmenter, parse_example_sentences};
pub use backend::{ChatMessage, Completion, CompletionBackend, CompletionRequest, Role};
pub use chat::OpenAiChatBackend;
pub use client::{ensure_client, test_configured_api_key};
pub use model::{ModelClient, TokenUsage};
pub use secrets::{clear_api_key, store_api_key};
