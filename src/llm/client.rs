use anyhow::{Context, Result, anyhow, bail};
use async_openai::{Client, config::OpenAIConfig};

use super::chat::OpenAiChatBackend;
use super::model::ModelClient;
use super::secrets::{API_KEY_ENV, ApiKeySource, lookup_api_key, prompt_for_api_key, store_api_key};
use crate::utils::ask_yn;

/// Builds the model client for a generation run. Prompts for a key when none
/// is configured and, unless `skip_confirmation`, asks before spending tokens.
pub fn ensure_client(
    model: &str,
    user_prompt: &str,
    skip_confirmation: bool,
) -> Result<ModelClient<OpenAiChatBackend>> {
    let (key, prompted_for_key) = match lookup_api_key()? {
        Some(found) => {
            tracing::debug!(source = found.source.description(), "Using stored API key");
            (found.key, false)
        }
        None => {
            println!("{user_prompt}");
            let key = prompt_for_api_key()?;
            if key.is_empty() {
                bail!(
                    "No API key provided. Set {} or run `wordcards llm --set <KEY>`.",
                    API_KEY_ENV
                );
            }
            store_api_key(&key)?;
            (key, true)
        }
    };

    // Entering a key already counts as consent.
    if !prompted_for_key && !skip_confirmation && !ask_yn(user_prompt.to_string())? {
        bail!("Flashcard generation cancelled.");
    }

    Ok(ModelClient::new(OpenAiChatBackend::new(&key), model))
}

pub async fn test_configured_api_key() -> Result<ApiKeySource> {
    let found = lookup_api_key()?.ok_or_else(|| {
        anyhow!(
            "No API key configured. Set {} or run `wordcards llm --set <KEY>`.",
            API_KEY_ENV
        )
    })?;
    let client = Client::with_config(OpenAIConfig::new().with_api_key(found.key));
    client
        .models()
        .list()
        .await
        .context("Failed to validate API key with OpenAI")?;
    Ok(found.source)
}
