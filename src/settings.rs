use crate::error::{Error, Result};
use crate::language::{detect_language, detect_romanization, validate_language};
use crate::llm::{CompletionBackend, ModelClient};

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_NUMBER_OF_SENTENCES: usize = 3;
pub const DEFAULT_MAX_CONCURRENT_CARDS: usize = 100;

/// Scalars the generation core runs with, after detection has filled gaps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSettings {
    pub language: String,
    pub use_romanization: bool,
    pub number_of_sentences: usize,
    pub max_concurrent_cards: usize,
}

/// What the user asked for; `None` means "ask the model".
#[derive(Clone, Debug, Default)]
pub struct RequestedSettings {
    pub language: Option<String>,
    pub use_romanization: Option<bool>,
    pub number_of_sentences: usize,
    pub max_concurrent_cards: usize,
}

impl RequestedSettings {
    /// Checks everything that can be checked without the network.
    pub fn validate(&mut self) -> Result<()> {
        if self.max_concurrent_cards == 0 {
            return Err(Error::Configuration(
                "--max-concurrent-cards must be at least 1".to_string(),
            ));
        }
        if let Some(language) = self.language.as_deref() {
            self.language = Some(validate_language(language)?);
        }
        Ok(())
    }

    pub async fn resolve<B: CompletionBackend>(
        self,
        client: &ModelClient<B>,
        words: &[String],
    ) -> Result<RunSettings> {
        let language = match self.language {
            Some(language) => language,
            None => {
                tracing::info!("Auto-detecting language from provided words");
                detect_language(client, words).await?
            }
        };
        let use_romanization = match self.use_romanization {
            Some(flag) => flag,
            None => detect_romanization(client, &language).await?,
        };

        tracing::info!(%language, use_romanization, "Language settings");
        Ok(RunSettings {
            language,
            use_romanization,
            number_of_sentences: self.number_of_sentences,
            max_concurrent_cards: self.max_concurrent_cards,
        })
    }
}
