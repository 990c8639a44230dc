use std::collections::HashSet;

use super::backend::{ChatMessage, CompletionBackend, CompletionRequest};
use super::model::ModelClient;
use crate::card::{AugmentationResult, ExampleSentence};
use crate::error::Result;
use crate::utils::{strip_answer, trim_line};

const ROMANIZATION_MAX_TOKENS: u32 = 50;
const TRANSLATION_MAX_TOKENS: u32 = 50;
const SENTENCE_MAX_TOKENS: u32 = 65;
const EXPLANATION_MAX_TOKENS: u32 = 50;

/// Runs the per-word queries for one target language.
pub struct Augmenter<'a, B> {
    client: &'a ModelClient<B>,
    language: String,
    use_romanization: bool,
    number_of_sentences: usize,
}

impl<'a, B: CompletionBackend> Augmenter<'a, B> {
    pub fn new(
        client: &'a ModelClient<B>,
        language: impl Into<String>,
        use_romanization: bool,
        number_of_sentences: usize,
    ) -> Self {
        Self {
            client,
            language: language.into(),
            use_romanization,
            number_of_sentences,
        }
    }

    fn instructor_prompt(&self) -> ChatMessage {
        ChatMessage::system(format!(
            "You are a helpful {} instructor. Be very concise. You can use incomplete sentences.",
            self.language
        ))
    }

    pub async fn fetch_romanization(&self, word: &str) -> Result<Option<String>> {
        let request = CompletionRequest::new(
            "romanization",
            vec![
                self.instructor_prompt(),
                ChatMessage::user(format!(
                    "Give the romanization (i.e. pinyin, romaji equivalent for language {language}) \
                     for this word: {word}. Put appropriate spaces, accents, and diacritics. \
                     Do not capitalize romanizations.",
                    language = self.language
                )),
            ],
        )
        .temperature(1.0)
        .max_tokens(ROMANIZATION_MAX_TOKENS)
        .top_p(1.0)
        .choices(1)
        .penalties(0.0, 0.0);

        let answer = self.client.complete_one(request).await?;
        let romanization = strip_answer(&answer);
        Ok((!romanization.is_empty()).then(|| romanization.to_string()))
    }

    pub async fn fetch_translation(&self, word: &str) -> Result<String> {
        let request = CompletionRequest::new(
            "translation",
            vec![
                self.instructor_prompt(),
                ChatMessage::user(format!(
                    "Translate this {} word or phrase into English in an idiomatic, \
                     not just literal, way: {word}.",
                    self.language
                )),
            ],
        )
        .max_tokens(TRANSLATION_MAX_TOKENS);

        self.client.complete_one(request).await
    }

    /// Asks for twice as many completions as needed and keeps the ones that
    /// follow the two-line format.
    pub async fn fetch_example_sentences(
        &self,
        word: &str,
        requested: usize,
    ) -> Result<Vec<ExampleSentence>> {
        if requested == 0 {
            return Ok(Vec::new());
        }
        let language = &self.language;
        let request = CompletionRequest::new(
            "example_sentences",
            vec![
                ChatMessage::system(format!("You are a {language} language translator.")),
                ChatMessage::user(format!(
                    "Write a short, illustrative phrase in {language} using the word {word} \
                     followed by its English translation. Formatted as {language} first, \
                     then English on a different line, i.e.: '{language} \\n English'. \
                     Do not forget either the {language} or the English translation!"
                )),
            ],
        )
        .temperature(1.0)
        .max_tokens(SENTENCE_MAX_TOKENS)
        .top_p(1.0)
        .choices(u8::try_from(requested.saturating_mul(2)).unwrap_or(u8::MAX))
        .penalties(0.0, 0.0);

        let completion = self.client.complete(request).await?;
        let sentences = parse_example_sentences(&completion.choices, requested);
        tracing::debug!(
            word,
            received = completion.choices.len(),
            kept = sentences.len(),
            "Filtered example sentences"
        );
        Ok(sentences)
    }

    pub async fn fetch_explanation(&self, word: &str) -> Result<String> {
        let request = CompletionRequest::new(
            "explanation",
            vec![
                self.instructor_prompt(),
                ChatMessage::user(format!(
                    "In {EXPLANATION_MAX_TOKENS} tokens, give one intuitive, memorable way to \
                     remember this in {}: {word}. Use mostly English.",
                    self.language
                )),
            ],
        )
        .max_tokens(EXPLANATION_MAX_TOKENS);

        self.client.complete_one(request).await
    }

    /// The queries for `word`, one after the other. Romanization is only
    /// asked for when enabled. Any failure drops the whole card.
    pub async fn augment(&self, word: &str) -> Result<AugmentationResult> {
        let romanization = if self.use_romanization {
            self.fetch_romanization(word).await?
        } else {
            None
        };
        tracing::debug!(word, ?romanization, "Romanization");

        let english_definition = self.fetch_translation(word).await?;
        tracing::debug!(word, translation = %english_definition, "Translation");

        let example_sentences = self
            .fetch_example_sentences(word, self.number_of_sentences)
            .await?;
        tracing::debug!(word, sentences = ?example_sentences, "Example sentences");

        let explanation = self.fetch_explanation(word).await?;
        tracing::debug!(word, explanation = %explanation, "Explanation");

        tracing::info!("Generated card for {word}");
        Ok(AugmentationResult {
            word: word.to_string(),
            romanization,
            english_definition,
            example_sentences,
            explanation,
        })
    }
}

/// Keeps completions made of exactly two non-blank lines (foreign, then
/// English), first occurrence per foreign line, at most `limit` of them.
pub fn parse_example_sentences(completions: &[String], limit: usize) -> Vec<ExampleSentence> {
    let mut seen = HashSet::new();
    completions
        .iter()
        .filter_map(|completion| split_sentence_pair(completion))
        .filter(|sentence| seen.insert(sentence.foreign.clone()))
        .take(limit)
        .collect()
}

fn split_sentence_pair(completion: &str) -> Option<ExampleSentence> {
    let lines: Vec<&str> = completion.lines().filter_map(trim_line).collect();
    match lines.as_slice() {
        [foreign, english] => ExampleSentence::new(foreign, english),
        _ => {
            tracing::trace!(completion, "Discarding malformed example sentence");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::llm::testing::ScriptedBackend;
    use proptest::prelude::*;

    fn sentence(foreign: &str, english: &str) -> ExampleSentence {
        ExampleSentence::new(foreign, english).unwrap()
    }

    proptest! {
        #[test]
        fn parsed_sentences_are_bounded_and_unique(
            completions in prop::collection::vec("\\PC{0,20}(\n\\PC{0,20}){0,3}", 0..12),
            limit in 0usize..6,
        ) {
            let parsed = parse_example_sentences(&completions, limit);
            prop_assert!(parsed.len() <= limit);
            let unique: HashSet<_> = parsed.iter().map(|s| s.foreign.as_str()).collect();
            prop_assert_eq!(unique.len(), parsed.len());
        }
    }

    #[test]
    fn malformed_completions_contribute_nothing() {
        let completions = vec![
            "  \n\n".to_string(),
            "only one line".to_string(),
            "one\ntwo\nthree".to_string(),
        ];
        assert!(parse_example_sentences(&completions, 3).is_empty());
    }

    #[test]
    fn blank_lines_between_halves_are_ignored() {
        let completions = vec!["\n  la mesa es grande \n\n\nthe table is big\n".to_string()];
        assert_eq!(
            parse_example_sentences(&completions, 1),
            vec![sentence("la mesa es grande", "the table is big")]
        );
    }

    #[test]
    fn duplicates_keep_first_and_truncate() {
        let completions = vec![
            "la mesa\nthe table".to_string(),
            "la mesa\na table".to_string(),
            "una mesa\na table".to_string(),
            "mi mesa\nmy table".to_string(),
        ];
        assert_eq!(
            parse_example_sentences(&completions, 2),
            vec![sentence("la mesa", "the table"), sentence("una mesa", "a table")]
        );
    }

    #[test]
    fn fewer_valid_sentences_than_requested_is_fine() {
        let completions = vec!["la mesa\nthe table".to_string(), "bad".to_string()];
        assert_eq!(parse_example_sentences(&completions, 3).len(), 1);
    }

    fn spanish_backend() -> ScriptedBackend {
        ScriptedBackend::replying(|request| match request.operation {
            "romanization" => vec![" mesa. \n".to_string()],
            "translation" => vec!["table\n".to_string()],
            "example_sentences" => {
                let n = request.n.unwrap_or(1) as usize;
                (0..n)
                    .map(|i| format!("la mesa número {}\ntable number {}", i % 2, i % 2))
                    .collect()
            }
            "explanation" => vec!["Think of a mesa, a flat-topped hill.".to_string()],
            other => panic!("unexpected operation {other}"),
        })
    }

    #[tokio::test]
    async fn sentences_request_twice_the_count() {
        let client = ModelClient::new(spanish_backend(), "test-model");
        let augmenter = Augmenter::new(&client, "spanish", false, 3);

        let sentences = augmenter.fetch_example_sentences("mesa", 3).await.unwrap();
        // Only two distinct foreign lines come back.
        assert_eq!(sentences.len(), 2);

        let requests = client.backend().requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].n, Some(6));
        assert_eq!(requests[0].max_tokens, Some(SENTENCE_MAX_TOKENS));
    }

    #[tokio::test]
    async fn zero_sentences_skips_the_request() {
        let client = ModelClient::new(spanish_backend(), "test-model");
        let augmenter = Augmenter::new(&client, "spanish", false, 0);

        assert!(augmenter.fetch_example_sentences("mesa", 0).await.unwrap().is_empty());
        assert!(client.backend().requests().is_empty());
    }

    #[tokio::test]
    async fn augment_collects_all_pieces_and_usage() {
        let client = ModelClient::new(spanish_backend(), "test-model");
        let augmenter = Augmenter::new(&client, "spanish", true, 1);

        let result = augmenter.augment("mesa").await.unwrap();
        assert_eq!(result.word, "mesa");
        assert_eq!(result.romanization.as_deref(), Some("mesa"));
        assert_eq!(result.english_definition, "table");
        assert_eq!(
            result.example_sentences,
            vec![sentence("la mesa número 0", "table number 0")]
        );
        assert_eq!(result.explanation, "Think of a mesa, a flat-topped hill.");

        let operations: Vec<_> = client
            .backend()
            .requests()
            .iter()
            .map(|request| request.operation)
            .collect();
        assert_eq!(
            operations,
            vec!["romanization", "translation", "example_sentences", "explanation"]
        );
        assert_eq!(client.usage().total_tokens, 4 * ScriptedBackend::TOKENS_PER_CALL);
    }

    #[tokio::test]
    async fn augment_without_romanization_skips_that_query() {
        let client = ModelClient::new(spanish_backend(), "test-model");
        let augmenter = Augmenter::new(&client, "spanish", false, 1);

        let result = augmenter.augment("mesa").await.unwrap();
        assert!(result.romanization.is_none());
        assert_eq!(client.usage().requests, 3);
    }

    #[tokio::test]
    async fn remote_failure_drops_the_card() {
        let backend = spanish_backend().failing_on("explanation", "rate_limit_exceeded");
        let client = ModelClient::new(backend, "test-model");
        let augmenter = Augmenter::new(&client, "spanish", false, 1);

        let err = augmenter.augment("mesa").await.unwrap_err();
        assert!(matches!(
            err,
            Error::RemoteService { ref operation, code: Some(ref code), .. }
                if operation == "explanation" && code == "rate_limit_exceeded"
        ));
    }
}
