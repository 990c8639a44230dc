use std::sync::atomic::{AtomicBool, Ordering};

use futures::stream::{self, StreamExt};

use crate::card::AugmentationResult;
use crate::error::Result;
use crate::llm::{Augmenter, CompletionBackend};

/// Augments every word with at most `max_concurrent` words in flight.
/// Results line up with `words`. The first failure fails the batch: words
/// already in flight run to completion, words not yet started are skipped.
pub async fn augment_all<B: CompletionBackend>(
    augmenter: &Augmenter<'_, B>,
    words: &[String],
    max_concurrent: usize,
) -> Result<Vec<AugmentationResult>> {
    let failed = &AtomicBool::new(false);
    let mut tasks = stream::iter(words.iter().enumerate().map(|(idx, word)| async move {
        if failed.load(Ordering::SeqCst) {
            return (idx, None);
        }
        let outcome = augmenter.augment(word).await;
        if outcome.is_err() {
            failed.store(true, Ordering::SeqCst);
        }
        (idx, Some(outcome))
    }))
    .buffer_unordered(max_concurrent.max(1));

    let mut slots: Vec<Option<AugmentationResult>> = vec![None; words.len()];
    let mut first_error = None;
    let mut done = 0;
    while let Some((idx, outcome)) = tasks.next().await {
        match outcome {
            Some(Ok(result)) => {
                slots[idx] = Some(result);
                done += 1;
                tracing::debug!(done, total = words.len(), "Card finished");
            }
            Some(Err(err)) if first_error.is_none() => {
                tracing::warn!(error = %err, "Card failed, letting cards in flight finish");
                first_error = Some(err);
            }
            Some(Err(err)) => tracing::warn!(error = %err, "Card failed"),
            None => tracing::debug!(word = %words[idx], "Skipped after earlier failure"),
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(slots.into_iter().flatten().collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::llm::ModelClient;
    use crate::llm::testing::ScriptedBackend;

    fn echo_backend() -> ScriptedBackend {
        ScriptedBackend::replying(|request| {
            let word = request
                .user_prompt()
                .and_then(|prompt| prompt.split_whitespace().find(|w| w.starts_with("zz")))
                .unwrap_or("?")
                .trim_end_matches(['.', ','])
                .to_string();
            match request.operation {
                "example_sentences" => vec![format!("{word} sentence\n{word} english")],
                _ => vec![format!("{word} answer")],
            }
        })
    }

    fn words(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("zz{i}")).collect()
    }

    #[tokio::test]
    async fn ceiling_of_one_is_strictly_sequential() {
        let client = ModelClient::new(echo_backend().reentry_limit(1), "test-model");
        let augmenter = Augmenter::new(&client, "spanish", true, 1);
        let words = words(5);

        let results = augment_all(&augmenter, &words, 1).await.unwrap();
        let returned: Vec<_> = results.iter().map(|r| r.word.as_str()).collect();
        assert_eq!(returned, vec!["zz0", "zz1", "zz2", "zz3", "zz4"]);
        assert_eq!(client.backend().max_active(), 1);
    }

    #[tokio::test]
    async fn ceiling_bounds_words_in_flight() {
        let client = ModelClient::new(echo_backend().reentry_limit(3), "test-model");
        let augmenter = Augmenter::new(&client, "spanish", false, 1);
        let words = words(12);

        let results = augment_all(&augmenter, &words, 3).await.unwrap();
        assert_eq!(results.len(), 12);
        for (word, result) in words.iter().zip(&results) {
            assert_eq!(&result.word, word);
            assert_eq!(result.english_definition, format!("{word} answer"));
        }
        assert!(client.backend().max_active() > 1);
        assert!(client.backend().max_active() <= 3);
        assert_eq!(client.usage().requests, 12 * 3);
    }

    #[tokio::test]
    async fn one_failure_fails_the_batch() {
        let backend = echo_backend().failing_on("translation", "server_error");
        let client = ModelClient::new(backend, "test-model");
        let augmenter = Augmenter::new(&client, "spanish", false, 1);

        let err = augment_all(&augmenter, &words(4), 2).await.unwrap_err();
        assert!(matches!(err, Error::RemoteService { code: Some(ref code), .. } if code == "server_error"));
    }

    #[tokio::test]
    async fn failure_lets_cards_in_flight_finish_and_skips_the_rest() {
        let backend = echo_backend().failing_for_word("translation", "zz0", "server_error");
        let client = ModelClient::new(backend, "test-model");
        let augmenter = Augmenter::new(&client, "spanish", false, 1);

        let err = augment_all(&augmenter, &words(8), 4).await.unwrap_err();
        assert!(matches!(err, Error::RemoteService { code: Some(ref code), .. } if code == "server_error"));

        let completed = client.backend().completed();
        for word in ["zz1", "zz2", "zz3"] {
            let finished: Vec<_> = completed
                .iter()
                .filter(|request| request.user_prompt().is_some_and(|p| p.contains(word)))
                .map(|request| request.operation)
                .collect();
            assert_eq!(
                finished,
                vec!["translation", "example_sentences", "explanation"],
                "{word} was cut short"
            );
        }

        let requests = client.backend().requests();
        for word in ["zz4", "zz5", "zz6", "zz7"] {
            assert!(
                !requests
                    .iter()
                    .any(|request| request.user_prompt().is_some_and(|p| p.contains(word))),
                "{word} started after the batch had failed"
            );
        }
        assert_eq!(client.usage().requests, 9);
    }

    #[tokio::test]
    async fn empty_input_makes_no_calls() {
        let client = ModelClient::new(echo_backend(), "test-model");
        let augmenter = Augmenter::new(&client, "spanish", false, 1);

        assert!(augment_all(&augmenter, &[], 10).await.unwrap().is_empty());
        assert_eq!(client.usage().requests, 0);
    }
}
