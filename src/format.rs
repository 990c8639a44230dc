use crate::card::{AugmentationResult, ExampleSentence, OutputTarget, RenderedCard};
use crate::error::{Error, Result};

pub fn column_headers(use_romanization: bool) -> Vec<&'static str> {
    let mut headers = vec!["Word"];
    if use_romanization {
        headers.push("Romanization");
    }
    headers.extend(["Translation", "Example Sentences", "Explanation"]);
    headers
}

/// Copy of `result` with the word emphasized in every foreign sentence.
pub fn emphasize_word(result: &AugmentationResult, target: OutputTarget) -> AugmentationResult {
    let word = result.word.as_str();
    if word.is_empty() {
        return result.clone();
    }
    let marked = target.emphasize(word);
    let sentences = result
        .example_sentences
        .iter()
        .map(|sentence| ExampleSentence {
            foreign: sentence.foreign.replace(word, &marked),
            english: sentence.english.clone(),
        })
        .collect();
    result.with_example_sentences(sentences)
}

pub fn join_sentences(sentences: &[ExampleSentence], target: OutputTarget) -> String {
    let line_break = target.line_break();
    sentences
        .iter()
        .map(|sentence| format!("{}{line_break}{}", sentence.foreign, sentence.english))
        .collect::<Vec<_>>()
        .join(&line_break.repeat(2))
}

/// Doubles embedded quotes and wraps the value in quotes.
pub fn quote_cell(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Renders `result` as the columns of one card for `target`.
///
/// `query_word` is the word the result was requested for; a mismatch means
/// results were paired with the wrong words and nothing may be written.
pub fn render_card(
    result: &AugmentationResult,
    query_word: &str,
    target: OutputTarget,
    use_romanization: bool,
) -> Result<RenderedCard> {
    if result.word != query_word {
        return Err(Error::ConsistencyViolation {
            expected: query_word.to_string(),
            found: result.word.clone(),
        });
    }

    let emphasized = emphasize_word(result, target);
    let mut sentences = join_sentences(&emphasized.example_sentences, target);
    if target.is_workbook() && !sentences.is_empty() {
        sentences = quote_cell(&sentences);
    }

    let mut columns = Vec::with_capacity(5);
    columns.push(result.word.clone());
    if use_romanization {
        columns.push(result.romanization.clone().unwrap_or_default());
    }
    columns.push(result.english_definition.clone());
    columns.push(sentences);
    columns.push(result.explanation.clone());

    Ok(RenderedCard { columns })
}

/// Renders every result against the word list it was produced from.
pub fn render_cards(
    results: &[AugmentationResult],
    words: &[String],
    target: OutputTarget,
    use_romanization: bool,
) -> Result<Vec<RenderedCard>> {
    if results.len() != words.len() {
        return Err(Error::ConsistencyViolation {
            expected: format!("{} cards", words.len()),
            found: format!("{} results", results.len()),
        });
    }
    results
        .iter()
        .zip(words)
        .map(|(result, word)| {
            tracing::debug!(word = %word, %target, "Rendering card");
            render_card(result, word, target, use_romanization)
        })
        .collect()
}
