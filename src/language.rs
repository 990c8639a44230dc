//! Recognised language names and model-assisted detection of the input
//! language and of whether it needs romanization.

use std::collections::HashSet;

use once_cell::sync::Lazy;

use crate::error::{Error, Result};
use crate::llm::{ChatMessage, CompletionBackend, CompletionRequest, ModelClient};
use crate::utils::strip_answer;

/// Number of input words shown to the model when guessing the language.
pub const DETECTION_SAMPLE_SIZE: usize = 10;

// ISO 639-1 English names, plus the common short forms people type.
const LANGUAGE_NAMES: &[&str] = &[
    "abkhazian", "afar", "afrikaans", "akan", "albanian", "amharic", "arabic", "aragonese",
    "armenian", "assamese", "avaric", "avestan", "aymara", "azerbaijani", "bambara", "bashkir",
    "basque", "belarusian", "bengali", "bislama", "bosnian", "breton", "bulgarian", "burmese",
    "cantonese", "catalan", "chamorro", "chechen", "chichewa", "chinese", "church slavic",
    "chuvash", "cornish", "corsican", "cree", "croatian", "czech", "danish", "dhivehi", "dutch",
    "dzongkha", "english", "esperanto", "estonian", "ewe", "faroese", "fijian", "filipino",
    "finnish", "french", "fulah", "galician", "ganda", "georgian", "german", "greek",
    "modern greek (1453-)", "guarani", "gujarati", "haitian", "haitian creole", "hausa", "hebrew",
    "herero", "hindi", "hiri motu", "hungarian", "icelandic", "ido", "igbo", "indonesian",
    "interlingua", "interlingue", "inuktitut", "inupiaq", "irish", "italian", "japanese",
    "javanese", "kalaallisut", "kannada", "kanuri", "kashmiri", "kazakh", "khmer",
    "central khmer", "kikuyu", "kinyarwanda", "kirghiz", "kyrgyz", "komi", "kongo", "korean",
    "kurdish", "kuanyama", "lao", "latin", "latvian", "limburgan", "lingala", "lithuanian",
    "luba-katanga", "luxembourgish", "macedonian", "malagasy", "malay", "malayalam", "maltese",
    "mandarin", "manx", "maori", "marathi", "marshallese", "mongolian", "nauru", "navajo",
    "ndonga", "nepali", "north ndebele", "northern sami", "norwegian", "norwegian bokmål",
    "norwegian nynorsk", "occitan", "ojibwa", "oriya", "oromo", "ossetian", "pali", "pashto",
    "persian", "farsi", "polish", "portuguese", "punjabi", "panjabi", "quechua", "romanian",
    "romansh", "rundi", "russian", "samoan", "sango", "sanskrit", "sardinian",
    "scottish gaelic", "gaelic", "serbian", "shona", "sichuan yi", "sindhi", "sinhala",
    "slovak", "slovenian", "somali", "south ndebele", "southern sotho", "spanish", "sundanese",
    "swahili", "swati", "swedish", "tagalog", "tahitian", "tajik", "tamil", "tatar", "telugu",
    "thai", "tibetan", "tigrinya", "tonga", "tsonga", "tswana", "turkish", "turkmen", "twi",
    "uighur", "uyghur", "ukrainian", "urdu", "uzbek", "venda", "vietnamese", "volapük",
    "walloon", "welsh", "western frisian", "wolof", "xhosa", "yiddish", "yoruba", "zhuang",
    "zulu",
];

static LANGUAGES: Lazy<HashSet<&'static str>> =
    Lazy::new(|| LANGUAGE_NAMES.iter().copied().collect());

/// Normalises `name` and checks it against the known languages.
pub fn validate_language(name: &str) -> Result<String> {
    let normalized = strip_answer(name).to_lowercase();
    if LANGUAGES.contains(normalized.as_str()) {
        Ok(normalized)
    } else {
        Err(Error::Configuration(format!(
            "Invalid language: {normalized}. Please specify a valid ISO-639 language name via `--language`"
        )))
    }
}

pub async fn detect_language<B: CompletionBackend>(
    client: &ModelClient<B>,
    words: &[String],
) -> Result<String> {
    let sample = &words[..words.len().min(DETECTION_SAMPLE_SIZE)];
    let request = CompletionRequest::new(
        "detect_language",
        vec![ChatMessage::user(format!(
            "In a single word, what language are all these words in? \
             If you do not know, type \"I do not know\". Words: {}",
            sample.join(", ")
        ))],
    );

    let answer = client.complete_one(request).await?;
    let language = strip_answer(&answer).to_lowercase();
    tracing::debug!(answer = %answer, "Model guessed input language");

    if !LANGUAGES.contains(language.as_str()) {
        return Err(Error::Configuration(format!(
            "Invalid language detected: {language}. Check that the input file contains words \
             in a single language, or pass a valid language via `--language`"
        )));
    }
    Ok(language)
}

pub async fn detect_romanization<B: CompletionBackend>(
    client: &ModelClient<B>,
    language: &str,
) -> Result<bool> {
    let request = CompletionRequest::new(
        "detect_romanization",
        vec![ChatMessage::user(format!(
            "Reply Yes or No, does \"{language}\" need romanization for an english speaker to pronounce?"
        ))],
    );

    let answer = client.complete_one(request).await?;
    match strip_answer(&answer).to_lowercase().as_str() {
        "yes" => Ok(true),
        "no" => Ok(false),
        other => Err(Error::Configuration(format!(
            "Unable to infer romanization of language {language}. Model responded: {other}. \
             Please pass `--use-romanization true` or `--use-romanization false`"
        ))),
    }
}
