use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::utils::trim_word;

/// Distinct words in first-seen order. Repeats are dropped with a warning.
pub fn parse_words(contents: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut words = Vec::new();
    for word in contents.lines().filter_map(trim_word) {
        if !seen.insert(word) {
            tracing::warn!("Word {word} is repeated in input file");
            continue;
        }
        words.push(word.to_string());
    }
    words
}

pub fn read_words(path: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path).map_err(|err| Error::io(path, err))?;
    let words = parse_words(&contents);
    if words.is_empty() {
        return Err(Error::Configuration(format!(
            "No words found in input file {}",
            path.display()
        )));
    }
    Ok(words)
}
