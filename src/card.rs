use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExampleSentence {
    pub foreign: String,
    pub english: String,
}

impl ExampleSentence {
    /// Both halves are trimmed; a blank half yields `None`.
    pub fn new(foreign: &str, english: &str) -> Option<Self> {
        let foreign = foreign.trim();
        let english = english.trim();
        if foreign.is_empty() || english.is_empty() {
            return None;
        }
        Some(Self {
            foreign: foreign.to_string(),
            english: english.to_string(),
        })
    }
}

/// Everything the model produced for one input word.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AugmentationResult {
    pub word: String,
    pub romanization: Option<String>,
    pub english_definition: String,
    pub example_sentences: Vec<ExampleSentence>,
    pub explanation: String,
}

impl AugmentationResult {
    pub fn with_example_sentences(&self, example_sentences: Vec<ExampleSentence>) -> Self {
        Self {
            example_sentences,
            ..self.clone()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum OutputTarget {
    /// Semicolon separated text with HTML markup, for Anki
    Anki,
    /// Semicolon separated plain text, for Google Sheets
    Sheets,
    /// Excel workbook
    Excel,
}

impl OutputTarget {
    pub fn emphasize(self, word: &str) -> String {
        match self {
            OutputTarget::Anki => format!("<b>**{word}**</b>"),
            OutputTarget::Sheets | OutputTarget::Excel => format!("**{word}**"),
        }
    }

    pub fn line_break(self) -> &'static str {
        match self {
            OutputTarget::Anki => "<br>",
            OutputTarget::Sheets | OutputTarget::Excel => "\n",
        }
    }

    pub fn is_workbook(self) -> bool {
        matches!(self, OutputTarget::Excel)
    }

    pub fn extension(self) -> &'static str {
        if self.is_workbook() { "xlsx" } else { "csv" }
    }

    pub fn validate_path(self, path: &Path) -> Result<()> {
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(self.extension()))
            .unwrap_or(false);
        if !matches {
            return Err(Error::Configuration(format!(
                "Output file ({}) must end in .{} for {} output format",
                path.display(),
                self.extension(),
                self
            )));
        }
        Ok(())
    }
}

impl fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputTarget::Anki => "anki",
            OutputTarget::Sheets => "sheets",
            OutputTarget::Excel => "excel",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug)]
pub struct OutputGroup {
    pub path: PathBuf,
    pub target: OutputTarget,
}

impl OutputGroup {
    pub fn pair(paths: Vec<PathBuf>, targets: Vec<OutputTarget>) -> Result<Vec<Self>> {
        if paths.len() != targets.len() {
            return Err(Error::Configuration(format!(
                "Got {} output files but {} output formats; pass one format per file",
                paths.len(),
                targets.len()
            )));
        }
        let groups: Vec<Self> = paths
            .into_iter()
            .zip(targets)
            .map(|(path, target)| OutputGroup { path, target })
            .collect();
        for group in &groups {
            group.target.validate_path(&group.path)?;
        }
        Ok(groups)
    }
}

/// Column values of one card, ready to serialize.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedCard {
    pub columns: Vec<String>,
}
