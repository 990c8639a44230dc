use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, ValueHint};

use crate::card::{AugmentationResult, OutputGroup, OutputTarget};
use crate::error;
use crate::format::{column_headers, render_cards};
use crate::input::read_words;
use crate::llm::{Augmenter, CompletionBackend, ModelClient, TokenUsage, ensure_client};
use crate::output::write_group;
use crate::palette::Palette;
use crate::pipeline::augment_all;
use crate::settings::{
    DEFAULT_MAX_CONCURRENT_CARDS, DEFAULT_MODEL, DEFAULT_NUMBER_OF_SENTENCES, RequestedSettings,
    RunSettings,
};
use crate::utils::pluralize_with;

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// File with newline separated words to turn into flashcards
    #[arg(
        short,
        long,
        value_name = "PATH",
        default_value = "cards/words_to_translate.txt",
        value_hint = ValueHint::FilePath
    )]
    pub input_file: PathBuf,
    /// Output file, one per output format. Excel files must end in .xlsx, Anki/Sheets in .csv
    #[arg(
        short,
        long = "output-file",
        value_name = "PATH",
        default_values = [
            "cards/output_flashcards_anki.csv",
            "cards/output_flashcards_google_sheets.csv",
            "cards/output_flashcards_excel.xlsx",
        ],
        value_hint = ValueHint::FilePath
    )]
    pub output_files: Vec<PathBuf>,
    /// Output format for each output file, in the same order
    #[arg(
        short = 'f',
        long = "output-format",
        value_name = "FORMAT",
        value_enum,
        default_values = ["anki", "sheets", "excel"]
    )]
    pub output_formats: Vec<OutputTarget>,
    /// Truncate csv outputs instead of appending to them
    #[arg(long, default_value_t = false)]
    pub overwrite_output: bool,
    /// Language of the input words, e.g. chinese, arabic, french. Auto-detected when omitted.
    #[arg(long, value_name = "NAME")]
    pub language: Option<String>,
    /// Whether the language needs romanization (pinyin, romaji, ...). Auto-detected when omitted.
    /// When false the romanization query is not sent: three requests per word instead of four.
    #[arg(long, value_name = "BOOL")]
    pub use_romanization: Option<bool>,
    /// Number of example sentences per card
    #[arg(long, value_name = "COUNT", default_value_t = DEFAULT_NUMBER_OF_SENTENCES)]
    pub number_of_sentences: usize,
    /// Maximum number of cards generated concurrently
    #[arg(long, value_name = "COUNT", default_value_t = DEFAULT_MAX_CONCURRENT_CARDS)]
    pub max_concurrent_cards: usize,
    /// Model used for every request
    #[arg(long, value_name = "MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,
    /// Skip the confirmation before sending requests
    #[arg(short, long, default_value_t = false)]
    pub yes: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationReport {
    pub cards: usize,
    pub usage: TokenUsage,
}

pub async fn run(args: GenerateArgs) -> Result<()> {
    let start = Instant::now();

    let groups = OutputGroup::pair(args.output_files, args.output_formats)?;
    let mut requested = RequestedSettings {
        language: args.language,
        use_romanization: args.use_romanization,
        number_of_sentences: args.number_of_sentences,
        max_concurrent_cards: args.max_concurrent_cards,
    };
    requested.validate()?;

    let words = read_words(&args.input_file)
        .with_context(|| format!("Failed to load words from {}", args.input_file.display()))?;
    tracing::info!(
        input = %args.input_file.display(),
        words = words.len(),
        max_concurrent_cards = requested.max_concurrent_cards,
        "Loaded input words"
    );
    tracing::debug!(?words, "Will search these words");

    let prompt = confirmation_prompt(words.len(), &groups);
    let client = ensure_client(&args.model, &prompt, args.yes)?;

    let report = generate_cards(&client, &words, requested, &groups, args.overwrite_output)
        .await
        .context("Flashcard generation failed")?;

    println!("{}", summary_line(&report, start.elapsed().as_secs()));
    Ok(())
}

fn summary_line(report: &GenerationReport, elapsed_secs: u64) -> String {
    format!(
        "{} {} in {}s using {} tokens over {}.",
        Palette::paint(Palette::SUCCESS, "Wrote"),
        pluralize_with("flashcard", report.cards, |n| Palette::paint(
            Palette::WARNING,
            n
        )),
        elapsed_secs,
        Palette::paint(Palette::WARNING, report.usage.total_tokens),
        pluralize_with("request", report.usage.requests as usize, |n| n.to_string()),
    )
}

/// Resolves settings, augments every word and writes each output group in
/// order. Groups written before a failure stay on disk.
pub async fn generate_cards<B: CompletionBackend>(
    client: &ModelClient<B>,
    words: &[String],
    requested: RequestedSettings,
    groups: &[OutputGroup],
    overwrite: bool,
) -> error::Result<GenerationReport> {
    let settings = requested.resolve(client, words).await?;
    let results = augment_words(client, words, &settings).await?;

    let headers = column_headers(settings.use_romanization);
    for group in groups {
        let cards = render_cards(&results, words, group.target, settings.use_romanization)?;
        write_group(group, &cards, &headers, overwrite)?;
    }

    let usage = client.usage();
    tracing::info!(
        total_tokens = usage.total_tokens,
        requests = usage.requests,
        "Total tokens used"
    );
    Ok(GenerationReport {
        cards: results.len(),
        usage,
    })
}

async fn augment_words<B: CompletionBackend>(
    client: &ModelClient<B>,
    words: &[String],
    settings: &RunSettings,
) -> error::Result<Vec<AugmentationResult>> {
    let augmenter = Augmenter::new(
        client,
        settings.language.as_str(),
        settings.use_romanization,
        settings.number_of_sentences,
    );
    augment_all(&augmenter, words, settings.max_concurrent_cards).await
}

fn confirmation_prompt(word_count: usize, groups: &[OutputGroup]) -> String {
    let targets = groups
        .iter()
        .map(|group| {
            format!(
                "  {} {}",
                Palette::paint(Palette::ACCENT, group.path.display()),
                Palette::dim(format!("({})", group.target))
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "\n{} will generate {} with the model and write them to:\n{}\n",
        Palette::paint(Palette::INFO, "wordcards"),
        pluralize_with("flashcard", word_count, |n| Palette::paint(
            Palette::WARNING,
            n
        )),
        targets
    )
}
