pub mod card;
pub mod commands;
pub mod error;
pub mod format;
pub mod input;
pub mod language;
pub mod llm;
pub mod output;
pub mod palette;
pub mod pipeline;
pub mod settings;
pub mod utils;

pub use error::{Error, Result};
