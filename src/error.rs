use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The model endpoint rejected the call.
    #[error("Remote service error in {operation}: {message}")]
    RemoteService {
        operation: String,
        code: Option<String>,
        message: String,
    },

    /// The request never produced a response.
    #[error("Transport error in {operation}: {reason}")]
    Transport { operation: String, reason: String },

    /// The response body did not have the expected shape.
    #[error("Malformed response in {operation}: {reason}")]
    Decode { operation: String, reason: String },

    /// A rendered card no longer matches the word it was built for.
    #[error("Input word {expected} and result word {found} do not match")]
    ConsistencyViolation { expected: String, found: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write delimited output: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to write workbook: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
