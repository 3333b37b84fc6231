use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeckError {
    #[error("I/O error: {0}")]
    Io(Box<std::io::Error>),

    #[error("CSV error: {0}")]
    Csv(Box<csv::Error>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(Box<reqwest::Error>),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Row {row}: invalid number in '{field}': '{value}'")]
    InvalidNumber { row: usize, field: String, value: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Translation failed: {0}")]
    Translation(String),

    #[error("The CSV file has no data rows")]
    EmptyFile,

    #[error("Import cancelled")]
    Cancelled,

    #[error("DeckError: {0}")]
    Custom(String),
}

impl From<std::io::Error> for DeckError {
    fn from(error: std::io::Error) -> Self {
        DeckError::Io(Box::new(error))
    }
}

impl From<csv::Error> for DeckError {
    fn from(error: csv::Error) -> Self {
        DeckError::Csv(Box::new(error))
    }
}

impl From<reqwest::Error> for DeckError {
    fn from(error: reqwest::Error) -> Self {
        DeckError::Http(Box::new(error))
    }
}

impl DeckError {
    /// Transport failures are the only retryable class of error.
    pub fn is_transport(&self) -> bool {
        matches!(self, DeckError::Transport(_))
    }
}
