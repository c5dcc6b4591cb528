use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// Parse failure reported from another thread, where only the message survives.
    #[error("CSV parsing error: {0}")]
    Malformed(String),

    #[error("CSV file must have a header line")]
    HeaderMissing,

    #[error("Missing required column: {column}")]
    MissingColumn { column: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Message encoding error: {0}")]
    Message(#[from] serde_json::Error),

    #[error("Worker error: {0}")]
    Worker(String),

    #[error("Processing cancelled by user")]
    Cancelled,

    #[error("Async task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl ProcessingError {
    /// User-initiated cancellation is not a failure and should not be shown as one.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProcessingError::Cancelled)
    }

    pub fn is_parse_error(&self) -> bool {
        matches!(self, ProcessingError::Csv(_) | ProcessingError::Malformed(_))
    }
}
