use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolkitError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Prompt is too large to have a {requested} thinking budget (only {available} available)")]
    InsufficientThinkingBudget { requested: i64, available: i64 },

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Text file '{path}' not found")]
    InputNotFound { path: String },

    #[error("Text file '{path}' is empty")]
    EmptyInput { path: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ToolkitError>;
