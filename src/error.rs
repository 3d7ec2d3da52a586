use thiserror::Error;

/// Errors surfaced by the content API, passed through unmodified.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Request failed: {message}")]
    RequestFailed { message: String },
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Only .txt files can be imported, got: {name}")]
    UnsupportedFileType { name: String },

    #[error("Document '{name}' has no text to import")]
    EmptyDocument { name: String },

    #[error("Invalid pattern: {reason}")]
    Pattern { reason: String },

    #[error("Configuration error: {reason}")]
    Config { reason: String },

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ImportError>;
