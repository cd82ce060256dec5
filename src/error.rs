use thiserror::Error;

#[derive(Error, Debug)]
pub enum MontageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Media probe error: {0}")]
    Probe(String),

    #[error("Transform failed: {0}")]
    Transform(String),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Remote fetch error: {0}")]
    Fetch(String),

    #[error("Storage upload error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, MontageError>;
