//! Error types for msgreader

use std::io;
use thiserror::Error;

/// Main error type for msgreader
#[derive(Error, Debug)]
pub enum MsgReaderError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("INI parse error: {0}")]
    IniParse(String),

    #[error("Speech synthesis error: {0}")]
    Speech(String),

    #[error("Speech engine initialization failed: {0}")]
    EngineInit(String),

    #[error("Keep-alive error: {0}")]
    KeepAlive(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for msgreader operations
pub type Result<T> = std::result::Result<T, MsgReaderError>;

impl From<String> for MsgReaderError {
    fn from(s: String) -> Self {
        MsgReaderError::Other(s)
    }
}

impl From<&str> for MsgReaderError {
    fn from(s: &str) -> Self {
        MsgReaderError::Other(s.to_string())
    }
}
