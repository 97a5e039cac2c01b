//! Error types for scriptlines-core

use thiserror::Error;

/// Main error type for the scriptlines-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A line pattern failed to compile
    #[error("invalid {name} pattern: {source}")]
    Pattern {
        name: &'static str,
        #[source]
        source: regex::Error,
    },

    /// Invalid file discovery pattern
    #[error("invalid glob pattern: {0}")]
    Glob(#[from] glob::PatternError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Logging setup error
    #[error("logging error: {0}")]
    Logging(String),

    /// Show code or folder name that maps to no known show
    #[error("unknown show: {0}")]
    UnknownShow(String),
}

/// Result type alias for scriptlines-core
pub type Result<T> = std::result::Result<T, Error>;
