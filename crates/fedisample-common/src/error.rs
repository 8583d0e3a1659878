//! Error types for fedisample.
//!
//! Structured error handling with stable numeric codes for machine parsing,
//! category classification for grouping, and recoverability hints. Per-record
//! load problems are not errors — the loader counts and skips them; only
//! conditions that invalidate a whole operation surface here.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for fedisample operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Configuration file or flag errors.
    Config,
    /// Instance data loading errors.
    Load,
    /// Correlation/fitting errors.
    Analysis,
    /// Sampling and stratification errors.
    Sampling,
    /// Probe and crawl network errors.
    Network,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Load => write!(f, "load"),
            ErrorCategory::Analysis => write!(f, "analysis"),
            ErrorCategory::Sampling => write!(f, "sampling"),
            ErrorCategory::Network => write!(f, "network"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for fedisample.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown statistic: {name}")]
    UnknownStat { name: String },

    // Load errors (20-29)
    #[error("instance data is not valid JSON at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("no usable instance records in input")]
    EmptyDataset,

    // Analysis errors (30-39)
    #[error("analysis failed: {0}")]
    Analysis(String),

    #[error("not enough data: {n} records (need at least {min})")]
    NotEnoughData { n: usize, min: usize },

    // Sampling errors (40-49)
    #[error("sampling failed: {0}")]
    Sampling(String),

    // Network errors (50-59)
    #[error("request to {instance} failed: {message}")]
    Http { instance: String, message: String },

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Stable error code, grouped by category.
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::UnknownStat { .. } => 11,
            Error::Parse { .. } => 20,
            Error::EmptyDataset => 21,
            Error::Analysis(_) => 30,
            Error::NotEnoughData { .. } => 31,
            Error::Sampling(_) => 40,
            Error::Http { .. } => 50,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::UnknownStat { .. } => ErrorCategory::Config,
            Error::Parse { .. } | Error::EmptyDataset => ErrorCategory::Load,
            Error::Analysis(_) | Error::NotEnoughData { .. } => ErrorCategory::Analysis,
            Error::Sampling(_) => ErrorCategory::Sampling,
            Error::Http { .. } => ErrorCategory::Network,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Whether the error may resolve on retry or after user action.
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Fixable by editing config/flags.
            Error::Config(_) | Error::UnknownStat { .. } => true,
            // A broken input file stays broken.
            Error::Parse { .. } => false,
            Error::EmptyDataset => false,
            Error::Analysis(_) => true,
            Error::NotEnoughData { .. } => false,
            Error::Sampling(_) => true,
            // Transient by nature.
            Error::Http { .. } => true,
            Error::Io(_) => true,
            Error::Json(_) => false,
        }
    }
}
