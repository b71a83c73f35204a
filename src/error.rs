//! Custom error types for arxivtiming.
//!
//! This module defines all error types used throughout the application.
//! All functions return `Result<T, TimingError>` instead of using `unwrap()`.

use thiserror::Error;

/// Main error type for arxivtiming operations.
///
/// Uses `thiserror` for ergonomic error handling and automatic `Display` implementation.
#[derive(Debug, Error)]
pub enum TimingError {
    /// The two raw tables of a batch are misaligned (length or id mismatch)
    #[error("Join integrity error: {0}")]
    Integrity(String),

    /// Malformed timestamp, weekday code or citation count in the raw data
    #[error("Data quality error: {0}")]
    DataQuality(String),

    /// The curve fit could not reduce the residuals within the iteration budget
    #[error("Fit did not converge after {iterations} iterations (cost {cost})")]
    NonConvergence {
        /// Iterations spent before giving up
        iterations: usize,
        /// Sum of squared residuals at the last accepted parameters
        cost: f64,
    },

    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Rate limited by external API
    #[error("Rate limited, retry after {0}s")]
    RateLimited(u64),

    /// External API returned an error
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status or error code from the API
        code: i32,
        /// Error message from API
        message: String,
    },

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read/write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),
}

/// Result type alias using `TimingError`
pub type Result<T> = std::result::Result<T, TimingError>;
