// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
///
/// Probe failures never appear here; they are `OutcomeStatus` values.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Resolve error: {0}")]
    Resolve(String),

    #[error("Result sink error: {0}")]
    Sink(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
