//! Centralized error types for the temphist pipeline.
//!
//! Domain errors from the archive client and the store funnel into
//! [`AppError`] so the HTTP boundary can log the full chain while replying
//! with a message safe to show a user.

use temphist_archive::ArchiveError;
use thiserror::Error;

/// Top-level application error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a user-friendly message suitable for an HTTP response body.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Archive(ArchiveError::Network(_)) => {
                "Could not reach the weather archive. Check your connection and try again."
            }
            AppError::Archive(ArchiveError::Status { .. }) => {
                "The weather archive rejected the request. Please try again later."
            }
            AppError::Archive(ArchiveError::Schema(_)) => {
                "The weather archive returned data in an unexpected format."
            }
            AppError::Database(_) => "A database operation failed. Please try again.",
            AppError::Io(_) => "A file operation failed. Please try again.",
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }
}
