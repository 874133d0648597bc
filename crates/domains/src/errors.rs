//! # DomainError
//!
//! Centralized error handling for the YelpCamp workspace.
//! Upstream failures keep their original message so it can be shown to the
//! user verbatim.

use thiserror::Error;

/// The primary error type for every port and service operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Referenced entity is absent (e.g., Campground, Comment)
    #[error("{entity} not found")]
    NotFound { entity: &'static str, id: String },

    /// Rejected at the input boundary (missing field, non-image upload)
    #[error("{0}")]
    Validation(String),

    /// No (valid) identity was presented
    #[error("You need to be logged in to do that")]
    Unauthenticated,

    /// The identity does not own the resource
    #[error("You don't have permission to do that")]
    Forbidden,

    /// The media host failed; message is the upstream's
    #[error("{0}")]
    MediaStore(String),

    /// The repository failed; message is the upstream's
    #[error("{0}")]
    Repository(String),

    /// Anything else
    #[error("internal service error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Whether the failure came from one of the storage backends.
    pub const fn is_upstream(&self) -> bool {
        matches!(self, Self::MediaStore(_) | Self::Repository(_))
    }
}

/// A specialized Result type for YelpCamp logic.
pub type Result<T> = std::result::Result<T, DomainError>;
