//! Error taxonomy for the registration pipeline.
//!
//! Errors fall into three recovery tiers: attempt-level (`Solver`, feature
//! computation via `Core`) recovered by skipping the attempt, subject-level
//! (`DataUnavailable`, `NoCandidates`) recovered without aborting the batch,
//! and persistence-level (`AlreadyExists`, `NotFound`) surfaced to callers.

use thiserror::Error;
use voxalign_core::CoreError;

/// Main error type for registration workflows.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// Subject data could not be provisioned; recovered by persisting the
    /// identity fallback.
    #[error("Data unavailable for subject '{subject}': {reason}")]
    DataUnavailable { subject: String, reason: String },

    /// Core volume/feature/transform failure (attempt-level).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The solver failed to converge on one attempt.
    #[error("Solver error: {0}")]
    Solver(String),

    /// Every attempt for a subject failed; reportable, not persisted.
    #[error("No successful candidates to rank")]
    NoCandidates,

    /// A transform record already exists and overwrite was not requested.
    #[error("Transform record already exists for subject '{subject}'")]
    AlreadyExists { subject: String },

    /// No transform record exists for the subject.
    #[error("No transform record found for subject '{subject}'")]
    NotFound { subject: String },

    /// Invalid batch configuration or subject identifier.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The attempt or subject was cancelled before completion.
    #[error("Operation cancelled")]
    Cancelled,

    /// Store I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transform record (de)serialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for registration operations.
pub type Result<T> = std::result::Result<T, RegistrationError>;

impl RegistrationError {
    /// Create a solver error.
    pub fn solver(msg: impl Into<String>) -> Self {
        Self::Solver(msg.into())
    }

    /// Create a data-unavailable error for a subject.
    pub fn data_unavailable(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            subject: subject.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }
}
