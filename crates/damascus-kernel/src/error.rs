//! Error types for the billet kernel.

use thiserror::Error;

/// Errors that can occur while building or deforming a billet.
#[derive(Error, Debug)]
pub enum BilletError {
    /// Billet construction parameters are unusable.
    #[error("invalid billet configuration: {0}")]
    InvalidConfig(String),

    /// An operator was called with an invalid parameter.
    #[error("invalid {operation} parameter: {reason}")]
    InvalidParameter {
        /// Operator name.
        operation: &'static str,
        /// What was wrong.
        reason: String,
    },

    /// Twisting was requested before the billet was forged to a bar.
    #[error("billet must be forged to a square or octagonal bar before twisting")]
    ForgeRequired,

    /// Undo requested with an empty operation list.
    #[error("no operations to undo")]
    NothingToUndo,

    /// Settings file could not be parsed or failed validation.
    #[error("invalid settings: {0}")]
    Settings(String),

    /// Export or file access failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BilletError {
    pub(crate) fn invalid(operation: &'static str, reason: impl Into<String>) -> Self {
        BilletError::InvalidParameter {
            operation,
            reason: reason.into(),
        }
    }
}

/// Result type for billet operations.
pub type Result<T> = std::result::Result<T, BilletError>;
