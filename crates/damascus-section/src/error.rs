//! Error types for cross-section extraction.

use thiserror::Error;

/// Errors that can occur while slicing a billet.
#[derive(Error, Debug)]
pub enum SectionError {
    /// Invalid slice settings.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// The billet has no extent to map onto the raster.
    #[error("billet has no height or width to slice")]
    EmptyBillet,

    /// Raster export failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for cross-section operations.
pub type Result<T> = std::result::Result<T, SectionError>;
