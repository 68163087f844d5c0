//! Error types for dispatch operations.
//!
//! Validation and not-found failures on mutations are deliberately quiet:
//! the store maps them to no-ops per the optimistic-UI contract, logging at
//! debug level. Persistence failures surface through the toast layer instead
//! of rolling back local state.

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Error type for dispatch operations.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// An attempted mutation resolved to an out-of-bounds or invalid target.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An operation referenced an id no longer present in the snapshot.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A backend call failed. The optimistic local mutation is not rolled
    /// back; the next reconciliation is the corrective path.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Invalid configuration supplied at construction time.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl DispatchError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a persistence error.
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Whether this error should be treated as a silent no-op by the store.
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotFound(_))
    }
}
