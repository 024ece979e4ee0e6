//! Error types for blur operations.

use thiserror::Error;

/// Error type for blur operations.
#[derive(Error, Debug)]
pub enum OpsError {
    /// Invalid dimensions specified.
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// Images have incompatible sizes.
    #[error("size mismatch: {0}")]
    SizeMismatch(String),

    /// Invalid parameter value (caller error).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Joint kernel normalization produced a non-positive energy total.
    ///
    /// Only a malformed parameter table can trigger this.
    #[error("kernel normalization failed: energy total {total} is not positive")]
    NormalizationFailure {
        /// The offending total.
        total: f64,
    },

    /// A convolution task could not complete (e.g. allocation failure).
    #[error("compute failure: {0}")]
    ComputeFailure(String),

    /// Error from the core image container.
    #[error(transparent)]
    Core(#[from] bokeh_core::Error),
}

/// Result type for blur operations.
pub type OpsResult<T> = Result<T, OpsError>;
