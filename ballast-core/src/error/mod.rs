//! Error types and handling framework.
//!
//! The error system is organized hierarchically:
//! - [`BallastError`] - Top-level error type
//!   - [`ValidationError`] - Malformed request input; surfaced immediately
//!   - [`DataError`] - Missing or insufficient market data; degrades to a
//!     documented fallback (equal weighting, empty result) with warnings
//!   - [`ComputeError`] - Solver non-convergence or timeout; degrades to
//!     the equal-weight fallback with a warning
//!
//! Every engine operation converts errors into a well-formed result object
//! carrying an `error` field and provenance metadata; raw errors never
//! reach the caller.

mod compute;
mod data;
mod validation;

pub use compute::ComputeError;
pub use data::DataError;
pub use validation::ValidationError;

use thiserror::Error;

/// Error severity, driving the degradation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorSeverity {
    /// The request cannot proceed; the caller gets an error-carrying
    /// result immediately.
    Fatal,
    /// The pipeline continues on a documented fallback path with a
    /// warning attached to the result.
    Degradable,
}

/// Top-level error type for the Ballast engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BallastError {
    /// Malformed or missing request input.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Missing or insufficient market data.
    #[error(transparent)]
    Data(#[from] DataError),

    /// Numerical computation failure.
    #[error(transparent)]
    Compute(#[from] ComputeError),
}

impl BallastError {
    /// Returns the severity of this error.
    #[must_use]
    pub const fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Validation(_) => ErrorSeverity::Fatal,
            Self::Data(_) | Self::Compute(_) => ErrorSeverity::Degradable,
        }
    }

    /// Returns true if the pipeline may continue on a fallback path.
    #[must_use]
    pub const fn is_degradable(&self) -> bool {
        matches!(self.severity(), ErrorSeverity::Degradable)
    }
}

impl From<crate::types::PrimitiveError> for BallastError {
    fn from(err: crate::types::PrimitiveError) -> Self {
        Self::Validation(ValidationError::InvalidField {
            field: "primitive".to_string(),
            reason: err.to_string(),
        })
    }
}
