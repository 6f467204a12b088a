//! Numerical computation error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Solver failures.
///
/// Never fatal: the engine substitutes equal weights across the eligible
/// universe and attaches a warning, so callers always receive a usable
/// allocation.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComputeError {
    /// The iterative solver did not converge within its iteration cap.
    #[error("[Compute] {method} did not converge after {iterations} iterations")]
    NonConvergence {
        /// Optimization method that failed.
        method: String,
        /// Iterations attempted.
        iterations: u32,
    },

    /// The optimizer exceeded its time box.
    #[error("[Compute] optimization timed out after {timeout_ms}ms")]
    Timeout {
        /// Configured timeout in milliseconds.
        timeout_ms: u64,
    },

    /// The covariance matrix is singular and cannot be inverted.
    #[error("[Compute] covariance matrix is singular")]
    SingularMatrix,

    /// A division by zero was encountered.
    #[error("[Compute] division by zero in {context}")]
    DivisionByZero {
        /// Where the division occurred.
        context: String,
    },
}
