//! Request validation error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for request input.
///
/// These are fatal to the individual request: there is no defensible
/// fallback for a missing portfolio id or an unrecognized scenario, so
/// the operation reports the error instead of guessing.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationError {
    /// Portfolio id was absent or empty.
    #[error("[Validation] portfolio id is required")]
    MissingPortfolioId,

    /// Pricing pack id was absent or empty.
    #[error("[Validation] pricing pack id is required")]
    MissingPricingPack,

    /// A request field failed to parse or was out of range.
    #[error("[Validation] invalid field '{field}': {reason}")]
    InvalidField {
        /// Field that failed validation.
        field: String,
        /// Reason for the failure.
        reason: String,
    },

    /// The policy input could not be interpreted in any known shape.
    #[error("[Validation] malformed policy input: {reason}")]
    MalformedPolicy {
        /// Reason the policy could not be parsed.
        reason: String,
    },

    /// Impact analysis requires at least one proposed trade.
    #[error("[Validation] proposed trade list is empty")]
    EmptyTradeList,

    /// The scenario id maps to no known shock category.
    #[error("[Validation] unsupported scenario: {scenario_id}")]
    UnsupportedScenario {
        /// The scenario id as supplied by the caller.
        scenario_id: String,
    },

    /// No regime could be resolved from any supplied source.
    #[error("[Validation] could not resolve a macro regime from the request")]
    UnresolvedRegime,

    /// A regime or cycle-phase label was supplied but not recognized.
    #[error("[Validation] unrecognized regime label: {label}")]
    UnrecognizedRegime {
        /// The label as supplied by the caller.
        label: String,
    },
}
