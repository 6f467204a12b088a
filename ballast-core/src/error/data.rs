//! Market-data error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Data availability errors.
///
/// These degrade gracefully: too little history triggers the equal-weight
/// fallback, a symbol with no data is dropped from the universe with a
/// warning, and an empty post-filter universe yields an empty result.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataError {
    /// Too few usable observations across the universe.
    #[error("[Data] insufficient history: {periods} usable periods, {required} required")]
    InsufficientHistory {
        /// Usable periods found.
        periods: usize,
        /// Minimum periods required.
        required: usize,
    },

    /// A symbol has no price history at all.
    #[error("[Data] no price history for symbol: {symbol}")]
    NoPriceHistory {
        /// Affected symbol.
        symbol: String,
    },

    /// A price series violated the strictly-increasing-dates invariant.
    #[error("[Data] unordered price series for {symbol} at {date}")]
    UnorderedSeries {
        /// Affected symbol.
        symbol: String,
        /// First out-of-order date.
        date: String,
    },

    /// Quality filtering left nothing to optimize.
    #[error("[Data] no eligible positions after filtering")]
    NoEligiblePositions,

    /// The portfolio has no holdings to rebalance.
    #[error("[Data] portfolio is empty")]
    EmptyPortfolio,

    /// An upstream provider failed.
    #[error("[Data] provider '{provider}' failed: {reason}")]
    ProviderFailure {
        /// Provider name.
        provider: String,
        /// Failure description.
        reason: String,
    },
}
