//! Data provider trait definitions.
//!
//! The engine is read-only with respect to its data sources: providers
//! fetch snapshots and history, the engine consumes them, and accepting
//! or recording trades is an external collaborator's responsibility.
//!
//! # Thread Safety
//!
//! Implementations must be `Send + Sync`; a single provider instance is
//! shared across concurrent request-scoped pipelines.

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::data::{Position, PriceSeries};
use crate::error::DataError;
use crate::types::{Symbol, Timestamp};

/// Supplies position snapshots valued against a pricing pack.
#[async_trait]
pub trait PositionRepository: Send + Sync {
    /// Fetches the holdings of a portfolio valued with the given pricing
    /// pack.
    ///
    /// # Errors
    ///
    /// Returns a `DataError` if the portfolio is unknown or the pack
    /// cannot be resolved.
    async fn fetch(
        &self,
        portfolio_id: &str,
        pricing_pack_id: &str,
    ) -> Result<Vec<Position>, DataError>;
}

/// Supplies historical price series per symbol.
#[async_trait]
pub trait PriceHistoryProvider: Send + Sync {
    /// Fetches up to `lookback_periods` observations per symbol, ending
    /// at `as_of`.
    ///
    /// Symbols with no history may be absent from the returned map; the
    /// engine treats them as data gaps, not errors.
    ///
    /// # Errors
    ///
    /// Returns a `DataError` only when the provider itself fails.
    async fn fetch(
        &self,
        symbols: &[Symbol],
        lookback_periods: usize,
        as_of: Timestamp,
    ) -> Result<HashMap<Symbol, PriceSeries>, DataError>;
}

/// Supplies externally computed quality ratings per symbol.
///
/// Optional collaborator: when absent, the quality filter passes every
/// position through.
#[async_trait]
pub trait QualityScoreProvider: Send + Sync {
    /// Fetches quality scores (0-100 scale) for the given symbols.
    ///
    /// Coverage may be partial; unscored symbols are simply absent from
    /// the map.
    ///
    /// # Errors
    ///
    /// Returns a `DataError` only when the provider itself fails.
    async fn scores(&self, symbols: &[Symbol]) -> Result<HashMap<Symbol, Decimal>, DataError>;
}
