//! Historical price series with gap filling.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DataError;
use crate::types::Symbol;

/// A single dated price observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Observation date.
    pub date: NaiveDate,
    /// Closing price. Zero marks a gap (holiday, stale feed) that is
    /// filled before use.
    pub price: Decimal,
}

impl PricePoint {
    /// Creates a price point.
    #[must_use]
    pub const fn new(date: NaiveDate, price: Decimal) -> Self {
        Self { date, price }
    }
}

/// An ordered per-symbol price history.
///
/// Invariant: dates are strictly increasing with no duplicates. The
/// constructor enforces this; gaps (zero prices) are tolerated and filled
/// forward-then-backward by [`PriceSeries::filled`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSeries {
    /// Symbol this series belongs to.
    pub symbol: Symbol,
    /// Ordered observations.
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Creates a series, validating the date ordering invariant.
    ///
    /// # Errors
    ///
    /// Returns `DataError::UnorderedSeries` if dates are not strictly
    /// increasing.
    pub fn new(symbol: Symbol, points: Vec<PricePoint>) -> Result<Self, DataError> {
        for pair in points.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(DataError::UnorderedSeries {
                    symbol: symbol.to_string(),
                    date: pair[1].date.to_string(),
                });
            }
        }
        Ok(Self { symbol, points })
    }

    /// Returns the observations.
    #[must_use]
    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    /// Returns the number of observations, including gaps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if the series holds no observations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns a copy with gaps (non-positive prices) forward-filled,
    /// then backward-filled for any leading gap.
    ///
    /// A series with no positive price at all is returned unchanged; the
    /// caller detects that via [`PriceSeries::usable_periods`].
    #[must_use]
    pub fn filled(&self) -> Self {
        let mut points = self.points.clone();

        let mut last_good: Option<Decimal> = None;
        for p in &mut points {
            if p.price > Decimal::ZERO {
                last_good = Some(p.price);
            } else if let Some(price) = last_good {
                p.price = price;
            }
        }

        // Backward pass for leading gaps.
        let mut next_good: Option<Decimal> = None;
        for p in points.iter_mut().rev() {
            if p.price > Decimal::ZERO {
                next_good = Some(p.price);
            } else if let Some(price) = next_good {
                p.price = price;
            }
        }

        if points.iter().any(|p| p.price <= Decimal::ZERO) {
            debug!(symbol = %self.symbol, "price series has no usable observations");
        }

        Self {
            symbol: self.symbol.clone(),
            points,
        }
    }

    /// Returns the count of observations with a positive price after
    /// gap filling.
    #[must_use]
    pub fn usable_periods(&self) -> usize {
        self.filled()
            .points
            .iter()
            .filter(|p| p.price > Decimal::ZERO)
            .count()
    }

    /// Computes simple period returns over the trailing `lookback`
    /// observations of the gap-filled series.
    ///
    /// Returns an empty vector when fewer than two usable observations
    /// exist.
    #[must_use]
    pub fn returns(&self, lookback: usize) -> Vec<Decimal> {
        let filled = self.filled();
        let usable: Vec<Decimal> = filled
            .points
            .iter()
            .filter(|p| p.price > Decimal::ZERO)
            .map(|p| p.price)
            .collect();
        if usable.len() < 2 {
            return Vec::new();
        }

        let start = usable.len().saturating_sub(lookback + 1);
        let window = &usable[start..];
        window
            .windows(2)
            .map(|pair| (pair[1] - pair[0]) / pair[0])
            .collect()
    }
}
