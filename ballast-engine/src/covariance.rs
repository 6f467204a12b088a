//! Return covariance estimation from historical prices.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use ballast_core::data::PriceSeries;
use ballast_core::error::DataError;
use ballast_core::types::Symbol;

use crate::numeric;

/// Default lookback window in trading periods (one year of dailies).
pub const DEFAULT_LOOKBACK: usize = 252;

/// Minimum usable periods before the estimate is trusted.
pub const MIN_PERIODS: usize = 30;

/// A sample covariance estimate over the optimization universe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CovarianceEstimate {
    /// Symbols in matrix order.
    pub symbols: Vec<Symbol>,
    /// N x N sample covariance of period returns.
    pub matrix: Vec<Vec<Decimal>>,
    /// Per-symbol mean period return, matrix order.
    pub mean_returns: Vec<Decimal>,
    /// Per-symbol trailing return series (time-aligned), matrix order.
    /// Retained for the historical-scenario CVaR method.
    pub returns: Vec<Vec<Decimal>>,
    /// Number of aligned return periods used.
    pub periods: usize,
    /// Symbols excluded for having no usable history at all. They keep a
    /// zero target weight downstream rather than failing the request.
    pub excluded: Vec<Symbol>,
}

/// Builds sample covariance matrices from per-symbol price history.
#[derive(Debug, Clone, Copy)]
pub struct CovarianceEstimator {
    lookback: usize,
    min_periods: usize,
}

impl Default for CovarianceEstimator {
    fn default() -> Self {
        Self {
            lookback: DEFAULT_LOOKBACK,
            min_periods: MIN_PERIODS,
        }
    }
}

impl CovarianceEstimator {
    /// Creates an estimator with a custom window.
    #[must_use]
    pub const fn new(lookback: usize, min_periods: usize) -> Self {
        Self {
            lookback,
            min_periods,
        }
    }

    /// Estimates the covariance matrix for `universe` from `history`.
    ///
    /// Symbols with no usable observations are excluded (not errors);
    /// the aligned window across the remaining symbols must reach the
    /// minimum period count.
    ///
    /// # Errors
    ///
    /// Returns `DataError::InsufficientHistory` when the aligned window
    /// is too short, and `DataError::NoEligiblePositions` when every
    /// symbol lacks data. Both degrade to the equal-weight fallback
    /// upstream.
    pub fn estimate(
        &self,
        universe: &[Symbol],
        history: &HashMap<Symbol, PriceSeries>,
    ) -> Result<CovarianceEstimate, DataError> {
        let mut symbols = Vec::with_capacity(universe.len());
        let mut per_symbol_returns: Vec<Vec<Decimal>> = Vec::with_capacity(universe.len());
        let mut excluded = Vec::new();

        for symbol in universe {
            let returns = history
                .get(symbol)
                .map(|series| series.returns(self.lookback))
                .unwrap_or_default();
            if returns.is_empty() {
                warn!(symbol = %symbol, "no usable price history; excluding from universe");
                excluded.push(symbol.clone());
            } else {
                symbols.push(symbol.clone());
                per_symbol_returns.push(returns);
            }
        }

        if symbols.is_empty() {
            return Err(DataError::NoEligiblePositions);
        }

        // Align every series on its trailing window.
        let periods = per_symbol_returns.iter().map(Vec::len).min().unwrap_or(0);
        if periods < self.min_periods {
            return Err(DataError::InsufficientHistory {
                periods,
                required: self.min_periods,
            });
        }
        let returns: Vec<Vec<Decimal>> = per_symbol_returns
            .into_iter()
            .map(|r| r[r.len() - periods..].to_vec())
            .collect();

        let mean_returns: Vec<Decimal> = returns.iter().map(|r| numeric::mean(r)).collect();

        let n = symbols.len();
        let denom = Decimal::from(periods - 1);
        let mut matrix = vec![vec![Decimal::ZERO; n]; n];
        for i in 0..n {
            for j in i..n {
                let mut cov = Decimal::ZERO;
                for t in 0..periods {
                    cov += (returns[i][t] - mean_returns[i]) * (returns[j][t] - mean_returns[j]);
                }
                cov /= denom;
                matrix[i][j] = cov;
                matrix[j][i] = cov;
            }
        }

        debug!(
            symbols = n,
            periods,
            excluded = excluded.len(),
            "covariance estimated"
        );

        Ok(CovarianceEstimate {
            symbols,
            matrix,
            mean_returns,
            returns,
            periods,
            excluded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballast_core::data::PricePoint;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn series(symbol: &str, prices: Vec<Decimal>) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let points = prices
            .into_iter()
            .enumerate()
            .map(|(i, p)| {
                PricePoint::new(start + chrono::Days::new(u64::try_from(i).unwrap()), p)
            })
            .collect();
        PriceSeries::new(Symbol::new(symbol).unwrap(), points).unwrap()
    }

    fn flat_then_step(symbol: &str, n: usize, step_every: usize) -> PriceSeries {
        // Deterministic series with mild oscillation so variance is nonzero.
        let prices = (0..n)
            .map(|i| {
                if i % step_every == 0 {
                    dec!(101)
                } else {
                    dec!(100)
                }
            })
            .collect();
        series(symbol, prices)
    }

    #[test]
    fn test_estimate_shape_and_symmetry() {
        let a = Symbol::new("AAA").unwrap();
        let b = Symbol::new("BBB").unwrap();
        let mut history = HashMap::new();
        history.insert(a.clone(), flat_then_step("AAA", 60, 2));
        history.insert(b.clone(), flat_then_step("BBB", 60, 3));

        let est = CovarianceEstimator::default()
            .estimate(&[a, b], &history)
            .unwrap();
        assert_eq!(est.symbols.len(), 2);
        assert_eq!(est.matrix.len(), 2);
        assert_eq!(est.matrix[0][1], est.matrix[1][0]);
        assert!(est.matrix[0][0] > Decimal::ZERO);
        assert_eq!(est.returns[0].len(), est.periods);
    }

    #[test]
    fn test_insufficient_history_detected() {
        let a = Symbol::new("AAA").unwrap();
        let mut history = HashMap::new();
        history.insert(a.clone(), flat_then_step("AAA", 10, 2));

        let err = CovarianceEstimator::default()
            .estimate(&[a], &history)
            .unwrap_err();
        assert!(matches!(
            err,
            DataError::InsufficientHistory { periods: 9, required: 30 }
        ));
    }

    #[test]
    fn test_symbol_with_no_data_excluded() {
        let a = Symbol::new("AAA").unwrap();
        let ghost = Symbol::new("GHOST").unwrap();
        let mut history = HashMap::new();
        history.insert(a.clone(), flat_then_step("AAA", 60, 2));

        let est = CovarianceEstimator::default()
            .estimate(&[a.clone(), ghost.clone()], &history)
            .unwrap();
        assert_eq!(est.symbols, vec![a]);
        assert_eq!(est.excluded, vec![ghost]);
    }

    #[test]
    fn test_all_symbols_missing_is_error() {
        let ghost = Symbol::new("GHOST").unwrap();
        let err = CovarianceEstimator::default()
            .estimate(&[ghost], &HashMap::new())
            .unwrap_err();
        assert_eq!(err, DataError::NoEligiblePositions);
    }

    #[test]
    fn test_series_aligned_on_trailing_window() {
        let a = Symbol::new("AAA").unwrap();
        let b = Symbol::new("BBB").unwrap();
        let mut history = HashMap::new();
        history.insert(a.clone(), flat_then_step("AAA", 120, 2));
        history.insert(b.clone(), flat_then_step("BBB", 40, 3));

        let est = CovarianceEstimator::default()
            .estimate(&[a, b], &history)
            .unwrap();
        assert_eq!(est.periods, 39);
    }
}
