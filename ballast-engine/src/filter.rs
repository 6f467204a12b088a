//! Quality-based universe filtering.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use ballast_core::data::Position;
use ballast_core::types::Symbol;

/// Outcome of a quality filter pass.
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    /// Positions that stay in the optimization universe.
    pub kept: Vec<Position>,
    /// Positions dropped for insufficient quality. These still receive a
    /// zero target weight downstream, so they are sold, not forgotten.
    pub dropped: Vec<Position>,
    /// Human-readable warnings, one per drop.
    pub warnings: Vec<String>,
}

/// Drops holdings whose quality score falls below the policy floor.
///
/// Positions without a score are kept: score coverage is routinely
/// partial and absence of a rating is not evidence of poor quality.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityFilter;

impl QualityFilter {
    /// Applies the filter.
    #[must_use]
    pub fn apply(
        positions: Vec<Position>,
        scores: &HashMap<Symbol, Decimal>,
        min_quality_score: Decimal,
    ) -> FilterOutcome {
        if min_quality_score <= Decimal::ZERO {
            debug!("quality filter disabled (floor is zero)");
            return FilterOutcome {
                kept: positions,
                dropped: Vec::new(),
                warnings: Vec::new(),
            };
        }

        let mut kept = Vec::with_capacity(positions.len());
        let mut dropped = Vec::new();
        let mut warnings = Vec::new();

        for position in positions {
            match scores.get(&position.symbol) {
                Some(score) if *score < min_quality_score => {
                    warn!(
                        symbol = %position.symbol,
                        score = %score,
                        floor = %min_quality_score,
                        "dropping position below quality floor"
                    );
                    warnings.push(format!(
                        "{} dropped: quality score {} below floor {}",
                        position.symbol, score, min_quality_score
                    ));
                    dropped.push(position);
                }
                _ => kept.push(position),
            }
        }

        FilterOutcome {
            kept,
            dropped,
            warnings,
        }
    }
}
