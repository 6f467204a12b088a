//! Portfolio impact simulation for a proposed trade set.

use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ballast_core::data::{Position, Provenance};
use ballast_core::error::ValidationError;
use ballast_core::types::{Amount, Symbol, Timestamp};

use crate::trades::TradeProposal;

/// Portfolio-level impact of applying a trade set.
///
/// Expected return, volatility, Sharpe, and max-drawdown deltas are
/// deliberately absent: they need a historical-return integration this
/// engine does not yet have, and approximating them silently would be
/// worse than omitting them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactAnalysis {
    /// Portfolio value before trading.
    pub current_value: Amount,
    /// Portfolio value after trading, net of estimated costs.
    pub post_rebalance_value: Amount,
    /// Value change (always the cost drag for same-pack trades).
    pub value_delta: Amount,
    /// Share of value in the ten largest positions, before, percent.
    pub current_concentration_top10_pct: Decimal,
    /// Share of value in the ten largest positions, after, percent.
    pub post_concentration_top10_pct: Decimal,
    /// Concentration change in percentage points.
    pub concentration_delta: Decimal,
    /// Position-weighted quality score change, when scores were given.
    pub quality_score_delta: Option<Decimal>,
    /// Position-weighted moat score change, when scores were given.
    pub moat_score_delta: Option<Decimal>,
    /// Non-fatal notes accumulated during simulation.
    pub warnings: Vec<String>,
    /// Populated when the request failed validation.
    pub error: Option<String>,
    /// Source and caching metadata.
    pub provenance: Provenance,
}

impl ImpactAnalysis {
    const SOURCE: &'static str = "impact_simulator";

    /// A well-formed zero analysis carrying an error, for failed
    /// requests.
    #[must_use]
    pub fn failed(as_of: Timestamp, error: impl Into<String>) -> Self {
        Self {
            current_value: Amount::ZERO,
            post_rebalance_value: Amount::ZERO,
            value_delta: Amount::ZERO,
            current_concentration_top10_pct: Decimal::ZERO,
            post_concentration_top10_pct: Decimal::ZERO,
            concentration_delta: Decimal::ZERO,
            quality_score_delta: None,
            moat_score_delta: None,
            warnings: Vec::new(),
            error: Some(error.into()),
            provenance: Provenance::live(Self::SOURCE, as_of),
        }
    }
}

/// Applies a proposed trade set to current holdings and recomputes
/// portfolio statistics. Pure: neither input is mutated.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImpactSimulator;

impl ImpactSimulator {
    /// Runs the simulation.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyTradeList` for an empty trade set;
    /// impact of doing nothing is not a meaningful question and callers
    /// asking it usually have a bug upstream.
    pub fn simulate(
        positions: &[Position],
        trades: &[TradeProposal],
        quality_scores: Option<&HashMap<Symbol, Decimal>>,
        moat_scores: Option<&HashMap<Symbol, Decimal>>,
        as_of: Timestamp,
    ) -> Result<ImpactAnalysis, ValidationError> {
        if trades.is_empty() {
            return Err(ValidationError::EmptyTradeList);
        }

        let mut warnings = Vec::new();

        // Pre-trade holdings valued off the snapshot.
        let pre: HashMap<Symbol, Decimal> = positions
            .iter()
            .map(|p| (p.symbol.clone(), p.market_value.as_decimal()))
            .collect();
        let current_value: Decimal = pre.values().copied().sum();

        // Post-trade holdings: each trade pins its symbol at target
        // shares. Trades may introduce symbols not currently held.
        let mut post = pre.clone();
        let mut total_costs = Decimal::ZERO;
        for trade in trades {
            if !pre.contains_key(&trade.symbol) && trade.target_shares > Decimal::ZERO {
                warnings.push(format!(
                    "{} enters the portfolio via the proposed trades",
                    trade.symbol
                ));
            }
            post.insert(
                trade.symbol.clone(),
                trade.target_shares * trade.price.as_decimal(),
            );
            total_costs += trade.estimated_cost.as_decimal();
        }

        // Same-pack rebalancing is value neutral except for costs; the
        // buy/sell residual sits in cash and carries no concentration.
        let post_value = current_value - total_costs;

        let current_conc = top10_concentration(&pre, current_value);
        let post_conc = top10_concentration(&post, current_value);

        let quality_score_delta =
            quality_scores.map(|scores| weighted_score_delta(&pre, &post, scores));
        let moat_score_delta =
            moat_scores.map(|scores| weighted_score_delta(&pre, &post, scores));

        debug!(
            trades = trades.len(),
            %current_conc,
            %post_conc,
            "impact simulated"
        );

        Ok(ImpactAnalysis {
            current_value: Amount::new(current_value),
            post_rebalance_value: Amount::new(post_value),
            value_delta: Amount::new(post_value - current_value),
            current_concentration_top10_pct: current_conc,
            post_concentration_top10_pct: post_conc,
            concentration_delta: post_conc - current_conc,
            quality_score_delta,
            moat_score_delta,
            warnings,
            error: None,
            provenance: Provenance::live(ImpactAnalysis::SOURCE, as_of),
        })
    }
}

/// Percent of portfolio value held in the ten largest positions.
fn top10_concentration(values: &HashMap<Symbol, Decimal>, total: Decimal) -> Decimal {
    if total.is_zero() {
        return Decimal::ZERO;
    }
    let mut sorted: Vec<Decimal> = values.values().map(|v| v.abs()).collect();
    sorted.sort_by(|a, b| b.cmp(a));
    let top: Decimal = sorted.iter().take(10).copied().sum();
    top / total * dec!(100)
}

/// Value-weighted average score delta between two holding maps, over
/// scored symbols only.
fn weighted_score_delta(
    pre: &HashMap<Symbol, Decimal>,
    post: &HashMap<Symbol, Decimal>,
    scores: &HashMap<Symbol, Decimal>,
) -> Decimal {
    weighted_score(post, scores) - weighted_score(pre, scores)
}

fn weighted_score(values: &HashMap<Symbol, Decimal>, scores: &HashMap<Symbol, Decimal>) -> Decimal {
    let mut scored_value = Decimal::ZERO;
    let mut weighted = Decimal::ZERO;
    for (symbol, value) in values {
        if let Some(score) = scores.get(symbol) {
            scored_value += *value;
            weighted += *value * *score;
        }
    }
    if scored_value.is_zero() {
        Decimal::ZERO
    } else {
        weighted / scored_value
    }
}
