//! Trade proposal sizing and cost estimation.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use ballast_core::data::Position;
use ballast_core::types::{Amount, Price, Symbol};

use crate::optimizer::TargetWeights;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeAction {
    /// Increase the position.
    Buy,
    /// Decrease the position.
    Sell,
    /// No trade warranted (suppressed from output).
    Hold,
}

/// A sized, costed buy or sell instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeProposal {
    /// Security being traded.
    pub symbol: Symbol,
    /// Trade direction. HOLD entries are filtered out before the result
    /// is returned.
    pub action: TradeAction,
    /// Whole shares currently held.
    pub current_shares: Decimal,
    /// Whole shares after the trade.
    pub target_shares: Decimal,
    /// Current portfolio weight, percent.
    pub current_weight_pct: Decimal,
    /// Target portfolio weight, percent.
    pub target_weight_pct: Decimal,
    /// Execution price from the pricing pack.
    pub price: Price,
    /// Signed trade value: positive buys, negative sells.
    pub trade_value: Amount,
    /// Estimated commission plus market impact.
    pub estimated_cost: Amount,
    /// Short human-readable driver for the trade.
    pub rationale: String,
}

/// Transaction cost model: fixed commission per ticket plus linear
/// market impact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostModel {
    /// Fixed commission per trade ticket.
    #[serde(default = "default_fixed_commission")]
    pub fixed_commission: Decimal,
    /// Market impact in basis points of traded value.
    #[serde(default = "default_market_impact_bps")]
    pub market_impact_bps: Decimal,
}

fn default_fixed_commission() -> Decimal {
    dec!(1.00)
}

fn default_market_impact_bps() -> Decimal {
    dec!(5)
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            fixed_commission: default_fixed_commission(),
            market_impact_bps: default_market_impact_bps(),
        }
    }
}

impl CostModel {
    /// Estimated cost of a trade of the given absolute value.
    #[must_use]
    pub fn estimate(&self, trade_value: Amount) -> Amount {
        let impact = trade_value.abs().as_decimal() * self.market_impact_bps / dec!(10000);
        Amount::new(self.fixed_commission + impact)
    }
}

/// Converts target weights plus current holdings into sized trades.
///
/// Churn control: deltas under one whole share or under the minimum
/// notional are classified HOLD and suppressed, so rounding noise never
/// generates tickets.
#[derive(Debug, Clone)]
pub struct TradeProposalBuilder {
    cost_model: CostModel,
    min_notional: Decimal,
}

impl TradeProposalBuilder {
    /// Creates a builder.
    #[must_use]
    pub const fn new(cost_model: CostModel, min_notional: Decimal) -> Self {
        Self {
            cost_model,
            min_notional,
        }
    }

    /// Minimum absolute trade value for a proposal to survive.
    #[must_use]
    pub const fn min_notional(&self) -> Decimal {
        self.min_notional
    }

    /// Builds trade proposals for every symbol in the union of current
    /// holdings and target weights.
    ///
    /// Held symbols absent from the target map are sold to zero. Target
    /// symbols not held and not priced in the snapshot cannot be sized
    /// and produce a warning instead of a trade.
    #[must_use]
    pub fn build(
        &self,
        positions: &[Position],
        targets: &TargetWeights,
        total_value: Amount,
    ) -> (Vec<TradeProposal>, Vec<String>) {
        let mut warnings = Vec::new();
        if total_value.as_decimal() <= Decimal::ZERO {
            warnings.push("portfolio value is zero; no trades sized".to_string());
            return (Vec::new(), warnings);
        }

        let by_symbol: HashMap<&Symbol, &Position> =
            positions.iter().map(|p| (&p.symbol, p)).collect();

        let mut universe: Vec<Symbol> = positions.iter().map(|p| p.symbol.clone()).collect();
        let held: HashSet<&Symbol> = by_symbol.keys().copied().collect();
        let mut unpriced: Vec<Symbol> = targets
            .keys()
            .filter(|s| !held.contains(*s))
            .cloned()
            .collect();
        unpriced.sort();
        for symbol in unpriced {
            warnings.push(format!(
                "target weight for {symbol} skipped: no priced position to size against"
            ));
            warn!(symbol = %symbol, "cannot size trade for unpriced target symbol");
        }
        universe.sort();

        let mut trades = Vec::new();
        for symbol in universe {
            let position = by_symbol[&symbol];
            if position.price.is_zero() {
                warnings.push(format!("{symbol} skipped: zero price in pricing pack"));
                continue;
            }
            let target_weight = targets.get(&symbol).copied().unwrap_or(Decimal::ZERO);
            if let Some(trade) = self.size_trade(position, target_weight, total_value) {
                trades.push(trade);
            }
        }

        debug!(trades = trades.len(), "trade proposals built");
        (trades, warnings)
    }

    fn size_trade(
        &self,
        position: &Position,
        target_weight: Decimal,
        total_value: Amount,
    ) -> Option<TradeProposal> {
        let price = position.price.as_decimal();
        let current_shares = position.quantity.as_decimal();
        let current_value = position.market_value.as_decimal();
        let target_value = target_weight * total_value.as_decimal();
        let target_shares = (target_value / price).floor();

        let delta_shares = target_shares - current_shares;
        if delta_shares.abs() < Decimal::ONE {
            return None;
        }

        let trade_value = delta_shares * price;
        if trade_value.abs() < self.min_notional {
            return None;
        }

        let action = if delta_shares > Decimal::ZERO {
            TradeAction::Buy
        } else {
            TradeAction::Sell
        };
        let current_weight_pct = current_value / total_value.as_decimal() * dec!(100);
        let target_weight_pct = target_weight * dec!(100);
        let rationale = format!(
            "{} {} from {:.2}% to {:.2}% of portfolio",
            match action {
                TradeAction::Buy => "increase",
                TradeAction::Sell | TradeAction::Hold => "reduce",
            },
            position.symbol,
            current_weight_pct,
            target_weight_pct,
        );

        Some(TradeProposal {
            symbol: position.symbol.clone(),
            action,
            current_shares,
            target_shares,
            current_weight_pct,
            target_weight_pct,
            price: position.price,
            trade_value: Amount::new(trade_value),
            estimated_cost: self.cost_model.estimate(Amount::new(trade_value)),
            rationale,
        })
    }
}
