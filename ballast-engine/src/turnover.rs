//! Aggregate turnover limiting.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use ballast_core::types::Amount;

use crate::trades::TradeProposal;

/// Result of a turnover-limit pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitOutcome {
    /// Trades after any scaling, with thresholds re-applied.
    pub trades: Vec<TradeProposal>,
    /// Total one-way turnover after scaling.
    pub total_turnover: Amount,
    /// Turnover as a percent of portfolio value, after scaling.
    pub turnover_pct: Decimal,
    /// Applied scale factor; 1 when within limit.
    pub scale_factor: Decimal,
    /// Present when trades were scaled down.
    pub warning: Option<String>,
}

/// Scales a trade set down proportionally when its aggregate turnover
/// exceeds the policy limit.
///
/// One-way turnover is half the summed absolute trade values (a buy
/// funded by a sell would otherwise count twice). Scaling preserves each
/// trade's direction by construction: the factor is always in (0, 1).
#[derive(Debug, Clone, Copy)]
pub struct TurnoverLimiter {
    min_notional: Decimal,
}

impl TurnoverLimiter {
    /// Creates a limiter. `min_notional` re-applies the trade-size floor
    /// after scaling.
    #[must_use]
    pub const fn new(min_notional: Decimal) -> Self {
        Self { min_notional }
    }

    /// Computes one-way turnover for a trade set.
    #[must_use]
    pub fn turnover(trades: &[TradeProposal]) -> Amount {
        let gross: Decimal = trades
            .iter()
            .map(|t| t.trade_value.abs().as_decimal())
            .sum();
        Amount::new(gross / dec!(2))
    }

    /// Applies the limit. Within-limit input is returned unchanged
    /// (idempotent).
    #[must_use]
    pub fn apply(
        &self,
        trades: Vec<TradeProposal>,
        total_value: Amount,
        max_turnover_pct: Decimal,
    ) -> LimitOutcome {
        let total_turnover = Self::turnover(&trades);
        let turnover_pct = if total_value.as_decimal().is_zero() {
            Decimal::ZERO
        } else {
            total_turnover.as_decimal() / total_value.as_decimal() * dec!(100)
        };

        if turnover_pct <= max_turnover_pct {
            debug!(%turnover_pct, %max_turnover_pct, "turnover within limit");
            return LimitOutcome {
                trades,
                total_turnover,
                turnover_pct,
                scale_factor: Decimal::ONE,
                warning: None,
            };
        }

        let scale_factor = max_turnover_pct / turnover_pct;
        warn!(
            %turnover_pct,
            %max_turnover_pct,
            %scale_factor,
            "scaling trades to honor turnover limit"
        );

        let mut scaled = Vec::with_capacity(trades.len());
        for trade in trades {
            let delta = trade.target_shares - trade.current_shares;
            // Round the scaled delta toward zero so whole shares remain
            // whole and the direction cannot flip.
            let scaled_delta = truncate_toward_zero(delta * scale_factor);
            if scaled_delta.abs() < Decimal::ONE {
                continue;
            }
            let trade_value = scaled_delta * trade.price.as_decimal();
            if trade_value.abs() < self.min_notional {
                continue;
            }

            let target_shares = trade.current_shares + scaled_delta;
            let target_weight_pct = if total_value.as_decimal().is_zero() {
                trade.target_weight_pct
            } else {
                target_shares * trade.price.as_decimal() / total_value.as_decimal() * dec!(100)
            };
            let mut updated = trade;
            updated.target_shares = target_shares;
            updated.target_weight_pct = target_weight_pct;
            updated.trade_value = Amount::new(trade_value);
            scaled.push(updated);
        }

        let scaled_turnover = Self::turnover(&scaled);
        let scaled_pct = if total_value.as_decimal().is_zero() {
            Decimal::ZERO
        } else {
            scaled_turnover.as_decimal() / total_value.as_decimal() * dec!(100)
        };
        let warning = format!(
            "turnover {turnover_pct:.2}% exceeded limit {max_turnover_pct:.2}%; \
             trades scaled to {scaled_pct:.2}%"
        );

        LimitOutcome {
            trades: scaled,
            total_turnover: scaled_turnover,
            turnover_pct: scaled_pct,
            scale_factor,
            warning: Some(warning),
        }
    }
}

fn truncate_toward_zero(value: Decimal) -> Decimal {
    if value >= Decimal::ZERO {
        value.floor()
    } else {
        value.ceil()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trades::{CostModel, TradeAction};
    use ballast_core::types::{Price, Symbol};

    fn trade(symbol: &str, current: Decimal, target: Decimal, price: Decimal) -> TradeProposal {
        let delta = target - current;
        let trade_value = delta * price;
        TradeProposal {
            symbol: Symbol::new(symbol).unwrap(),
            action: if delta > Decimal::ZERO {
                TradeAction::Buy
            } else {
                TradeAction::Sell
            },
            current_shares: current,
            target_shares: target,
            current_weight_pct: dec!(0),
            target_weight_pct: dec!(0),
            price: Price::new(price).unwrap(),
            trade_value: Amount::new(trade_value),
            estimated_cost: CostModel::default().estimate(Amount::new(trade_value)),
            rationale: String::new(),
        }
    }

    #[test]
    fn test_within_limit_is_identity() {
        let trades = vec![
            trade("AAA", dec!(100), dec!(150), dec!(100)),
            trade("BBB", dec!(200), dec!(150), dec!(100)),
        ];
        // Turnover: (5000 + 5000) / 2 = 5000 of 100k = 5%.
        let outcome = TurnoverLimiter::new(dec!(100)).apply(
            trades.clone(),
            Amount::new(dec!(100000)),
            dec!(20),
        );
        assert_eq!(outcome.scale_factor, Decimal::ONE);
        assert_eq!(outcome.trades, trades);
        assert!(outcome.warning.is_none());
        assert_eq!(outcome.turnover_pct, dec!(5));
    }

    #[test]
    fn test_over_limit_scales_proportionally() {
        let trades = vec![
            trade("AAA", dec!(0), dec!(400), dec!(100)),
            trade("BBB", dec!(400), dec!(0), dec!(100)),
        ];
        // Turnover: 80000 / 2 = 40000 of 100k = 40%, limit 20% -> 0.5x.
        let outcome = TurnoverLimiter::new(dec!(100)).apply(
            trades,
            Amount::new(dec!(100000)),
            dec!(20),
        );
        assert_eq!(outcome.scale_factor, dec!(0.5));
        assert!(outcome.warning.is_some());
        assert!(outcome.turnover_pct <= dec!(20));

        let buy = &outcome.trades[0];
        assert_eq!(buy.action, TradeAction::Buy);
        assert_eq!(buy.target_shares, dec!(200));
        assert_eq!(buy.trade_value, Amount::new(dec!(20000)));

        let sell = &outcome.trades[1];
        assert_eq!(sell.action, TradeAction::Sell);
        assert_eq!(sell.target_shares, dec!(200));
        assert_eq!(sell.trade_value, Amount::new(dec!(-20000)));
    }

    #[test]
    fn test_scaling_never_flips_direction() {
        let trades = vec![trade("AAA", dec!(10), dec!(400), dec!(100))];
        let outcome = TurnoverLimiter::new(dec!(100)).apply(
            trades,
            Amount::new(dec!(50000)),
            dec!(1),
        );
        for t in &outcome.trades {
            assert_eq!(t.action, TradeAction::Buy);
            assert!(t.trade_value.as_decimal() > Decimal::ZERO);
        }
    }

    #[test]
    fn test_tiny_trades_dropped_after_scaling() {
        // Scaling 3 shares by a small factor truncates to zero shares.
        let trades = vec![
            trade("BIG", dec!(0), dec!(1000), dec!(100)),
            trade("TINY", dec!(0), dec!(3), dec!(100)),
        ];
        let outcome = TurnoverLimiter::new(dec!(100)).apply(
            trades,
            Amount::new(dec!(100000)),
            dec!(10),
        );
        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(outcome.trades[0].symbol.as_str(), "BIG");
    }
}
