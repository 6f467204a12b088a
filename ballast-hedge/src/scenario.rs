//! Scenario hedge playbooks and sizing.

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use ballast_core::data::Provenance;
use ballast_core::error::DataError;
use ballast_core::types::{Amount, Symbol, Timestamp};

use crate::shock::ShockCategory;

/// Position-level simulated losses under one shock, from the external
/// scenario simulator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioImpact {
    /// Portfolio value the losses were simulated against.
    pub portfolio_value: Amount,
    /// Simulated loss per symbol; positive values are losses.
    pub losses: HashMap<Symbol, Amount>,
}

impl ScenarioImpact {
    /// Sum of positive simulated losses. Gains do not net against
    /// losses: the hedge protects the losing sleeve.
    #[must_use]
    pub fn gross_loss(&self) -> Decimal {
        self.losses
            .values()
            .map(Amount::as_decimal)
            .filter(|v| *v > Decimal::ZERO)
            .sum()
    }
}

/// Supplies position-level shock simulations.
///
/// The simulation internals (factor models, repricing) live outside this
/// crate; the advisor only consumes the per-position loss vector.
#[async_trait]
pub trait ScenarioImpactProvider: Send + Sync {
    /// Simulates the given shock against a portfolio.
    ///
    /// # Errors
    ///
    /// Returns a `DataError` when the portfolio or pack is unknown or
    /// the simulator fails.
    async fn simulate(
        &self,
        portfolio_id: &str,
        pricing_pack_id: &str,
        category: ShockCategory,
    ) -> Result<ScenarioImpact, DataError>;
}

/// Hedge instrument class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HedgeInstrumentType {
    /// Cash equity or short equity.
    Equity,
    /// Listed option.
    Option,
    /// Futures contract.
    Futures,
    /// Exchange-traded fund.
    Etf,
}

/// Hedge trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HedgeAction {
    /// Establish a long hedge.
    Buy,
    /// Establish a short hedge.
    Sell,
}

/// One sized hedge instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HedgeRecommendation {
    /// Hedge instrument identifier.
    pub instrument: String,
    /// Instrument class.
    pub instrument_type: HedgeInstrumentType,
    /// Direction.
    pub action: HedgeAction,
    /// Hedge notional in base currency.
    pub notional: Amount,
    /// Fraction of the simulated loss this leg is sized to offset.
    pub hedge_ratio: Decimal,
    /// Why this instrument for this shock.
    pub rationale: String,
    /// Expected loss offset contributed by this leg, percent.
    pub expected_offset_pct: Decimal,
}

/// A complete hedge advisory response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioHedgeResult {
    /// Sized hedge legs, possibly empty.
    pub hedges: Vec<HedgeRecommendation>,
    /// Summed hedge notional.
    pub total_notional: Amount,
    /// Expected aggregate loss offset, percent.
    pub expected_offset_pct: Decimal,
    /// The scenario id as supplied by the caller.
    pub scenario_id: String,
    /// Non-fatal notes (budget scaling, zero-loss scenarios).
    pub warnings: Vec<String>,
    /// Populated when the request failed.
    pub error: Option<String>,
    /// Source and caching metadata.
    pub provenance: Provenance,
}

impl ScenarioHedgeResult {
    pub(crate) const SOURCE: &'static str = "scenario_hedge_advisor";

    /// A well-formed empty result carrying an error.
    #[must_use]
    pub fn failed(
        scenario_id: impl Into<String>,
        as_of: Timestamp,
        error: impl Into<String>,
    ) -> Self {
        Self {
            hedges: Vec::new(),
            total_notional: Amount::ZERO,
            expected_offset_pct: Decimal::ZERO,
            scenario_id: scenario_id.into(),
            warnings: Vec::new(),
            error: Some(error.into()),
            provenance: Provenance::advisory(Self::SOURCE, as_of),
        }
    }
}

/// One leg of a shock playbook, before sizing.
#[derive(Debug, Clone)]
pub(crate) struct PlaybookLeg {
    pub instrument: &'static str,
    pub instrument_type: HedgeInstrumentType,
    pub action: HedgeAction,
    /// Share of the hedge budget allocated to this leg. Splits within a
    /// playbook sum to 1.
    pub split: Decimal,
    /// Expected payoff per unit notional under the shock, as a fraction.
    pub effectiveness: Decimal,
    pub rationale: &'static str,
}

/// The fixed, research-derived playbook for each shock category.
pub(crate) fn playbook(category: ShockCategory) -> Vec<PlaybookLeg> {
    match category {
        ShockCategory::RatesUp => vec![PlaybookLeg {
            instrument: "TLT",
            instrument_type: HedgeInstrumentType::Etf,
            action: HedgeAction::Sell,
            split: dec!(1),
            effectiveness: dec!(0.85),
            rationale: "short long-duration treasuries offsets duration losses as yields rise",
        }],
        ShockCategory::RatesDown => vec![PlaybookLeg {
            instrument: "TLT",
            instrument_type: HedgeInstrumentType::Etf,
            action: HedgeAction::Buy,
            split: dec!(1),
            effectiveness: dec!(0.85),
            rationale: "long-duration treasuries rally as yields fall",
        }],
        ShockCategory::UsdUp => vec![PlaybookLeg {
            instrument: "UUP",
            instrument_type: HedgeInstrumentType::Etf,
            action: HedgeAction::Buy,
            split: dec!(1),
            effectiveness: dec!(0.70),
            rationale: "long broad-dollar index offsets foreign-currency translation losses",
        }],
        ShockCategory::UsdDown => vec![
            PlaybookLeg {
                instrument: "GLD",
                instrument_type: HedgeInstrumentType::Etf,
                action: HedgeAction::Buy,
                split: dec!(0.6),
                effectiveness: dec!(0.60),
                rationale: "gold appreciates against a weakening dollar",
            },
            PlaybookLeg {
                instrument: "UUP",
                instrument_type: HedgeInstrumentType::Etf,
                action: HedgeAction::Sell,
                split: dec!(0.4),
                effectiveness: dec!(0.70),
                rationale: "short broad-dollar index pays off directly on dollar weakness",
            },
        ],
        ShockCategory::CpiSurprise => vec![
            PlaybookLeg {
                instrument: "TIP",
                instrument_type: HedgeInstrumentType::Etf,
                action: HedgeAction::Buy,
                split: dec!(0.6),
                effectiveness: dec!(0.65),
                rationale: "inflation-linked treasuries reprice with realized CPI",
            },
            PlaybookLeg {
                instrument: "DBC",
                instrument_type: HedgeInstrumentType::Etf,
                action: HedgeAction::Buy,
                split: dec!(0.4),
                effectiveness: dec!(0.60),
                rationale: "broad commodities lead inflation surprises",
            },
        ],
        ShockCategory::CreditSpreadWidening => vec![PlaybookLeg {
            instrument: "LQD 6M 95% put",
            instrument_type: HedgeInstrumentType::Option,
            action: HedgeAction::Buy,
            split: dec!(1),
            effectiveness: dec!(0.75),
            rationale: "investment-grade credit puts monetize spread widening",
        }],
        ShockCategory::EquitySelloff => vec![
            PlaybookLeg {
                instrument: "SPX 6M 95% put",
                instrument_type: HedgeInstrumentType::Option,
                action: HedgeAction::Buy,
                split: dec!(0.6),
                effectiveness: dec!(0.80),
                rationale: "index puts pay off directly on a broad drawdown",
            },
            PlaybookLeg {
                instrument: "VIX front-month futures",
                instrument_type: HedgeInstrumentType::Futures,
                action: HedgeAction::Buy,
                split: dec!(0.4),
                effectiveness: dec!(0.60),
                rationale: "long volatility convexity kicks in during selloffs",
            },
        ],
        ShockCategory::EquityRally => vec![PlaybookLeg {
            instrument: "SPX 6M 105% call",
            instrument_type: HedgeInstrumentType::Option,
            action: HedgeAction::Buy,
            split: dec!(1),
            effectiveness: dec!(0.70),
            rationale: "upside calls cover a melt-up against hedged or short exposure",
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playbook_splits_sum_to_one() {
        for category in ShockCategory::ALL {
            let legs = playbook(category);
            assert!(!legs.is_empty(), "{category} has no playbook");
            let total: Decimal = legs.iter().map(|l| l.split).sum();
            assert_eq!(total, Decimal::ONE, "{category} splits do not sum to 1");
        }
    }

    #[test]
    fn test_gross_loss_ignores_gains() {
        let mut losses = HashMap::new();
        losses.insert(Symbol::new("AAA").unwrap(), Amount::new(dec!(1000)));
        losses.insert(Symbol::new("BBB").unwrap(), Amount::new(dec!(-400)));
        let impact = ScenarioImpact {
            portfolio_value: Amount::new(dec!(100000)),
            losses,
        };
        assert_eq!(impact.gross_loss(), dec!(1000));
    }
}
