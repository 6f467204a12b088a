//! The hedge advisor: scenario hedges and deleveraging guidance.

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use ballast_core::data::Provenance;
use ballast_core::request::RequestContext;
use ballast_core::types::Amount;

use crate::deleveraging::{
    playbook as regime_playbook, resolve_regime, DeleveragingRequest, DeleveragingResult,
    RegimeProvider,
};
use crate::scenario::{
    playbook, HedgeRecommendation, ScenarioHedgeResult, ScenarioImpactProvider,
};
use crate::shock::ShockCategory;

/// Advisor tuning parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HedgeConfig {
    /// Percent of the simulated loss a hedge is sized to offset.
    #[serde(default = "default_target_offset_pct")]
    pub target_offset_pct: Decimal,
    /// Annualized hedge carry cost, basis points of hedge notional.
    #[serde(default = "default_carry_cost_bps")]
    pub carry_cost_bps: Decimal,
}

fn default_target_offset_pct() -> Decimal {
    dec!(80)
}

fn default_carry_cost_bps() -> Decimal {
    dec!(25)
}

impl Default for HedgeConfig {
    fn default() -> Self {
        Self {
            target_offset_pct: default_target_offset_pct(),
            carry_cost_bps: default_carry_cost_bps(),
        }
    }
}

/// Maps scenarios and regimes to sized defensive recommendations.
pub struct HedgeAdvisor {
    impacts: Arc<dyn ScenarioImpactProvider>,
    regimes: Option<Arc<dyn RegimeProvider>>,
    config: HedgeConfig,
}

impl HedgeAdvisor {
    /// Creates an advisor over the given providers.
    #[must_use]
    pub fn new(
        impacts: Arc<dyn ScenarioImpactProvider>,
        regimes: Option<Arc<dyn RegimeProvider>>,
        config: HedgeConfig,
    ) -> Self {
        Self {
            impacts,
            regimes,
            config,
        }
    }

    /// Suggests sized hedges against a stress scenario.
    ///
    /// `max_cost_bps` caps the estimated hedge carry cost in basis
    /// points of portfolio value; zero or negative disables the cap.
    /// An unrecognized scenario id or a simulator failure produces a
    /// result with `error` set, never a default hedge list.
    pub async fn suggest_hedges(
        &self,
        ctx: &RequestContext,
        scenario_id: &str,
        max_cost_bps: Decimal,
    ) -> ScenarioHedgeResult {
        let category = match ShockCategory::resolve(scenario_id) {
            Ok(c) => c,
            Err(err) => {
                warn!(scenario_id, error = %err, "unsupported scenario");
                return ScenarioHedgeResult::failed(scenario_id, ctx.as_of, err.to_string());
            }
        };
        info!(
            portfolio_id = %ctx.portfolio_id,
            scenario_id,
            category = %category,
            "hedge advisory requested"
        );

        let impact = match self
            .impacts
            .simulate(&ctx.portfolio_id, &ctx.pricing_pack_id, category)
            .await
        {
            Ok(i) => i,
            Err(err) => {
                warn!(error = %err, "scenario simulation failed");
                return ScenarioHedgeResult::failed(scenario_id, ctx.as_of, err.to_string());
            }
        };

        let mut warnings = Vec::new();
        let gross_loss = impact.gross_loss();
        if gross_loss <= Decimal::ZERO {
            warnings.push(format!(
                "scenario {category} produces no simulated loss; nothing to hedge"
            ));
            return ScenarioHedgeResult {
                hedges: Vec::new(),
                total_notional: Amount::ZERO,
                expected_offset_pct: Decimal::ZERO,
                scenario_id: scenario_id.to_string(),
                warnings,
                error: None,
                provenance: Provenance::advisory(ScenarioHedgeResult::SOURCE, ctx.as_of),
            };
        }

        // Size each leg so its payoff covers its share of the target
        // offset: notional = loss * offset * split / effectiveness.
        let offset_fraction = self.config.target_offset_pct / dec!(100);
        let legs = playbook(category);
        let mut notionals: Vec<Decimal> = legs
            .iter()
            .map(|leg| gross_loss * offset_fraction * leg.split / leg.effectiveness)
            .collect();
        let mut total_notional: Decimal = notionals.iter().copied().sum();

        // Carry budget binds against portfolio value, not loss size.
        let mut scale = Decimal::ONE;
        if max_cost_bps > Decimal::ZERO {
            let carry = total_notional * self.config.carry_cost_bps / dec!(10000);
            let budget =
                impact.portfolio_value.as_decimal() * max_cost_bps / dec!(10000);
            if carry > budget && carry > Decimal::ZERO {
                scale = budget / carry;
                for notional in &mut notionals {
                    *notional *= scale;
                }
                total_notional *= scale;
                warnings.push(format!(
                    "hedge carry cost exceeds budget of {max_cost_bps} bps; \
                     notional scaled to {scale:.4} of target"
                ));
            }
        }

        let achieved_offset = self.config.target_offset_pct * scale;
        let hedge_ratio = (offset_fraction * scale).min(Decimal::ONE);
        let hedges: Vec<HedgeRecommendation> = legs
            .iter()
            .zip(&notionals)
            .map(|(leg, notional)| HedgeRecommendation {
                instrument: leg.instrument.to_string(),
                instrument_type: leg.instrument_type,
                action: leg.action,
                notional: Amount::new(*notional),
                hedge_ratio,
                rationale: leg.rationale.to_string(),
                expected_offset_pct: achieved_offset * leg.split,
            })
            .collect();

        info!(
            legs = hedges.len(),
            %total_notional,
            %achieved_offset,
            "hedge advisory complete"
        );

        ScenarioHedgeResult {
            hedges,
            total_notional: Amount::new(total_notional),
            expected_offset_pct: achieved_offset,
            scenario_id: scenario_id.to_string(),
            warnings,
            error: None,
            provenance: Provenance::advisory(ScenarioHedgeResult::SOURCE, ctx.as_of),
        }
    }

    /// Suggests the allocation playbook for a macro regime.
    ///
    /// The regime resolves from the request in priority order (explicit
    /// label, cycle phase, most severe scenario impact, provider); when
    /// nothing resolves the result carries an error, never a silently
    /// chosen default regime.
    pub async fn suggest_deleveraging(
        &self,
        ctx: &RequestContext,
        request: &DeleveragingRequest,
    ) -> DeleveragingResult {
        let mut warnings = Vec::new();
        let regime = match resolve_regime(request, self.regimes.as_deref(), &mut warnings).await {
            Ok(r) => r,
            Err(err) => {
                warn!(error = %err, "regime resolution failed");
                let mut result = DeleveragingResult::failed(ctx.as_of, err.to_string());
                result.warnings = warnings;
                return result;
            }
        };

        info!(
            portfolio_id = %ctx.portfolio_id,
            regime = %regime,
            "deleveraging advisory"
        );
        DeleveragingResult {
            regime: Some(regime),
            recommendations: regime_playbook(regime),
            warnings,
            error: None,
            provenance: Provenance::advisory(DeleveragingResult::SOURCE, ctx.as_of),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use ballast_core::error::DataError;
    use ballast_core::types::{Symbol, Timestamp};

    use crate::deleveraging::Regime;
    use crate::scenario::{HedgeInstrumentType, ScenarioImpact};

    struct StaticImpact(ScenarioImpact);

    #[async_trait]
    impl ScenarioImpactProvider for StaticImpact {
        async fn simulate(
            &self,
            _: &str,
            _: &str,
            _: ShockCategory,
        ) -> Result<ScenarioImpact, DataError> {
            Ok(self.0.clone())
        }
    }

    struct StaticRegime(Regime);

    #[async_trait]
    impl RegimeProvider for StaticRegime {
        async fn current_regime(&self) -> Result<Regime, DataError> {
            Ok(self.0)
        }
    }

    fn impact(portfolio_value: Decimal, losses: &[(&str, Decimal)]) -> ScenarioImpact {
        ScenarioImpact {
            portfolio_value: Amount::new(portfolio_value),
            losses: losses
                .iter()
                .map(|(s, v)| (Symbol::new(*s).unwrap(), Amount::new(*v)))
                .collect(),
        }
    }

    fn advisor(impact: ScenarioImpact, regime: Option<Regime>) -> HedgeAdvisor {
        HedgeAdvisor::new(
            Arc::new(StaticImpact(impact)),
            regime.map(|r| Arc::new(StaticRegime(r)) as Arc<dyn RegimeProvider>),
            HedgeConfig::default(),
        )
    }

    fn ctx() -> RequestContext {
        RequestContext::new("port-1", "pack-2025-06-30", Timestamp::now()).unwrap()
    }

    #[tokio::test]
    async fn test_equity_selloff_yields_equity_hedges() {
        let advisor = advisor(
            impact(dec!(1000000), &[("AAA", dec!(80000)), ("BBB", dec!(20000))]),
            None,
        );
        let result = advisor.suggest_hedges(&ctx(), "equity_selloff", dec!(0)).await;

        assert!(result.error.is_none());
        assert!(!result.hedges.is_empty());
        assert!(result.expected_offset_pct > Decimal::ZERO);
        assert!(result
            .hedges
            .iter()
            .any(|h| matches!(
                h.instrument_type,
                HedgeInstrumentType::Option | HedgeInstrumentType::Futures
            )));
        for hedge in &result.hedges {
            assert!(hedge.hedge_ratio >= Decimal::ZERO && hedge.hedge_ratio <= Decimal::ONE);
            assert!(hedge.expected_offset_pct > Decimal::ZERO);
        }
        assert_eq!(result.provenance.cache_ttl_secs, 3600);
    }

    #[tokio::test]
    async fn test_unknown_scenario_never_defaults() {
        let advisor = advisor(impact(dec!(1000000), &[("AAA", dec!(1000))]), None);
        let result = advisor.suggest_hedges(&ctx(), "sharknado", dec!(0)).await;
        assert!(result.error.is_some());
        assert!(result.hedges.is_empty());
        assert_eq!(result.total_notional, Amount::ZERO);
    }

    #[tokio::test]
    async fn test_cost_budget_scales_notional() {
        let book = impact(dec!(1000000), &[("AAA", dec!(500000))]);
        let advisor_unbudgeted = advisor(book.clone(), None);
        let unbudgeted = advisor_unbudgeted
            .suggest_hedges(&ctx(), "rates_up", dec!(0))
            .await;

        // A 1 bps budget cannot carry a hedge against a 50% loss.
        let advisor_budgeted = advisor(book, None);
        let budgeted = advisor_budgeted
            .suggest_hedges(&ctx(), "rates_up", dec!(1))
            .await;

        assert!(budgeted.total_notional < unbudgeted.total_notional);
        assert!(budgeted.expected_offset_pct < unbudgeted.expected_offset_pct);
        assert!(budgeted.warnings.iter().any(|w| w.contains("budget")));
    }

    #[tokio::test]
    async fn test_zero_loss_scenario_yields_no_hedges() {
        let advisor = advisor(impact(dec!(1000000), &[("AAA", dec!(-5000))]), None);
        let result = advisor.suggest_hedges(&ctx(), "usd_up", dec!(0)).await;
        assert!(result.error.is_none());
        assert!(result.hedges.is_empty());
        assert!(result.warnings.iter().any(|w| w.contains("no simulated loss")));
    }

    #[tokio::test]
    async fn test_deleveraging_regression_pin() {
        let advisor = advisor(impact(dec!(1), &[]), None);
        let request = DeleveragingRequest {
            regime: Some("DELEVERAGING".to_string()),
            ..DeleveragingRequest::default()
        };
        let result = advisor.suggest_deleveraging(&ctx(), &request).await;

        assert_eq!(result.regime, Some(Regime::Deleveraging));
        let equity: Vec<_> = result
            .recommendations
            .iter()
            .filter(|r| r.action == "reduce_equity_exposure")
            .collect();
        assert_eq!(equity.len(), 1);
        assert_eq!(equity[0].target_reduction_pct, Some(dec!(40)));
    }

    #[tokio::test]
    async fn test_provider_is_last_resort() {
        let advisor = advisor(impact(dec!(1), &[]), Some(Regime::LateExpansion));
        let result = advisor
            .suggest_deleveraging(&ctx(), &DeleveragingRequest::default())
            .await;
        assert_eq!(result.regime, Some(Regime::LateExpansion));
        let equity = result
            .recommendations
            .iter()
            .find(|r| r.action == "reduce_equity_exposure")
            .unwrap();
        assert_eq!(equity.target_reduction_pct, Some(dec!(20)));
    }

    #[tokio::test]
    async fn test_unresolved_regime_is_an_error() {
        let advisor = advisor(impact(dec!(1), &[]), None);
        let result = advisor
            .suggest_deleveraging(&ctx(), &DeleveragingRequest::default())
            .await;
        assert!(result.error.is_some());
        assert!(result.recommendations.is_empty());
    }
}
