//! Rebalancing engine: wires the pipeline stages together.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use ballast_core::data::{Position, Provenance};
use ballast_core::error::{ComputeError, DataError};
use ballast_core::request::RequestContext;
use ballast_core::traits::{PositionRepository, PriceHistoryProvider, QualityScoreProvider};
use ballast_core::types::{Amount, Symbol, Timestamp};

use crate::covariance::{CovarianceEstimator, DEFAULT_LOOKBACK, MIN_PERIODS};
use crate::filter::QualityFilter;
use crate::impact::{ImpactAnalysis, ImpactSimulator};
use crate::optimizer::{AllocationOptimizer, OptimizerConfig, TargetWeights};
use crate::policy::{parse_policy, OptimizationMethod, PolicyConstraints, PolicyInput};
use crate::trades::{CostModel, TradeProposal, TradeProposalBuilder};
use crate::turnover::TurnoverLimiter;

/// Engine tuning parameters.
///
/// Every field has a production default so an empty config section
/// deserializes to a working engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Trading periods of history requested per symbol.
    #[serde(default = "default_lookback_periods")]
    pub lookback_periods: usize,
    /// Minimum aligned return periods for a covariance estimate.
    #[serde(default = "default_min_periods")]
    pub min_periods: usize,
    /// Minimum absolute trade value for a proposal to survive.
    #[serde(default = "default_min_trade_notional")]
    pub min_trade_notional: Decimal,
    /// Fixed commission per trade ticket.
    #[serde(default = "default_fixed_commission")]
    pub fixed_commission: Decimal,
    /// Linear market impact, basis points of traded value.
    #[serde(default = "default_market_impact_bps")]
    pub market_impact_bps: Decimal,
    /// Wall-clock budget for one optimizer run.
    #[serde(default = "default_optimizer_timeout_ms")]
    pub optimizer_timeout_ms: u64,
    /// Weights below this fraction are zeroed and the rest renormalized.
    #[serde(default = "default_dust_threshold")]
    pub dust_threshold: Decimal,
    /// Per-period risk-free rate for the Sharpe objective.
    #[serde(default)]
    pub risk_free_rate: Decimal,
    /// Risk-aversion lambda for the mean-variance utility objective.
    #[serde(default = "default_risk_aversion")]
    pub risk_aversion: Decimal,
    /// CVaR confidence level.
    #[serde(default = "default_cvar_confidence")]
    pub cvar_confidence: Decimal,
    /// Iteration cap for the iterative solvers.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

fn default_lookback_periods() -> usize {
    DEFAULT_LOOKBACK
}

fn default_min_periods() -> usize {
    MIN_PERIODS
}

fn default_min_trade_notional() -> Decimal {
    dec!(100)
}

fn default_fixed_commission() -> Decimal {
    dec!(1.00)
}

fn default_market_impact_bps() -> Decimal {
    dec!(5)
}

fn default_optimizer_timeout_ms() -> u64 {
    5000
}

fn default_dust_threshold() -> Decimal {
    dec!(0.005)
}

fn default_risk_aversion() -> Decimal {
    dec!(1)
}

fn default_cvar_confidence() -> Decimal {
    dec!(0.95)
}

fn default_max_iterations() -> u32 {
    500
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lookback_periods: default_lookback_periods(),
            min_periods: default_min_periods(),
            min_trade_notional: default_min_trade_notional(),
            fixed_commission: default_fixed_commission(),
            market_impact_bps: default_market_impact_bps(),
            optimizer_timeout_ms: default_optimizer_timeout_ms(),
            dust_threshold: default_dust_threshold(),
            risk_free_rate: Decimal::ZERO,
            risk_aversion: default_risk_aversion(),
            cvar_confidence: default_cvar_confidence(),
            max_iterations: default_max_iterations(),
        }
    }
}

/// A complete rebalancing proposal.
///
/// Always well formed: failures populate `error` (fatal) or `warnings`
/// (degraded) rather than replacing the payload with an exception shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceResult {
    /// Sized, costed trade instructions.
    pub trades: Vec<TradeProposal>,
    /// Number of trades proposed.
    pub trade_count: usize,
    /// One-way turnover of the trade set.
    pub total_turnover: Amount,
    /// Turnover as a percent of portfolio value.
    pub turnover_pct: Decimal,
    /// Summed estimated transaction costs.
    pub estimated_costs: Amount,
    /// Estimated costs in basis points of portfolio value.
    pub cost_bps: Decimal,
    /// Optimization method that produced the targets.
    pub method: OptimizationMethod,
    /// False when the engine had to fall back to equal weights or scale
    /// trades beyond what the policy asked for.
    pub constraints_met: bool,
    /// Non-fatal notes accumulated along the pipeline.
    pub warnings: Vec<String>,
    /// Populated when the request failed outright.
    pub error: Option<String>,
    /// Source and caching metadata.
    pub provenance: Provenance,
}

impl RebalanceResult {
    const SOURCE: &'static str = "rebalance_engine";

    /// A well-formed empty result carrying an error, for fatal failures.
    #[must_use]
    pub fn failed(as_of: Timestamp, error: impl Into<String>) -> Self {
        Self {
            trades: Vec::new(),
            trade_count: 0,
            total_turnover: Amount::ZERO,
            turnover_pct: Decimal::ZERO,
            estimated_costs: Amount::ZERO,
            cost_bps: Decimal::ZERO,
            method: OptimizationMethod::default(),
            constraints_met: false,
            warnings: Vec::new(),
            error: Some(error.into()),
            provenance: Provenance::live(Self::SOURCE, as_of),
        }
    }
}

/// The rebalancing engine.
///
/// Holds shared provider handles and tuning config; each call runs a
/// request-scoped pipeline and returns a self-describing result.
pub struct RebalanceEngine {
    positions: Arc<dyn PositionRepository>,
    prices: Arc<dyn PriceHistoryProvider>,
    quality: Option<Arc<dyn QualityScoreProvider>>,
    config: EngineConfig,
}

impl RebalanceEngine {
    /// Creates an engine over the given providers.
    #[must_use]
    pub fn new(
        positions: Arc<dyn PositionRepository>,
        prices: Arc<dyn PriceHistoryProvider>,
        quality: Option<Arc<dyn QualityScoreProvider>>,
        config: EngineConfig,
    ) -> Self {
        Self {
            positions,
            prices,
            quality,
            config,
        }
    }

    /// Proposes rebalancing trades for a portfolio under a policy.
    ///
    /// `positions_override` and `quality_override` bypass the respective
    /// providers; callers holding fresh data in hand (or tests) use them
    /// to pin the inputs.
    ///
    /// Data and compute failures degrade to the equal-weight fallback
    /// with `constraints_met` false; only unusable input (no positions at
    /// all) produces a result with `error` set.
    pub async fn propose_trades(
        &self,
        ctx: &RequestContext,
        policy: &PolicyInput,
        positions_override: Option<Vec<Position>>,
        quality_override: Option<HashMap<Symbol, Decimal>>,
    ) -> RebalanceResult {
        let (constraints, mut warnings) = parse_policy(policy);
        info!(
            portfolio_id = %ctx.portfolio_id,
            pricing_pack_id = %ctx.pricing_pack_id,
            method = %constraints.method,
            "rebalance requested"
        );

        let positions = match positions_override {
            Some(p) => p,
            None => match self
                .positions
                .fetch(&ctx.portfolio_id, &ctx.pricing_pack_id)
                .await
            {
                Ok(p) => p,
                Err(err) => {
                    warn!(error = %err, "position fetch failed");
                    return RebalanceResult::failed(ctx.as_of, err.to_string());
                }
            },
        };
        if positions.is_empty() {
            warnings.push("portfolio holds no positions; nothing to rebalance".to_string());
            return RebalanceResult {
                trades: Vec::new(),
                trade_count: 0,
                total_turnover: Amount::ZERO,
                turnover_pct: Decimal::ZERO,
                estimated_costs: Amount::ZERO,
                cost_bps: Decimal::ZERO,
                method: constraints.method,
                constraints_met: true,
                warnings,
                error: None,
                provenance: Provenance::live(RebalanceResult::SOURCE, ctx.as_of),
            };
        }
        let total_value: Amount = positions.iter().map(|p| p.market_value).sum();

        let scores = match quality_override {
            Some(s) => s,
            None => self.fetch_quality(&positions, &mut warnings).await,
        };

        let outcome = QualityFilter::apply(positions, &scores, constraints.min_quality_score);
        warnings.extend(outcome.warnings);
        let kept = outcome.kept;
        let dropped = outcome.dropped;

        // An empty survivor universe must not turn into a forced
        // liquidation of the dropped holdings: degrade to an empty
        // result instead of optimizing over nothing.
        if kept.is_empty() {
            let err = DataError::NoEligiblePositions;
            warn!(error = %err, "quality filter dropped every position");
            warnings.push(format!("{err}; no trades proposed"));
            return RebalanceResult {
                trades: Vec::new(),
                trade_count: 0,
                total_turnover: Amount::ZERO,
                turnover_pct: Decimal::ZERO,
                estimated_costs: Amount::ZERO,
                cost_bps: Decimal::ZERO,
                method: constraints.method,
                constraints_met: false,
                warnings,
                error: None,
                provenance: Provenance::live(RebalanceResult::SOURCE, ctx.as_of),
            };
        }

        // Dropped holdings stay out of the target map and are therefore
        // sold to zero by the proposal builder.
        let universe: Vec<Symbol> = kept.iter().map(|p| p.symbol.clone()).collect();
        let (targets, constraints_met) = self
            .solve_targets(ctx, &universe, &constraints, &mut warnings)
            .await;

        let cost_model = CostModel {
            fixed_commission: self.config.fixed_commission,
            market_impact_bps: self.config.market_impact_bps,
        };
        let builder = TradeProposalBuilder::new(cost_model, self.config.min_trade_notional);
        let mut all_positions = kept;
        all_positions.extend(dropped);
        let (trades, build_warnings) = builder.build(&all_positions, &targets, total_value);
        warnings.extend(build_warnings);

        let limiter = TurnoverLimiter::new(self.config.min_trade_notional);
        let limited = limiter.apply(trades, total_value, constraints.max_turnover_pct);
        let scaled = limited.scale_factor < Decimal::ONE;
        warnings.extend(limited.warning);

        let estimated_costs: Amount = limited.trades.iter().map(|t| t.estimated_cost).sum();
        let cost_bps = if total_value.as_decimal().is_zero() {
            Decimal::ZERO
        } else {
            estimated_costs.as_decimal() / total_value.as_decimal() * dec!(10000)
        };

        info!(
            trades = limited.trades.len(),
            turnover_pct = %limited.turnover_pct,
            constraints_met = constraints_met && !scaled,
            "rebalance proposal complete"
        );

        RebalanceResult {
            trade_count: limited.trades.len(),
            trades: limited.trades,
            total_turnover: limited.total_turnover,
            turnover_pct: limited.turnover_pct,
            estimated_costs,
            cost_bps,
            method: constraints.method,
            constraints_met: constraints_met && !scaled,
            warnings,
            error: None,
            provenance: Provenance::live(RebalanceResult::SOURCE, ctx.as_of),
        }
    }

    /// Simulates the portfolio-level impact of a proposed trade set.
    pub async fn analyze_impact(
        &self,
        ctx: &RequestContext,
        trades: &[TradeProposal],
        quality_scores: Option<&HashMap<Symbol, Decimal>>,
        moat_scores: Option<&HashMap<Symbol, Decimal>>,
    ) -> ImpactAnalysis {
        let positions = match self
            .positions
            .fetch(&ctx.portfolio_id, &ctx.pricing_pack_id)
            .await
        {
            Ok(p) => p,
            Err(err) => {
                warn!(error = %err, "position fetch failed");
                return ImpactAnalysis::failed(ctx.as_of, err.to_string());
            }
        };

        match ImpactSimulator::simulate(&positions, trades, quality_scores, moat_scores, ctx.as_of)
        {
            Ok(analysis) => analysis,
            Err(err) => ImpactAnalysis::failed(ctx.as_of, err.to_string()),
        }
    }

    async fn fetch_quality(
        &self,
        positions: &[Position],
        warnings: &mut Vec<String>,
    ) -> HashMap<Symbol, Decimal> {
        let Some(provider) = &self.quality else {
            return HashMap::new();
        };
        let symbols: Vec<Symbol> = positions.iter().map(|p| p.symbol.clone()).collect();
        match provider.scores(&symbols).await {
            Ok(scores) => scores,
            Err(err) => {
                warn!(error = %err, "quality scores unavailable; filter passes all");
                warnings.push(format!("quality scores unavailable: {err}"));
                HashMap::new()
            }
        }
    }

    /// Runs estimation and optimization, degrading to equal weights on
    /// any data or compute failure. Returns the targets and whether the
    /// requested method actually produced them.
    async fn solve_targets(
        &self,
        ctx: &RequestContext,
        universe: &[Symbol],
        constraints: &PolicyConstraints,
        warnings: &mut Vec<String>,
    ) -> (TargetWeights, bool) {
        let history = match self
            .prices
            .fetch(universe, self.config.lookback_periods, ctx.as_of)
            .await
        {
            Ok(h) => h,
            Err(err) => {
                warn!(error = %err, "price history fetch failed; equal-weight fallback");
                warnings.push(format!("{err}; using equal-weight targets"));
                return (AllocationOptimizer::equal_weight_fallback(universe), false);
            }
        };

        let estimator =
            CovarianceEstimator::new(self.config.lookback_periods, self.config.min_periods);
        let estimate = match estimator.estimate(universe, &history) {
            Ok(e) => e,
            Err(err) => {
                warn!(error = %err, "covariance estimation failed; equal-weight fallback");
                warnings.push(format!("{err}; using equal-weight targets"));
                return (AllocationOptimizer::equal_weight_fallback(universe), false);
            }
        };
        for symbol in &estimate.excluded {
            warnings.push(format!("{symbol} excluded: no usable price history"));
        }

        let optimizer = AllocationOptimizer::new(OptimizerConfig {
            max_weight: constraints.max_single_position_pct / dec!(100),
            dust_threshold: self.config.dust_threshold,
            risk_free_rate: self.config.risk_free_rate,
            risk_aversion: self.config.risk_aversion,
            cvar_confidence: self.config.cvar_confidence,
            max_iterations: self.config.max_iterations,
        });
        let method = constraints.method;
        let eligible = estimate.symbols.clone();

        // The solvers are CPU-bound Decimal loops; run them off the
        // async runtime and cap the wall clock.
        let handle =
            tokio::task::spawn_blocking(move || optimizer.solve(method, &estimate, None));
        let solved = tokio::time::timeout(
            Duration::from_millis(self.config.optimizer_timeout_ms),
            handle,
        )
        .await;

        match solved {
            Ok(Ok(Ok(targets))) => {
                debug!(method = %method, n = eligible.len(), "optimizer succeeded");
                (targets, true)
            }
            Ok(Ok(Err(err))) => {
                warn!(error = %err, "optimizer failed; equal-weight fallback");
                warnings.push(format!("{err}; using equal-weight targets"));
                (AllocationOptimizer::equal_weight_fallback(&eligible), false)
            }
            Ok(Err(join_err)) => {
                warn!(error = %join_err, "optimizer task aborted; equal-weight fallback");
                warnings.push("optimizer task aborted; using equal-weight targets".to_string());
                (AllocationOptimizer::equal_weight_fallback(&eligible), false)
            }
            Err(_) => {
                let err = ComputeError::Timeout {
                    timeout_ms: self.config.optimizer_timeout_ms,
                };
                warn!(error = %err, "optimizer timed out; equal-weight fallback");
                warnings.push(format!("{err}; using equal-weight targets"));
                (AllocationOptimizer::equal_weight_fallback(&eligible), false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ballast_core::data::{PricePoint, PriceSeries};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use ballast_core::types::{Price, Quantity};
    use crate::trades::TradeAction;

    struct StaticPositions(Vec<Position>);

    #[async_trait]
    impl PositionRepository for StaticPositions {
        async fn fetch(&self, _: &str, _: &str) -> Result<Vec<Position>, DataError> {
            Ok(self.0.clone())
        }
    }

    struct FailingPositions;

    #[async_trait]
    impl PositionRepository for FailingPositions {
        async fn fetch(&self, _: &str, _: &str) -> Result<Vec<Position>, DataError> {
            Err(DataError::ProviderFailure {
                provider: "positions".to_string(),
                reason: "connection refused".to_string(),
            })
        }
    }

    struct StaticHistory(HashMap<Symbol, PriceSeries>);

    #[async_trait]
    impl PriceHistoryProvider for StaticHistory {
        async fn fetch(
            &self,
            _: &[Symbol],
            _: usize,
            _: Timestamp,
        ) -> Result<HashMap<Symbol, PriceSeries>, DataError> {
            Ok(self.0.clone())
        }
    }

    struct StaticScores(HashMap<Symbol, Decimal>);

    #[async_trait]
    impl QualityScoreProvider for StaticScores {
        async fn scores(&self, _: &[Symbol]) -> Result<HashMap<Symbol, Decimal>, DataError> {
            Ok(self.0.clone())
        }
    }

    fn position(symbol: &str, shares: Decimal, price: Decimal) -> Position {
        Position::new(
            Symbol::new(symbol).unwrap(),
            format!("id-{symbol}"),
            Quantity::new(shares),
            Price::new(price).unwrap(),
            "USD",
        )
    }

    // Deterministic oscillating series with a distinct period per asset,
    // so the sample covariance is well conditioned.
    fn history_for(symbols: &[&str], days: usize) -> HashMap<Symbol, PriceSeries> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let mut map = HashMap::new();
        for (i, name) in symbols.iter().enumerate() {
            let base = dec!(100) + Decimal::from(i as u32) * dec!(10);
            let bump = dec!(0.5) + Decimal::from(i as u32) * dec!(0.3);
            let points: Vec<PricePoint> = (0..days)
                .map(|t| {
                    let price = if t % (3 + i) == 0 { base + bump } else { base };
                    PricePoint::new(start + chrono::Days::new(t as u64), price)
                })
                .collect();
            let symbol = Symbol::new(*name).unwrap();
            map.insert(symbol.clone(), PriceSeries::new(symbol, points).unwrap());
        }
        map
    }

    fn ctx() -> RequestContext {
        RequestContext::new("port-1", "pack-2025-06-30", Timestamp::now()).unwrap()
    }

    fn engine_with(
        positions: Vec<Position>,
        history: HashMap<Symbol, PriceSeries>,
        scores: Option<HashMap<Symbol, Decimal>>,
    ) -> RebalanceEngine {
        RebalanceEngine::new(
            Arc::new(StaticPositions(positions)),
            Arc::new(StaticHistory(history)),
            scores.map(|s| Arc::new(StaticScores(s)) as Arc<dyn QualityScoreProvider>),
            EngineConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_happy_path_produces_trades() {
        let symbols = ["AAA", "BBB", "CCC", "DDD"];
        // Heavily lopsided book so rebalancing is mandatory.
        let positions = vec![
            position("AAA", dec!(700), dec!(100)),
            position("BBB", dec!(100), dec!(100)),
            position("CCC", dec!(100), dec!(100)),
            position("DDD", dec!(100), dec!(100)),
        ];
        let engine = engine_with(positions, history_for(&symbols, 120), None);

        let result = engine
            .propose_trades(&ctx(), &PolicyInput::default(), None, None)
            .await;

        assert!(result.error.is_none());
        assert!(result.trade_count > 0);
        assert_eq!(result.trade_count, result.trades.len());
        assert_eq!(result.provenance.cache_ttl_secs, 0);
        // AAA at 70% must come down toward the 20% cap.
        let aaa = result
            .trades
            .iter()
            .find(|t| t.symbol.as_str() == "AAA")
            .expect("AAA must be traded");
        assert_eq!(aaa.action, TradeAction::Sell);
    }

    #[tokio::test]
    async fn test_balanced_portfolio_proposes_no_trades() {
        // Five positions at exactly 20% each under a 20% cap: the only
        // feasible target is the current book.
        let symbols = ["AAA", "BBB", "CCC", "DDD", "EEE"];
        let positions: Vec<Position> = symbols
            .iter()
            .map(|s| position(s, dec!(200), dec!(100)))
            .collect();
        let engine = engine_with(positions, history_for(&symbols, 300), None);

        let result = engine
            .propose_trades(&ctx(), &PolicyInput::default(), None, None)
            .await;

        assert!(result.error.is_none());
        assert!(result.constraints_met);
        assert!(result.trades.is_empty());
        assert_eq!(result.total_turnover, Amount::ZERO);
    }

    #[tokio::test]
    async fn test_insufficient_history_falls_back_to_equal_weight() {
        let symbols = ["AAA", "BBB", "CCC"];
        let positions = vec![
            position("AAA", dec!(900), dec!(100)),
            position("BBB", dec!(50), dec!(100)),
            position("CCC", dec!(50), dec!(100)),
        ];
        // 10 days yields 9 returns, below the 30-period minimum.
        let engine = engine_with(positions, history_for(&symbols, 10), None);

        let result = engine
            .propose_trades(&ctx(), &PolicyInput::default(), None, None)
            .await;

        assert!(result.error.is_none());
        assert!(!result.constraints_met);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("equal-weight")));
        // Equal weight over 3 assets is ~33% each; AAA must be sold down.
        let aaa = result
            .trades
            .iter()
            .find(|t| t.symbol.as_str() == "AAA")
            .unwrap();
        assert_eq!(aaa.action, TradeAction::Sell);
    }

    #[tokio::test]
    async fn test_position_fetch_failure_is_fatal() {
        let engine = RebalanceEngine::new(
            Arc::new(FailingPositions),
            Arc::new(StaticHistory(HashMap::new())),
            None,
            EngineConfig::default(),
        );
        let result = engine
            .propose_trades(&ctx(), &PolicyInput::default(), None, None)
            .await;
        assert!(result.error.is_some());
        assert!(result.trades.is_empty());
    }

    #[tokio::test]
    async fn test_empty_portfolio_is_a_warning_not_an_error() {
        let engine = engine_with(Vec::new(), HashMap::new(), None);
        let result = engine
            .propose_trades(&ctx(), &PolicyInput::default(), None, None)
            .await;
        assert!(result.error.is_none());
        assert!(result.trades.is_empty());
        assert!(result.warnings.iter().any(|w| w.contains("no positions")));
    }

    #[tokio::test]
    async fn test_quality_floor_sells_dropped_position() {
        let symbols = ["AAA", "BBB", "CCC", "JUNK"];
        let positions = vec![
            position("AAA", dec!(250), dec!(100)),
            position("BBB", dec!(250), dec!(100)),
            position("CCC", dec!(250), dec!(100)),
            position("JUNK", dec!(250), dec!(100)),
        ];
        let mut scores = HashMap::new();
        for name in ["AAA", "BBB", "CCC"] {
            scores.insert(Symbol::new(name).unwrap(), dec!(85));
        }
        scores.insert(Symbol::new("JUNK").unwrap(), dec!(20));
        let engine = engine_with(positions, history_for(&symbols, 120), Some(scores));

        // Turnover cap lifted so the full exit is not scaled back.
        let policy = PolicyInput::Entries(vec![
            crate::policy::PolicyEntry {
                name: "min_quality_score".to_string(),
                value: serde_json::json!(60),
            },
            crate::policy::PolicyEntry {
                name: "max_turnover".to_string(),
                value: serde_json::json!(100),
            },
        ]);
        let result = engine.propose_trades(&ctx(), &policy, None, None).await;

        let junk = result
            .trades
            .iter()
            .find(|t| t.symbol.as_str() == "JUNK")
            .expect("JUNK must be sold");
        assert_eq!(junk.action, TradeAction::Sell);
        assert_eq!(junk.target_shares, Decimal::ZERO);
        assert!(result.warnings.iter().any(|w| w.contains("JUNK")));
    }

    #[tokio::test]
    async fn test_all_positions_filtered_yields_empty_result() {
        // Every holding scores below the floor: the engine must return
        // an empty result, not liquidate the book.
        let symbols = ["AAA", "BBB", "CCC"];
        let positions: Vec<Position> = symbols
            .iter()
            .map(|s| position(s, dec!(300), dec!(100)))
            .collect();
        let scores: HashMap<Symbol, Decimal> = symbols
            .iter()
            .map(|s| (Symbol::new(*s).unwrap(), dec!(10)))
            .collect();
        let engine = engine_with(positions, history_for(&symbols, 120), Some(scores));

        let policy = PolicyInput::Entries(vec![crate::policy::PolicyEntry {
            name: "min_quality_score".to_string(),
            value: serde_json::json!(60),
        }]);
        let result = engine.propose_trades(&ctx(), &policy, None, None).await;

        assert!(result.error.is_none());
        assert!(result.trades.is_empty());
        assert_eq!(result.trade_count, 0);
        assert!(!result.constraints_met);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("no eligible positions")));
    }

    #[tokio::test]
    async fn test_turnover_limit_scales_and_flags() {
        let symbols = ["AAA", "BBB", "CCC"];
        let positions = vec![
            position("AAA", dec!(900), dec!(100)),
            position("BBB", dec!(50), dec!(100)),
            position("CCC", dec!(50), dec!(100)),
        ];
        let engine = engine_with(positions, history_for(&symbols, 120), None);

        // A 2% turnover cap cannot absorb a 90% -> ~33% unwinding.
        let policy = PolicyInput::Entries(vec![crate::policy::PolicyEntry {
            name: "max_turnover".to_string(),
            value: serde_json::json!(2),
        }]);
        let result = engine.propose_trades(&ctx(), &policy, None, None).await;

        assert!(!result.constraints_met);
        assert!(result.turnover_pct <= dec!(2));
        assert!(result.warnings.iter().any(|w| w.contains("scaled")));
    }

    #[tokio::test]
    async fn test_analyze_impact_empty_trades_reports_error() {
        let positions = vec![position("AAA", dec!(10), dec!(100))];
        let engine = engine_with(positions, HashMap::new(), None);
        let analysis = engine.analyze_impact(&ctx(), &[], None, None).await;
        assert!(analysis.error.is_some());
        assert!(analysis
            .error
            .as_deref()
            .unwrap()
            .contains("trade list is empty"));
    }

    #[tokio::test]
    async fn test_positions_override_bypasses_repository() {
        let engine = RebalanceEngine::new(
            Arc::new(FailingPositions),
            Arc::new(StaticHistory(history_for(&["AAA", "BBB", "CCC"], 120))),
            None,
            EngineConfig::default(),
        );
        let positions = vec![
            position("AAA", dec!(600), dec!(100)),
            position("BBB", dec!(200), dec!(100)),
            position("CCC", dec!(200), dec!(100)),
        ];
        let result = engine
            .propose_trades(&ctx(), &PolicyInput::default(), Some(positions), None)
            .await;
        assert!(result.error.is_none());
        assert!(result.trade_count > 0);
    }
}
