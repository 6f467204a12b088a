//! Constrained allocation optimization.
//!
//! Four selectable methods over one covariance estimate, all long-only
//! with a per-position cap. Solvers are synchronous and pure; the engine
//! dispatches them to a blocking worker and time-boxes the call. Any
//! solver failure degrades to the equal-weight fallback upstream, never
//! to a hard error for the caller.

use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ballast_core::error::ComputeError;
use ballast_core::types::Symbol;

use crate::covariance::CovarianceEstimate;
use crate::numeric;
use crate::policy::OptimizationMethod;

/// Target portfolio weights by symbol. Weights sum to 1 (±1e-6).
pub type TargetWeights = HashMap<Symbol, Decimal>;

/// Optimizer tuning parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Per-position weight cap as a fraction (policy pct / 100). When the
    /// universe is too small for the cap to be feasible (n * cap < 1) the
    /// cap is relaxed to 1/n.
    pub max_weight: Decimal,
    /// Weights below this fraction are zeroed and the rest renormalized.
    #[serde(default = "default_dust_threshold")]
    pub dust_threshold: Decimal,
    /// Per-period risk-free rate used by the Sharpe objective.
    #[serde(default)]
    pub risk_free_rate: Decimal,
    /// Risk-aversion lambda for the mean-variance utility objective.
    #[serde(default = "default_risk_aversion")]
    pub risk_aversion: Decimal,
    /// CVaR confidence level (tail probability is 1 - confidence).
    #[serde(default = "default_cvar_confidence")]
    pub cvar_confidence: Decimal,
    /// Iteration cap for the iterative solvers.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
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

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_weight: dec!(0.20),
            dust_threshold: default_dust_threshold(),
            risk_free_rate: Decimal::ZERO,
            risk_aversion: default_risk_aversion(),
            cvar_confidence: default_cvar_confidence(),
            max_iterations: default_max_iterations(),
        }
    }
}

/// Solves for target weights under the selected method.
#[derive(Debug, Clone)]
pub struct AllocationOptimizer {
    config: OptimizerConfig,
}

impl AllocationOptimizer {
    /// Creates an optimizer.
    #[must_use]
    pub const fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Equal weights over the given symbols: the universal fallback for
    /// insufficient data, non-convergence, and timeouts.
    #[must_use]
    pub fn equal_weight_fallback(symbols: &[Symbol]) -> TargetWeights {
        let weights = numeric::equal_weights(symbols.len());
        symbols.iter().cloned().zip(weights).collect()
    }

    /// Solves for target weights.
    ///
    /// `expected_returns` switches mean-variance from pure minimum
    /// variance to the utility objective; the return-aware methods fall
    /// back to the estimate's sample means when it is absent.
    ///
    /// # Errors
    ///
    /// Returns a `ComputeError` on non-convergence or a singular
    /// covariance matrix. The engine catches these and substitutes the
    /// equal-weight fallback.
    pub fn solve(
        &self,
        method: OptimizationMethod,
        estimate: &CovarianceEstimate,
        expected_returns: Option<&[Decimal]>,
    ) -> Result<TargetWeights, ComputeError> {
        let n = estimate.symbols.len();
        if n == 0 {
            return Ok(TargetWeights::new());
        }
        let cap = self.effective_cap(n);

        let raw = match method {
            OptimizationMethod::MeanVariance => {
                self.solve_mean_variance(estimate, expected_returns, cap)?
            }
            OptimizationMethod::RiskParity => self.solve_risk_parity(estimate, cap)?,
            OptimizationMethod::MaxSharpe => {
                let mu = expected_returns.unwrap_or(&estimate.mean_returns);
                self.solve_max_sharpe(estimate, mu, cap)?
            }
            OptimizationMethod::Cvar => self.solve_cvar(estimate, cap)?,
        };

        let weights = self.finalize(raw, cap);
        debug!(method = %method, n, "optimization complete");
        Ok(estimate.symbols.iter().cloned().zip(weights).collect())
    }

    /// The cap actually enforced: relaxed to 1/n when the configured cap
    /// cannot sum to full investment.
    fn effective_cap(&self, n: usize) -> Decimal {
        let floor = Decimal::ONE / Decimal::from(n);
        if self.config.max_weight < floor {
            floor
        } else {
            self.config.max_weight
        }
    }

    // --- mean-variance -------------------------------------------------

    fn solve_mean_variance(
        &self,
        estimate: &CovarianceEstimate,
        expected_returns: Option<&[Decimal]>,
        cap: Decimal,
    ) -> Result<Vec<Decimal>, ComputeError> {
        let sigma = &estimate.matrix;
        let n = estimate.symbols.len();

        if let Some(mu) = expected_returns {
            // Utility objective: max mu'w - lambda * w'Sigma w, by
            // projected gradient ascent.
            let lambda = self.config.risk_aversion;
            let mut w = numeric::equal_weights(n);
            let step = dec!(0.01);
            for _ in 0..self.config.max_iterations {
                let sigma_w = numeric::mat_vec(sigma, &w);
                for i in 0..n {
                    w[i] += step * (mu[i] - dec!(2) * lambda * sigma_w[i]);
                }
                project(&mut w, cap);
            }
            return Ok(w);
        }

        // Pure minimum variance: analytical solution when the matrix is
        // invertible and the result feasible.
        if let Ok(sigma_inv) = numeric::mat_inverse(sigma) {
            let ones = vec![Decimal::ONE; n];
            let sigma_inv_ones = numeric::mat_vec(&sigma_inv, &ones);
            let denom: Decimal = sigma_inv_ones.iter().sum();
            if !denom.is_zero() {
                let unconstrained: Vec<Decimal> =
                    sigma_inv_ones.iter().map(|v| *v / denom).collect();
                if is_feasible(&unconstrained, cap) {
                    return Ok(unconstrained);
                }
            }
        }

        // Projected gradient descent on w'Sigma w; also handles the
        // singular-covariance case the analytic path cannot.
        let mut w = numeric::equal_weights(n);
        project(&mut w, cap);
        let step = dec!(0.01);
        for _ in 0..self.config.max_iterations {
            let sigma_w = numeric::mat_vec(sigma, &w);
            for i in 0..n {
                w[i] -= step * dec!(2) * sigma_w[i];
            }
            project(&mut w, cap);
        }
        Ok(w)
    }

    // --- risk parity ---------------------------------------------------

    fn solve_risk_parity(
        &self,
        estimate: &CovarianceEstimate,
        cap: Decimal,
    ) -> Result<Vec<Decimal>, ComputeError> {
        let sigma = &estimate.matrix;
        let n = estimate.symbols.len();

        // Inverse-volatility start.
        let mut w: Vec<Decimal> = (0..n)
            .map(|i| {
                let vol = numeric::sqrt(sigma[i][i]);
                if vol.is_zero() {
                    Decimal::ONE
                } else {
                    Decimal::ONE / vol
                }
            })
            .collect();
        project(&mut w, cap);

        let tolerance = dec!(0.000001);
        for iteration in 0..self.config.max_iterations {
            let sigma_w = numeric::mat_vec(sigma, &w);
            let contributions: Vec<Decimal> =
                (0..n).map(|i| w[i] * sigma_w[i]).collect();
            let total: Decimal = contributions.iter().sum();
            if total <= Decimal::ZERO {
                return Err(ComputeError::DivisionByZero {
                    context: "risk_parity: zero portfolio variance".to_string(),
                });
            }
            let target = total / Decimal::from(n);

            let max_deviation = contributions
                .iter()
                .map(|rc| (*rc - target).abs())
                .fold(Decimal::ZERO, |a, b| if b > a { b } else { a });
            if max_deviation <= tolerance * total {
                debug!(iteration, "risk parity converged");
                return Ok(w);
            }

            let previous = w.clone();
            for i in 0..n {
                if contributions[i] > Decimal::ZERO {
                    w[i] *= numeric::sqrt(target / contributions[i]);
                }
            }
            project(&mut w, cap);

            // Constrained fixed point: the box projection can pin every
            // weight before contributions equalize. That is the
            // constrained optimum, not a failure.
            let max_change = w
                .iter()
                .zip(previous.iter())
                .map(|(a, b)| (*a - *b).abs())
                .fold(Decimal::ZERO, |a, b| if b > a { b } else { a });
            if max_change <= dec!(0.000000001) {
                debug!(iteration, "risk parity pinned by box constraint");
                return Ok(w);
            }
        }

        Err(ComputeError::NonConvergence {
            method: "risk_parity".to_string(),
            iterations: self.config.max_iterations,
        })
    }

    // --- max sharpe ----------------------------------------------------

    fn solve_max_sharpe(
        &self,
        estimate: &CovarianceEstimate,
        mu: &[Decimal],
        cap: Decimal,
    ) -> Result<Vec<Decimal>, ComputeError> {
        let sigma = &estimate.matrix;
        let n = estimate.symbols.len();
        let rf = self.config.risk_free_rate;
        let excess: Vec<Decimal> = mu.iter().map(|r| *r - rf).collect();

        // Tangency portfolio when the unconstrained solution is feasible.
        if let Ok(sigma_inv) = numeric::mat_inverse(sigma) {
            let sigma_inv_excess = numeric::mat_vec(&sigma_inv, &excess);
            let denom: Decimal = sigma_inv_excess.iter().sum();
            if denom.abs() > dec!(0.0000000001) {
                let unconstrained: Vec<Decimal> =
                    sigma_inv_excess.iter().map(|v| *v / denom).collect();
                if is_feasible(&unconstrained, cap) {
                    return Ok(unconstrained);
                }
            }
        }

        // Projected gradient ascent on the Sharpe ratio, tracking the
        // best iterate.
        let mut w = numeric::equal_weights(n);
        project(&mut w, cap);
        let step = dec!(0.002);
        let mut best = w.clone();
        let mut best_sharpe = Decimal::MIN;

        for _ in 0..self.config.max_iterations {
            let port_ret = numeric::vec_dot(&w, mu);
            let port_risk = numeric::portfolio_std(&w, sigma);
            if port_risk.is_zero() {
                break;
            }
            let sharpe = (port_ret - rf) / port_risk;
            if sharpe > best_sharpe {
                best_sharpe = sharpe;
                best = w.clone();
            }

            let sigma_w = numeric::mat_vec(sigma, &w);
            let excess_ret = port_ret - rf;
            let risk_cubed = port_risk * port_risk * port_risk;
            for i in 0..n {
                let grad =
                    -(mu[i] - rf) / port_risk + excess_ret * sigma_w[i] / risk_cubed;
                w[i] -= step * grad;
            }
            project(&mut w, cap);
        }

        Ok(best)
    }

    // --- historical CVaR -----------------------------------------------

    fn solve_cvar(
        &self,
        estimate: &CovarianceEstimate,
        cap: Decimal,
    ) -> Result<Vec<Decimal>, ComputeError> {
        let n = estimate.symbols.len();
        let periods = estimate.periods;
        if periods == 0 {
            return Err(ComputeError::DivisionByZero {
                context: "cvar: no return scenarios".to_string(),
            });
        }
        let tail_fraction = Decimal::ONE - self.config.cvar_confidence;
        let tail_count = usize::max(
            1,
            (tail_fraction * Decimal::from(periods))
                .floor()
                .to_usize()
                .unwrap_or(1),
        );

        let mut w = numeric::equal_weights(n);
        project(&mut w, cap);
        let step = dec!(0.05);
        let mut best = w.clone();
        let mut best_cvar = Decimal::MAX;

        for _ in 0..self.config.max_iterations {
            // Portfolio return per historical period.
            let mut period_returns: Vec<(usize, Decimal)> = (0..periods)
                .map(|t| {
                    let r = (0..n)
                        .map(|i| w[i] * estimate.returns[i][t])
                        .sum::<Decimal>();
                    (t, r)
                })
                .collect();
            period_returns.sort_by(|a, b| a.1.cmp(&b.1));
            let tail = &period_returns[..tail_count];

            let tail_mean: Decimal =
                tail.iter().map(|(_, r)| *r).sum::<Decimal>() / Decimal::from(tail_count);
            let cvar = -tail_mean;
            if cvar < best_cvar {
                best_cvar = cvar;
                best = w.clone();
            }

            // Subgradient: the tail-average asset return, negated.
            for i in 0..n {
                let tail_asset_mean: Decimal = tail
                    .iter()
                    .map(|(t, _)| estimate.returns[i][*t])
                    .sum::<Decimal>()
                    / Decimal::from(tail_count);
                w[i] += step * tail_asset_mean;
            }
            project(&mut w, cap);
        }

        Ok(best)
    }

    // --- finishing -----------------------------------------------------

    /// Clamps into the box, renormalizes, zeroes dust, and renormalizes
    /// again so the full-investment and cap invariants both hold.
    fn finalize(&self, mut w: Vec<Decimal>, cap: Decimal) -> Vec<Decimal> {
        project(&mut w, cap);

        for wi in &mut w {
            if *wi < self.config.dust_threshold {
                *wi = Decimal::ZERO;
            }
        }
        if w.iter().all(Decimal::is_zero) {
            // Dust threshold swallowed everything; keep the projection.
            w = numeric::equal_weights(w.len());
        }
        project(&mut w, cap);
        w
    }
}

/// Projects onto the feasible set {w >= 0, w <= cap, sum w = 1} by
/// alternating clamps and renormalization.
fn project(w: &mut [Decimal], cap: Decimal) {
    for _ in 0..16 {
        numeric::clamp_box(w, cap);
        let total: Decimal = w.iter().sum();
        if total.is_zero() {
            let n = w.len();
            w.copy_from_slice(&numeric::equal_weights(n));
            continue;
        }
        numeric::normalize(w);
        let feasible = w.iter().all(|wi| *wi <= cap + dec!(0.0000001));
        if feasible {
            break;
        }
    }

    // Exact finish: clamp/normalize alone converges only asymptotically
    // when the cap binds everywhere (n * cap = 1 must yield exactly cap
    // per position). Spread the residual across entries with headroom.
    numeric::clamp_box(w, cap);
    for _ in 0..w.len() {
        let total: Decimal = w.iter().sum();
        let residual = Decimal::ONE - total;
        if residual.is_zero() {
            break;
        }
        let open: Vec<usize> = (0..w.len())
            .filter(|&i| {
                if residual > Decimal::ZERO {
                    w[i] < cap
                } else {
                    w[i] > Decimal::ZERO
                }
            })
            .collect();
        if open.is_empty() {
            break;
        }
        let share = residual / Decimal::from(open.len());
        for &i in &open {
            w[i] += share;
        }
        numeric::clamp_box(w, cap);
    }
}

fn is_feasible(w: &[Decimal], cap: Decimal) -> bool {
    let tolerance = dec!(0.0001);
    w.iter()
        .all(|wi| *wi >= -tolerance && *wi <= cap + tolerance)
}
