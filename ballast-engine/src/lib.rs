//! # Ballast Engine
//!
//! The rebalancing pipeline for the Ballast portfolio engine: policy
//! parsing, quality filtering, covariance estimation, allocation
//! optimization, trade sizing, turnover limiting, and impact simulation.
//!
//! The entry point is [`engine::RebalanceEngine`]. Each stage is also a
//! standalone component usable on its own; the engine only wires them
//! together and supplies the degradation policy (data and compute
//! failures fall back to equal-weight targets, validation failures fail
//! the request).

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]

/// Sample covariance estimation from price history
pub mod covariance;

/// Pipeline orchestration
pub mod engine;

/// Quality-based universe filtering
pub mod filter;

/// Portfolio impact simulation
pub mod impact;

/// Decimal linear algebra helpers
pub mod numeric;

/// Allocation optimization methods
pub mod optimizer;

/// Policy input parsing and canonical constraints
pub mod policy;

/// Trade proposal construction and cost modeling
pub mod trades;

/// Aggregate turnover limiting
pub mod turnover;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::covariance::{CovarianceEstimate, CovarianceEstimator};
    pub use crate::engine::{EngineConfig, RebalanceEngine, RebalanceResult};
    pub use crate::filter::{FilterOutcome, QualityFilter};
    pub use crate::impact::{ImpactAnalysis, ImpactSimulator};
    pub use crate::optimizer::{AllocationOptimizer, OptimizerConfig, TargetWeights};
    pub use crate::policy::{
        parse_policy, policy_from_value, OptimizationMethod, PolicyConstraints, PolicyEntry,
        PolicyInput,
    };
    pub use crate::trades::{CostModel, TradeAction, TradeProposal, TradeProposalBuilder};
    pub use crate::turnover::{LimitOutcome, TurnoverLimiter};
}
