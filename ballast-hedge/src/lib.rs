//! # Ballast Hedge
//!
//! Scenario hedge advisory and regime-indexed deleveraging guidance for
//! the Ballast portfolio engine.
//!
//! A free-form scenario id resolves through a validated alias table into
//! a closed [`shock::ShockCategory`]; each category carries a fixed
//! hedge playbook sized from simulated position-level losses. Macro
//! regimes map to static, research-derived allocation playbooks. Both
//! surfaces live on [`advisor::HedgeAdvisor`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]

/// The hedge advisor surface
pub mod advisor;

/// Regime resolution and deleveraging playbooks
pub mod deleveraging;

/// Scenario hedge playbooks and result types
pub mod scenario;

/// Shock category taxonomy and alias resolution
pub mod shock;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::advisor::{HedgeAdvisor, HedgeConfig};
    pub use crate::deleveraging::{
        DeleveragingRecommendation, DeleveragingRequest, DeleveragingResult, Regime,
        RegimeProvider,
    };
    pub use crate::scenario::{
        HedgeAction, HedgeInstrumentType, HedgeRecommendation, ScenarioHedgeResult,
        ScenarioImpact, ScenarioImpactProvider,
    };
    pub use crate::shock::ShockCategory;
}
