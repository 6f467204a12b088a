//! Regime resolution and the deleveraging playbook table.
//!
//! The playbooks are static and research-derived, not computed: the
//! value of this module is the resolution chain and the exactness of the
//! table, so the recommendations are pinned by regression tests.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ballast_core::data::Provenance;
use ballast_core::error::{DataError, ValidationError};
use ballast_core::types::Timestamp;

/// Macro-cycle regime driving allocation guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Regime {
    /// Debt-cycle deleveraging or outright depression.
    Deleveraging,
    /// Late-cycle expansion: stretched valuations, tightening ahead.
    LateExpansion,
    /// Post-deleveraging reflation: money printing, negative real rates.
    Reflation,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Deleveraging => "DELEVERAGING",
            Self::LateExpansion => "LATE_EXPANSION",
            Self::Reflation => "REFLATION",
        };
        write!(f, "{label}")
    }
}

impl FromStr for Regime {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "deleveraging" | "depression" => Ok(Self::Deleveraging),
            "late_expansion" => Ok(Self::LateExpansion),
            "reflation" => Ok(Self::Reflation),
            _ => Err(ValidationError::UnrecognizedRegime {
                label: s.to_string(),
            }),
        }
    }
}

impl Regime {
    /// Maps a long-term-debt-cycle phase label to a regime via the fixed
    /// phase table.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::UnrecognizedRegime` for a phase outside
    /// the table.
    pub fn from_phase(phase: &str) -> Result<Self, ValidationError> {
        match phase.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "bubble" | "top" | "late_expansion" | "tightening" => Ok(Self::LateExpansion),
            "deleveraging" | "depression" | "ugly_deleveraging" => Ok(Self::Deleveraging),
            "reflation" | "beautiful_deleveraging" | "normalization" => Ok(Self::Reflation),
            _ => Err(ValidationError::UnrecognizedRegime {
                label: phase.to_string(),
            }),
        }
    }
}

/// Supplies the house view of the current macro regime.
#[async_trait]
pub trait RegimeProvider: Send + Sync {
    /// Returns the current regime.
    ///
    /// # Errors
    ///
    /// Returns a `DataError` when no view is published.
    async fn current_regime(&self) -> Result<Regime, DataError>;
}

/// Inputs for one deleveraging advisory request, in resolution priority
/// order: explicit regime, then cycle phase, then the most severe entry
/// of a scenario-impact map, then the [`RegimeProvider`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleveragingRequest {
    /// Explicit regime label; wins over everything else when present.
    #[serde(default)]
    pub regime: Option<String>,
    /// Long-term-debt-cycle phase label.
    #[serde(default)]
    pub cycle_phase: Option<String>,
    /// Simulated impact per scenario label; the most severe (largest
    /// absolute value) entry whose label parses as a regime or phase is
    /// used.
    #[serde(default)]
    pub scenario_impacts: Option<HashMap<String, Decimal>>,
}

/// One allocation-shift instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleveragingRecommendation {
    /// Action identifier, stable across releases.
    pub action: String,
    /// Representative instruments for executing the shift.
    pub instruments: Vec<String>,
    /// Why the shift fits the regime.
    pub rationale: String,
    /// Percent to cut from the named sleeve, when reducing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_reduction_pct: Option<Decimal>,
    /// Target allocation percent for the named sleeve, when raising.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_allocation_pct: Option<Decimal>,
}

/// A complete deleveraging advisory response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleveragingResult {
    /// The regime the playbook was selected for, when one resolved.
    pub regime: Option<Regime>,
    /// Playbook entries, possibly empty on failure.
    pub recommendations: Vec<DeleveragingRecommendation>,
    /// Non-fatal notes accumulated during resolution.
    pub warnings: Vec<String>,
    /// Populated when no regime could be resolved.
    pub error: Option<String>,
    /// Source and caching metadata.
    pub provenance: Provenance,
}

impl DeleveragingResult {
    pub(crate) const SOURCE: &'static str = "deleveraging_advisor";

    /// A well-formed empty result carrying an error.
    #[must_use]
    pub fn failed(as_of: Timestamp, error: impl Into<String>) -> Self {
        Self {
            regime: None,
            recommendations: Vec::new(),
            warnings: Vec::new(),
            error: Some(error.into()),
            provenance: Provenance::advisory(Self::SOURCE, as_of),
        }
    }
}

fn recommendation(
    action: &str,
    instruments: &[&str],
    rationale: &str,
    target_reduction_pct: Option<Decimal>,
    target_allocation_pct: Option<Decimal>,
) -> DeleveragingRecommendation {
    DeleveragingRecommendation {
        action: action.to_string(),
        instruments: instruments.iter().map(ToString::to_string).collect(),
        rationale: rationale.to_string(),
        target_reduction_pct,
        target_allocation_pct,
    }
}

/// The static playbook for a regime.
#[must_use]
pub fn playbook(regime: Regime) -> Vec<DeleveragingRecommendation> {
    match regime {
        Regime::Deleveraging => vec![
            recommendation(
                "reduce_equity_exposure",
                &["SPY", "QQQ", "IWM"],
                "equity multiples compress hard while credit contracts",
                Some(dec!(40)),
                None,
            ),
            recommendation(
                "raise_safe_haven_allocation",
                &["GLD", "TLT", "SHY"],
                "safe havens hold value while leveraged assets are repriced",
                None,
                Some(dec!(30)),
            ),
            recommendation(
                "exit_high_yield_credit",
                &["HYG", "JNK"],
                "default cycles start in the weakest credit",
                Some(dec!(100)),
                None,
            ),
        ],
        Regime::LateExpansion => vec![
            recommendation(
                "reduce_equity_exposure",
                &["SPY", "QQQ"],
                "late-cycle valuations leave little margin for tightening",
                Some(dec!(20)),
                None,
            ),
            recommendation(
                "raise_defensive_allocation",
                &["XLP", "XLU", "XLV"],
                "staples, utilities, and healthcare hold earnings through a slowdown",
                None,
                Some(dec!(15)),
            ),
        ],
        Regime::Reflation => vec![
            recommendation(
                "reduce_long_duration_bonds",
                &["TLT", "EDV"],
                "negative real rates erode long-duration nominal bonds",
                Some(dec!(50)),
                None,
            ),
            recommendation(
                "raise_inflation_hedge_allocation",
                &["TIP", "GLD", "DBC"],
                "inflation-linked and real assets benefit from reflationary policy",
                None,
                Some(dec!(20)),
            ),
        ],
    }
}

/// Resolves a regime from the request, in priority order. The provider
/// is consulted last and only when supplied.
pub(crate) async fn resolve_regime(
    request: &DeleveragingRequest,
    provider: Option<&dyn RegimeProvider>,
    warnings: &mut Vec<String>,
) -> Result<Regime, ValidationError> {
    if let Some(label) = &request.regime {
        return Regime::from_str(label);
    }
    if let Some(phase) = &request.cycle_phase {
        return Regime::from_phase(phase);
    }
    if let Some(impacts) = &request.scenario_impacts {
        let mut entries: Vec<(&String, Decimal)> =
            impacts.iter().map(|(k, v)| (k, v.abs())).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        for (label, severity) in entries {
            if let Ok(regime) = Regime::from_str(label).or_else(|_| Regime::from_phase(label)) {
                debug!(%regime, %label, %severity, "regime resolved from scenario impacts");
                return Ok(regime);
            }
            warnings.push(format!(
                "scenario impact label '{label}' maps to no regime; skipped"
            ));
        }
    }
    if let Some(provider) = provider {
        match provider.current_regime().await {
            Ok(regime) => return Ok(regime),
            Err(err) => warnings.push(format!("regime provider unavailable: {err}")),
        }
    }
    Err(ValidationError::UnresolvedRegime)
}
