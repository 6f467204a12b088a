//! Shock category taxonomy and scenario-id resolution.
//!
//! Scenario ids arrive as free-form strings from several upstream
//! systems, each with its own spelling. Resolution goes through a fixed
//! alias table into a closed enum; an id outside the table is a
//! validation error, never a guessed default.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use ballast_core::error::ValidationError;

/// The closed set of stress-shock categories the advisor can hedge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShockCategory {
    /// Parallel upward rate shock.
    RatesUp,
    /// Parallel downward rate shock.
    RatesDown,
    /// Broad dollar appreciation.
    UsdUp,
    /// Broad dollar depreciation.
    UsdDown,
    /// Upside inflation surprise.
    CpiSurprise,
    /// Corporate credit spread widening.
    CreditSpreadWidening,
    /// Broad equity drawdown.
    EquitySelloff,
    /// Broad equity melt-up (hurts hedged or short books).
    EquityRally,
}

impl ShockCategory {
    /// All categories, for coverage checks.
    pub const ALL: [Self; 8] = [
        Self::RatesUp,
        Self::RatesDown,
        Self::UsdUp,
        Self::UsdDown,
        Self::CpiSurprise,
        Self::CreditSpreadWidening,
        Self::EquitySelloff,
        Self::EquityRally,
    ];
}

impl fmt::Display for ShockCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::RatesUp => "RATES_UP",
            Self::RatesDown => "RATES_DOWN",
            Self::UsdUp => "USD_UP",
            Self::UsdDown => "USD_DOWN",
            Self::CpiSurprise => "CPI_SURPRISE",
            Self::CreditSpreadWidening => "CREDIT_SPREAD_WIDENING",
            Self::EquitySelloff => "EQUITY_SELLOFF",
            Self::EquityRally => "EQUITY_RALLY",
        };
        write!(f, "{label}")
    }
}

/// Every scenario-id spelling observed upstream, in normalized form.
const ALIASES: &[(&str, ShockCategory)] = &[
    ("rates_up", ShockCategory::RatesUp),
    ("rate_hike", ShockCategory::RatesUp),
    ("rising_rates", ShockCategory::RatesUp),
    ("yields_up", ShockCategory::RatesUp),
    ("rates_down", ShockCategory::RatesDown),
    ("rate_cut", ShockCategory::RatesDown),
    ("falling_rates", ShockCategory::RatesDown),
    ("yields_down", ShockCategory::RatesDown),
    ("usd_up", ShockCategory::UsdUp),
    ("dollar_rally", ShockCategory::UsdUp),
    ("usd_strength", ShockCategory::UsdUp),
    ("usd_down", ShockCategory::UsdDown),
    ("dollar_selloff", ShockCategory::UsdDown),
    ("usd_weakness", ShockCategory::UsdDown),
    ("cpi_surprise", ShockCategory::CpiSurprise),
    ("inflation", ShockCategory::CpiSurprise),
    ("inflation_surprise", ShockCategory::CpiSurprise),
    ("inflation_shock", ShockCategory::CpiSurprise),
    ("credit_spread_widening", ShockCategory::CreditSpreadWidening),
    ("credit_stress", ShockCategory::CreditSpreadWidening),
    ("spread_widening", ShockCategory::CreditSpreadWidening),
    ("credit_crunch", ShockCategory::CreditSpreadWidening),
    ("equity_selloff", ShockCategory::EquitySelloff),
    ("market_crash", ShockCategory::EquitySelloff),
    ("equity_drawdown", ShockCategory::EquitySelloff),
    ("bear_market", ShockCategory::EquitySelloff),
    ("equity_rally", ShockCategory::EquityRally),
    ("melt_up", ShockCategory::EquityRally),
    ("bull_market", ShockCategory::EquityRally),
];

/// Alias map, checked once at first use: duplicate aliases and
/// unreachable categories are programming errors, caught before any
/// request is served.
static ALIAS_MAP: LazyLock<HashMap<&'static str, ShockCategory>> = LazyLock::new(|| {
    let mut map = HashMap::with_capacity(ALIASES.len());
    for (alias, category) in ALIASES {
        assert!(
            map.insert(*alias, *category).is_none(),
            "duplicate scenario alias: {alias}"
        );
    }
    for category in ShockCategory::ALL {
        assert!(
            map.values().any(|c| *c == category),
            "shock category {category} has no alias"
        );
    }
    map
});

fn normalize(scenario_id: &str) -> String {
    scenario_id.trim().to_lowercase().replace(['-', ' '], "_")
}

impl ShockCategory {
    /// Resolves a free-form scenario id.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::UnsupportedScenario` for an id outside
    /// the alias table.
    pub fn resolve(scenario_id: &str) -> Result<Self, ValidationError> {
        ALIAS_MAP
            .get(normalize(scenario_id).as_str())
            .copied()
            .ok_or_else(|| ValidationError::UnsupportedScenario {
                scenario_id: scenario_id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_category_reachable() {
        // Forces the LazyLock assertions too.
        for category in ShockCategory::ALL {
            let alias = ALIASES
                .iter()
                .find(|(_, c)| *c == category)
                .map(|(a, _)| *a)
                .unwrap();
            assert_eq!(ShockCategory::resolve(alias).unwrap(), category);
        }
    }

    #[test]
    fn test_resolution_is_case_and_separator_tolerant() {
        assert_eq!(
            ShockCategory::resolve("Equity Selloff").unwrap(),
            ShockCategory::EquitySelloff
        );
        assert_eq!(
            ShockCategory::resolve("CPI-SURPRISE").unwrap(),
            ShockCategory::CpiSurprise
        );
        assert_eq!(
            ShockCategory::resolve("inflation").unwrap(),
            ShockCategory::CpiSurprise
        );
    }

    #[test]
    fn test_unknown_scenario_errors() {
        let err = ShockCategory::resolve("alien_invasion").unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnsupportedScenario {
                scenario_id: "alien_invasion".to_string()
            }
        );
    }
}
