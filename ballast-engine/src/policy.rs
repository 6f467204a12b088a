//! Policy input normalization.
//!
//! Callers have historically supplied rebalancing policy in three shapes:
//! a flat alias map ({"maxTurnoverPct": 15}), a typed entry list
//! ([{"name": "max_turnover_pct", "value": 15}]), and a constraint-keyed
//! map ({"constraints": {...}}). All three normalize at this boundary
//! into one canonical [`PolicyConstraints`]; alias resolution never leaks
//! into the optimization core.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use ballast_core::error::ValidationError;

/// Allocation optimization method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationMethod {
    /// Markowitz minimum-variance (or mean-variance utility when
    /// expected returns are supplied).
    #[default]
    MeanVariance,
    /// Equal marginal risk contribution.
    RiskParity,
    /// Maximum return per unit risk.
    MaxSharpe,
    /// Minimum historical conditional value-at-risk.
    Cvar,
}

impl fmt::Display for OptimizationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MeanVariance => write!(f, "mean_variance"),
            Self::RiskParity => write!(f, "risk_parity"),
            Self::MaxSharpe => write!(f, "max_sharpe"),
            Self::Cvar => write!(f, "cvar"),
        }
    }
}

impl FromStr for OptimizationMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "mean_variance" | "meanvariance" | "markowitz" | "min_variance" => {
                Ok(Self::MeanVariance)
            }
            "risk_parity" | "riskparity" | "erc" => Ok(Self::RiskParity),
            "max_sharpe" | "maxsharpe" | "tangency" => Ok(Self::MaxSharpe),
            "cvar" | "min_cvar" | "expected_shortfall" => Ok(Self::Cvar),
            _ => Err(ValidationError::InvalidField {
                field: "optimization_method".to_string(),
                reason: format!("unknown method '{s}'"),
            }),
        }
    }
}

/// Canonical, fully populated policy constraints.
///
/// All percentage fields are in `[0, 100]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConstraints {
    /// Minimum quality score for a holding to stay in the optimization
    /// universe (0 disables the filter).
    #[serde(default)]
    pub min_quality_score: Decimal,
    /// Per-position weight cap, percent.
    #[serde(default = "default_max_single_position_pct")]
    pub max_single_position_pct: Decimal,
    /// Per-sector weight cap, percent.
    #[serde(default = "default_max_sector_pct")]
    pub max_sector_pct: Decimal,
    /// Aggregate turnover cap, percent of portfolio value.
    #[serde(default = "default_max_turnover_pct")]
    pub max_turnover_pct: Decimal,
    /// Tracking error budget versus benchmark, percent.
    #[serde(default = "default_max_tracking_error_pct")]
    pub max_tracking_error_pct: Decimal,
    /// Selected optimization method.
    #[serde(default)]
    pub method: OptimizationMethod,
}

fn default_max_single_position_pct() -> Decimal {
    dec!(20)
}

fn default_max_sector_pct() -> Decimal {
    dec!(30)
}

fn default_max_turnover_pct() -> Decimal {
    dec!(20)
}

fn default_max_tracking_error_pct() -> Decimal {
    dec!(3)
}

impl Default for PolicyConstraints {
    fn default() -> Self {
        Self {
            min_quality_score: Decimal::ZERO,
            max_single_position_pct: default_max_single_position_pct(),
            max_sector_pct: default_max_sector_pct(),
            max_turnover_pct: default_max_turnover_pct(),
            max_tracking_error_pct: default_max_tracking_error_pct(),
            method: OptimizationMethod::MeanVariance,
        }
    }
}

/// One entry of the typed-list policy shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyEntry {
    /// Constraint name (alias-tolerant).
    pub name: String,
    /// Constraint value: number or string.
    pub value: Value,
}

/// The loosely structured policy input accepted at the boundary.
///
/// Variant order matters for untagged deserialization: the entry list is
/// an array, the keyed shape is a map with a `constraints` key, and the
/// flat map catches everything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PolicyInput {
    /// Typed list of {name, value} entries.
    Entries(Vec<PolicyEntry>),
    /// Constraint-keyed map: {"constraints": {...}}.
    Keyed {
        /// The nested constraint map.
        constraints: HashMap<String, Value>,
    },
    /// Flat alias map.
    Flat(HashMap<String, Value>),
}

impl Default for PolicyInput {
    fn default() -> Self {
        Self::Flat(HashMap::new())
    }
}

/// The canonical fields a policy key can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PolicyField {
    MinQuality,
    MaxSinglePosition,
    MaxSector,
    MaxTurnover,
    MaxTrackingError,
    Method,
}

/// Alias table: every historically observed key spelling, normalized to
/// lowercase-with-underscores. Unknown keys are ignored.
const ALIASES: &[(&str, PolicyField)] = &[
    ("min_quality_score", PolicyField::MinQuality),
    ("min_quality", PolicyField::MinQuality),
    ("quality_floor", PolicyField::MinQuality),
    ("max_single_position_pct", PolicyField::MaxSinglePosition),
    ("max_position_pct", PolicyField::MaxSinglePosition),
    ("max_weight_pct", PolicyField::MaxSinglePosition),
    ("position_limit", PolicyField::MaxSinglePosition),
    ("max_sector_pct", PolicyField::MaxSector),
    ("sector_limit", PolicyField::MaxSector),
    ("max_turnover_pct", PolicyField::MaxTurnover),
    ("max_turnover", PolicyField::MaxTurnover),
    ("turnover_limit", PolicyField::MaxTurnover),
    ("max_tracking_error_pct", PolicyField::MaxTrackingError),
    ("tracking_error_limit", PolicyField::MaxTrackingError),
    ("te_limit", PolicyField::MaxTrackingError),
    ("optimization_method", PolicyField::Method),
    ("method", PolicyField::Method),
    ("optimizer", PolicyField::Method),
];

fn normalize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (i, c) in key.trim().chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            for lower in c.to_lowercase() {
                out.push(lower);
            }
        } else if c == '-' || c == ' ' {
            out.push('_');
        } else {
            out.push(c);
        }
    }
    out
}

fn resolve_field(key: &str) -> Option<PolicyField> {
    let normalized = normalize_key(key);
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == normalized)
        .map(|(_, field)| *field)
}

fn parse_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(Decimal::from)
            .or_else(|| n.as_f64().and_then(Decimal::from_f64)),
        Value::String(s) => Decimal::from_str(s).ok(),
        _ => None,
    }
}

/// Parses loosely structured policy input into canonical constraints.
///
/// Malformed numeric fields and out-of-range percentages yield a warning
/// plus the documented default; they never abort the request. An unknown
/// method string likewise warns and defaults to mean-variance.
#[must_use]
pub fn parse_policy(input: &PolicyInput) -> (PolicyConstraints, Vec<String>) {
    let pairs: Vec<(String, Value)> = match input {
        PolicyInput::Entries(entries) => entries
            .iter()
            .map(|e| (e.name.clone(), e.value.clone()))
            .collect(),
        PolicyInput::Keyed { constraints } => {
            constraints.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        }
        PolicyInput::Flat(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
    };

    let mut constraints = PolicyConstraints::default();
    let mut warnings = Vec::new();

    for (key, value) in pairs {
        let Some(field) = resolve_field(&key) else {
            debug!(key = %key, "ignoring unknown policy key");
            continue;
        };

        if field == PolicyField::Method {
            match value.as_str().map(OptimizationMethod::from_str) {
                Some(Ok(method)) => constraints.method = method,
                _ => warnings.push(format!(
                    "policy field '{key}' has unrecognized method {value}; \
                     defaulting to mean_variance"
                )),
            }
            continue;
        }

        let Some(parsed) = parse_decimal(&value) else {
            warnings.push(format!(
                "policy field '{key}' is not numeric ({value}); using default"
            ));
            continue;
        };

        if parsed < Decimal::ZERO || parsed > dec!(100) {
            warnings.push(format!(
                "policy field '{key}' out of range [0, 100] ({parsed}); using default"
            ));
            continue;
        }

        match field {
            PolicyField::MinQuality => constraints.min_quality_score = parsed,
            PolicyField::MaxSinglePosition => constraints.max_single_position_pct = parsed,
            PolicyField::MaxSector => constraints.max_sector_pct = parsed,
            PolicyField::MaxTurnover => constraints.max_turnover_pct = parsed,
            PolicyField::MaxTrackingError => constraints.max_tracking_error_pct = parsed,
            PolicyField::Method => unreachable!("method handled above"),
        }
    }

    (constraints, warnings)
}

/// Deserializes an arbitrary JSON value into a [`PolicyInput`].
///
/// # Errors
///
/// Returns `ValidationError::MalformedPolicy` when the value matches none
/// of the three accepted shapes.
pub fn policy_from_value(value: Value) -> Result<PolicyInput, ValidationError> {
    serde_json::from_value(value).map_err(|e| ValidationError::MalformedPolicy {
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse_json(value: Value) -> (PolicyConstraints, Vec<String>) {
        let input = policy_from_value(value).unwrap();
        parse_policy(&input)
    }

    #[test]
    fn test_defaults_when_empty() {
        let (constraints, warnings) = parse_json(json!({}));
        assert_eq!(constraints, PolicyConstraints::default());
        assert_eq!(constraints.max_single_position_pct, dec!(20));
        assert_eq!(constraints.max_turnover_pct, dec!(20));
        assert_eq!(constraints.max_tracking_error_pct, dec!(3));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_flat_map_with_camel_case_aliases() {
        let (constraints, warnings) = parse_json(json!({
            "maxSinglePositionPct": 15,
            "maxTurnoverPct": "12.5",
            "optimizationMethod": "risk_parity",
        }));
        assert!(warnings.is_empty());
        assert_eq!(constraints.max_single_position_pct, dec!(15));
        assert_eq!(constraints.max_turnover_pct, dec!(12.5));
        assert_eq!(constraints.method, OptimizationMethod::RiskParity);
    }

    #[test]
    fn test_entry_list_shape() {
        let (constraints, _) = parse_json(json!([
            {"name": "min_quality", "value": 60},
            {"name": "method", "value": "max_sharpe"},
        ]));
        assert_eq!(constraints.min_quality_score, dec!(60));
        assert_eq!(constraints.method, OptimizationMethod::MaxSharpe);
    }

    #[test]
    fn test_constraint_keyed_shape() {
        let (constraints, _) = parse_json(json!({
            "constraints": {"max_sector_pct": 25}
        }));
        assert_eq!(constraints.max_sector_pct, dec!(25));
    }

    #[test]
    fn test_malformed_numeric_warns_and_defaults() {
        let (constraints, warnings) = parse_json(json!({
            "max_turnover_pct": "lots",
        }));
        assert_eq!(constraints.max_turnover_pct, dec!(20));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("max_turnover_pct"));
    }

    #[test]
    fn test_out_of_range_percentage_warns_and_defaults() {
        let (constraints, warnings) = parse_json(json!({
            "max_single_position_pct": 150,
            "min_quality": -5,
        }));
        assert_eq!(constraints.max_single_position_pct, dec!(20));
        assert_eq!(constraints.min_quality_score, Decimal::ZERO);
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let (constraints, warnings) = parse_json(json!({
            "favourite_color": "green",
        }));
        assert_eq!(constraints, PolicyConstraints::default());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_unknown_method_warns_and_defaults() {
        let (constraints, warnings) = parse_json(json!({
            "method": "tea_leaves",
        }));
        assert_eq!(constraints.method, OptimizationMethod::MeanVariance);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_method_parsing_aliases() {
        assert_eq!(
            "Mean-Variance".parse::<OptimizationMethod>().unwrap(),
            OptimizationMethod::MeanVariance
        );
        assert_eq!(
            "CVAR".parse::<OptimizationMethod>().unwrap(),
            OptimizationMethod::Cvar
        );
        assert!("astrology".parse::<OptimizationMethod>().is_err());
    }

    #[test]
    fn test_all_percentages_in_range_property() {
        let (constraints, _) = parse_json(json!({
            "max_single_position_pct": 35,
            "max_sector_pct": 40,
            "max_turnover_pct": 10,
            "te_limit": 2,
            "quality_floor": 50,
        }));
        for pct in [
            constraints.min_quality_score,
            constraints.max_single_position_pct,
            constraints.max_sector_pct,
            constraints.max_turnover_pct,
            constraints.max_tracking_error_pct,
        ] {
            assert!(pct >= Decimal::ZERO && pct <= dec!(100));
        }
    }
}
