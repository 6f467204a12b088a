//! Provenance metadata attached to every engine response.

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Where a result came from and how long a caller may cache it.
///
/// Trade proposals and impact analyses are priced off live pack data and
/// carry a zero TTL; hedge and deleveraging recommendations are keyed by
/// coarse labels and may be cached for an hour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Component that produced the result.
    pub source: String,
    /// Pricing as-of instant.
    pub as_of: Timestamp,
    /// Seconds the caller may cache the result. Zero means do not cache.
    pub cache_ttl_secs: u64,
}

impl Provenance {
    /// TTL for results computed off live pack prices.
    pub const TTL_LIVE: u64 = 0;
    /// TTL for results keyed by coarse scenario/regime labels.
    pub const TTL_ADVISORY: u64 = 3600;

    /// Provenance for a freshly computed, non-cacheable result.
    #[must_use]
    pub fn live(source: impl Into<String>, as_of: Timestamp) -> Self {
        Self {
            source: source.into(),
            as_of,
            cache_ttl_secs: Self::TTL_LIVE,
        }
    }

    /// Provenance for advisory output cacheable up to an hour.
    #[must_use]
    pub fn advisory(source: impl Into<String>, as_of: Timestamp) -> Self {
        Self {
            source: source.into(),
            as_of,
            cache_ttl_secs: Self::TTL_ADVISORY,
        }
    }
}
