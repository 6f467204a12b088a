//! Request-scoped context.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::Timestamp;

/// Immutable context carried through one engine request.
///
/// Every invocation names the portfolio being operated on and the pricing
/// pack it is valued against. Pipeline stages never pass state through
/// loosely typed blobs; anything request-scoped lives here or in the
/// typed output of the previous stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Portfolio identifier.
    pub portfolio_id: String,
    /// Immutable, dated price snapshot identifier.
    pub pricing_pack_id: String,
    /// Pricing as-of instant.
    pub as_of: Timestamp,
}

impl RequestContext {
    /// Creates a context, validating that both identifiers are present.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::MissingPortfolioId` or
    /// `ValidationError::MissingPricingPack` when the respective id is
    /// empty.
    pub fn new(
        portfolio_id: impl Into<String>,
        pricing_pack_id: impl Into<String>,
        as_of: Timestamp,
    ) -> Result<Self, ValidationError> {
        let portfolio_id = portfolio_id.into();
        if portfolio_id.trim().is_empty() {
            return Err(ValidationError::MissingPortfolioId);
        }
        let pricing_pack_id = pricing_pack_id.into();
        if pricing_pack_id.trim().is_empty() {
            return Err(ValidationError::MissingPricingPack);
        }
        Ok(Self {
            portfolio_id,
            pricing_pack_id,
            as_of,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_both_ids() {
        let as_of = Timestamp::now();
        assert!(RequestContext::new("port-1", "pack-2025-06-30", as_of).is_ok());
        assert_eq!(
            RequestContext::new("", "pack", as_of),
            Err(ValidationError::MissingPortfolioId)
        );
        assert_eq!(
            RequestContext::new("port-1", "  ", as_of),
            Err(ValidationError::MissingPricingPack)
        );
    }
}
