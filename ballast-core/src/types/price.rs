//! Price type for representing security prices.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::PrimitiveError;

/// Price type - used for representing security prices.
///
/// Wraps a `Decimal` value to ensure type safety and prevent
/// mixing price values with other numeric types.
///
/// # Examples
///
/// ```
/// use ballast_core::types::Price;
/// use rust_decimal_macros::dec;
///
/// let price = Price::new(dec!(100.50)).unwrap();
/// assert_eq!(price.as_decimal(), dec!(100.50));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Zero price constant.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Creates a new `Price` from a `Decimal` value.
    ///
    /// # Errors
    ///
    /// Returns `PrimitiveError::NegativePrice` if the value is negative.
    pub fn new(value: Decimal) -> Result<Self, PrimitiveError> {
        if value < Decimal::ZERO {
            return Err(PrimitiveError::NegativePrice(value));
        }
        Ok(Self(value))
    }

    /// Creates a new `Price` without validation.
    ///
    /// The caller must ensure the value is non-negative.
    #[must_use]
    pub const fn new_unchecked(value: Decimal) -> Self {
        Self(value)
    }

    /// Returns the underlying `Decimal` value.
    #[must_use]
    pub const fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Returns true if the price is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = PrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decimal = Decimal::from_str(s)
            .map_err(|_| PrimitiveError::InvalidDecimal(s.to_string()))
            .and_then(|d| {
                if d < Decimal::ZERO {
                    Err(PrimitiveError::NegativePrice(d))
                } else {
                    Ok(d)
                }
            })?;
        Ok(Self(decimal))
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_price_validation() {
        assert!(Price::new(dec!(100.50)).is_ok());
        assert!(Price::new(Decimal::ZERO).is_ok());
        assert!(Price::new(dec!(-1.0)).is_err());
    }

    #[test]
    fn test_price_zero() {
        assert!(Price::ZERO.is_zero());
        assert!(!Price::new(dec!(0.01)).unwrap().is_zero());
    }

    #[test]
    fn test_parse_failure_names_the_decimal() {
        assert_eq!(
            "not-a-price".parse::<Price>(),
            Err(PrimitiveError::InvalidDecimal("not-a-price".to_string()))
        );
        assert_eq!(
            "-5".parse::<Price>(),
            Err(PrimitiveError::NegativePrice(dec!(-5)))
        );
    }
}
