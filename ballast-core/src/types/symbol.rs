//! Symbol type for representing security ticker identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::PrimitiveError;

/// Symbol type - used for representing security ticker identifiers.
///
/// Wraps a `String` value with validation to ensure proper format.
/// Symbols are typically tickers such as "AAPL", "SPY" or "BRK-B".
///
/// # Examples
///
/// ```
/// use ballast_core::types::Symbol;
///
/// let symbol = Symbol::new("AAPL").unwrap();
/// assert_eq!(symbol.as_str(), "AAPL");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Creates a new `Symbol` from a string.
    ///
    /// # Errors
    ///
    /// Returns `PrimitiveError::EmptySymbol` if the string is empty.
    /// Returns `PrimitiveError::InvalidSymbol` if it contains characters
    /// other than alphanumerics, hyphens, underscores, or dots.
    pub fn new(value: impl Into<String>) -> Result<Self, PrimitiveError> {
        let s = value.into();
        if s.is_empty() {
            return Err(PrimitiveError::EmptySymbol);
        }
        if !s
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err(PrimitiveError::InvalidSymbol(s));
        }
        Ok(Self(s))
    }

    /// Creates a new `Symbol` without validation.
    ///
    /// The caller must ensure the value is a valid ticker format.
    #[must_use]
    pub fn new_unchecked(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Symbol {
    type Err = PrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
