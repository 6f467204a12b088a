//! Core type definitions and `NewType` wrappers for financial primitives.
//!
//! All monetary and quantity arithmetic in Ballast goes through these
//! wrappers so that a price can never be silently added to a share count.

mod amount;
mod price;
mod quantity;
mod symbol;
mod timestamp;

pub use amount::Amount;
pub use price::Price;
pub use quantity::Quantity;
pub use symbol::Symbol;
pub use timestamp::Timestamp;

use thiserror::Error;

/// Validation errors for core primitive types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrimitiveError {
    /// Price value is negative.
    #[error("price cannot be negative: {0}")]
    NegativePrice(rust_decimal::Decimal),

    /// Quantity value is negative where an unsigned quantity was required.
    #[error("quantity cannot be negative: {0}")]
    NegativeQuantity(rust_decimal::Decimal),

    /// Symbol format is invalid.
    #[error("invalid symbol format: {0}")]
    InvalidSymbol(String),

    /// A numeric string could not be parsed as a decimal.
    #[error("invalid decimal value: {0}")]
    InvalidDecimal(String),

    /// Symbol is empty.
    #[error("symbol cannot be empty")]
    EmptySymbol,

    /// Timestamp is negative.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(i64),
}
