//! Position snapshot type.

use serde::{Deserialize, Serialize};

use crate::types::{Amount, Price, Quantity, Symbol};

/// A single holding in a portfolio, snapshotted at a pricing timestamp.
///
/// Positions are read-only inputs to the engine: the engine never mutates
/// or persists them, it only values them and derives trade proposals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Security ticker.
    pub symbol: Symbol,
    /// Stable instrument identifier from the security master.
    pub instrument_id: String,
    /// Shares held. Negative for short positions.
    pub quantity: Quantity,
    /// Price per share from the pricing pack.
    pub price: Price,
    /// Market value (quantity x price) in the position currency.
    pub market_value: Amount,
    /// ISO 4217 currency code.
    pub currency: String,
}

impl Position {
    /// Creates a position, deriving the market value from price and
    /// quantity.
    #[must_use]
    pub fn new(
        symbol: Symbol,
        instrument_id: impl Into<String>,
        quantity: Quantity,
        price: Price,
        currency: impl Into<String>,
    ) -> Self {
        let market_value = Amount::from_price_qty(price, quantity);
        Self {
            symbol,
            instrument_id: instrument_id.into(),
            quantity,
            price,
            market_value,
            currency: currency.into(),
        }
    }
}
