//! Portfolio data structures.
//!
//! Read-only inputs to the engine (position snapshots, price history) and
//! the provenance metadata attached to every engine response.

mod position;
mod provenance;
mod series;

pub use position::Position;
pub use provenance::Provenance;
pub use series::{PricePoint, PriceSeries};
