//! Provider traits for external collaborators.

mod providers;

pub use providers::{PositionRepository, PriceHistoryProvider, QualityScoreProvider};
