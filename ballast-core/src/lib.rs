//! # Ballast Core
//!
//! Core types, errors, and provider traits for the Ballast portfolio
//! rebalancing and hedging engine.
//!
//! This crate provides:
//! - `NewType` wrappers for financial primitives ([`types::Price`],
//!   [`types::Quantity`], [`types::Amount`], [`types::Symbol`],
//!   [`types::Timestamp`])
//! - The portfolio data model ([`data::Position`], [`data::PriceSeries`],
//!   [`data::Provenance`])
//! - The hierarchical error framework ([`error::BallastError`])
//! - Async provider traits for external collaborators
//!   ([`traits::PositionRepository`], [`traits::PriceHistoryProvider`],
//!   [`traits::QualityScoreProvider`])

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]

/// Portfolio data structures
pub mod data;

/// Error types and handling
pub mod error;

/// Request-scoped context
pub mod request;

/// Provider trait definitions
pub mod traits;

/// Core type definitions and `NewType` wrappers
pub mod types;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::data::*;
    pub use crate::error::*;
    pub use crate::request::RequestContext;
    pub use crate::traits::*;
    pub use crate::types::*;
}
