//! Analysis modules.
//!
//! Magnitude statistics and the per-trigger aggregator.

pub mod aggregator;

pub use aggregator::*;
