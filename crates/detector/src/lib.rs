//! # Market-Stage Detector Crate
//!
//! Reads a token's pump.fun bonding-curve account and decides whether the token
//! still trades on the curve or has graduated to a PumpSwap pool.

pub mod curve;
pub mod pump_const;
pub mod service;

// Re-export the main service struct for easy access.
pub use curve::BondingCurveState;
pub use service::{classify, CurveObservation, MarketStageDetector};
