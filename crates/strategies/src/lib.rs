//! # Trade Strategies Crate
//!
//! One [`strategy_trait::TradeStrategy`] per market stage: the pump.fun bonding
//! curve and the PumpSwap AMM that tokens graduate to.

pub mod bonding_curve;
pub mod pump_swap;
pub mod settings;
pub mod token;

pub use bonding_curve::BondingCurveStrategy;
pub use pump_swap::PumpSwapStrategy;
pub use settings::StrategySettings;
