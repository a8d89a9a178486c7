//! # Pump Trader Common Crate
//!
//! This crate provides common data types, error definitions, and the ledger
//! provider trait used across the `pump-trader` workspace.

/// Module for common error types.
pub mod errors;

/// Module for shared service traits.
pub mod traits;

/// Module for common data structures and types.
pub mod types;

// Re-export key items for easier access.
pub use errors::{ProviderError, TradeError};
pub use traits::LedgerProvider;
pub use types::{
    MarketStage, MintAddress, SellPercentage, Slippage, SolAmount, TradeRequest, TradeResult,
    TradeSide, LAMPORTS_PER_SOL,
};
