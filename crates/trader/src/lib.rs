//! Configuration and the unified pump.fun trader.

pub mod config;
pub mod info;
pub mod unified;

pub use config::{ConfigError, TraderConfig};
pub use info::{PoolInfo, TokenInfo};
pub use unified::UnifiedTrader;
