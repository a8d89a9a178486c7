use common::types::LAMPORTS_PER_SOL;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Transaction fee settings shared by both strategies.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategySettings {
    /// Compute unit limit requested by every trade transaction.
    pub compute_unit_limit: u32,
    /// Compute unit price for curve trades, in micro-lamports.
    pub compute_unit_price: u64,
    /// Total priority fee for PumpSwap trades, in SOL.
    pub pump_swap_fee_sol: Decimal,
}

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            compute_unit_limit: 120_000,
            compute_unit_price: 100_000,
            pump_swap_fee_sol: Decimal::new(5, 4), // 0.0005 SOL
        }
    }
}

impl StrategySettings {
    /// Spreads the PumpSwap priority fee over the compute unit limit and returns
    /// the resulting unit price in micro-lamports.
    pub fn pump_swap_unit_price(&self) -> u64 {
        if self.compute_unit_limit == 0 {
            return 0;
        }
        let fee_lamports = (self.pump_swap_fee_sol * Decimal::from(LAMPORTS_PER_SOL))
            .floor()
            .to_u64()
            .unwrap_or(0);
        fee_lamports.saturating_mul(1_000_000) / u64::from(self.compute_unit_limit)
    }
}
