use common::types::{MarketStage, MintAddress, LAMPORTS_PER_SOL};
use detector::BondingCurveState;
use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;
use std::fmt;
use strategies::pump_swap::pool::{PoolLayout, PoolSnapshot};

/// The pool a graduated token would be traded on.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolInfo {
    pub address: Pubkey,
    pub layout: PoolLayout,
    pub base_reserve: u64,
    pub quote_reserve: u64,
    pub liquidity_sol: Decimal,
}

impl From<&PoolSnapshot> for PoolInfo {
    fn from(snapshot: &PoolSnapshot) -> Self {
        PoolInfo {
            address: snapshot.keys.address,
            layout: snapshot.keys.layout,
            base_reserve: snapshot.base_reserve,
            quote_reserve: snapshot.quote_reserve,
            liquidity_sol: Decimal::from(snapshot.quote_reserve) / Decimal::from(LAMPORTS_PER_SOL),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TokenInfo {
    pub mint: MintAddress,
    pub stage: MarketStage,
    pub token_program: Pubkey,
    pub bonding_curve: Pubkey,
    /// Decoded curve account, also present when the curve is complete.
    pub curve: Option<BondingCurveState>,
    /// Only looked up for graduated tokens; `None` if no pool exists.
    pub pool: Option<PoolInfo>,
}

impl fmt::Display for TokenInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "mint:          {}", self.mint)?;
        writeln!(f, "stage:         {}", self.stage)?;
        writeln!(f, "token program: {}", self.token_program)?;
        write!(f, "bonding curve: {}", self.bonding_curve)?;
        if let Some(curve) = &self.curve {
            write!(
                f,
                "\n  virtual reserves: {} lamports / {} tokens\n  real reserves:    {} lamports / {} tokens\n  complete:         {}",
                curve.virtual_sol_reserves,
                curve.virtual_token_reserves,
                curve.real_sol_reserves,
                curve.real_token_reserves,
                curve.complete
            )?;
        }
        match (&self.stage, &self.pool) {
            (MarketStage::GraduatedDex, Some(pool)) => write!(
                f,
                "\npool:          {} ({:?} layout)\n  reserves:         {} tokens / {} lamports\n  liquidity:        {} SOL",
                pool.address, pool.layout, pool.base_reserve, pool.quote_reserve, pool.liquidity_sol
            ),
            (MarketStage::GraduatedDex, None) => write!(f, "\npool:          none found"),
            _ => Ok(()),
        }
    }
}
