use crate::errors::TradeError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use std::fmt;
use std::str::FromStr;

/// Number of lamports in one SOL.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// The mint address identifying a tradable token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MintAddress(pub Pubkey);

impl MintAddress {
    pub fn pubkey(&self) -> &Pubkey {
        &self.0
    }
}

impl FromStr for MintAddress {
    type Err = TradeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pubkey::from_str(s.trim())
            .map(MintAddress)
            .map_err(|e| TradeError::InvalidArgument(format!("invalid mint address '{}': {}", s, e)))
    }
}

impl From<Pubkey> for MintAddress {
    fn from(pubkey: Pubkey) -> Self {
        MintAddress(pubkey)
    }
}

impl fmt::Display for MintAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a token currently trades. Recomputed on every call since a token can
/// graduate between two calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketStage {
    /// Priced by an active, incomplete pump.fun bonding curve.
    BondingCurve,
    /// The curve is complete or gone; liquidity lives in a PumpSwap pool.
    GraduatedDex,
}

impl fmt::Display for MarketStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketStage::BondingCurve => write!(f, "BondingCurve"),
            MarketStage::GraduatedDex => write!(f, "GraduatedDex"),
        }
    }
}

/// Direction of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "BUY"),
            TradeSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Amount of SOL to spend on a buy. Always positive and at least one lamport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SolAmount(Decimal);

impl SolAmount {
    pub fn new(sol: Decimal) -> Result<Self, TradeError> {
        if sol <= Decimal::ZERO {
            return Err(TradeError::InvalidArgument(format!(
                "sol_amount must be greater than 0, got {}",
                sol
            )));
        }
        let lamports = sol
            .checked_mul(Decimal::from(LAMPORTS_PER_SOL))
            .map(|lamports| lamports.floor())
            .ok_or_else(|| {
                TradeError::InvalidArgument(format!("sol_amount {} is out of range", sol))
            })?;
        if lamports < Decimal::ONE {
            return Err(TradeError::InvalidArgument(format!(
                "sol_amount {} is smaller than one lamport",
                sol
            )));
        }
        if lamports.to_u64().is_none() {
            return Err(TradeError::InvalidArgument(format!(
                "sol_amount {} is out of range",
                sol
            )));
        }
        Ok(SolAmount(sol))
    }

    pub fn sol(&self) -> Decimal {
        self.0
    }

    /// The amount in lamports, rounded down.
    pub fn lamports(&self) -> u64 {
        self.0
            .checked_mul(Decimal::from(LAMPORTS_PER_SOL))
            .and_then(|lamports| lamports.floor().to_u64())
            .unwrap_or(u64::MAX)
    }
}

impl fmt::Display for SolAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} SOL", self.0)
    }
}

/// Share of current holdings to sell, in percent: `0 < p <= 100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SellPercentage(Decimal);

impl SellPercentage {
    pub fn new(percentage: Decimal) -> Result<Self, TradeError> {
        if percentage <= Decimal::ZERO || percentage > dec!(100) {
            return Err(TradeError::InvalidArgument(format!(
                "percentage must be in (0, 100], got {}",
                percentage
            )));
        }
        Ok(SellPercentage(percentage))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_full(&self) -> bool {
        self.0 == dec!(100)
    }

    /// Applies the percentage to a raw token balance, rounding down.
    pub fn apply(&self, balance: u64) -> u64 {
        (Decimal::from(balance) * self.0 / dec!(100))
            .floor()
            .to_u64()
            .unwrap_or(0)
    }
}

impl fmt::Display for SellPercentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Maximum tolerated price deviation as a fraction: `0 <= s < 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slippage(Decimal);

impl Slippage {
    pub fn new(fraction: Decimal) -> Result<Self, TradeError> {
        if fraction < Decimal::ZERO || fraction >= Decimal::ONE {
            return Err(TradeError::InvalidArgument(format!(
                "slippage must be in [0, 1), got {}",
                fraction
            )));
        }
        Ok(Slippage(fraction))
    }

    pub fn fraction(&self) -> Decimal {
        self.0
    }

    /// Upper bound for an amount paid: `amount * (1 + s)`, rounded down.
    pub fn max_in(&self, amount: Decimal) -> Decimal {
        (amount * (Decimal::ONE + self.0)).floor()
    }

    /// Lower bound for an amount received: `amount * (1 - s)`, rounded down.
    pub fn min_out(&self, amount: Decimal) -> Decimal {
        (amount * (Decimal::ONE - self.0)).floor()
    }
}

impl fmt::Display for Slippage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0 * dec!(100))
    }
}

/// A validated trade request. Built per call and never persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum TradeRequest {
    Buy {
        mint: MintAddress,
        sol_amount: SolAmount,
        slippage: Slippage,
    },
    Sell {
        mint: MintAddress,
        percentage: SellPercentage,
        slippage: Slippage,
    },
}

impl TradeRequest {
    /// Validates raw buy parameters.
    pub fn buy(mint: &str, sol_amount: Decimal, slippage: Decimal) -> Result<Self, TradeError> {
        Ok(TradeRequest::Buy {
            sol_amount: SolAmount::new(sol_amount)?,
            slippage: Slippage::new(slippage)?,
            mint: mint.parse()?,
        })
    }

    /// Validates raw sell parameters.
    pub fn sell(mint: &str, percentage: Decimal, slippage: Decimal) -> Result<Self, TradeError> {
        Ok(TradeRequest::Sell {
            percentage: SellPercentage::new(percentage)?,
            slippage: Slippage::new(slippage)?,
            mint: mint.parse()?,
        })
    }

    pub fn mint(&self) -> &MintAddress {
        match self {
            TradeRequest::Buy { mint, .. } | TradeRequest::Sell { mint, .. } => mint,
        }
    }

    pub fn side(&self) -> TradeSide {
        match self {
            TradeRequest::Buy { .. } => TradeSide::Buy,
            TradeRequest::Sell { .. } => TradeSide::Sell,
        }
    }
}

/// Outcome of a confirmed trade.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeResult {
    pub side: TradeSide,
    pub mint: MintAddress,
    /// The venue the trade was executed on.
    pub stage: MarketStage,
    pub signature: Signature,
    /// Raw token amount bought (expected) or sold.
    pub token_amount: u64,
    /// Max SOL paid on a buy, min SOL received on a sell, in lamports.
    pub sol_limit_lamports: u64,
}

impl fmt::Display for TradeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} on {}: {} tokens, sol limit {} lamports, tx {}",
            self.side,
            self.mint,
            self.stage,
            self.token_amount,
            self.sol_limit_lamports,
            self.signature
        )
    }
}
