use async_trait::async_trait;
use common::errors::TradeError;
use common::types::{MarketStage, MintAddress, SellPercentage, Slippage, SolAmount, TradeResult};

/// An execution venue for a token: the bonding curve or the graduated DEX pool.
///
/// The unified trader holds one implementation per [`MarketStage`] and picks one
/// per call, so implementations must be interchangeable behind `dyn`.
#[async_trait]
pub trait TradeStrategy: Send + Sync {
    /// Returns the unique identifier for the strategy.
    fn id(&self) -> &'static str;

    /// The market stage this strategy executes on.
    fn stage(&self) -> MarketStage;

    /// Spends `sol_amount` on `mint`, paying at most `slippage` above the quoted price.
    async fn buy(
        &self,
        mint: &MintAddress,
        sol_amount: SolAmount,
        slippage: Slippage,
    ) -> Result<TradeResult, TradeError>;

    /// Sells `percentage` of the wallet's `mint` holdings, accepting at most
    /// `slippage` below the quoted price.
    async fn sell(
        &self,
        mint: &MintAddress,
        percentage: SellPercentage,
        slippage: Slippage,
    ) -> Result<TradeResult, TradeError>;

    /// Releases resources held by the strategy. Must be safe to call twice.
    async fn close(&self) -> Result<(), TradeError>;
}
