//! Routes each trade to the strategy matching the token's current market stage.

use crate::info::{PoolInfo, TokenInfo};
use common::errors::{ProviderError, TradeError};
use common::traits::LedgerProvider;
use common::types::{MarketStage, MintAddress, TradeRequest, TradeResult};
use detector::MarketStageDetector;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use strategies::pump_swap::pool::find_best_pool;
use strategies::{BondingCurveStrategy, PumpSwapStrategy, StrategySettings};
use strategy_trait::TradeStrategy;

pub struct UnifiedTrader {
    provider: Arc<dyn LedgerProvider>,
    detector: MarketStageDetector,
    bonding_curve: Arc<dyn TradeStrategy>,
    dex: Arc<dyn TradeStrategy>,
    closed: AtomicBool,
}

impl UnifiedTrader {
    /// Trader with the pump.fun curve and PumpSwap strategies.
    pub fn new(provider: Arc<dyn LedgerProvider>, settings: &StrategySettings) -> Self {
        let bonding_curve = Arc::new(BondingCurveStrategy::new(provider.clone(), settings.clone()));
        let dex = Arc::new(PumpSwapStrategy::new(provider.clone(), settings.clone()));
        Self::with_strategies(provider, bonding_curve, dex)
    }

    pub fn with_strategies(
        provider: Arc<dyn LedgerProvider>,
        bonding_curve: Arc<dyn TradeStrategy>,
        dex: Arc<dyn TradeStrategy>,
    ) -> Self {
        UnifiedTrader {
            detector: MarketStageDetector::new(provider.clone()),
            provider,
            bonding_curve,
            dex,
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> Result<(), TradeError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(ProviderError::Closed.into())
        } else {
            Ok(())
        }
    }

    pub fn strategy_for(&self, stage: MarketStage) -> &Arc<dyn TradeStrategy> {
        match stage {
            MarketStage::BondingCurve => &self.bonding_curve,
            MarketStage::GraduatedDex => &self.dex,
        }
    }

    pub async fn detect(&self, mint: &str) -> Result<MarketStage, TradeError> {
        let mint: MintAddress = mint.parse()?;
        self.ensure_open()?;
        self.detector.detect(&mint).await
    }

    /// Buys `sol_amount` SOL worth of `mint`.
    pub async fn buy(
        &self,
        mint: &str,
        sol_amount: Decimal,
        slippage: Decimal,
    ) -> Result<TradeResult, TradeError> {
        self.execute(TradeRequest::buy(mint, sol_amount, slippage)?).await
    }

    /// Sells `percentage` percent of the wallet's balance of `mint`.
    pub async fn sell(
        &self,
        mint: &str,
        percentage: Decimal,
        slippage: Decimal,
    ) -> Result<TradeResult, TradeError> {
        self.execute(TradeRequest::sell(mint, percentage, slippage)?).await
    }

    /// Detects the stage once and hands the request to exactly one strategy.
    pub async fn execute(&self, request: TradeRequest) -> Result<TradeResult, TradeError> {
        self.ensure_open()?;
        let stage = self.detector.detect(request.mint()).await?;
        let strategy = self.strategy_for(stage);
        log::info!(
            "{} {} routed to {} strategy ({})",
            request.side(),
            request.mint(),
            strategy.id(),
            stage
        );

        let result = match request {
            TradeRequest::Buy {
                mint,
                sol_amount,
                slippage,
            } => strategy.buy(&mint, sol_amount, slippage).await,
            TradeRequest::Sell {
                mint,
                percentage,
                slippage,
            } => strategy.sell(&mint, percentage, slippage).await,
        };
        match &result {
            Ok(trade) => log::info!("{}", trade),
            Err(e) => log::debug!("{} strategy failed: {}", strategy.id(), e),
        }
        result
    }

    /// Current stage of `mint` together with its curve or best pool.
    pub async fn token_info(&self, mint: &str) -> Result<TokenInfo, TradeError> {
        let mint: MintAddress = mint.parse()?;
        self.ensure_open()?;
        let observation = self.detector.observe(&mint).await?;

        let pool = match observation.stage {
            MarketStage::BondingCurve => None,
            MarketStage::GraduatedDex => find_best_pool(self.provider.as_ref(), &mint)
                .await?
                .map(|snapshot| PoolInfo::from(&snapshot)),
        };
        Ok(TokenInfo {
            mint,
            stage: observation.stage,
            token_program: observation.token_program,
            bonding_curve: observation.bonding_curve,
            curve: observation.curve,
            pool,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Closes both strategies, then the provider. Safe to call more than once.
    pub async fn close(&self) -> Result<(), TradeError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let mut first_error = None;
        for strategy in [&self.bonding_curve, &self.dex] {
            if let Err(e) = strategy.close().await {
                log::warn!("Closing {} strategy failed: {}", strategy.id(), e);
                first_error.get_or_insert(e);
            }
        }
        if let Err(e) = self.provider.close().await {
            log::warn!("Closing provider failed: {}", e);
            first_error.get_or_insert(e.into());
        }
        log::info!("Trader closed");
        first_error.map_or(Ok(()), Err)
    }

    /// Closes the trader and hands back `outcome`. A close failure is logged
    /// and never replaces the outcome.
    pub async fn close_after<T>(&self, outcome: Result<T, TradeError>) -> Result<T, TradeError> {
        if let Err(e) = self.close().await {
            log::warn!("Trader close failed after trade: {}", e);
        }
        outcome
    }
}
