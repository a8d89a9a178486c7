//! Routing tests for the unified trader, with spy strategies behind it.

use async_trait::async_trait;
use common::errors::TradeError;
use common::types::{
    MarketStage, MintAddress, SellPercentage, SolAmount, Slippage, TradeResult, TradeSide,
};
use detector::pump_const::{bonding_curve_address, PUMP_FUN_PROGRAM, TOKEN_PROGRAM};
use detector::BondingCurveState;
use provider::testing::{mint_account, program_account, MockProvider};
use rust_decimal_macros::dec;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use strategy_trait::TradeStrategy;
use trader::UnifiedTrader;

struct SpyStrategy {
    stage: MarketStage,
    buys: AtomicUsize,
    sells: AtomicUsize,
    closes: AtomicUsize,
    fail_close: bool,
}

impl SpyStrategy {
    fn build(stage: MarketStage, fail_close: bool) -> Arc<Self> {
        Arc::new(SpyStrategy {
            stage,
            buys: AtomicUsize::new(0),
            sells: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
            fail_close,
        })
    }

    fn new(stage: MarketStage) -> Arc<Self> {
        Self::build(stage, false)
    }

    fn failing_close(stage: MarketStage) -> Arc<Self> {
        Self::build(stage, true)
    }

    fn calls(&self) -> usize {
        self.buys.load(Ordering::SeqCst) + self.sells.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TradeStrategy for SpyStrategy {
    fn id(&self) -> &'static str {
        "spy"
    }

    fn stage(&self) -> MarketStage {
        self.stage
    }

    async fn buy(
        &self,
        mint: &MintAddress,
        sol_amount: SolAmount,
        _slippage: Slippage,
    ) -> Result<TradeResult, TradeError> {
        self.buys.fetch_add(1, Ordering::SeqCst);
        Ok(TradeResult {
            side: TradeSide::Buy,
            mint: *mint,
            stage: self.stage,
            signature: Signature::new_unique(),
            token_amount: 1,
            sol_limit_lamports: sol_amount.lamports(),
        })
    }

    async fn sell(
        &self,
        mint: &MintAddress,
        _percentage: SellPercentage,
        _slippage: Slippage,
    ) -> Result<TradeResult, TradeError> {
        self.sells.fetch_add(1, Ordering::SeqCst);
        Ok(TradeResult {
            side: TradeSide::Sell,
            mint: *mint,
            stage: self.stage,
            signature: Signature::new_unique(),
            token_amount: 1,
            sol_limit_lamports: 0,
        })
    }

    async fn close(&self) -> Result<(), TradeError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            Err(TradeError::ExecutionError("spy close failed".to_string()))
        } else {
            Ok(())
        }
    }
}

struct Harness {
    provider: Arc<MockProvider>,
    curve_spy: Arc<SpyStrategy>,
    dex_spy: Arc<SpyStrategy>,
    trader: UnifiedTrader,
}

fn harness_with(curve_spy: Arc<SpyStrategy>, dex_spy: Arc<SpyStrategy>) -> Harness {
    let provider = Arc::new(MockProvider::new());
    let trader = UnifiedTrader::with_strategies(provider.clone(), curve_spy.clone(), dex_spy.clone());
    Harness {
        provider,
        curve_spy,
        dex_spy,
        trader,
    }
}

fn harness() -> Harness {
    harness_with(
        SpyStrategy::new(MarketStage::BondingCurve),
        SpyStrategy::new(MarketStage::GraduatedDex),
    )
}

/// Registers a mint, with a curve account when `complete` is given.
fn token(provider: &MockProvider, complete: Option<bool>) -> String {
    let mint = Pubkey::new_unique();
    provider.set_account(mint, mint_account(6, TOKEN_PROGRAM));
    if let Some(complete) = complete {
        let state = BondingCurveState {
            virtual_token_reserves: 1_073_000_000_000_000,
            virtual_sol_reserves: 30_000_000_000,
            real_token_reserves: 793_100_000_000_000,
            real_sol_reserves: 0,
            token_total_supply: 1_000_000_000_000_000,
            complete,
            creator: Pubkey::new_unique(),
        };
        provider.set_account(
            bonding_curve_address(&mint),
            program_account(PUMP_FUN_PROGRAM, state.encode()),
        );
    }
    mint.to_string()
}

#[tokio::test]
async fn test_active_curve_buy_goes_to_bonding_curve() {
    let h = harness();
    let mint = token(&h.provider, Some(false));

    let result = h.trader.buy(&mint, dec!(0.5), dec!(0.1)).await.unwrap();

    assert_eq!(result.stage, MarketStage::BondingCurve);
    assert_eq!(result.side, TradeSide::Buy);
    assert_eq!(result.sol_limit_lamports, 500_000_000);
    assert_eq!(h.curve_spy.buys.load(Ordering::SeqCst), 1);
    assert_eq!(h.dex_spy.calls(), 0);
}

#[tokio::test]
async fn test_migrated_sell_goes_to_dex() {
    let h = harness();
    let mint = token(&h.provider, Some(true));

    let result = h.trader.sell(&mint, dec!(50), dec!(0.05)).await.unwrap();

    assert_eq!(result.stage, MarketStage::GraduatedDex);
    assert_eq!(h.dex_spy.sells.load(Ordering::SeqCst), 1);
    assert_eq!(h.curve_spy.calls(), 0);
}

#[tokio::test]
async fn test_missing_curve_goes_to_dex() {
    let h = harness();
    let mint = token(&h.provider, None);
    h.trader.buy(&mint, dec!(1), dec!(0)).await.unwrap();
    assert_eq!(h.dex_spy.buys.load(Ordering::SeqCst), 1);
    assert_eq!(h.curve_spy.calls(), 0);
}

#[tokio::test]
async fn test_unknown_mint_touches_no_strategy() {
    let h = harness();
    let unknown = Pubkey::new_unique().to_string();

    let detect = h.trader.detect(&unknown).await;
    assert!(matches!(detect, Err(TradeError::LookupError(_))));

    let buy = h.trader.buy(&unknown, dec!(0.5), dec!(0.1)).await;
    assert!(matches!(buy, Err(TradeError::LookupError(_))));
    assert_eq!(h.curve_spy.calls() + h.dex_spy.calls(), 0);
}

#[tokio::test]
async fn test_invalid_arguments_fail_before_network() {
    let h = harness();
    let mint = token(&h.provider, Some(false));

    let cases = vec![
        h.trader.buy(&mint, dec!(0), dec!(0.1)).await,
        h.trader.buy(&mint, dec!(-1), dec!(0.1)).await,
        h.trader.buy(&mint, dec!(0.5), dec!(1)).await,
        h.trader.buy(&mint, dec!(0.5), dec!(-0.01)).await,
        h.trader.sell(&mint, dec!(0), dec!(0.1)).await,
        h.trader.sell(&mint, dec!(100.5), dec!(0.1)).await,
        h.trader.sell("not-a-mint", dec!(50), dec!(0.1)).await,
    ];
    for outcome in cases {
        assert!(
            matches!(outcome, Err(TradeError::InvalidArgument(_))),
            "unexpected outcome {:?}",
            outcome
        );
    }
    assert_eq!(h.provider.read_count(), 0);
    assert_eq!(h.curve_spy.calls() + h.dex_spy.calls(), 0);
}

#[tokio::test]
async fn test_network_failure_touches_no_strategy() {
    let h = harness();
    let mint = token(&h.provider, Some(false));
    h.provider.fail_reads(Some("connection refused"));

    let outcome = h.trader.buy(&mint, dec!(0.5), dec!(0.1)).await;
    assert!(matches!(outcome, Err(TradeError::NetworkError(_))));
    assert_eq!(h.curve_spy.calls() + h.dex_spy.calls(), 0);
}

#[tokio::test]
async fn test_stage_is_observed_per_request() {
    let h = harness();
    let mint = token(&h.provider, Some(false));
    h.trader.buy(&mint, dec!(0.1), dec!(0.1)).await.unwrap();

    // The token graduates between two requests.
    let key: Pubkey = mint.parse().unwrap();
    h.provider.remove_account(&bonding_curve_address(&key));
    h.trader.sell(&mint, dec!(100), dec!(0.1)).await.unwrap();

    assert_eq!(h.curve_spy.buys.load(Ordering::SeqCst), 1);
    assert_eq!(h.dex_spy.sells.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let h = harness();
    let mint = token(&h.provider, Some(false));

    h.trader.close().await.unwrap();
    h.trader.close().await.unwrap();

    assert!(h.trader.is_closed());
    assert_eq!(h.curve_spy.closes.load(Ordering::SeqCst), 1);
    assert_eq!(h.dex_spy.closes.load(Ordering::SeqCst), 1);
    assert_eq!(h.provider.close_calls(), 1);

    let outcome = h.trader.buy(&mint, dec!(0.5), dec!(0.1)).await;
    assert_eq!(
        outcome.unwrap_err(),
        TradeError::NetworkError("provider closed".to_string())
    );
}

#[tokio::test]
async fn test_close_after_keeps_trade_outcome() {
    let h = harness_with(
        SpyStrategy::failing_close(MarketStage::BondingCurve),
        SpyStrategy::new(MarketStage::GraduatedDex),
    );
    let mint = token(&h.provider, Some(false));

    let outcome = h.trader.buy(&mint, dec!(0.5), dec!(0.1)).await;
    let outcome = h.trader.close_after(outcome).await;
    assert!(outcome.is_ok());

    // The provider is still released even though a strategy failed to close.
    assert!(h.provider.is_closed());
    assert_eq!(h.dex_spy.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_close_is_reported_by_close() {
    let h = harness_with(
        SpyStrategy::new(MarketStage::BondingCurve),
        SpyStrategy::failing_close(MarketStage::GraduatedDex),
    );
    assert!(matches!(
        h.trader.close().await,
        Err(TradeError::ExecutionError(_))
    ));
    // A second close is a no-op.
    assert!(h.trader.close().await.is_ok());
}
