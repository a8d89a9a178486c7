//! Full trades through the real strategies against an in-memory ledger.

use common::errors::TradeError;
use common::types::{MarketStage, LAMPORTS_PER_SOL};
use common::LedgerProvider;
use detector::pump_const::{bonding_curve_address, PUMP_FUN_PROGRAM, TOKEN_PROGRAM};
use detector::BondingCurveState;
use provider::testing::{mint_account, program_account, token_account, MockProvider};
use rust_decimal_macros::dec;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use strategies::pump_swap::consts::PUMP_SWAP_PROGRAM;
use strategies::pump_swap::pool::PoolLayout;
use strategies::token::associated_token_address;
use strategies::StrategySettings;
use trader::UnifiedTrader;

fn setup() -> (Arc<MockProvider>, UnifiedTrader) {
    let provider = Arc::new(MockProvider::new());
    let trader = UnifiedTrader::new(provider.clone(), &StrategySettings::default());
    (provider, trader)
}

fn curve_token(provider: &MockProvider) -> Pubkey {
    let mint = Pubkey::new_unique();
    provider.set_account(mint, mint_account(6, TOKEN_PROGRAM));
    let state = BondingCurveState {
        virtual_token_reserves: 1_000_000_000_000_000,
        virtual_sol_reserves: 30_000_000_000,
        real_token_reserves: 800_000_000_000_000,
        real_sol_reserves: 0,
        token_total_supply: 1_000_000_000_000_000,
        complete: false,
        creator: Pubkey::new_unique(),
    };
    provider.set_account(
        bonding_curve_address(&mint),
        program_account(PUMP_FUN_PROGRAM, state.encode()),
    );
    mint
}

/// A graduated token with one new-layout pool of 1e9 units against 100 SOL.
fn graduated_token(provider: &MockProvider) -> (Pubkey, Pubkey) {
    let mint = Pubkey::new_unique();
    provider.set_account(mint, mint_account(6, TOKEN_PROGRAM));

    let pool = Pubkey::new_unique();
    let base_vault = Pubkey::new_unique();
    let quote_vault = Pubkey::new_unique();
    let wsol = spl_token::native_mint::id();

    let mut data = vec![0u8; 8];
    data.push(255);
    data.extend_from_slice(&0u16.to_le_bytes());
    for key in [Pubkey::new_unique(), mint, wsol, Pubkey::new_unique(), base_vault, quote_vault] {
        data.extend_from_slice(key.as_ref());
    }
    data.extend_from_slice(&1_000u64.to_le_bytes());
    data.extend_from_slice(Pubkey::new_unique().as_ref());

    provider.set_account(pool, program_account(PUMP_SWAP_PROGRAM, data));
    provider.set_account(base_vault, token_account(mint, pool, 1_000_000_000, TOKEN_PROGRAM));
    provider.set_account(
        quote_vault,
        token_account(wsol, pool, 100 * LAMPORTS_PER_SOL, TOKEN_PROGRAM),
    );
    (mint, pool)
}

#[tokio::test]
async fn test_curve_buy_submits_pump_fun_transaction() {
    let (provider, trader) = setup();
    let mint = curve_token(&provider);

    let result = trader.buy(&mint.to_string(), dec!(0.5), dec!(0.1)).await.unwrap();
    assert_eq!(result.stage, MarketStage::BondingCurve);
    assert_eq!(result.token_amount, 16_666_666_666_666);

    let submissions = provider.submissions();
    assert_eq!(submissions.len(), 1);
    assert!(submissions[0].iter().any(|ix| ix.program_id == PUMP_FUN_PROGRAM));
    assert!(submissions[0].iter().all(|ix| ix.program_id != PUMP_SWAP_PROGRAM));
}

#[tokio::test]
async fn test_graduated_sell_submits_pump_swap_transaction() {
    let (provider, trader) = setup();
    let (mint, pool) = graduated_token(&provider);
    let user = provider.payer();
    provider.set_account(
        associated_token_address(&user, &mint, &TOKEN_PROGRAM),
        token_account(mint, user, 10_000_000, TOKEN_PROGRAM),
    );

    let result = trader.sell(&mint.to_string(), dec!(50), dec!(0.05)).await.unwrap();
    assert_eq!(result.stage, MarketStage::GraduatedDex);
    assert_eq!(result.token_amount, 5_000_000);
    assert_eq!(result.sol_limit_lamports, 475_000_000);

    let submissions = provider.submissions();
    let swap = submissions[0]
        .iter()
        .find(|ix| ix.program_id == PUMP_SWAP_PROGRAM)
        .unwrap();
    assert_eq!(swap.accounts[0].pubkey, pool);
}

#[tokio::test]
async fn test_graduated_without_pool_is_lookup_error() {
    let (provider, trader) = setup();
    let mint = Pubkey::new_unique();
    provider.set_account(mint, mint_account(9, TOKEN_PROGRAM));

    let outcome = trader.buy(&mint.to_string(), dec!(0.5), dec!(0.1)).await;
    assert!(matches!(outcome, Err(TradeError::LookupError(_))));
    assert!(provider.submissions().is_empty());
}

#[tokio::test]
async fn test_token_info_for_both_stages() {
    let (provider, trader) = setup();

    let on_curve = curve_token(&provider);
    let info = trader.token_info(&on_curve.to_string()).await.unwrap();
    assert_eq!(info.stage, MarketStage::BondingCurve);
    assert!(info.curve.is_some());
    assert!(info.pool.is_none());
    assert!(info.to_string().contains("virtual reserves"));

    let (graduated, pool) = graduated_token(&provider);
    let info = trader.token_info(&graduated.to_string()).await.unwrap();
    assert_eq!(info.stage, MarketStage::GraduatedDex);
    let pool_info = info.pool.clone().unwrap();
    assert_eq!(pool_info.address, pool);
    assert_eq!(pool_info.layout, PoolLayout::New);
    assert_eq!(pool_info.liquidity_sol, dec!(100));
    assert!(info.to_string().contains(&pool.to_string()));
}

#[tokio::test]
async fn test_close_releases_provider() {
    let (provider, trader) = setup();
    let mint = curve_token(&provider);
    let outcome = trader.buy(&mint.to_string(), dec!(0.1), dec!(0.1)).await;
    assert!(trader.close_after(outcome).await.is_ok());
    assert!(provider.is_closed());
    assert!(matches!(
        trader.detect(&mint.to_string()).await,
        Err(TradeError::NetworkError(_))
    ));
}
