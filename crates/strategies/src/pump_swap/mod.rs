//! Trades graduated tokens on their PumpSwap pool, quoting in WSOL.

pub mod consts;
pub mod instructions;
pub mod pool;

use crate::settings::StrategySettings;
use crate::token::{
    associated_token_address, close_token_account, compute_budget, create_associated_account,
    mint_token_program, token_balance,
};
use async_trait::async_trait;
use common::errors::TradeError;
use common::traits::LedgerProvider;
use common::types::{
    MarketStage, MintAddress, SellPercentage, SolAmount, Slippage, TradeResult, TradeSide,
};
use dashmap::DashMap;
use detector::pump_const::TOKEN_PROGRAM;
use pool::{find_best_pool, load_snapshot, PoolKeys, PoolSnapshot};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_instruction;
use spl_token::native_mint;
use std::sync::Arc;
use strategy_trait::TradeStrategy;

fn floor_u64(value: Decimal, what: &str) -> Result<u64, TradeError> {
    value
        .floor()
        .to_u64()
        .ok_or_else(|| TradeError::ExecutionError(format!("{} {} does not fit in u64", what, value)))
}

/// User-side accounts of one swap.
struct UserAccounts {
    user: Pubkey,
    base_token_program: Pubkey,
    base_account: Pubkey,
    base_exists: bool,
    base_balance: u64,
    wsol_account: Pubkey,
    wsol_exists: bool,
}

pub struct PumpSwapStrategy {
    provider: Arc<dyn LedgerProvider>,
    settings: StrategySettings,
    // Pool addresses only; reserves are always re-read.
    pools: Arc<DashMap<MintAddress, PoolKeys>>,
}

impl PumpSwapStrategy {
    pub fn new(provider: Arc<dyn LedgerProvider>, settings: StrategySettings) -> Self {
        Self {
            provider,
            settings,
            pools: Arc::new(DashMap::new()),
        }
    }

    /// Best pool for `mint` with fresh reserves. Discovery runs once per mint.
    pub async fn pool(&self, mint: &MintAddress) -> Result<PoolSnapshot, TradeError> {
        let cached = self.pools.get(mint).map(|entry| entry.value().clone());
        if let Some(keys) = cached {
            log::debug!("Using cached pool {} for {}", keys.address, mint);
            return load_snapshot(self.provider.as_ref(), keys).await;
        }

        let best = find_best_pool(self.provider.as_ref(), mint)
            .await?
            .ok_or_else(|| TradeError::LookupError(format!("no PumpSwap pool for {}", mint)))?;
        log::info!(
            "Selected pool {} ({:?} layout, score {}) for {}",
            best.keys.address,
            best.keys.layout,
            best.score(),
            mint
        );
        self.pools.insert(*mint, best.keys.clone());
        Ok(best)
    }

    pub fn cached_pools(&self) -> usize {
        self.pools.len()
    }

    async fn user_accounts(&self, mint: &MintAddress) -> Result<UserAccounts, TradeError> {
        let user = self.provider.payer();
        let wsol_account = associated_token_address(&user, &native_mint::id(), &TOKEN_PROGRAM);

        let accounts = self
            .provider
            .get_multiple_accounts(&[*mint.pubkey(), wsol_account])
            .await?;
        let base_token_program = mint_token_program(mint, accounts.first().and_then(Option::as_ref))?;
        let wsol_exists = accounts.get(1).map_or(false, Option::is_some);

        let base_account = associated_token_address(&user, mint.pubkey(), &base_token_program);
        let holding = self.provider.get_account(&base_account).await?;
        log::debug!(
            "User {} base account {} exists={} wsol account exists={}",
            user,
            base_account,
            holding.is_some(),
            wsol_exists
        );

        Ok(UserAccounts {
            user,
            base_token_program,
            base_account,
            base_exists: holding.is_some(),
            base_balance: token_balance(holding.as_ref())?,
            wsol_account,
            wsol_exists,
        })
    }

    fn prelude(&self, accounts: &UserAccounts) -> Vec<Instruction> {
        let mut instructions = compute_budget(
            self.settings.compute_unit_limit,
            self.settings.pump_swap_unit_price(),
        )
        .to_vec();
        if !accounts.wsol_exists {
            instructions.push(create_associated_account(
                &accounts.user,
                &native_mint::id(),
                &TOKEN_PROGRAM,
            ));
        }
        instructions
    }
}

fn sync_native(account: &Pubkey) -> Result<Instruction, TradeError> {
    spl_token::instruction::sync_native(&TOKEN_PROGRAM, account)
        .map_err(|e| TradeError::ExecutionError(format!("sync native instruction: {}", e)))
}

#[async_trait]
impl TradeStrategy for PumpSwapStrategy {
    fn id(&self) -> &'static str {
        "pump-swap"
    }

    fn stage(&self) -> MarketStage {
        MarketStage::GraduatedDex
    }

    async fn buy(
        &self,
        mint: &MintAddress,
        sol_amount: SolAmount,
        slippage: Slippage,
    ) -> Result<TradeResult, TradeError> {
        let snapshot = self.pool(mint).await?;
        let lamports = sol_amount.lamports();
        let base_out = snapshot.base_for_quote(lamports)?;
        if base_out == 0 {
            return Err(TradeError::ExecutionError(format!(
                "{} SOL buys no tokens of {}",
                sol_amount, mint
            )));
        }
        let max_quote_in = floor_u64(slippage.max_in(Decimal::from(lamports)), "max quote in")?;

        let accounts = self.user_accounts(mint).await?;
        let mut instructions = self.prelude(&accounts);
        instructions.push(system_instruction::transfer(
            &accounts.user,
            &accounts.wsol_account,
            max_quote_in,
        ));
        instructions.push(sync_native(&accounts.wsol_account)?);
        if !accounts.base_exists {
            instructions.push(create_associated_account(
                &accounts.user,
                mint.pubkey(),
                &accounts.base_token_program,
            ));
        }
        instructions.push(instructions::buy(
            &snapshot.keys,
            &accounts.user,
            &accounts.base_token_program,
            base_out,
            max_quote_in,
        ));
        instructions.push(close_token_account(
            &TOKEN_PROGRAM,
            &accounts.wsol_account,
            &accounts.user,
        )?);

        log::info!(
            "Buying {} tokens of {} on pool {} for at most {} lamports ({} slippage)",
            base_out,
            mint,
            snapshot.keys.address,
            max_quote_in,
            slippage
        );
        let signature = self.provider.submit(instructions).await?;

        Ok(TradeResult {
            side: TradeSide::Buy,
            mint: *mint,
            stage: MarketStage::GraduatedDex,
            signature,
            token_amount: base_out,
            sol_limit_lamports: max_quote_in,
        })
    }

    async fn sell(
        &self,
        mint: &MintAddress,
        percentage: SellPercentage,
        slippage: Slippage,
    ) -> Result<TradeResult, TradeError> {
        let snapshot = self.pool(mint).await?;
        let accounts = self.user_accounts(mint).await?;
        if accounts.base_balance == 0 {
            return Err(TradeError::ExecutionError(format!("no balance of {} to sell", mint)));
        }

        let base_in = percentage.apply(accounts.base_balance);
        if base_in == 0 {
            return Err(TradeError::ExecutionError(format!(
                "{} of balance {} rounds to zero tokens",
                percentage, accounts.base_balance
            )));
        }
        let expected = snapshot.quote_for_base(base_in)?;
        let min_quote_out = floor_u64(slippage.min_out(Decimal::from(expected)), "min quote out")?;
        if min_quote_out == 0 {
            return Err(TradeError::ExecutionError(format!(
                "selling {} tokens of {} would return no SOL",
                base_in, mint
            )));
        }

        let mut instructions = self.prelude(&accounts);
        instructions.push(instructions::sell(
            &snapshot.keys,
            &accounts.user,
            &accounts.base_token_program,
            base_in,
            min_quote_out,
        ));
        instructions.push(close_token_account(
            &TOKEN_PROGRAM,
            &accounts.wsol_account,
            &accounts.user,
        )?);

        log::info!(
            "Selling {} of {} tokens of {} on pool {} for at least {} lamports",
            base_in,
            accounts.base_balance,
            mint,
            snapshot.keys.address,
            min_quote_out
        );
        let signature = self.provider.submit(instructions).await?;

        Ok(TradeResult {
            side: TradeSide::Sell,
            mint: *mint,
            stage: MarketStage::GraduatedDex,
            signature,
            token_amount: base_in,
            sol_limit_lamports: min_quote_out,
        })
    }

    async fn close(&self) -> Result<(), TradeError> {
        log::debug!("Closing {} strategy, dropping {} cached pools", self.id(), self.pools.len());
        self.pools.clear();
        Ok(())
    }
}
