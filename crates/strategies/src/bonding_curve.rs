//! Trades against a pump.fun bonding curve.

use crate::settings::StrategySettings;
use crate::token::{
    associated_token_address, close_token_account, compute_budget, create_associated_account,
    token_balance,
};
use async_trait::async_trait;
use common::errors::TradeError;
use common::traits::LedgerProvider;
use common::types::{
    MarketStage, MintAddress, SellPercentage, SolAmount, Slippage, TradeResult, TradeSide,
};
use detector::pump_const::{
    creator_vault_address, PUMP_EVENT_AUTHORITY, PUMP_FEE_RECIPIENT, PUMP_FUN_PROGRAM, PUMP_GLOBAL,
};
use detector::{BondingCurveState, CurveObservation, MarketStageDetector};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_program;
use std::sync::Arc;
use strategy_trait::TradeStrategy;

pub const BUY_DISCRIMINATOR: [u8; 8] = [0x66, 0x06, 0x3d, 0x12, 0x01, 0xda, 0xeb, 0xea];
pub const SELL_DISCRIMINATOR: [u8; 8] = [0x33, 0xe6, 0x85, 0xa4, 0x01, 0x7f, 0x83, 0xad];

/// Accounts every curve trade touches.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveAccounts {
    pub mint: Pubkey,
    pub bonding_curve: Pubkey,
    pub curve_token_account: Pubkey,
    pub user: Pubkey,
    pub user_token_account: Pubkey,
    pub token_program: Pubkey,
    pub creator_vault: Pubkey,
}

impl CurveAccounts {
    fn resolve(observation: &CurveObservation, curve: &BondingCurveState, user: Pubkey) -> Self {
        let mint = *observation.mint.pubkey();
        let token_program = observation.token_program;
        CurveAccounts {
            mint,
            bonding_curve: observation.bonding_curve,
            curve_token_account: associated_token_address(
                &observation.bonding_curve,
                &mint,
                &token_program,
            ),
            user,
            user_token_account: associated_token_address(&user, &mint, &token_program),
            token_program,
            creator_vault: creator_vault_address(&curve.creator),
        }
    }
}

fn instruction_data(discriminator: [u8; 8], amount: u64, sol_limit: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(24);
    data.extend_from_slice(&discriminator);
    data.extend_from_slice(&amount.to_le_bytes());
    data.extend_from_slice(&sol_limit.to_le_bytes());
    data
}

/// `buy(token_amount, max_sol_cost)`.
pub fn buy_instruction(accounts: &CurveAccounts, token_amount: u64, max_sol_cost: u64) -> Instruction {
    Instruction {
        program_id: PUMP_FUN_PROGRAM,
        accounts: vec![
            AccountMeta::new_readonly(PUMP_GLOBAL, false),
            AccountMeta::new(PUMP_FEE_RECIPIENT, false),
            AccountMeta::new_readonly(accounts.mint, false),
            AccountMeta::new(accounts.bonding_curve, false),
            AccountMeta::new(accounts.curve_token_account, false),
            AccountMeta::new(accounts.user_token_account, false),
            AccountMeta::new(accounts.user, true),
            AccountMeta::new_readonly(system_program::id(), false),
            AccountMeta::new_readonly(accounts.token_program, false),
            AccountMeta::new(accounts.creator_vault, false),
            AccountMeta::new_readonly(PUMP_EVENT_AUTHORITY, false),
            AccountMeta::new_readonly(PUMP_FUN_PROGRAM, false),
        ],
        data: instruction_data(BUY_DISCRIMINATOR, token_amount, max_sol_cost),
    }
}

/// `sell(token_amount, min_sol_output)`. The creator vault precedes the token
/// program here, unlike in `buy`.
pub fn sell_instruction(accounts: &CurveAccounts, token_amount: u64, min_sol_output: u64) -> Instruction {
    Instruction {
        program_id: PUMP_FUN_PROGRAM,
        accounts: vec![
            AccountMeta::new_readonly(PUMP_GLOBAL, false),
            AccountMeta::new(PUMP_FEE_RECIPIENT, false),
            AccountMeta::new_readonly(accounts.mint, false),
            AccountMeta::new(accounts.bonding_curve, false),
            AccountMeta::new(accounts.curve_token_account, false),
            AccountMeta::new(accounts.user_token_account, false),
            AccountMeta::new(accounts.user, true),
            AccountMeta::new_readonly(system_program::id(), false),
            AccountMeta::new(accounts.creator_vault, false),
            AccountMeta::new_readonly(accounts.token_program, false),
            AccountMeta::new_readonly(PUMP_EVENT_AUTHORITY, false),
            AccountMeta::new_readonly(PUMP_FUN_PROGRAM, false),
        ],
        data: instruction_data(SELL_DISCRIMINATOR, token_amount, min_sol_output),
    }
}

fn to_u64(value: Decimal, what: &str) -> Result<u64, TradeError> {
    value
        .floor()
        .to_u64()
        .ok_or_else(|| TradeError::ExecutionError(format!("{} {} does not fit in u64", what, value)))
}

/// Strategy for tokens whose curve is still active.
pub struct BondingCurveStrategy {
    provider: Arc<dyn LedgerProvider>,
    detector: MarketStageDetector,
    settings: StrategySettings,
}

impl BondingCurveStrategy {
    pub fn new(provider: Arc<dyn LedgerProvider>, settings: StrategySettings) -> Self {
        let detector = MarketStageDetector::new(provider.clone());
        Self {
            provider,
            detector,
            settings,
        }
    }

    /// Re-reads the curve right before trading. A curve that completed since
    /// detection is an execution failure; no fallback to the DEX happens here.
    async fn active_curve(
        &self,
        mint: &MintAddress,
    ) -> Result<(CurveObservation, BondingCurveState), TradeError> {
        let observation = self.detector.observe(mint).await?;
        match observation.curve {
            Some(curve) if !curve.complete => Ok((observation, curve)),
            Some(_) => Err(TradeError::ExecutionError(format!(
                "bonding curve of {} is complete",
                mint
            ))),
            None => Err(TradeError::ExecutionError(format!(
                "no bonding curve account for {}",
                mint
            ))),
        }
    }

    /// `floor(amount * to_reserve / from_reserve)` over the virtual reserves.
    fn at_curve_ratio(
        mint: &MintAddress,
        amount: u64,
        to_reserve: u64,
        from_reserve: u64,
    ) -> Result<u64, TradeError> {
        if to_reserve == 0 || from_reserve == 0 {
            return Err(TradeError::ExecutionError(format!(
                "bonding curve of {} has empty reserves",
                mint
            )));
        }
        let scaled = u128::from(amount) * u128::from(to_reserve) / u128::from(from_reserve);
        u64::try_from(scaled).map_err(|_| {
            TradeError::ExecutionError(format!(
                "amount {} exceeds u64 at the curve ratio of {}",
                amount, mint
            ))
        })
    }
}

#[async_trait]
impl TradeStrategy for BondingCurveStrategy {
    fn id(&self) -> &'static str {
        "bonding-curve"
    }

    fn stage(&self) -> MarketStage {
        MarketStage::BondingCurve
    }

    async fn buy(
        &self,
        mint: &MintAddress,
        sol_amount: SolAmount,
        slippage: Slippage,
    ) -> Result<TradeResult, TradeError> {
        let (observation, curve) = self.active_curve(mint).await?;

        let lamports = sol_amount.lamports();
        let token_amount = Self::at_curve_ratio(
            mint,
            lamports,
            curve.virtual_token_reserves,
            curve.virtual_sol_reserves,
        )?;
        if token_amount == 0 {
            return Err(TradeError::ExecutionError(format!(
                "{} SOL buys no tokens of {}",
                sol_amount, mint
            )));
        }
        let max_sol_cost = to_u64(slippage.max_in(Decimal::from(lamports)), "max sol cost")?;

        let user = self.provider.payer();
        let accounts = CurveAccounts::resolve(&observation, &curve, user);
        let holding = self.provider.get_account(&accounts.user_token_account).await?;

        let mut instructions = compute_budget(
            self.settings.compute_unit_limit,
            self.settings.compute_unit_price,
        )
        .to_vec();
        if holding.is_none() {
            instructions.push(create_associated_account(
                &user,
                &accounts.mint,
                &accounts.token_program,
            ));
        }
        instructions.push(buy_instruction(&accounts, token_amount, max_sol_cost));

        log::info!(
            "Buying {} tokens of {} on curve for at most {} lamports ({} slippage)",
            token_amount,
            mint,
            max_sol_cost,
            slippage
        );
        let signature = self.provider.submit(instructions).await?;

        Ok(TradeResult {
            side: TradeSide::Buy,
            mint: *mint,
            stage: MarketStage::BondingCurve,
            signature,
            token_amount,
            sol_limit_lamports: max_sol_cost,
        })
    }

    async fn sell(
        &self,
        mint: &MintAddress,
        percentage: SellPercentage,
        slippage: Slippage,
    ) -> Result<TradeResult, TradeError> {
        let (observation, curve) = self.active_curve(mint).await?;

        let user = self.provider.payer();
        let accounts = CurveAccounts::resolve(&observation, &curve, user);
        let holding = self.provider.get_account(&accounts.user_token_account).await?;
        let balance = token_balance(holding.as_ref())?;
        if balance == 0 {
            return Err(TradeError::ExecutionError(format!("no balance of {} to sell", mint)));
        }

        let token_amount = percentage.apply(balance);
        if token_amount == 0 {
            return Err(TradeError::ExecutionError(format!(
                "{} of balance {} rounds to zero tokens",
                percentage, balance
            )));
        }
        let expected_sol = Self::at_curve_ratio(
            mint,
            token_amount,
            curve.virtual_sol_reserves,
            curve.virtual_token_reserves,
        )?;
        let min_sol_output =
            to_u64(slippage.min_out(Decimal::from(expected_sol)), "min sol output")?;

        let mut instructions = compute_budget(
            self.settings.compute_unit_limit,
            self.settings.compute_unit_price,
        )
        .to_vec();
        instructions.push(sell_instruction(&accounts, token_amount, min_sol_output));
        if percentage.is_full() {
            instructions.push(close_token_account(
                &accounts.token_program,
                &accounts.user_token_account,
                &user,
            )?);
        }

        log::info!(
            "Selling {} of {} tokens of {} on curve for at least {} lamports",
            token_amount,
            balance,
            mint,
            min_sol_output
        );
        let signature = self.provider.submit(instructions).await?;

        Ok(TradeResult {
            side: TradeSide::Sell,
            mint: *mint,
            stage: MarketStage::BondingCurve,
            signature,
            token_amount,
            sol_limit_lamports: min_sol_output,
        })
    }

    async fn close(&self) -> Result<(), TradeError> {
        log::debug!("Closing {} strategy", self.id());
        Ok(())
    }
}
