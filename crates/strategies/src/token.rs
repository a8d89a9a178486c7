//! Token account helpers shared by both strategies.

use common::errors::TradeError;
use common::types::MintAddress;
use detector::pump_const::{is_token_program, MINT_ACCOUNT_LEN};
use solana_sdk::account::Account;
use solana_sdk::compute_budget::ComputeBudgetInstruction;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use spl_associated_token_account::get_associated_token_address_with_program_id;
use spl_associated_token_account::instruction::create_associated_token_account_idempotent;
use spl_token::solana_program::program_pack::Pack;
use spl_token::state::Account as TokenAccount;

pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey, token_program: &Pubkey) -> Pubkey {
    get_associated_token_address_with_program_id(owner, mint, token_program)
}

/// Instruction creating `owner`'s associated account for `mint`, paid by `owner`.
pub fn create_associated_account(owner: &Pubkey, mint: &Pubkey, token_program: &Pubkey) -> Instruction {
    create_associated_token_account_idempotent(owner, owner, mint, token_program)
}

/// Raw amount held by a token account; `None` counts as an empty balance.
///
/// Token-2022 accounts share the base layout, extensions follow it.
pub fn token_balance(account: Option<&Account>) -> Result<u64, TradeError> {
    let Some(account) = account else {
        return Ok(0);
    };
    if account.data.len() < TokenAccount::LEN {
        return Err(TradeError::LookupError(format!(
            "token account data is {} bytes, expected at least {}",
            account.data.len(),
            TokenAccount::LEN
        )));
    }
    let state = TokenAccount::unpack_from_slice(&account.data)
        .map_err(|e| TradeError::LookupError(format!("invalid token account: {}", e)))?;
    Ok(state.amount)
}

/// Checks that `account` is a mint and returns the token program owning it.
pub fn mint_token_program(mint: &MintAddress, account: Option<&Account>) -> Result<Pubkey, TradeError> {
    let account =
        account.ok_or_else(|| TradeError::LookupError(format!("mint account {} not found", mint)))?;
    if !is_token_program(&account.owner) || account.data.len() < MINT_ACCOUNT_LEN {
        return Err(TradeError::LookupError(format!(
            "account {} is not a token mint (owner {})",
            mint, account.owner
        )));
    }
    Ok(account.owner)
}

/// `CloseAccount` for a classic or Token-2022 account. Both programs share
/// the instruction layout, so the classic builder is retargeted.
pub fn close_token_account(
    token_program: &Pubkey,
    account: &Pubkey,
    owner: &Pubkey,
) -> Result<Instruction, TradeError> {
    let mut instruction =
        spl_token::instruction::close_account(&spl_token::id(), account, owner, owner, &[])
            .map_err(|e| TradeError::ExecutionError(format!("close account instruction: {}", e)))?;
    instruction.program_id = *token_program;
    Ok(instruction)
}

pub fn compute_budget(unit_limit: u32, unit_price: u64) -> [Instruction; 2] {
    [
        ComputeBudgetInstruction::set_compute_unit_limit(unit_limit),
        ComputeBudgetInstruction::set_compute_unit_price(unit_price),
    ]
}
