//! PumpSwap `buy`/`sell` instruction builders.

use super::consts::{
    coin_creator_vault_authority, global_volume_accumulator, user_volume_accumulator,
    BUY_DISCRIMINATOR, EVENT_AUTHORITY, GLOBAL_CONFIG, PROTOCOL_FEE_RECIPIENT,
    PROTOCOL_FEE_RECIPIENT_TOKEN_ACCOUNT, PUMP_SWAP_PROGRAM, SELL_DISCRIMINATOR,
};
use super::pool::{PoolKeys, PoolLayout};
use crate::token::associated_token_address;
use detector::pump_const::TOKEN_PROGRAM;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_program;

fn data(discriminator: [u8; 8], base_amount: u64, quote_limit: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(24);
    data.extend_from_slice(&discriminator);
    data.extend_from_slice(&base_amount.to_le_bytes());
    data.extend_from_slice(&quote_limit.to_le_bytes());
    data
}

/// The seventeen accounts both layouts share. New pools are passed read-only.
fn common_accounts(pool: &PoolKeys, user: &Pubkey, base_token_program: &Pubkey) -> Vec<AccountMeta> {
    let pool_meta = match pool.layout {
        PoolLayout::Old => AccountMeta::new(pool.address, false),
        PoolLayout::New => AccountMeta::new_readonly(pool.address, false),
    };
    vec![
        pool_meta,
        AccountMeta::new(*user, true),
        AccountMeta::new_readonly(GLOBAL_CONFIG, false),
        AccountMeta::new_readonly(pool.base_mint, false),
        AccountMeta::new_readonly(pool.quote_mint, false),
        AccountMeta::new(
            associated_token_address(user, &pool.base_mint, base_token_program),
            false,
        ),
        AccountMeta::new(
            associated_token_address(user, &pool.quote_mint, &TOKEN_PROGRAM),
            false,
        ),
        AccountMeta::new(pool.pool_base_token_account, false),
        AccountMeta::new(pool.pool_quote_token_account, false),
        AccountMeta::new_readonly(PROTOCOL_FEE_RECIPIENT, false),
        AccountMeta::new(PROTOCOL_FEE_RECIPIENT_TOKEN_ACCOUNT, false),
        AccountMeta::new_readonly(*base_token_program, false),
        AccountMeta::new_readonly(TOKEN_PROGRAM, false),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(spl_associated_token_account::id(), false),
        AccountMeta::new_readonly(EVENT_AUTHORITY, false),
        AccountMeta::new_readonly(PUMP_SWAP_PROGRAM, false),
    ]
}

/// Coin creator vault account and its authority, for new pools.
fn creator_vault_accounts(pool: &PoolKeys) -> Option<[AccountMeta; 2]> {
    let coin_creator = pool.coin_creator?;
    let authority = coin_creator_vault_authority(&coin_creator);
    let vault = associated_token_address(&authority, &pool.quote_mint, &TOKEN_PROGRAM);
    Some([
        AccountMeta::new(vault, false),
        AccountMeta::new_readonly(authority, false),
    ])
}

/// `buy(base_amount_out, max_quote_amount_in)`.
pub fn buy(
    pool: &PoolKeys,
    user: &Pubkey,
    base_token_program: &Pubkey,
    base_amount_out: u64,
    max_quote_amount_in: u64,
) -> Instruction {
    let mut accounts = common_accounts(pool, user, base_token_program);
    if let Some(vault) = creator_vault_accounts(pool) {
        accounts.extend(vault);
        accounts.push(AccountMeta::new(global_volume_accumulator(), false));
        accounts.push(AccountMeta::new(user_volume_accumulator(user), false));
    }
    Instruction {
        program_id: PUMP_SWAP_PROGRAM,
        accounts,
        data: data(BUY_DISCRIMINATOR, base_amount_out, max_quote_amount_in),
    }
}

/// `sell(base_amount_in, min_quote_amount_out)`. Sells carry no volume accumulators.
pub fn sell(
    pool: &PoolKeys,
    user: &Pubkey,
    base_token_program: &Pubkey,
    base_amount_in: u64,
    min_quote_amount_out: u64,
) -> Instruction {
    let mut accounts = common_accounts(pool, user, base_token_program);
    if let Some(vault) = creator_vault_accounts(pool) {
        accounts.extend(vault);
    }
    Instruction {
        program_id: PUMP_SWAP_PROGRAM,
        accounts,
        data: data(SELL_DISCRIMINATOR, base_amount_in, min_quote_amount_out),
    }
}
