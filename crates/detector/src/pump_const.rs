//! pump.fun program addresses and PDA helpers.

use solana_sdk::pubkey;
use solana_sdk::pubkey::Pubkey;

/// The pump.fun bonding-curve program.
pub const PUMP_FUN_PROGRAM: Pubkey = pubkey!("6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P");
/// Global settings account of the pump.fun program.
pub const PUMP_GLOBAL: Pubkey = pubkey!("4wTV1YmiEkRvAtNtsSGPtUrqRYQMe5SKy2uB4Jjaxnjf");
/// Protocol fee recipient for curve trades.
pub const PUMP_FEE_RECIPIENT: Pubkey = pubkey!("CebN5WGQ4jvEPvsVU4EoHEpgzq1VV7AbicfhtW4xC9iM");
/// Anchor event authority of the pump.fun program.
pub const PUMP_EVENT_AUTHORITY: Pubkey = pubkey!("Ce6TQqeHC9p8KetsN6JsjHK7UTZk7nasjjnr7XxXp9F1");

/// The original SPL token program.
pub const TOKEN_PROGRAM: Pubkey = pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");
/// The Token-2022 program, used by newer pump.fun mints.
pub const TOKEN_2022_PROGRAM: Pubkey = pubkey!("TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb");

/// Size of the base SPL mint layout. Token-2022 mints may be longer.
pub const MINT_ACCOUNT_LEN: usize = 82;

const BONDING_CURVE_SEED: &[u8] = b"bonding-curve";
const CREATOR_VAULT_SEED: &[u8] = b"creator-vault";

/// Returns `true` if `owner` is one of the token programs a mint can live under.
pub fn is_token_program(owner: &Pubkey) -> bool {
    *owner == TOKEN_PROGRAM || *owner == TOKEN_2022_PROGRAM
}

/// The bonding-curve PDA of `mint`.
pub fn bonding_curve_address(mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[BONDING_CURVE_SEED, mint.as_ref()], &PUMP_FUN_PROGRAM).0
}

/// The creator fee vault PDA of `creator`.
pub fn creator_vault_address(creator: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[CREATOR_VAULT_SEED, creator.as_ref()], &PUMP_FUN_PROGRAM).0
}
