//! PumpSwap program addresses and seeds.

use solana_sdk::pubkey;
use solana_sdk::pubkey::Pubkey;

pub const PUMP_SWAP_PROGRAM: Pubkey = pubkey!("pAMMBay6oceH9fJKBRHGP5D4bD4sWpmSwMn52FMfXEA");
pub const GLOBAL_CONFIG: Pubkey = pubkey!("ADyA8hdefvWN2dbGGWFotbzWxrAvLW83WG6QCVXvJKqw");
pub const PROTOCOL_FEE_RECIPIENT: Pubkey = pubkey!("62qc2CNXwrYqQScmEdiZFFAnJR262PxWEuNQtxfafNgV");
/// WSOL account of [`PROTOCOL_FEE_RECIPIENT`].
pub const PROTOCOL_FEE_RECIPIENT_TOKEN_ACCOUNT: Pubkey =
    pubkey!("94qWNrtmfn42h3ZjUZwWvK1MEo9uVmmrBPd2hpNjYDjb");
pub const EVENT_AUTHORITY: Pubkey = pubkey!("GS4CU59F31iL7aR2Q8zVS8DRrcRnXX1yjQ66TqNVQnaR");

pub const BUY_DISCRIMINATOR: [u8; 8] = [0x66, 0x06, 0x3d, 0x12, 0x01, 0xda, 0xeb, 0xea];
pub const SELL_DISCRIMINATOR: [u8; 8] = [0x33, 0xe6, 0x85, 0xa4, 0x01, 0x7f, 0x83, 0xad];

const CREATOR_VAULT_SEED: &[u8] = b"creator_vault";
const GLOBAL_VOLUME_ACCUMULATOR_SEED: &[u8] = b"global_volume_accumulator";
const USER_VOLUME_ACCUMULATOR_SEED: &[u8] = b"user_volume_accumulator";

/// Authority of the coin creator's fee vault.
pub fn coin_creator_vault_authority(coin_creator: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[CREATOR_VAULT_SEED, coin_creator.as_ref()], &PUMP_SWAP_PROGRAM).0
}

pub fn global_volume_accumulator() -> Pubkey {
    Pubkey::find_program_address(&[GLOBAL_VOLUME_ACCUMULATOR_SEED], &PUMP_SWAP_PROGRAM).0
}

pub fn user_volume_accumulator(user: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[USER_VOLUME_ACCUMULATOR_SEED, user.as_ref()], &PUMP_SWAP_PROGRAM).0
}
