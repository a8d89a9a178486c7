//! PumpSwap pool accounts: layout detection, discovery and ranking.

use super::consts::PUMP_SWAP_PROGRAM;
use crate::token::token_balance;
use common::errors::TradeError;
use common::traits::LedgerProvider;
use common::types::{MintAddress, LAMPORTS_PER_SOL};
use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;

/// Discriminator, bump and index, then six keys and the LP supply.
pub const OLD_POOL_LEN: usize = 8 + 1 + 2 + 6 * 32 + 8;
/// Pools created after creator fees carry the coin creator as well.
pub const NEW_POOL_LEN: usize = OLD_POOL_LEN + 32;
/// Where `base_mint` sits in both layouts; used to filter program accounts.
pub const BASE_MINT_OFFSET: usize = 8 + 1 + 2 + 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolLayout {
    Old,
    New,
}

/// Static part of a pool account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolKeys {
    pub address: Pubkey,
    pub layout: PoolLayout,
    pub bump: u8,
    pub index: u16,
    pub creator: Pubkey,
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub lp_mint: Pubkey,
    pub pool_base_token_account: Pubkey,
    pub pool_quote_token_account: Pubkey,
    pub lp_supply: u64,
    /// Only present in the new layout.
    pub coin_creator: Option<Pubkey>,
}

fn key_at(data: &[u8], offset: usize) -> Pubkey {
    let mut key = [0u8; 32];
    key.copy_from_slice(&data[offset..offset + 32]);
    Pubkey::new_from_array(key)
}

impl PoolKeys {
    /// Tries the new layout first and falls back to the old one.
    pub fn decode(address: Pubkey, data: &[u8]) -> Result<Self, TradeError> {
        let layout = if data.len() >= NEW_POOL_LEN {
            PoolLayout::New
        } else if data.len() >= OLD_POOL_LEN {
            PoolLayout::Old
        } else {
            return Err(TradeError::LookupError(format!(
                "pool account {} is {} bytes, expected at least {}",
                address,
                data.len(),
                OLD_POOL_LEN
            )));
        };

        let keys_start = 8 + 1 + 2;
        let key = |i: usize| key_at(data, keys_start + i * 32);
        let lp_start = keys_start + 6 * 32;
        let mut lp_supply = [0u8; 8];
        lp_supply.copy_from_slice(&data[lp_start..lp_start + 8]);

        Ok(PoolKeys {
            address,
            layout,
            bump: data[8],
            index: u16::from_le_bytes([data[9], data[10]]),
            creator: key(0),
            base_mint: key(1),
            quote_mint: key(2),
            lp_mint: key(3),
            pool_base_token_account: key(4),
            pool_quote_token_account: key(5),
            lp_supply: u64::from_le_bytes(lp_supply),
            coin_creator: match layout {
                PoolLayout::New => Some(key_at(data, OLD_POOL_LEN)),
                PoolLayout::Old => None,
            },
        })
    }

    #[cfg(test)]
    pub(crate) fn encode(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(NEW_POOL_LEN);
        data.extend_from_slice(&[0xf1, 0x9a, 0x6d, 0x04, 0x11, 0xb1, 0x6d, 0xbc]);
        data.push(self.bump);
        data.extend_from_slice(&self.index.to_le_bytes());
        for key in [
            self.creator,
            self.base_mint,
            self.quote_mint,
            self.lp_mint,
            self.pool_base_token_account,
            self.pool_quote_token_account,
        ] {
            data.extend_from_slice(key.as_ref());
        }
        data.extend_from_slice(&self.lp_supply.to_le_bytes());
        if let Some(coin_creator) = self.coin_creator {
            data.extend_from_slice(coin_creator.as_ref());
        }
        data
    }
}

/// A pool together with its vault balances at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolSnapshot {
    pub keys: PoolKeys,
    pub base_reserve: u64,
    pub quote_reserve: u64,
}

impl PoolSnapshot {
    /// Quote-side liquidity in SOL, doubled when both sides hold funds, with a
    /// bonus for the new layout.
    pub fn score(&self) -> Decimal {
        let quote_sol = Decimal::from(self.quote_reserve) / Decimal::from(LAMPORTS_PER_SOL);
        let score = if self.base_reserve > 0 && self.quote_reserve > 0 {
            quote_sol * Decimal::TWO
        } else {
            quote_sol
        };
        match self.keys.layout {
            // New pools get a bonus over old ones of similar depth.
            PoolLayout::New => score * Decimal::new(11, 1),
            PoolLayout::Old => score,
        }
    }

    /// Base units received for `quote_in` lamports at the current reserve ratio,
    /// rounded down.
    pub fn base_for_quote(&self, quote_in: u64) -> Result<u64, TradeError> {
        self.at_reserve_ratio(quote_in, self.base_reserve, self.quote_reserve)
    }

    /// Lamports received for `base_in` units at the current reserve ratio,
    /// rounded down.
    pub fn quote_for_base(&self, base_in: u64) -> Result<u64, TradeError> {
        self.at_reserve_ratio(base_in, self.quote_reserve, self.base_reserve)
    }

    /// `floor(amount * to_reserve / from_reserve)` in 128-bit integers.
    fn at_reserve_ratio(
        &self,
        amount: u64,
        to_reserve: u64,
        from_reserve: u64,
    ) -> Result<u64, TradeError> {
        if self.base_reserve == 0 || self.quote_reserve == 0 {
            return Err(TradeError::ExecutionError(format!(
                "pool {} has empty reserves",
                self.keys.address
            )));
        }
        let scaled = u128::from(amount) * u128::from(to_reserve) / u128::from(from_reserve);
        u64::try_from(scaled).map_err(|_| {
            TradeError::ExecutionError(format!(
                "amount {} exceeds u64 at the reserve ratio of pool {}",
                amount, self.keys.address
            ))
        })
    }
}

/// Every decodable pool whose base mint is `mint` and whose quote mint is WSOL.
pub async fn discover_pools(
    provider: &dyn LedgerProvider,
    mint: &MintAddress,
) -> Result<Vec<PoolKeys>, TradeError> {
    let accounts = provider
        .get_program_accounts(&PUMP_SWAP_PROGRAM, BASE_MINT_OFFSET, mint.pubkey().as_ref())
        .await?;
    let pools = accounts
        .into_iter()
        .filter_map(|(address, account)| match PoolKeys::decode(address, &account.data) {
            Ok(keys) if keys.base_mint != *mint.pubkey() => None,
            Ok(keys) if keys.quote_mint != spl_token::native_mint::id() => {
                log::debug!("Skipping pool {}: quoted in {}", address, keys.quote_mint);
                None
            }
            Ok(keys) => Some(keys),
            Err(e) => {
                log::debug!("Skipping pool {}: {}", address, e);
                None
            }
        })
        .collect();
    Ok(pools)
}

/// Reads both vaults of `keys`.
pub async fn load_snapshot(
    provider: &dyn LedgerProvider,
    keys: PoolKeys,
) -> Result<PoolSnapshot, TradeError> {
    let vaults = provider
        .get_multiple_accounts(&[keys.pool_base_token_account, keys.pool_quote_token_account])
        .await?;
    let [base, quote] = vaults.as_slice() else {
        return Err(TradeError::LookupError(format!(
            "unexpected vault read for pool {}",
            keys.address
        )));
    };
    if base.is_none() || quote.is_none() {
        return Err(TradeError::LookupError(format!(
            "vault accounts of pool {} not found",
            keys.address
        )));
    }
    Ok(PoolSnapshot {
        base_reserve: token_balance(base.as_ref())?,
        quote_reserve: token_balance(quote.as_ref())?,
        keys,
    })
}

/// Discovers the pools of `mint` and returns the best scored one. Pools whose
/// vaults cannot be read are skipped.
pub async fn find_best_pool(
    provider: &dyn LedgerProvider,
    mint: &MintAddress,
) -> Result<Option<PoolSnapshot>, TradeError> {
    let candidates = discover_pools(provider, mint).await?;
    log::debug!("Found {} PumpSwap pools for {}", candidates.len(), mint);

    let mut best: Option<PoolSnapshot> = None;
    for keys in candidates {
        let address = keys.address;
        let snapshot = match load_snapshot(provider, keys).await {
            Ok(snapshot) => snapshot,
            Err(TradeError::LookupError(e)) => {
                log::debug!("Skipping pool {}: {}", address, e);
                continue;
            }
            Err(e) => return Err(e),
        };
        if best.as_ref().map_or(true, |current| snapshot.score() > current.score()) {
            best = Some(snapshot);
        }
    }
    Ok(best)
}
