//! Bonding-curve account layout.

use common::errors::TradeError;
use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;

/// Anchor discriminator of the `BondingCurve` account.
pub const BONDING_CURVE_DISCRIMINATOR: [u8; 8] = [23, 183, 248, 55, 96, 216, 172, 96];

/// Discriminator, five reserves and the `complete` flag. Accounts created before
/// creator fees were introduced stop here.
pub const LEGACY_CURVE_LEN: usize = 8 + 5 * 8 + 1;
/// Current layout, with the creator key appended.
pub const CURVE_LEN: usize = LEGACY_CURVE_LEN + 32;

/// Decoded state of a pump.fun bonding-curve account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BondingCurveState {
    pub virtual_token_reserves: u64,
    pub virtual_sol_reserves: u64,
    pub real_token_reserves: u64,
    pub real_sol_reserves: u64,
    pub token_total_supply: u64,
    /// Set once the curve has migrated its liquidity.
    pub complete: bool,
    /// Zero for legacy accounts.
    pub creator: Pubkey,
}

impl BondingCurveState {
    /// Decodes raw account data.
    pub fn decode(data: &[u8]) -> Result<Self, TradeError> {
        if data.len() < LEGACY_CURVE_LEN {
            return Err(TradeError::LookupError(format!(
                "bonding curve account is {} bytes, expected at least {}",
                data.len(),
                LEGACY_CURVE_LEN
            )));
        }
        if data[..8] != BONDING_CURVE_DISCRIMINATOR {
            return Err(TradeError::LookupError(
                "bonding curve account has an unexpected discriminator".to_string(),
            ));
        }

        let word = |index: usize| {
            let start = 8 + index * 8;
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&data[start..start + 8]);
            u64::from_le_bytes(bytes)
        };

        let complete = match data[8 + 5 * 8] {
            0 => false,
            1 => true,
            other => {
                return Err(TradeError::LookupError(format!(
                    "bonding curve complete flag has invalid value {}",
                    other
                )))
            }
        };

        let creator = if data.len() >= CURVE_LEN {
            let mut key = [0u8; 32];
            key.copy_from_slice(&data[LEGACY_CURVE_LEN..CURVE_LEN]);
            Pubkey::new_from_array(key)
        } else {
            Pubkey::default()
        };

        Ok(BondingCurveState {
            virtual_token_reserves: word(0),
            virtual_sol_reserves: word(1),
            real_token_reserves: word(2),
            real_sol_reserves: word(3),
            token_total_supply: word(4),
            complete,
            creator,
        })
    }

    /// Encodes the state in the current on-chain layout.
    pub fn encode(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(CURVE_LEN);
        data.extend_from_slice(&BONDING_CURVE_DISCRIMINATOR);
        for value in [
            self.virtual_token_reserves,
            self.virtual_sol_reserves,
            self.real_token_reserves,
            self.real_sol_reserves,
            self.token_total_supply,
        ] {
            data.extend_from_slice(&value.to_le_bytes());
        }
        data.push(self.complete as u8);
        data.extend_from_slice(self.creator.as_ref());
        data
    }

    /// Current spot price in lamports per raw token unit, taken from the
    /// virtual reserves. `None` when either reserve is empty.
    pub fn spot_price(&self) -> Option<Decimal> {
        if self.virtual_token_reserves == 0 || self.virtual_sol_reserves == 0 {
            return None;
        }
        Some(Decimal::from(self.virtual_sol_reserves) / Decimal::from(self.virtual_token_reserves))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> BondingCurveState {
        BondingCurveState {
            virtual_token_reserves: 1_073_000_000_000_000,
            virtual_sol_reserves: 30_000_000_000,
            real_token_reserves: 793_100_000_000_000,
            real_sol_reserves: 0,
            token_total_supply: 1_000_000_000_000_000,
            complete: false,
            creator: Pubkey::new_unique(),
        }
    }

    #[test]
    fn test_decode_current_layout() {
        let state = sample();
        let data = state.encode();
        assert_eq!(data.len(), CURVE_LEN);
        assert_eq!(BondingCurveState::decode(&data).unwrap(), state);
    }

    #[test]
    fn test_decode_legacy_layout_defaults_creator() {
        let state = sample();
        let data = state.encode();
        let legacy = BondingCurveState::decode(&data[..LEGACY_CURVE_LEN]).unwrap();
        assert_eq!(legacy.creator, Pubkey::default());
        assert_eq!(legacy.virtual_sol_reserves, state.virtual_sol_reserves);
        assert!(!legacy.complete);
    }

    #[test]
    fn test_decode_rejects_short_data() {
        let err = BondingCurveState::decode(&[0u8; 20]).unwrap_err();
        assert!(matches!(err, TradeError::LookupError(_)));
    }

    #[test]
    fn test_decode_rejects_wrong_discriminator() {
        let mut data = sample().encode();
        data[0] ^= 0xff;
        assert!(matches!(
            BondingCurveState::decode(&data),
            Err(TradeError::LookupError(_))
        ));
    }

    #[test]
    fn test_decode_rejects_invalid_complete_flag() {
        let mut data = sample().encode();
        data[LEGACY_CURVE_LEN - 1] = 7;
        assert!(BondingCurveState::decode(&data).is_err());
    }

    #[test]
    fn test_spot_price() {
        let mut state = sample();
        state.virtual_sol_reserves = 30;
        state.virtual_token_reserves = 1_000;
        assert_eq!(state.spot_price(), Some(dec!(0.03)));
        state.virtual_token_reserves = 0;
        assert_eq!(state.spot_price(), None);
    }
}
