use crate::curve::BondingCurveState;
use crate::pump_const::{bonding_curve_address, is_token_program, MINT_ACCOUNT_LEN};
use common::errors::TradeError;
use common::traits::LedgerProvider;
use common::types::{MarketStage, MintAddress};
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;

/// What a single detection pass read from the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveObservation {
    pub mint: MintAddress,
    /// Token program owning the mint (SPL Token or Token-2022).
    pub token_program: Pubkey,
    pub bonding_curve: Pubkey,
    /// `None` when the curve account does not exist.
    pub curve: Option<BondingCurveState>,
    pub stage: MarketStage,
}

/// Classifies a token as trading on its bonding curve or on the DEX.
///
/// Holds no state besides the shared provider; every call goes back to the ledger.
#[derive(Clone)]
pub struct MarketStageDetector {
    provider: Arc<dyn LedgerProvider>,
}

impl MarketStageDetector {
    pub fn new(provider: Arc<dyn LedgerProvider>) -> Self {
        Self { provider }
    }

    /// Returns the current market stage of `mint`.
    ///
    /// Fails with `LookupError` when the mint does not exist, is not a token
    /// mint, or has a malformed curve account, and with `NetworkError` when the
    /// provider is unreachable.
    pub async fn detect(&self, mint: &MintAddress) -> Result<MarketStage, TradeError> {
        Ok(self.observe(mint).await?.stage)
    }

    /// Reads the mint and its curve account in one round trip and classifies them.
    pub async fn observe(&self, mint: &MintAddress) -> Result<CurveObservation, TradeError> {
        let bonding_curve = bonding_curve_address(mint.pubkey());
        let mut accounts = self
            .provider
            .get_multiple_accounts(&[*mint.pubkey(), bonding_curve])
            .await?
            .into_iter();
        let mint_account = accounts.next().flatten();
        let curve_account = accounts.next().flatten();

        let mint_account = mint_account
            .ok_or_else(|| TradeError::LookupError(format!("mint account {} not found", mint)))?;
        if !is_token_program(&mint_account.owner) || mint_account.data.len() < MINT_ACCOUNT_LEN {
            return Err(TradeError::LookupError(format!(
                "account {} is not a token mint (owner {})",
                mint, mint_account.owner
            )));
        }

        let curve = curve_account
            .map(|account| BondingCurveState::decode(&account.data))
            .transpose()?;

        let stage = classify(curve.as_ref());
        log::debug!(
            "Mint {} curve {} present={} stage={}",
            mint,
            bonding_curve,
            curve.is_some(),
            stage
        );

        Ok(CurveObservation {
            mint: *mint,
            token_program: mint_account.owner,
            bonding_curve,
            curve,
            stage,
        })
    }
}

/// An active, incomplete curve always wins; anything else has graduated.
pub fn classify(curve: Option<&BondingCurveState>) -> MarketStage {
    match curve {
        Some(state) if !state.complete => MarketStage::BondingCurve,
        _ => MarketStage::GraduatedDex,
    }
}
