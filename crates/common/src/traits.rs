//! Shared traits for services in the trading workspace.

use crate::errors::ProviderError;
use async_trait::async_trait;
use solana_sdk::account::Account;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;

/// Owns the connection to the ledger: account reads and transaction submission.
///
/// One instance is built at process start and shared as `Arc<dyn LedgerProvider>`.
/// Reads may run concurrently; implementations serialize submissions per wallet.
#[async_trait]
pub trait LedgerProvider: Send + Sync {
    /// The wallet that pays for and signs submitted transactions.
    fn payer(&self) -> Pubkey;

    /// Reads several accounts in one round trip. Missing accounts are `None`.
    async fn get_multiple_accounts(
        &self,
        keys: &[Pubkey],
    ) -> Result<Vec<Option<Account>>, ProviderError>;

    /// Reads a single account.
    async fn get_account(&self, key: &Pubkey) -> Result<Option<Account>, ProviderError> {
        let mut accounts = self.get_multiple_accounts(std::slice::from_ref(key)).await?;
        Ok(accounts.pop().flatten())
    }

    /// Lists accounts owned by `program` whose data matches `bytes` at `offset`.
    async fn get_program_accounts(
        &self,
        program: &Pubkey,
        offset: usize,
        bytes: &[u8],
    ) -> Result<Vec<(Pubkey, Account)>, ProviderError>;

    /// Signs, sends and confirms a transaction made of `instructions`.
    async fn submit(&self, instructions: Vec<Instruction>) -> Result<Signature, ProviderError>;

    /// Releases the connection. Calling it more than once is a no-op.
    async fn close(&self) -> Result<(), ProviderError>;
}
