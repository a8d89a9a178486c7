//! Ledger connection: account reads, transaction signing, relaying and confirmation.

use anyhow::anyhow;
use async_trait::async_trait;
use common::errors::ProviderError;
use common::traits::LedgerProvider;
use solana_account_decoder::UiAccountEncoding;
use solana_client::client_error::ClientError;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::{
    RpcAccountInfoConfig, RpcProgramAccountsConfig, RpcSendTransactionConfig,
};
use solana_client::rpc_filter::{Memcmp, RpcFilterType};
use solana_sdk::account::Account;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{read_keypair_file, Keypair, Signature, Signer};
use solana_sdk::transaction::Transaction;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Connection settings for [`SolanaRpcProvider`].
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub rpc_url: String,
    pub commitment: CommitmentConfig,
    /// How many times a signature status is polled before giving up.
    pub confirm_max_retries: u32,
    /// Pause between two status polls.
    pub confirm_interval: Duration,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
            commitment: CommitmentConfig::confirmed(),
            confirm_max_retries: 20,
            confirm_interval: Duration::from_secs(3),
        }
    }
}

/// A [`LedgerProvider`] backed by a Solana JSON-RPC endpoint and a local signer.
pub struct SolanaRpcProvider {
    rpc: RpcClient,
    signer: Keypair,
    settings: ProviderSettings,
    // Transactions from one wallet go out one at a time.
    submit_lock: Mutex<()>,
    closed: AtomicBool,
}

impl SolanaRpcProvider {
    pub fn new(settings: ProviderSettings, signer: Keypair) -> Self {
        let rpc = RpcClient::new_with_commitment(settings.rpc_url.clone(), settings.commitment);
        SolanaRpcProvider {
            rpc,
            signer,
            settings,
            submit_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
        }
    }

    /// Builds a provider whose signer is read from a Solana CLI keypair file.
    pub fn from_keypair_file<P: AsRef<Path>>(
        settings: ProviderSettings,
        path: P,
    ) -> Result<Self, anyhow::Error> {
        let signer = read_keypair_file(path.as_ref()).map_err(|e| {
            anyhow!(
                "Failed to read keypair file {}: {}",
                path.as_ref().display(),
                e
            )
        })?;
        log::info!("Loaded payer keypair {}", signer.pubkey());
        Ok(Self::new(settings, signer))
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    fn ensure_open(&self) -> Result<(), ProviderError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(ProviderError::Closed)
        } else {
            Ok(())
        }
    }

    /// Polls the signature status until it reaches the configured commitment.
    async fn confirm(&self, signature: &Signature) -> Result<(), ProviderError> {
        for attempt in 0..self.settings.confirm_max_retries {
            match self.rpc.get_signature_statuses(&[*signature]).await {
                Ok(response) => {
                    if let Some(status) = response.value.into_iter().next().flatten() {
                        if let Some(err) = status.err {
                            return Err(ProviderError::TransactionFailed(err.to_string()));
                        }
                        if status.satisfies_commitment(self.settings.commitment) {
                            log::info!("Transaction {} confirmed after {} polls", signature, attempt + 1);
                            return Ok(());
                        }
                    }
                    log::debug!("Transaction {} not confirmed yet, poll {}", signature, attempt + 1);
                }
                Err(e) => {
                    // Status polling errors are transient; keep polling.
                    log::debug!("Awaiting confirmation of {}: {}", signature, e);
                }
            }
            tokio::time::sleep(self.settings.confirm_interval).await;
        }
        Err(ProviderError::Unconfirmed(signature.to_string()))
    }
}

fn rpc_error(err: ClientError) -> ProviderError {
    ProviderError::RpcError(err.to_string())
}

#[async_trait]
impl LedgerProvider for SolanaRpcProvider {
    fn payer(&self) -> Pubkey {
        self.signer.pubkey()
    }

    async fn get_multiple_accounts(
        &self,
        keys: &[Pubkey],
    ) -> Result<Vec<Option<Account>>, ProviderError> {
        self.ensure_open()?;
        self.rpc.get_multiple_accounts(keys).await.map_err(rpc_error)
    }

    async fn get_program_accounts(
        &self,
        program: &Pubkey,
        offset: usize,
        bytes: &[u8],
    ) -> Result<Vec<(Pubkey, Account)>, ProviderError> {
        self.ensure_open()?;
        let config = RpcProgramAccountsConfig {
            filters: Some(vec![RpcFilterType::Memcmp(Memcmp::new_base58_encoded(
                offset, bytes,
            ))]),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                commitment: Some(self.settings.commitment),
                ..Default::default()
            },
            ..Default::default()
        };
        self.rpc
            .get_program_accounts_with_config(program, config)
            .await
            .map_err(rpc_error)
    }

    async fn submit(&self, instructions: Vec<Instruction>) -> Result<Signature, ProviderError> {
        self.ensure_open()?;
        let _guard = self.submit_lock.lock().await;
        // `close` may have run while this call waited for the lock.
        self.ensure_open()?;

        let blockhash = self.rpc.get_latest_blockhash().await.map_err(rpc_error)?;
        let payer = self.signer.pubkey();
        let transaction =
            Transaction::new_signed_with_payer(&instructions, Some(&payer), &[&self.signer], blockhash);

        let config = RpcSendTransactionConfig {
            skip_preflight: true,
            max_retries: Some(0),
            ..Default::default()
        };
        let signature = self
            .rpc
            .send_transaction_with_config(&transaction, config)
            .await
            .map_err(|e| ProviderError::SubmissionError(e.to_string()))?;
        log::info!(
            "Transaction {} sent with {} instructions",
            signature,
            instructions.len()
        );

        self.confirm(&signature).await?;
        Ok(signature)
    }

    async fn close(&self) -> Result<(), ProviderError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        log::info!("Closing ledger provider for {}", self.settings.rpc_url);
        // Let an in-flight submission finish confirming. The nonblocking
        // RpcClient has no shutdown call; its connection pool goes on drop.
        let _guard = self.submit_lock.lock().await;
        Ok(())
    }
}
