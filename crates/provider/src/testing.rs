//! In-memory ledger used by the workspace test suites.

use async_trait::async_trait;
use common::errors::ProviderError;
use common::traits::LedgerProvider;
use solana_sdk::account::Account;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use spl_token::solana_program::program_option::COption;
use spl_token::solana_program::program_pack::Pack;
use spl_token::state::{Account as TokenAccount, AccountState, Mint};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// A [`LedgerProvider`] serving canned accounts and recording submissions.
pub struct MockProvider {
    payer: Pubkey,
    accounts: Mutex<HashMap<Pubkey, Account>>,
    submissions: Mutex<Vec<Vec<Instruction>>>,
    read_failure: Mutex<Option<String>>,
    submit_failure: Mutex<Option<ProviderError>>,
    reads: AtomicUsize,
    close_calls: AtomicUsize,
    closed: AtomicBool,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    pub fn new() -> Self {
        MockProvider {
            payer: Pubkey::new_unique(),
            accounts: Mutex::new(HashMap::new()),
            submissions: Mutex::new(Vec::new()),
            read_failure: Mutex::new(None),
            submit_failure: Mutex::new(None),
            reads: AtomicUsize::new(0),
            close_calls: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    pub fn set_account(&self, key: Pubkey, account: Account) {
        self.accounts.lock().unwrap().insert(key, account);
    }

    pub fn remove_account(&self, key: &Pubkey) {
        self.accounts.lock().unwrap().remove(key);
    }

    /// Makes every read fail with an RPC error until cleared with `None`.
    pub fn fail_reads(&self, message: Option<&str>) {
        *self.read_failure.lock().unwrap() = message.map(str::to_string);
    }

    /// Makes every submission fail with `error` until cleared with `None`.
    pub fn fail_submissions(&self, error: Option<ProviderError>) {
        *self.submit_failure.lock().unwrap() = error;
    }

    /// Instructions of every transaction submitted so far.
    pub fn submissions(&self) -> Vec<Vec<Instruction>> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn check_read(&self) -> Result<(), ProviderError> {
        if self.is_closed() {
            return Err(ProviderError::Closed);
        }
        self.reads.fetch_add(1, Ordering::SeqCst);
        match self.read_failure.lock().unwrap().as_ref() {
            Some(message) => Err(ProviderError::RpcError(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl LedgerProvider for MockProvider {
    fn payer(&self) -> Pubkey {
        self.payer
    }

    async fn get_multiple_accounts(
        &self,
        keys: &[Pubkey],
    ) -> Result<Vec<Option<Account>>, ProviderError> {
        self.check_read()?;
        let accounts = self.accounts.lock().unwrap();
        Ok(keys.iter().map(|key| accounts.get(key).cloned()).collect())
    }

    async fn get_program_accounts(
        &self,
        program: &Pubkey,
        offset: usize,
        bytes: &[u8],
    ) -> Result<Vec<(Pubkey, Account)>, ProviderError> {
        self.check_read()?;
        let accounts = self.accounts.lock().unwrap();
        let mut matches: Vec<(Pubkey, Account)> = accounts
            .iter()
            .filter(|(_, account)| account.owner == *program)
            .filter(|(_, account)| {
                account
                    .data
                    .get(offset..offset + bytes.len())
                    .map_or(false, |window| window == bytes)
            })
            .map(|(key, account)| (*key, account.clone()))
            .collect();
        matches.sort_by_key(|(key, _)| *key);
        Ok(matches)
    }

    async fn submit(&self, instructions: Vec<Instruction>) -> Result<Signature, ProviderError> {
        if self.is_closed() {
            return Err(ProviderError::Closed);
        }
        if let Some(err) = self.submit_failure.lock().unwrap().clone() {
            return Err(err);
        }
        self.submissions.lock().unwrap().push(instructions);
        Ok(Signature::new_unique())
    }

    async fn close(&self) -> Result<(), ProviderError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// An account owned by `owner` holding `data`.
pub fn program_account(owner: Pubkey, data: Vec<u8>) -> Account {
    Account {
        lamports: 1_461_600,
        data,
        owner,
        executable: false,
        rent_epoch: 0,
    }
}

/// An initialized SPL token mint owned by `token_program`.
pub fn mint_account(decimals: u8, token_program: Pubkey) -> Account {
    let mint = Mint {
        mint_authority: COption::None,
        supply: 1_000_000_000_000_000,
        decimals,
        is_initialized: true,
        freeze_authority: COption::None,
    };
    let mut data = vec![0u8; Mint::LEN];
    mint.pack_into_slice(&mut data);
    program_account(token_program, data)
}

/// An initialized SPL token account for `mint` held by `owner`.
pub fn token_account(mint: Pubkey, owner: Pubkey, amount: u64, token_program: Pubkey) -> Account {
    let account = TokenAccount {
        mint,
        owner,
        amount,
        delegate: COption::None,
        state: AccountState::Initialized,
        is_native: COption::None,
        delegated_amount: 0,
        close_authority: COption::None,
    };
    let mut data = vec![0u8; TokenAccount::LEN];
    account.pack_into_slice(&mut data);
    program_account(token_program, data)
}
