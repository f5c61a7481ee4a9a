//! Shared fixtures for unit tests

use async_trait::async_trait;
use solana_sdk::account::Account;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::Transaction;
use spl_associated_token_account::instruction::create_associated_token_account;
use spl_token::solana_program::program_pack::Pack;
use spl_token::state::{Account as TokenAccount, AccountState};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::domain::ledger::Ledger;
use crate::infrastructure::memory_cache::MemoryCache;
use crate::shared::errors::RelayError;
use crate::shared::types::{AllowedToken, RelayPolicy};

pub const FEE: u64 = 3000;
pub const DECIMALS: u8 = 6;
pub const LAMPORTS_PER_SIGNATURE: u64 = 5000;

/// In-memory ledger with a fixed per-signature fee
pub struct MockLedger {
    accounts: Mutex<HashMap<Pubkey, Account>>,
    blockhashes: Mutex<HashSet<Hash>>,
    lamports_per_signature: u64,
    simulation_error: Mutex<Option<String>>,
    unavailable: AtomicBool,
    pub simulations: AtomicUsize,
    pub sent: Mutex<Vec<Signature>>,
}

impl MockLedger {
    pub fn new(lamports_per_signature: u64) -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            blockhashes: Mutex::new(HashSet::new()),
            lamports_per_signature,
            simulation_error: Mutex::new(None),
            unavailable: AtomicBool::new(false),
            simulations: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn add_account(&self, address: Pubkey, account: Account) {
        self.accounts.lock().unwrap().insert(address, account);
    }

    pub fn add_blockhash(&self, blockhash: Hash) {
        self.blockhashes.lock().unwrap().insert(blockhash);
    }

    pub fn fail_simulation(&self, error: &str) {
        *self.simulation_error.lock().unwrap() = Some(error.to_string());
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), RelayError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RelayError::Ledger("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>, RelayError> {
        self.check_available()?;
        Ok(self.accounts.lock().unwrap().get(address).cloned())
    }

    async fn fee_for_message(&self, message: &Message) -> Result<Option<u64>, RelayError> {
        self.check_available()?;
        if !self.blockhashes.lock().unwrap().contains(&message.recent_blockhash) {
            return Ok(None);
        }
        Ok(Some(
            message.header.num_required_signatures as u64 * self.lamports_per_signature,
        ))
    }

    async fn simulate_transaction(&self, transaction: &Transaction) -> Result<(), RelayError> {
        self.check_available()?;
        self.simulations.fetch_add(1, Ordering::SeqCst);
        transaction
            .verify()
            .map_err(|e| RelayError::SimulationFailed(e.to_string()))?;
        match self.simulation_error.lock().unwrap().clone() {
            Some(error) => Err(RelayError::SimulationFailed(error)),
            None => Ok(()),
        }
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, RelayError> {
        self.check_available()?;
        let signature = transaction.signatures[0];
        self.sent.lock().unwrap().push(signature);
        Ok(signature)
    }
}

/// Initialized SPL token account holding `amount`
pub fn token_account(mint: Pubkey, owner: Pubkey, amount: u64) -> Account {
    let state = TokenAccount {
        mint,
        owner,
        amount,
        state: AccountState::Initialized,
        ..TokenAccount::default()
    };
    let mut data = vec![0u8; TokenAccount::LEN];
    TokenAccount::pack(state, &mut data).unwrap();
    Account {
        lamports: 2_039_280,
        data,
        owner: spl_token::id(),
        executable: false,
        rent_epoch: 0,
    }
}

/// A funded user, an allow-listed mint and a relay with its fee account
pub struct Fixture {
    pub fee_payer: Arc<Keypair>,
    pub user: Keypair,
    pub mint: Pubkey,
    pub fee_account: Pubkey,
    pub source: Pubkey,
    pub blockhash: Hash,
    pub ledger: Arc<MockLedger>,
    pub cache: Arc<MemoryCache>,
}

impl Fixture {
    pub fn new() -> Self {
        let fee_payer = Arc::new(Keypair::new());
        let user = Keypair::new();
        let mint = Pubkey::new_unique();
        let fee_account = Pubkey::new_unique();
        let source = Pubkey::new_unique();
        let blockhash = Hash::new_unique();

        let ledger = Arc::new(MockLedger::new(LAMPORTS_PER_SIGNATURE));
        ledger.add_blockhash(blockhash);
        ledger.add_account(source, token_account(mint, user.pubkey(), 1_000_000));
        ledger.add_account(fee_account, token_account(mint, fee_payer.pubkey(), 0));

        Self {
            fee_payer,
            user,
            mint,
            fee_account,
            source,
            blockhash,
            ledger,
            cache: Arc::new(MemoryCache::new()),
        }
    }

    pub fn allowed_token(&self) -> AllowedToken {
        AllowedToken {
            mint: self.mint,
            account: self.fee_account,
            decimals: DECIMALS,
            fee: FEE,
        }
    }

    pub fn policy(&self) -> RelayPolicy {
        RelayPolicy {
            max_signatures: 2,
            lamports_per_signature: LAMPORTS_PER_SIGNATURE,
            allowed_tokens: vec![self.allowed_token()],
            transaction_ttl: Duration::from_secs(120),
            account_ttl: Duration::from_secs(90),
            broadcast: false,
        }
    }

    pub fn transfer_ix(&self, amount: u64) -> Instruction {
        spl_token::instruction::transfer(
            &spl_token::id(),
            &self.source,
            &self.fee_account,
            &self.user.pubkey(),
            &[],
            amount,
        )
        .unwrap()
    }

    pub fn create_account_ix(&self, owner: &Pubkey) -> Instruction {
        create_associated_token_account(&self.fee_payer.pubkey(), owner, &self.mint, &spl_token::id())
    }

    /// Fee-payer-first transaction, signed by the user when it is a signer
    pub fn transaction(&self, instructions: &[Instruction]) -> Transaction {
        self.transaction_with_blockhash(instructions, self.blockhash)
    }

    pub fn transaction_with_blockhash(&self, instructions: &[Instruction], blockhash: Hash) -> Transaction {
        let message = Message::new_with_blockhash(instructions, Some(&self.fee_payer.pubkey()), &blockhash);
        let mut transaction = Transaction::new_unsigned(message);
        let user = self.user.pubkey();
        if transaction.message.signer_keys().contains(&&user) {
            transaction.partial_sign(&[&self.user], blockhash);
        }
        transaction
    }

    /// Fee transfer plus creation of an associated account for a fresh owner
    pub fn relay_transaction(&self, amount: u64, owner: &Pubkey) -> Transaction {
        self.transaction(&[self.transfer_ix(amount), self.create_account_ix(owner)])
    }
}
