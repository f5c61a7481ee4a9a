//! Ledger access the validators need

use async_trait::async_trait;
use solana_sdk::account::Account;
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;

use crate::shared::errors::RelayError;

/// Read and dry-run access to the cluster.
///
/// Transport failures and timeouts are reported as [`RelayError::Ledger`];
/// implementations never retry.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Account at `address`, or `None` if it does not exist
    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>, RelayError>;

    /// Lamports the cluster charges for `message`, or `None` when its
    /// recent blockhash is no longer valid
    async fn fee_for_message(&self, message: &Message) -> Result<Option<u64>, RelayError>;

    /// Dry-run against current state; an execution error is
    /// [`RelayError::SimulationFailed`]
    async fn simulate_transaction(&self, transaction: &Transaction) -> Result<(), RelayError>;

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, RelayError>;
}
