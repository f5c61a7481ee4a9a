//! Idempotency cache contract and key namespaces

use async_trait::async_trait;
use solana_sdk::hash::{hash, Hash};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::Transaction;
use std::time::Duration;

use crate::shared::errors::RelayError;

/// Key/value "seen" markers with a time-to-live
#[async_trait]
pub trait IdempotencyCache: Send + Sync {
    /// Whether an unexpired marker exists for `key`
    async fn exists(&self, key: &str) -> Result<bool, RelayError>;

    /// Write a marker for `key` that expires after `ttl`
    async fn set(&self, key: &str, ttl: Duration) -> Result<(), RelayError>;

    /// Write a marker only if none exists; returns `true` when this call wrote it.
    ///
    /// The default is `exists` followed by `set` and is NOT atomic: two
    /// concurrent callers can both observe `false` and both get `true` back.
    /// Backends with an insert-if-absent primitive should override it.
    async fn insert_if_absent(&self, key: &str, ttl: Duration) -> Result<bool, RelayError> {
        if self.exists(key).await? {
            return Ok(false);
        }
        self.set(key, ttl).await?;
        Ok(true)
    }
}

/// Global duplicate key: base58 SHA-256 of the signable message
pub fn transaction_key(transaction: &Transaction) -> String {
    format!("transaction/{}", hash(&transaction.message_data()))
}

/// Duplicate-account key scoped to one recent blockhash
pub fn account_key(recent_blockhash: &Hash, associated_account: &Pubkey) -> String {
    format!("account/{}_{}", recent_blockhash, associated_account)
}
