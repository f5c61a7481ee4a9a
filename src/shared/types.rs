//! Common types used across the relay

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use std::time::Duration;

/// A token the relay accepts as fee payment
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AllowedToken {
    pub mint: Pubkey,
    /// Relay-owned token account receiving the fee
    pub account: Pubkey,
    pub decimals: u8,
    /// Required fee in the token's base unit
    pub fee: u64,
}

/// Limits the orchestrator enforces on every request
#[derive(Debug, Clone)]
pub struct RelayPolicy {
    pub max_signatures: usize,
    pub lamports_per_signature: u64,
    pub allowed_tokens: Vec<AllowedToken>,
    pub transaction_ttl: Duration,
    pub account_ttl: Duration,
    /// Send the transaction after a clean simulation
    pub broadcast: bool,
}

/// Proof that the relay authorized a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayReceipt {
    pub signature: Signature,
    pub broadcast: bool,
}
