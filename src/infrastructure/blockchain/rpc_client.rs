//! Solana RPC client backing the relay's ledger access

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSimulateTransactionConfig;
use solana_sdk::account::Account;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use solana_transaction_status::UiTransactionEncoding;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::ledger::Ledger;
use crate::shared::errors::RelayError;

/// Solana RPC client wrapper
pub struct SolanaRpcClient {
    client: RpcClient,
}

impl SolanaRpcClient {
    /// Create new RPC client
    pub fn new(rpc_url: String, commitment: CommitmentConfig, timeout: Duration) -> Self {
        Self {
            client: RpcClient::new_with_timeout_and_commitment(rpc_url, timeout, commitment),
        }
    }

    pub fn url(&self) -> String {
        self.client.url()
    }
}

#[async_trait]
impl Ledger for SolanaRpcClient {
    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>, RelayError> {
        self.client
            .get_account_with_commitment(address, self.client.commitment())
            .await
            .map(|response| response.value)
            .map_err(|e| RelayError::Ledger(format!("Failed to get account {}: {}", address, e)))
    }

    async fn fee_for_message(&self, message: &Message) -> Result<Option<u64>, RelayError> {
        let valid = self
            .client
            .is_blockhash_valid(&message.recent_blockhash, self.client.commitment())
            .await
            .map_err(|e| RelayError::Ledger(format!("Failed to check blockhash: {}", e)))?;
        if !valid {
            debug!("Blockhash {} is no longer valid", message.recent_blockhash);
            return Ok(None);
        }

        self.client
            .get_fee_for_message(message)
            .await
            .map(Some)
            .map_err(|e| RelayError::Ledger(format!("Failed to get fee for message: {}", e)))
    }

    async fn simulate_transaction(&self, transaction: &Transaction) -> Result<(), RelayError> {
        let config = RpcSimulateTransactionConfig {
            sig_verify: true,
            commitment: Some(self.client.commitment()),
            encoding: Some(UiTransactionEncoding::Base64),
            ..RpcSimulateTransactionConfig::default()
        };
        let simulation = self
            .client
            .simulate_transaction_with_config(transaction, config)
            .await
            .map_err(|e| RelayError::Ledger(format!("Simulation error: {}", e)))?;

        debug!("Compute units used: {:?}", simulation.value.units_consumed);
        if let Some(err) = simulation.value.err {
            warn!("Simulation failed: {:?}, logs: {:?}", err, simulation.value.logs);
            return Err(RelayError::SimulationFailed(err.to_string()));
        }
        Ok(())
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, RelayError> {
        self.client
            .send_transaction(transaction)
            .await
            .map_err(|e| RelayError::Ledger(format!("Failed to send transaction: {}", e)))
    }
}
