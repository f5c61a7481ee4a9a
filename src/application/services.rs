//! Relay orchestration - the single authorization decision per request

use solana_sdk::signature::Keypair;
use solana_sdk::transaction::Transaction;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::cache::{transaction_key, IdempotencyCache};
use crate::domain::ledger::Ledger;
use crate::domain::validation::{AccountInitValidator, TransactionValidator, TransferValidator};
use crate::shared::errors::RelayError;
use crate::shared::types::{RelayPolicy, RelayReceipt};

/// Progress of one request through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayStage {
    Received,
    DedupChecked,
    StructureValid,
    AccountInitValid,
    TransferValid,
    Simulated,
    Authorized,
}

/// Co-signs transactions that pay a token fee for associated account creation
pub struct RelayService {
    ledger: Arc<dyn Ledger>,
    cache: Arc<dyn IdempotencyCache>,
    fee_payer: Arc<Keypair>,
    policy: RelayPolicy,
    transaction_validator: TransactionValidator,
    account_validator: AccountInitValidator,
    transfer_validator: TransferValidator,
}

impl RelayService {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        cache: Arc<dyn IdempotencyCache>,
        fee_payer: Arc<Keypair>,
        policy: RelayPolicy,
    ) -> Self {
        Self {
            transaction_validator: TransactionValidator::new(policy.max_signatures, policy.lamports_per_signature),
            account_validator: AccountInitValidator::new(),
            transfer_validator: TransferValidator::new(policy.allowed_tokens.clone()),
            ledger,
            cache,
            fee_payer,
            policy,
        }
    }

    /// Sign `transaction` as fee payer if instruction 0 pays an allowed token
    /// fee and instruction 1 creates a new associated token account funded by
    /// the fee payer.
    ///
    /// Every check passes and the fee-payer signature is returned, or nothing
    /// is signed. The duplicate-transaction marker is written first and kept
    /// even when a later check fails.
    pub async fn create_account_if_token_fee_paid(&self, transaction: Transaction) -> Result<RelayReceipt, RelayError> {
        let mut stage = RelayStage::Received;
        let result = self.authorize(transaction, &mut stage).await;
        match &result {
            Ok(receipt) => info!("✅ Authorized transaction {}", receipt.signature),
            Err(e) => warn!("❌ Rejected after {:?}: {}", stage, e),
        }
        result
    }

    async fn authorize(&self, transaction: Transaction, stage: &mut RelayStage) -> Result<RelayReceipt, RelayError> {
        let key = transaction_key(&transaction);
        if !self.cache.insert_if_absent(&key, self.policy.transaction_ttl).await? {
            return Err(RelayError::DuplicateTransaction);
        }
        *stage = RelayStage::DedupChecked;

        let signed = self
            .transaction_validator
            .validate_and_sign(self.ledger.as_ref(), transaction, &self.fee_payer)
            .await?;
        *stage = RelayStage::StructureValid;

        let reservation = self
            .account_validator
            .validate(self.ledger.as_ref(), self.cache.as_ref(), &signed.transaction, &self.fee_payer)
            .await?;
        *stage = RelayStage::AccountInitValid;

        let (transfer, token) = self
            .transfer_validator
            .validate(self.ledger.as_ref(), &signed.transaction, &self.fee_payer)
            .await?;
        *stage = RelayStage::TransferValid;
        debug!(
            "Fee {} of mint {} for account {}",
            transfer.amount(),
            token.mint,
            reservation.associated_account
        );

        // A concurrent request may have reserved the account since validation read the cache
        if !self
            .cache
            .insert_if_absent(&reservation.cache_key, self.policy.account_ttl)
            .await?
        {
            return Err(RelayError::DuplicateAccountAttempt);
        }

        self.ledger.simulate_transaction(&signed.transaction).await?;
        *stage = RelayStage::Simulated;

        let broadcast = if self.policy.broadcast {
            let sent = self.ledger.send_transaction(&signed.transaction).await?;
            info!("🚀 Sent transaction {} ({} bytes)", sent, signed.wire.len());
            true
        } else {
            false
        };
        *stage = RelayStage::Authorized;

        Ok(RelayReceipt {
            signature: signed.signature,
            broadcast,
        })
    }
}
