//! Transaction structure validation and fee-payer co-signing

use solana_sdk::sanitize::Sanitize;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::Transaction;
use tracing::debug;

use crate::domain::ledger::Ledger;
use crate::shared::errors::RelayError;

/// A transaction co-signed by the fee payer, ready for simulation
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    /// Fee-payer signature, also the transaction id
    pub signature: Signature,
    /// Bincode wire bytes with every signature attached
    pub wire: Vec<u8>,
}

/// Reject a fee above what `max_signatures` signatures may cost
pub fn check_fee_budget(fee: u64, max_signatures: usize, lamports_per_signature: u64) -> Result<(), RelayError> {
    let budget = (max_signatures as u64)
        .checked_mul(lamports_per_signature)
        .unwrap_or(u64::MAX);
    if fee > budget {
        return Err(RelayError::FeeBudgetExceeded { fee, budget });
    }
    Ok(())
}

/// Checks payer, signer count, blockhash, fee and signatures, then co-signs
pub struct TransactionValidator {
    max_signatures: usize,
    lamports_per_signature: u64,
}

impl TransactionValidator {
    pub fn new(max_signatures: usize, lamports_per_signature: u64) -> Self {
        Self {
            max_signatures,
            lamports_per_signature,
        }
    }

    pub async fn validate_and_sign(
        &self,
        ledger: &dyn Ledger,
        mut transaction: Transaction,
        fee_payer: &Keypair,
    ) -> Result<SignedTransaction, RelayError> {
        transaction
            .sanitize()
            .map_err(|e| RelayError::MalformedTransaction(e.to_string()))?;
        let message = &transaction.message;

        if message.account_keys.first() != Some(&fee_payer.pubkey()) {
            return Err(RelayError::PayerMismatch);
        }

        let required = message.header.num_required_signatures as usize;
        if required > self.max_signatures {
            return Err(RelayError::TooManySigners {
                count: required,
                max: self.max_signatures,
            });
        }
        if required == 0 || transaction.signatures.len() != required {
            return Err(RelayError::MalformedTransaction(format!(
                "{} signatures for {} required signers",
                transaction.signatures.len(),
                required
            )));
        }

        let fee = ledger
            .fee_for_message(message)
            .await?
            .ok_or(RelayError::StaleBlockhash)?;
        check_fee_budget(fee, self.max_signatures, self.lamports_per_signature)?;
        debug!("Transaction fee {} lamports for {} signers", fee, required);

        let unsigned = Signature::default();
        if transaction.signatures[0] != unsigned {
            return Err(RelayError::FeePayerAlreadySigned);
        }
        if let Some(position) = transaction.signatures[1..].iter().position(|s| *s == unsigned) {
            let signer = message
                .account_keys
                .get(position + 1)
                .ok_or_else(|| RelayError::MalformedTransaction("signer without account key".to_string()))?;
            return Err(RelayError::MissingSignature(*signer));
        }

        let recent_blockhash = message.recent_blockhash;
        transaction
            .try_partial_sign(&[fee_payer], recent_blockhash)
            .map_err(|e| RelayError::InvalidSignature(e.to_string()))?;
        transaction
            .verify()
            .map_err(|e| RelayError::InvalidSignature(e.to_string()))?;

        let wire = bincode::serialize(&transaction)
            .map_err(|e| RelayError::Internal(format!("Failed to serialize transaction: {}", e)))?;

        Ok(SignedTransaction {
            signature: transaction.signatures[0],
            transaction,
            wire,
        })
    }
}
