//! Validation of the associated token account creation instruction

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::transaction::Transaction;
use spl_associated_token_account::get_associated_token_address;
use spl_associated_token_account::instruction::create_associated_token_account;
use tracing::debug;

use crate::domain::cache::{account_key, IdempotencyCache};
use crate::domain::instruction::{decode_instruction, expect_exact};
use crate::domain::ledger::Ledger;
use crate::shared::errors::RelayError;

/// Instruction slots of a relayable transaction
pub const TRANSFER_INDEX: usize = 0;
pub const CREATE_ACCOUNT_INDEX: usize = 1;
pub const EXPECTED_INSTRUCTIONS: usize = 2;

const OWNER_POSITION: usize = 2;
const MINT_POSITION: usize = 3;

/// Account creation that passed validation but is not yet recorded in the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountReservation {
    pub associated_account: Pubkey,
    pub owner: Pubkey,
    pub mint: Pubkey,
    pub cache_key: String,
}

pub struct AccountInitValidator;

impl AccountInitValidator {
    pub fn new() -> Self {
        Self
    }

    /// Checks instruction 1 creates a fresh associated token account paid by
    /// `fee_payer` and exactly nothing else.
    ///
    /// Reads the cache but does not write it; the caller commits the returned
    /// reservation once every other check has passed.
    pub async fn validate(
        &self,
        ledger: &dyn Ledger,
        cache: &dyn IdempotencyCache,
        transaction: &Transaction,
        fee_payer: &Keypair,
    ) -> Result<AccountReservation, RelayError> {
        let message = &transaction.message;
        if message.instructions.len() != EXPECTED_INSTRUCTIONS {
            return Err(RelayError::WrongInstructionCount(message.instructions.len()));
        }

        let instruction = decode_instruction(message, CREATE_ACCOUNT_INDEX)?;
        if instruction.program_id != spl_associated_token_account::id() {
            return Err(RelayError::WrongProgram(instruction.program_id));
        }

        let (owner, mint) = match (
            instruction.accounts.get(OWNER_POSITION),
            instruction.accounts.get(MINT_POSITION),
        ) {
            (Some(owner), Some(mint)) => (owner.pubkey, mint.pubkey),
            _ => {
                return Err(RelayError::InstructionMismatch(format!(
                    "expected owner and mint accounts, found {} accounts",
                    instruction.accounts.len()
                )))
            }
        };

        let associated_account = get_associated_token_address(&owner, &mint);

        if ledger.get_account(&associated_account).await?.is_some() {
            return Err(RelayError::AccountAlreadyExists(associated_account));
        }

        let reference = create_associated_token_account(&fee_payer.pubkey(), &owner, &mint, &spl_token::id());
        expect_exact(message, CREATE_ACCOUNT_INDEX, &reference)?;

        let cache_key = account_key(&message.recent_blockhash, &associated_account);
        if cache.exists(&cache_key).await? {
            return Err(RelayError::DuplicateAccountAttempt);
        }

        debug!("Associated account {} for owner {} mint {} is valid", associated_account, owner, mint);
        Ok(AccountReservation {
            associated_account,
            owner,
            mint,
            cache_key,
        })
    }
}

impl Default for AccountInitValidator {
    fn default() -> Self {
        Self::new()
    }
}
