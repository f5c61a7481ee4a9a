//! Validation of the SPL token fee transfer

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::transaction::Transaction;
use spl_token::instruction::TokenInstruction;
use spl_token::solana_program::program_pack::Pack;
use spl_token::state::Account as TokenAccount;
use tracing::debug;

use super::account_init_validator::TRANSFER_INDEX;
use crate::domain::instruction::decode_instruction;
use crate::domain::ledger::Ledger;
use crate::shared::errors::RelayError;
use crate::shared::types::AllowedToken;

/// Fee transfer decoded from instruction 0
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeeTransfer {
    Transfer {
        source: Pubkey,
        destination: Pubkey,
        authority: Pubkey,
        amount: u64,
    },
    TransferChecked {
        source: Pubkey,
        mint: Pubkey,
        destination: Pubkey,
        authority: Pubkey,
        amount: u64,
        decimals: u8,
    },
}

impl FeeTransfer {
    pub fn source(&self) -> Pubkey {
        match self {
            Self::Transfer { source, .. } | Self::TransferChecked { source, .. } => *source,
        }
    }

    pub fn destination(&self) -> Pubkey {
        match self {
            Self::Transfer { destination, .. } | Self::TransferChecked { destination, .. } => *destination,
        }
    }

    pub fn authority(&self) -> Pubkey {
        match self {
            Self::Transfer { authority, .. } | Self::TransferChecked { authority, .. } => *authority,
        }
    }

    pub fn amount(&self) -> u64 {
        match self {
            Self::Transfer { amount, .. } | Self::TransferChecked { amount, .. } => *amount,
        }
    }
}

fn invalid(reason: impl Into<String>) -> RelayError {
    RelayError::InvalidFeeTransfer(reason.into())
}

/// Checks instruction 0 pays an allow-listed fee to the relay
pub struct TransferValidator {
    allowed_tokens: Vec<AllowedToken>,
}

impl TransferValidator {
    pub fn new(allowed_tokens: Vec<AllowedToken>) -> Self {
        Self { allowed_tokens }
    }

    pub async fn validate(
        &self,
        ledger: &dyn Ledger,
        transaction: &Transaction,
        fee_payer: &Keypair,
    ) -> Result<(FeeTransfer, AllowedToken), RelayError> {
        let message = &transaction.message;
        let instruction = decode_instruction(message, TRANSFER_INDEX)?;

        if instruction.program_id != spl_token::id() {
            return Err(invalid(format!("unexpected program {}", instruction.program_id)));
        }

        let key = |position: usize| {
            instruction
                .accounts
                .get(position)
                .ok_or_else(|| invalid("missing transfer accounts"))
        };
        let transfer = match TokenInstruction::unpack(&instruction.data) {
            Ok(TokenInstruction::Transfer { amount }) => FeeTransfer::Transfer {
                source: key(0)?.pubkey,
                destination: key(1)?.pubkey,
                authority: key(2)?.pubkey,
                amount,
            },
            Ok(TokenInstruction::TransferChecked { amount, decimals }) => FeeTransfer::TransferChecked {
                source: key(0)?.pubkey,
                mint: key(1)?.pubkey,
                destination: key(2)?.pubkey,
                authority: key(3)?.pubkey,
                amount,
                decimals,
            },
            _ => return Err(invalid("not a token transfer")),
        };

        let authority = transfer.authority();
        if authority == fee_payer.pubkey() {
            return Err(invalid("fee payer cannot authorize the fee transfer"));
        }
        if !transaction.message.signer_keys().contains(&&authority) {
            return Err(invalid("transfer authority must sign"));
        }

        let source = ledger
            .get_account(&transfer.source())
            .await?
            .ok_or_else(|| invalid("source account not found"))?;
        if source.owner != spl_token::id() {
            return Err(invalid("source is not a token account"));
        }
        let source = TokenAccount::unpack(&source.data).map_err(|_| invalid("source is not a token account"))?;
        if source.owner != authority {
            return Err(invalid("source invalid owner"));
        }
        if source.is_frozen() {
            return Err(invalid("source frozen"));
        }
        if source.amount < transfer.amount() {
            return Err(invalid("source insufficient balance"));
        }

        // The allow-list entry must match mint, destination and fee exactly
        let token = self
            .allowed_tokens
            .iter()
            .find(|token| {
                token.mint == source.mint && token.account == transfer.destination() && token.fee == transfer.amount()
            })
            .ok_or_else(|| {
                invalid(format!(
                    "no allowed token for mint {} to {} with fee {}",
                    source.mint,
                    transfer.destination(),
                    transfer.amount()
                ))
            })?;

        if let FeeTransfer::TransferChecked { mint, decimals, .. } = &transfer {
            if *mint != token.mint {
                return Err(invalid("invalid mint"));
            }
            if *decimals != token.decimals {
                return Err(invalid("invalid decimals"));
            }
        }

        debug!("Fee transfer of {} {} to {} accepted", transfer.amount(), token.mint, token.account);
        Ok((transfer, token.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{token_account, Fixture, DECIMALS, FEE};
    use solana_sdk::instruction::Instruction;
    use spl_token::state::AccountState;

    async fn run(fx: &Fixture, tx: &Transaction) -> Result<(FeeTransfer, AllowedToken), RelayError> {
        TransferValidator::new(vec![fx.allowed_token()])
            .validate(fx.ledger.as_ref(), tx, &fx.fee_payer)
            .await
    }

    fn with_transfer(fx: &Fixture, transfer: Instruction) -> Transaction {
        fx.transaction(&[transfer, fx.create_account_ix(&fx.user.pubkey())])
    }

    fn assert_invalid(result: Result<(FeeTransfer, AllowedToken), RelayError>, needle: &str) {
        match result {
            Err(RelayError::InvalidFeeTransfer(reason)) => {
                assert!(reason.contains(needle), "'{}' does not mention '{}'", reason, needle)
            }
            other => panic!("expected InvalidFeeTransfer({}), got {:?}", needle, other),
        }
    }

    #[tokio::test]
    async fn test_exact_fee_transfer_passes() {
        let fx = Fixture::new();
        let tx = fx.relay_transaction(FEE, &fx.user.pubkey());

        let (transfer, token) = run(&fx, &tx).await.unwrap();
        assert_eq!(token, fx.allowed_token());
        assert_eq!(
            transfer,
            FeeTransfer::Transfer {
                source: fx.source,
                destination: fx.fee_account,
                authority: fx.user.pubkey(),
                amount: FEE,
            }
        );
    }

    #[tokio::test]
    async fn test_transfer_checked_passes() {
        let fx = Fixture::new();
        let ix = spl_token::instruction::transfer_checked(
            &spl_token::id(),
            &fx.source,
            &fx.mint,
            &fx.fee_account,
            &fx.user.pubkey(),
            &[],
            FEE,
            DECIMALS,
        )
        .unwrap();
        assert!(run(&fx, &with_transfer(&fx, ix)).await.is_ok());
    }

    #[tokio::test]
    async fn test_transfer_checked_with_wrong_decimals_fails() {
        let fx = Fixture::new();
        let ix = spl_token::instruction::transfer_checked(
            &spl_token::id(),
            &fx.source,
            &fx.mint,
            &fx.fee_account,
            &fx.user.pubkey(),
            &[],
            FEE,
            DECIMALS + 1,
        )
        .unwrap();
        assert_invalid(run(&fx, &with_transfer(&fx, ix)).await, "invalid decimals");
    }

    #[tokio::test]
    async fn test_amount_other_than_fee_fails() {
        let fx = Fixture::new();
        for amount in [FEE - 1, FEE + 1000] {
            let tx = fx.relay_transaction(amount, &fx.user.pubkey());
            assert_invalid(run(&fx, &tx).await, "no allowed token");
        }
    }

    #[tokio::test]
    async fn test_each_fee_entry_for_same_account_is_reachable() {
        let fx = Fixture::new();
        let higher = AllowedToken {
            fee: FEE + 2000,
            ..fx.allowed_token()
        };
        let validator = TransferValidator::new(vec![higher.clone(), fx.allowed_token()]);

        for token in [fx.allowed_token(), higher] {
            let tx = fx.relay_transaction(token.fee, &fx.user.pubkey());
            let (transfer, matched) = validator
                .validate(fx.ledger.as_ref(), &tx, &fx.fee_payer)
                .await
                .unwrap();
            assert_eq!(transfer.amount(), token.fee);
            assert_eq!(matched, token);
        }
    }

    #[tokio::test]
    async fn test_transfer_checked_compares_against_matched_entry() {
        let fx = Fixture::new();
        let coarse = AllowedToken {
            fee: FEE + 2000,
            decimals: DECIMALS + 3,
            ..fx.allowed_token()
        };
        let validator = TransferValidator::new(vec![coarse, fx.allowed_token()]);
        let ix = spl_token::instruction::transfer_checked(
            &spl_token::id(),
            &fx.source,
            &fx.mint,
            &fx.fee_account,
            &fx.user.pubkey(),
            &[],
            FEE,
            DECIMALS,
        )
        .unwrap();

        let (_, matched) = validator
            .validate(fx.ledger.as_ref(), &with_transfer(&fx, ix), &fx.fee_payer)
            .await
            .unwrap();
        assert_eq!(matched, fx.allowed_token());
    }

    #[tokio::test]
    async fn test_destination_outside_allow_list_fails() {
        let fx = Fixture::new();
        let stranger = Pubkey::new_unique();
        let ix = spl_token::instruction::transfer(&spl_token::id(), &fx.source, &stranger, &fx.user.pubkey(), &[], FEE)
            .unwrap();
        assert_invalid(run(&fx, &with_transfer(&fx, ix)).await, "no allowed token");
    }

    #[tokio::test]
    async fn test_unlisted_mint_fails() {
        let fx = Fixture::new();
        let other_mint = Pubkey::new_unique();
        fx.ledger
            .add_account(fx.source, token_account(other_mint, fx.user.pubkey(), 1_000_000));
        let tx = fx.relay_transaction(FEE, &fx.user.pubkey());
        assert_invalid(run(&fx, &tx).await, "no allowed token");
    }

    #[tokio::test]
    async fn test_foreign_token_program_fails() {
        let fx = Fixture::new();
        let mut ix = fx.transfer_ix(FEE);
        ix.program_id = Pubkey::new_unique();
        assert_invalid(run(&fx, &with_transfer(&fx, ix)).await, "unexpected program");
    }

    #[tokio::test]
    async fn test_non_transfer_token_instruction_fails() {
        let fx = Fixture::new();
        let ix = spl_token::instruction::approve(&spl_token::id(), &fx.source, &fx.fee_account, &fx.user.pubkey(), &[], FEE)
            .unwrap();
        assert_invalid(run(&fx, &with_transfer(&fx, ix)).await, "not a token transfer");
    }

    #[tokio::test]
    async fn test_fee_payer_as_authority_fails() {
        let fx = Fixture::new();
        let payer = fx.fee_payer.pubkey();
        fx.ledger.add_account(fx.source, token_account(fx.mint, payer, 1_000_000));
        let ix = spl_token::instruction::transfer(&spl_token::id(), &fx.source, &fx.fee_account, &payer, &[], FEE)
            .unwrap();
        assert_invalid(run(&fx, &with_transfer(&fx, ix)).await, "fee payer cannot authorize");
    }

    #[tokio::test]
    async fn test_source_state_is_checked() {
        let fx = Fixture::new();
        let tx = fx.relay_transaction(FEE, &fx.user.pubkey());

        fx.ledger.add_account(fx.source, token_account(fx.mint, Pubkey::new_unique(), 1_000_000));
        assert_invalid(run(&fx, &tx).await, "invalid owner");

        fx.ledger.add_account(fx.source, token_account(fx.mint, fx.user.pubkey(), FEE - 1));
        assert_invalid(run(&fx, &tx).await, "insufficient balance");

        let mut frozen = token_account(fx.mint, fx.user.pubkey(), 1_000_000);
        let mut state = TokenAccount::unpack(&frozen.data).unwrap();
        state.state = AccountState::Frozen;
        TokenAccount::pack(state, &mut frozen.data).unwrap();
        fx.ledger.add_account(fx.source, frozen);
        assert_invalid(run(&fx, &tx).await, "frozen");
    }
}
