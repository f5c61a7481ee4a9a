//! Validators composing the relay's authorization decision

mod account_init_validator;
mod transaction_validator;
mod transfer_validator;

pub use account_init_validator::{
    AccountInitValidator, AccountReservation, CREATE_ACCOUNT_INDEX, EXPECTED_INSTRUCTIONS, TRANSFER_INDEX,
};
pub use transaction_validator::{check_fee_budget, SignedTransaction, TransactionValidator};
pub use transfer_validator::{FeeTransfer, TransferValidator};
