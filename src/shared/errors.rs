//! Error handling for the relay

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

/// Rejection class of a [`RelayError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Undecodable bytes or a transaction of the wrong shape
    Malformed,
    /// Payer, signer, fee or transfer terms the relay will not accept
    Policy,
    /// Duplicate transaction or account attempt; may succeed on a new blockhash
    Replay,
    /// Target account already exists
    StateConflict,
    /// Cache, RPC or simulation transport failure; not the caller's fault
    Infrastructure,
}

/// Every reason a relay request can fail
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("request should contain transaction")]
    MissingTransaction,

    #[error("can't decode transaction")]
    Undecodable,

    #[error("malformed transaction: {0}")]
    MalformedTransaction(String),

    #[error("transaction should contain 2 instructions: fee payment, account init (found {0})")]
    WrongInstructionCount(usize),

    #[error("account instruction should call associated token program (found {0})")]
    WrongProgram(Pubkey),

    #[error("unable to match associated account instruction: {0}")]
    InstructionMismatch(String),

    #[error("invalid fee payer")]
    PayerMismatch,

    #[error("too many signatures: {count} (max {max})")]
    TooManySigners { count: usize, max: usize },

    #[error("blockhash not found")]
    StaleBlockhash,

    #[error("fee too high: {fee} lamports (budget {budget})")]
    FeeBudgetExceeded { fee: u64, budget: u64 },

    #[error("invalid fee payer signature")]
    FeePayerAlreadySigned,

    #[error("missing signature for {0}")]
    MissingSignature(Pubkey),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("invalid fee transfer: {0}")]
    InvalidFeeTransfer(String),

    #[error("duplicate transaction")]
    DuplicateTransaction,

    #[error("duplicate account within same recent blockhash")]
    DuplicateAccountAttempt,

    #[error("account already exists: {0}")]
    AccountAlreadyExists(Pubkey),

    #[error("simulation failed: {0}")]
    SimulationFailed(String),

    #[error("cache unavailable: {0}")]
    Cache(String),

    #[error("ledger unavailable: {0}")]
    Ledger(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingTransaction
            | Self::Undecodable
            | Self::MalformedTransaction(_)
            | Self::WrongInstructionCount(_)
            | Self::WrongProgram(_)
            | Self::InstructionMismatch(_) => ErrorKind::Malformed,

            Self::PayerMismatch
            | Self::TooManySigners { .. }
            | Self::StaleBlockhash
            | Self::FeeBudgetExceeded { .. }
            | Self::FeePayerAlreadySigned
            | Self::MissingSignature(_)
            | Self::InvalidSignature(_)
            | Self::InvalidFeeTransfer(_)
            | Self::SimulationFailed(_) => ErrorKind::Policy,

            Self::DuplicateTransaction | Self::DuplicateAccountAttempt => ErrorKind::Replay,

            Self::AccountAlreadyExists(_) => ErrorKind::StateConflict,

            Self::Cache(_) | Self::Ledger(_) | Self::Internal(_) => ErrorKind::Infrastructure,
        }
    }

    /// Whether resubmitting the same bytes later can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Replay | ErrorKind::Infrastructure)
    }

    /// Status code the boundary answers with
    pub fn http_status(&self) -> u16 {
        match self.kind() {
            ErrorKind::Infrastructure => 503,
            _ => 400,
        }
    }
}
