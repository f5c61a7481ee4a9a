//! Fee relay - co-signs Solana transactions that pay an SPL token fee
//! in exchange for creating an associated token account.
//! Built with Domain-Driven Design principles

pub mod app;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod shared;

#[cfg(test)]
mod test_utils;

// Re-export main types for convenience
pub use application::RelayService;
pub use domain::cache::IdempotencyCache;
pub use domain::ledger::Ledger;
pub use infrastructure::{MemoryCache, SolanaRpcClient};
pub use shared::errors::{ErrorKind, RelayError};
pub use shared::types::{AllowedToken, RelayPolicy, RelayReceipt};
