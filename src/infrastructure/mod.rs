//! Infrastructure layer - concrete cache and cluster backends

pub mod blockchain;
pub mod memory_cache;

pub use blockchain::SolanaRpcClient;
pub use memory_cache::MemoryCache;
