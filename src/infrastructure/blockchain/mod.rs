//! Cluster access over JSON-RPC

pub mod rpc_client;

pub use rpc_client::SolanaRpcClient;
