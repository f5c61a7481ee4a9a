use anyhow::{bail, Context, Result};
use serde::Deserialize;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::time::Duration;
use std::{fs, path::Path};

use crate::shared::types::{AllowedToken, RelayPolicy};

#[derive(Debug, Clone, Deserialize)]
pub struct RpcCfg {
    pub url: String,
    #[serde(default = "default_commitment")]
    pub commitment: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WalletCfg {
    pub keypair: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelayCfg {
    pub max_signatures: usize,
    pub lamports_per_signature: u64,
    #[serde(default)]
    pub broadcast: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheCfg {
    #[serde(default = "default_transaction_ttl_secs")]
    pub transaction_ttl_secs: u64,
    #[serde(default = "default_account_ttl_secs")]
    pub account_ttl_secs: u64,
}

impl Default for CacheCfg {
    fn default() -> Self {
        Self {
            transaction_ttl_secs: default_transaction_ttl_secs(),
            account_ttl_secs: default_account_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenCfg {
    pub mint: String,
    pub account: String,
    pub decimals: u8,
    pub fee: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub rpc: RpcCfg,
    #[serde(default)]
    pub wallet: WalletCfg,
    pub relay: RelayCfg,
    #[serde(default)]
    pub cache: CacheCfg,
    #[serde(default)]
    pub tokens: Vec<TokenCfg>,
}

// 10^19 is the largest power of ten a u64 amount can hold
const MAX_DECIMALS: u8 = 19;

fn default_commitment() -> String {
    "confirmed".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_transaction_ttl_secs() -> u64 {
    120
}

// About one blockhash lifetime (150 slots)
fn default_account_ttl_secs() -> u64 {
    90
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path.as_ref())
            .with_context(|| format!("read {}", path.as_ref().display()))?;
        Self::from_toml(&s)
    }

    pub fn from_toml(s: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(s).context("parse Config.toml")?;
        Ok(cfg)
    }

    pub fn commitment(&self) -> Result<CommitmentConfig> {
        CommitmentConfig::from_str(&self.rpc.commitment)
            .map_err(|e| anyhow::anyhow!("invalid commitment {}: {:?}", self.rpc.commitment, e))
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc.timeout_secs)
    }

    pub fn allowed_tokens(&self) -> Result<Vec<AllowedToken>> {
        self.tokens
            .iter()
            .map(|token| {
                if token.decimals > MAX_DECIMALS {
                    bail!("token {} has {} decimals, at most {} supported", token.mint, token.decimals, MAX_DECIMALS);
                }
                Ok(AllowedToken {
                    mint: Pubkey::from_str(&token.mint).with_context(|| format!("invalid mint {}", token.mint))?,
                    account: Pubkey::from_str(&token.account)
                        .with_context(|| format!("invalid fee account {}", token.account))?,
                    decimals: token.decimals,
                    fee: token.fee,
                })
            })
            .collect()
    }

    pub fn policy(&self) -> Result<RelayPolicy> {
        if self.relay.max_signatures == 0 {
            bail!("relay.max_signatures must be at least 1");
        }
        Ok(RelayPolicy {
            max_signatures: self.relay.max_signatures,
            lamports_per_signature: self.relay.lamports_per_signature,
            allowed_tokens: self.allowed_tokens()?,
            transaction_ttl: Duration::from_secs(self.cache.transaction_ttl_secs),
            account_ttl: Duration::from_secs(self.cache.account_ttl_secs),
            broadcast: self.relay.broadcast,
        })
    }
}
