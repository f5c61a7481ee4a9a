// src/app.rs
use anyhow::{Context, Result};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::signature::{read_keypair_file, Keypair, Signer};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};

use crate::application::{handle_create_account, handle_json, ApiReply, CreateAccountRequest, RelayService};
use crate::config::Config;
use crate::infrastructure::{MemoryCache, SolanaRpcClient};
use crate::shared::types::RelayPolicy;
use crate::shared::utils::format_amount;

/// Environment variable holding the fee payer's base58 secret key
pub const FEE_PAYER_SECRET_ENV: &str = "FEE_PAYER_SECRET";

#[derive(Debug, Clone)]
pub struct AppCfg {
    pub rpc_url: String,
    pub commitment: CommitmentConfig,
    pub rpc_timeout: Duration,
    pub keypair_path: Option<String>,
    pub policy: RelayPolicy,
}

impl AppCfg {
    pub fn from_config(cfg: Config) -> Result<Self> {
        Ok(Self {
            commitment: cfg.commitment()?,
            rpc_timeout: cfg.rpc_timeout(),
            policy: cfg.policy()?,
            rpc_url: cfg.rpc.url,
            keypair_path: cfg.wallet.keypair,
        })
    }
}

/// Fee payer from a keypair file, or from `FEE_PAYER_SECRET` when no path is set
pub fn load_fee_payer(keypair_path: Option<&str>) -> Result<Keypair> {
    if let Some(path) = keypair_path {
        return read_keypair_file(path).map_err(|e| anyhow::anyhow!("Failed to load keypair {}: {}", path, e));
    }
    let secret = std::env::var(FEE_PAYER_SECRET_ENV)
        .with_context(|| format!("no wallet.keypair configured and {} is not set", FEE_PAYER_SECRET_ENV))?;
    let bytes = bs58::decode(secret.trim())
        .into_vec()
        .with_context(|| format!("{} is not base58", FEE_PAYER_SECRET_ENV))?;
    Keypair::from_bytes(&bytes).map_err(|e| anyhow::anyhow!("{} is not a keypair: {}", FEE_PAYER_SECRET_ENV, e))
}

pub fn build_service(app_cfg: &AppCfg, fee_payer: Arc<Keypair>) -> RelayService {
    let ledger = Arc::new(SolanaRpcClient::new(
        app_cfg.rpc_url.clone(),
        app_cfg.commitment,
        app_cfg.rpc_timeout,
    ));
    if app_cfg.policy.allowed_tokens.is_empty() {
        warn!("No allowed tokens configured - every request will be rejected");
    }
    info!("Relay using RPC {} with fee payer {}", ledger.url(), fee_payer.pubkey());
    RelayService::new(ledger, Arc::new(MemoryCache::new()), fee_payer, app_cfg.policy.clone())
}

/// Handle a single transaction and print the reply
pub async fn create_account(service: &RelayService, transaction: String) -> Result<ApiReply> {
    let reply = handle_create_account(
        service,
        CreateAccountRequest {
            id: None,
            transaction: Some(transaction),
        },
    )
    .await;
    println!("{}", serde_json::to_string(&reply)?);
    Ok(reply)
}

/// Answer one JSON request per stdin line, each on its own task
pub async fn serve_stdin(service: Arc<RelayService>) -> Result<()> {
    info!("Reading requests from stdin");
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = rx.recv().await {
            stdout.write_all(line.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
        Ok::<_, std::io::Error>(())
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let service = service.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let reply = handle_json(&service, &line).await;
            match serde_json::to_string(&reply) {
                Ok(encoded) => {
                    if tx.send(encoded).is_err() {
                        error!("Reply writer closed");
                    }
                }
                Err(e) => error!("Failed to encode reply: {}", e),
            }
        });
    }
    drop(tx);

    writer.await.context("reply writer panicked")??;
    Ok(())
}

pub fn show_config(app_cfg: &AppCfg, fee_payer: &Keypair) {
    println!("RPC:              {}", app_cfg.rpc_url);
    println!("Fee payer:        {}", fee_payer.pubkey());
    println!("Max signatures:   {}", app_cfg.policy.max_signatures);
    println!("Lamports/sig:     {}", app_cfg.policy.lamports_per_signature);
    println!("Broadcast:        {}", app_cfg.policy.broadcast);
    println!("Allowed tokens:");
    for token in &app_cfg.policy.allowed_tokens {
        println!(
            "  {} -> {} fee {} ({} decimals)",
            token.mint,
            token.account,
            format_amount(token.fee, token.decimals),
            token.decimals
        );
    }
}
