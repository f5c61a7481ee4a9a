use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use fee_relay::app::{self, AppCfg};
use fee_relay::config::Config;

#[derive(Parser, Debug)]
#[command(version, about = "Co-signs Solana transactions that pay an SPL token fee for associated account creation")]
struct Args {
    /// Path to config file
    #[arg(long, default_value = "Config.toml")]
    config: String,

    /// RPC endpoint URL (overrides config)
    #[arg(long)]
    rpc_url: Option<String>,

    /// Path to fee payer keypair file (overrides config)
    #[arg(long)]
    keypair: Option<String>,

    /// Send transactions after a clean simulation (overrides config)
    #[arg(long)]
    broadcast: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Relay one base58 wire transaction and print the JSON reply
    CreateAccount {
        #[arg(long)]
        transaction: String,
    },
    /// Relay one JSON request per stdin line
    ServeStdin,
    /// Print the fee payer and allow-list
    ShowConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    // CLI args > Config file > Defaults
    let mut app_cfg = AppCfg::from_config(Config::from_file(&args.config)?)?;
    if let Some(rpc_url) = args.rpc_url {
        app_cfg.rpc_url = rpc_url;
    }
    if let Some(keypair) = args.keypair {
        app_cfg.keypair_path = Some(keypair);
    }
    if args.broadcast {
        app_cfg.policy.broadcast = true;
    }

    let fee_payer = Arc::new(app::load_fee_payer(app_cfg.keypair_path.as_deref())?);

    match args.command {
        Command::CreateAccount { transaction } => {
            let service = app::build_service(&app_cfg, fee_payer);
            let reply = app::create_account(&service, transaction).await?;
            if reply.code != 200 {
                std::process::exit(1);
            }
        }
        Command::ServeStdin => {
            let service = Arc::new(app::build_service(&app_cfg, fee_payer));
            app::serve_stdin(service).await?;
        }
        Command::ShowConfig => app::show_config(&app_cfg, &fee_payer),
    }

    Ok(())
}
