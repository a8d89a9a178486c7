use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::traits::LedgerProvider;
use provider::SolanaRpcProvider;
use rust_decimal::Decimal;
use solana_sdk::signature::Keypair;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use trader::{TraderConfig, UnifiedTrader};

/// Buys and sells pump.fun tokens on whichever market they currently trade on.
#[derive(Parser, Debug)]
#[command(name = "pump-trader")]
struct Args {
    /// Path to the trader configuration YAML
    #[arg(long, default_value = "config/default.yml")]
    config: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the market stage of a token
    Stage { mint: String },
    /// Print the curve or pool a token trades on
    Info { mint: String },
    /// Buy a token for SOL
    Buy {
        mint: String,
        /// Amount of SOL to spend
        #[arg(long)]
        sol: Decimal,
        /// Slippage as a fraction, e.g. 0.15
        #[arg(long, default_value = "0.15")]
        slippage: Decimal,
    },
    /// Sell a share of the wallet's token balance
    Sell {
        mint: String,
        /// Percentage of the balance to sell
        #[arg(long, default_value = "100")]
        percent: Decimal,
        #[arg(long, default_value = "0.15")]
        slippage: Decimal,
    },
}

impl Command {
    fn needs_signer(&self) -> bool {
        matches!(self, Command::Buy { .. } | Command::Sell { .. })
    }
}

fn load_config(path: &str) -> Result<TraderConfig> {
    let mut config = if Path::new(path).exists() {
        TraderConfig::load(path).with_context(|| format!("Failed to load config {}", path))?
    } else {
        warn!(path, "Config file not found, using defaults");
        TraderConfig::default()
    };
    config.apply_env();
    config.validate()?;
    Ok(config)
}

fn build_provider(config: &TraderConfig, needs_signer: bool) -> Result<Arc<dyn LedgerProvider>> {
    let settings = config.provider_settings()?;
    let provider = if needs_signer {
        SolanaRpcProvider::from_keypair_file(settings, config.keypair_file())?
    } else {
        // Read-only commands never sign.
        SolanaRpcProvider::new(settings, Keypair::new())
    };
    Ok(Arc::new(provider))
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let args = Args::parse();

    let config = load_config(&args.config)?;
    info!(rpc = %config.rpc_url, commitment = %config.commitment, "Configuration loaded");

    let provider = build_provider(&config, args.command.needs_signer())?;
    let trader = UnifiedTrader::new(provider, &config.strategy_settings());

    match args.command {
        Command::Stage { mint } => {
            let stage = trader.close_after(trader.detect(&mint).await).await?;
            println!("{}", stage);
        }
        Command::Info { mint } => {
            let token_info = trader.close_after(trader.token_info(&mint).await).await?;
            println!("{}", token_info);
        }
        Command::Buy {
            mint,
            sol,
            slippage,
        } => {
            let outcome = trader.buy(&mint, sol, slippage).await;
            report(trader.close_after(outcome).await)?;
        }
        Command::Sell {
            mint,
            percent,
            slippage,
        } => {
            let outcome = trader.sell(&mint, percent, slippage).await;
            report(trader.close_after(outcome).await)?;
        }
    }

    Ok(())
}

fn report(outcome: Result<common::types::TradeResult, common::errors::TradeError>) -> Result<()> {
    match outcome {
        Ok(result) => {
            info!(signature = %result.signature, "Trade confirmed");
            println!("{}", result);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Trade failed");
            Err(e.into())
        }
    }
}
