//! gasfeed - native token gas-price view, entry point.

use anyhow::Result;
use clap::Parser;
use gasfeed_app::{AppConfig, NativeTokenRates};
use tracing::{info, warn};

/// Native token gas-price view
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via GASFEED_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Must run before any TLS connection
    gasfeed_ws::init_crypto();

    let args = Args::parse();

    gasfeed_telemetry::init_logging()?;

    info!("Starting gasfeed v{}", env!("CARGO_PKG_VERSION"));

    // CLI arg > GASFEED_CONFIG > default
    let config = match args.config {
        Some(path) => {
            info!(config_path = %path, "Loading configuration");
            AppConfig::from_file(&path)?
        }
        None => AppConfig::load()?,
    };
    info!(
        chain_id = ?config.chain_id,
        rates_url = %config.rates.url,
        "Configuration loaded"
    );

    let service = NativeTokenRates::start(config).await?;
    let mut output = service.subscribe();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, shutting down");
                break;
            }
            changed = output.changed() => {
                if changed.is_err() {
                    warn!("Output channel closed");
                    break;
                }
                let view = output.borrow_and_update().clone();
                match view {
                    Some(prices) => {
                        for chain in prices.iter() {
                            info!(
                                chain_id = %chain.chain_id,
                                gas_token_price_usd = chain.gas_token_price_usd,
                                gas_prices = %serde_json::to_string(&chain.gas_prices)?,
                                loading = service.loading(),
                                "Gas prices updated"
                            );
                        }
                    }
                    None => info!(connected = service.connected(), "Gas prices not available yet"),
                }
            }
        }
    }

    service.shutdown().await;
    Ok(())
}
