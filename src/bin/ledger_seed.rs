//! Creates the ledger schema and provisions the default assets, system
//! wallets, users and opening balances. Safe to run repeatedly.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wallet_ledger::{BootstrapPlan, LedgerConfig, PostgresAdapter, TransactionEngine, bootstrap};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = LedgerConfig::from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    let adapter = Arc::new(PostgresAdapter::connect(&config).await?);
    adapter.init_schema().await?;

    let engine = TransactionEngine::with_config(adapter.clone(), &config);
    let outcome = bootstrap(&engine, &BootstrapPlan::default()).await;
    adapter.close().await;
    let report = outcome?;

    for wallet in &report.wallets {
        info!(
            wallet_id = %wallet.wallet_id,
            user_id = %wallet.user_id,
            asset = %wallet.asset.symbol,
            balance = %wallet.balance,
            "wallet ready"
        );
    }
    info!(
        issued = report.issued,
        replayed = report.replayed,
        "seed finished"
    );

    Ok(())
}
