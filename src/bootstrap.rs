// src/bootstrap.rs
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::asset::AssetType;
use crate::engine::TransactionEngine;
use crate::error::LedgerError;
use crate::wallet::{SystemWallet, SystemWalletRole, User, WalletBalance};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSpec {
    pub name: String,
    pub symbol: String,
}

impl AssetSpec {
    pub fn new(name: &str, symbol: &str) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
        }
    }
}

/// Reference data to provision. Every step is keyed on natural keys, so
/// running the same plan twice changes nothing.
#[derive(Debug, Clone)]
pub struct BootstrapPlan {
    pub assets: Vec<AssetSpec>,
    pub users: Vec<String>,
    /// Issued once per wallet as a BONUS. Zero skips funding.
    pub opening_balance: u64,
}

impl Default for BootstrapPlan {
    fn default() -> Self {
        Self {
            assets: vec![
                AssetSpec::new("Gold Coins", "GOLD"),
                AssetSpec::new("Diamonds", "DIA"),
                AssetSpec::new("Loyalty Points", "LP"),
            ],
            users: vec!["user1@test.com".to_string(), "user2@test.com".to_string()],
            opening_balance: 2_000_000,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BootstrapReport {
    pub assets: Vec<AssetType>,
    pub system_wallets: Vec<SystemWallet>,
    pub users: Vec<User>,
    pub wallets: Vec<WalletBalance>,
    /// Opening balances written by this run.
    pub issued: usize,
    /// Opening balances that already existed and were replayed.
    pub replayed: usize,
}

/// Idempotency key of a wallet's opening balance.
pub fn opening_balance_key(wallet_id: Uuid) -> String {
    format!("bootstrap:opening:{wallet_id}")
}

/// Provision assets, system wallets, users and their wallets, then fund
/// each wallet through the engine so balances stay backed by entries.
#[instrument(skip_all, fields(assets = plan.assets.len(), users = plan.users.len()))]
pub async fn bootstrap(
    engine: &TransactionEngine,
    plan: &BootstrapPlan,
) -> Result<BootstrapReport, LedgerError> {
    let store = engine.store();
    let mut report = BootstrapReport::default();

    for spec in &plan.assets {
        let asset = store.upsert_asset(&spec.name, &spec.symbol).await?;
        for role in SystemWalletRole::ALL {
            let system_wallet = store.upsert_system_wallet(asset.id, role).await?;
            report.system_wallets.push(system_wallet);
        }
        debug!(asset = %asset.symbol, "asset provisioned");
        report.assets.push(asset);
    }

    for email in &plan.users {
        let user = store.upsert_user(email).await?;

        for asset in &report.assets {
            let wallet = store.upsert_wallet(user.id, asset.id).await?;
            if plan.opening_balance == 0 {
                continue;
            }

            let key = opening_balance_key(wallet.id);
            let seen = engine.get_transaction_by_idempotency_key(&key).await?;
            engine.bonus(wallet.id, plan.opening_balance, key).await?;

            if seen.is_some() {
                report.replayed += 1;
            } else {
                report.issued += 1;
            }
        }

        report.wallets.extend(engine.list_wallets(user.id).await?);
        report.users.push(user);
    }

    info!(
        assets = report.assets.len(),
        wallets = report.wallets.len(),
        issued = report.issued,
        replayed = report.replayed,
        "bootstrap complete"
    );

    Ok(report)
}
