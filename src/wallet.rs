// src/wallet.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::asset::AssetSummary;
use crate::error::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: &str) -> Self {
        Self {
            id: Uuid::now_v7(),
            email: email.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// User-owned balance for one asset. `cached_balance` is a materialized view
/// of the wallet's ledger entries and never goes negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub asset_type_id: Uuid,
    pub cached_balance: i64,
    pub created_at: DateTime<Utc>,
}

impl Wallet {
    pub fn new(user_id: Uuid, asset_type_id: Uuid) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            asset_type_id,
            cached_balance: 0,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemWalletRole {
    /// Counterpart for value created out of nothing (top-ups, bonuses).
    Treasury,
    /// Counterpart for value the business collects (spends).
    Revenue,
}

impl SystemWalletRole {
    pub const ALL: [SystemWalletRole; 2] = [SystemWalletRole::Treasury, SystemWalletRole::Revenue];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Treasury => "TREASURY",
            Self::Revenue => "REVENUE",
        }
    }
}

impl fmt::Display for SystemWalletRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SystemWalletRole {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TREASURY" => Ok(Self::Treasury),
            "REVENUE" => Ok(Self::Revenue),
            other => Err(StoreError::Corrupt(format!("unknown wallet role: {other}"))),
        }
    }
}

/// Business-side counterpart wallet, one per (asset, role). May go negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemWallet {
    pub id: Uuid,
    pub asset_type_id: Uuid,
    pub role: SystemWalletRole,
    pub cached_balance: i64,
    pub created_at: DateTime<Utc>,
}

impl SystemWallet {
    pub fn new(asset_type_id: Uuid, role: SystemWalletRole) -> Self {
        Self {
            id: Uuid::now_v7(),
            asset_type_id,
            role,
            cached_balance: 0,
            created_at: Utc::now(),
        }
    }
}

/// Read model: a wallet with its asset and the balance rendered as a decimal
/// string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletBalance {
    pub wallet_id: Uuid,
    pub user_id: Uuid,
    pub asset: AssetSummary,
    pub balance: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_codec() {
        for role in SystemWalletRole::ALL {
            assert_eq!(role.as_str().parse::<SystemWalletRole>().unwrap(), role);
        }
        assert!(matches!(
            "ESCROW".parse::<SystemWalletRole>(),
            Err(StoreError::Corrupt(_))
        ));
        assert_eq!(
            serde_json::to_string(&SystemWalletRole::Treasury).unwrap(),
            "\"TREASURY\""
        );
    }

    #[test]
    fn test_new_wallets_start_empty() {
        let wallet = Wallet::new(Uuid::now_v7(), Uuid::now_v7());
        assert_eq!(wallet.cached_balance, 0);

        let system = SystemWallet::new(wallet.asset_type_id, SystemWalletRole::Revenue);
        assert_eq!(system.cached_balance, 0);
        assert_eq!(system.asset_type_id, wallet.asset_type_id);
    }
}
