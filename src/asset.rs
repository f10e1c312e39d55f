// src/asset.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A distinct unit of value, e.g. "Gold Coins" / GOLD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetType {
    pub id: Uuid,
    pub name: String,
    pub symbol: String,
    pub created_at: DateTime<Utc>,
}

impl AssetType {
    pub fn new(name: &str, symbol: &str) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.to_string(),
            symbol: symbol.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Asset fields exposed next to a wallet balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSummary {
    pub id: Uuid,
    pub name: String,
    pub symbol: String,
}

impl From<&AssetType> for AssetSummary {
    fn from(asset: &AssetType) -> Self {
        Self {
            id: asset.id,
            name: asset.name.clone(),
            symbol: asset.symbol.clone(),
        }
    }
}
