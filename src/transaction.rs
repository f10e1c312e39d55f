// src/transaction.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{LedgerError, StoreError};
use crate::wallet::SystemWalletRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Topup,
    Bonus,
    Spend,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Topup => "TOPUP",
            Self::Bonus => "BONUS",
            Self::Spend => "SPEND",
        }
    }

    /// The system wallet on the other side of the movement.
    pub fn counterpart_role(&self) -> SystemWalletRole {
        match self {
            Self::Topup | Self::Bonus => SystemWalletRole::Treasury,
            Self::Spend => SystemWalletRole::Revenue,
        }
    }

    /// True when value flows into the user wallet.
    pub fn credits_user(&self) -> bool {
        !matches!(self, Self::Spend)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TOPUP" => Ok(Self::Topup),
            "BONUS" => Ok(Self::Bonus),
            "SPEND" => Ok(Self::Spend),
            other => Err(StoreError::Corrupt(format!(
                "unknown transaction type: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            other => Err(StoreError::Corrupt(format!(
                "unknown transaction status: {other}"
            ))),
        }
    }
}

/// Durable response snapshot. Replays return this value verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResult {
    pub transaction_id: String,
    pub balance: String,
}

impl TransactionResult {
    pub fn new(transaction_id: Uuid, balance: i64) -> Self {
        Self {
            transaction_id: transaction_id.to_string(),
            balance: balance.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub idempotency_key: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub status: TransactionStatus,
    pub response: Option<TransactionResult>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn pending(idempotency_key: &str, kind: TransactionType) -> Self {
        Self {
            id: Uuid::now_v7(),
            idempotency_key: idempotency_key.to_string(),
            kind,
            status: TransactionStatus::Pending,
            response: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TransactionStatus::Completed
    }
}

/// Input to [`TransactionEngine::execute`](crate::TransactionEngine::execute).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub kind: TransactionType,
    pub wallet_id: Uuid,
    pub amount: u64,
    pub idempotency_key: String,
}

impl TransactionRequest {
    pub fn new(
        kind: TransactionType,
        wallet_id: Uuid,
        amount: u64,
        idempotency_key: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            wallet_id,
            amount,
            idempotency_key: idempotency_key.into(),
        }
    }

    pub fn topup(wallet_id: Uuid, amount: u64, idempotency_key: impl Into<String>) -> Self {
        Self::new(TransactionType::Topup, wallet_id, amount, idempotency_key)
    }

    pub fn bonus(wallet_id: Uuid, amount: u64, idempotency_key: impl Into<String>) -> Self {
        Self::new(TransactionType::Bonus, wallet_id, amount, idempotency_key)
    }

    pub fn spend(wallet_id: Uuid, amount: u64, idempotency_key: impl Into<String>) -> Self {
        Self::new(TransactionType::Spend, wallet_id, amount, idempotency_key)
    }

    pub(crate) fn validate(&self) -> Result<(), LedgerError> {
        if self.idempotency_key.is_empty() {
            return Err(LedgerError::InvalidRequest(
                "idempotency key is required".to_string(),
            ));
        }
        if self.amount == 0 {
            return Err(LedgerError::InvalidRequest(
                "amount must be positive".to_string(),
            ));
        }
        if self.amount > i64::MAX as u64 {
            return Err(LedgerError::InvalidRequest(format!(
                "amount exceeds {}",
                i64::MAX
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_snapshot_shape() {
        let id = Uuid::now_v7();
        let result = TransactionResult::new(id, 1100);
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["transactionId"], id.to_string());
        assert_eq!(json["balance"], "1100");

        let back: TransactionResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_counterpart_roles() {
        assert_eq!(
            TransactionType::Topup.counterpart_role(),
            SystemWalletRole::Treasury
        );
        assert_eq!(
            TransactionType::Bonus.counterpart_role(),
            SystemWalletRole::Treasury
        );
        assert_eq!(
            TransactionType::Spend.counterpart_role(),
            SystemWalletRole::Revenue
        );
    }

    #[test]
    fn test_type_and_status_codec() {
        for kind in [
            TransactionType::Topup,
            TransactionType::Bonus,
            TransactionType::Spend,
        ] {
            assert_eq!(kind.as_str().parse::<TransactionType>().unwrap(), kind);
        }
        assert_eq!(
            "COMPLETED".parse::<TransactionStatus>().unwrap(),
            TransactionStatus::Completed
        );
        assert!("REFUND".parse::<TransactionType>().is_err());
        assert!("DONE".parse::<TransactionStatus>().is_err());
    }

    #[test]
    fn test_request_validation() {
        let wallet = Uuid::now_v7();

        assert!(TransactionRequest::topup(wallet, 1, "k").validate().is_ok());
        assert!(matches!(
            TransactionRequest::topup(wallet, 0, "k").validate(),
            Err(LedgerError::InvalidRequest(_))
        ));
        assert!(matches!(
            TransactionRequest::spend(wallet, 5, "").validate(),
            Err(LedgerError::InvalidRequest(_))
        ));
        // Keys are opaque; whitespace is a valid key.
        assert!(TransactionRequest::spend(wallet, 5, "   ").validate().is_ok());
        assert!(matches!(
            TransactionRequest::bonus(wallet, u64::MAX, "k").validate(),
            Err(LedgerError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_transaction_serializes_type_field() {
        let tx = Transaction::pending("abc", TransactionType::Spend);
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["type"], "SPEND");
        assert_eq!(json["status"], "PENDING");
        assert!(json["response"].is_null());
    }
}
