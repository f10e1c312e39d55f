// src/entry.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::StoreError;
use crate::transaction::TransactionType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Debit,
    Credit,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debit => "DEBIT",
            Self::Credit => "CREDIT",
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Self::Debit => Self::Credit,
            Self::Credit => Self::Debit,
        }
    }

    /// Contribution of `amount` to a balance: credits add, debits subtract.
    pub fn signed(&self, amount: i64) -> i64 {
        match self {
            Self::Debit => -amount,
            Self::Credit => amount,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEBIT" => Ok(Self::Debit),
            "CREDIT" => Ok(Self::Credit),
            other => Err(StoreError::Corrupt(format!("unknown direction: {other}"))),
        }
    }
}

/// The side an entry is booked against: a user wallet or a system wallet,
/// never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum EntryAccount {
    Wallet(Uuid),
    System(Uuid),
}

impl EntryAccount {
    pub fn wallet_id(&self) -> Option<Uuid> {
        match self {
            Self::Wallet(id) => Some(*id),
            Self::System(_) => None,
        }
    }

    pub fn system_wallet_id(&self) -> Option<Uuid> {
        match self {
            Self::System(id) => Some(*id),
            Self::Wallet(_) => None,
        }
    }

    pub(crate) fn from_columns(
        wallet_id: Option<Uuid>,
        system_wallet_id: Option<Uuid>,
    ) -> Result<Self, StoreError> {
        match (wallet_id, system_wallet_id) {
            (Some(id), None) => Ok(Self::Wallet(id)),
            (None, Some(id)) => Ok(Self::System(id)),
            _ => Err(StoreError::Corrupt(
                "ledger entry must reference exactly one wallet".to_string(),
            )),
        }
    }
}

/// One immutable side of a movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub account: EntryAccount,
    pub direction: Direction,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(
        transaction_id: Uuid,
        account: EntryAccount,
        direction: Direction,
        amount: i64,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            transaction_id,
            account,
            direction,
            amount,
            created_at: Utc::now(),
        }
    }

    pub fn signed_amount(&self) -> i64 {
        self.direction.signed(self.amount)
    }
}

/// Read model for a wallet's ledger listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntryView {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub wallet_id: Uuid,
    pub direction: Direction,
    pub amount: i64,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntryView {
    pub fn signed_amount(&self) -> i64 {
        self.direction.signed(self.amount)
    }
}

/// One page of a newest-first listing. `next_cursor` is the id to pass back
/// to fetch the following (older) page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPage {
    pub entries: Vec<LedgerEntryView>,
    pub next_cursor: Option<Uuid>,
}

impl EntryPage {
    /// Build a page from a `limit + 1` probe fetch.
    pub(crate) fn from_probe(mut entries: Vec<LedgerEntryView>, limit: usize) -> Self {
        let next_cursor = if entries.len() > limit {
            entries.truncate(limit);
            entries.last().map(|entry| entry.id)
        } else {
            None
        };

        Self {
            entries,
            next_cursor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(n: usize) -> Vec<LedgerEntryView> {
        (0..n)
            .map(|_| LedgerEntryView {
                id: Uuid::now_v7(),
                transaction_id: Uuid::now_v7(),
                wallet_id: Uuid::nil(),
                direction: Direction::Credit,
                amount: 1,
                kind: TransactionType::Topup,
                created_at: Utc::now(),
            })
            .collect()
    }

    #[test]
    fn test_signed_amounts() {
        assert_eq!(Direction::Credit.signed(40), 40);
        assert_eq!(Direction::Debit.signed(40), -40);
        assert_eq!(Direction::Debit.opposite(), Direction::Credit);
    }

    #[test]
    fn test_account_columns() {
        let id = Uuid::now_v7();
        assert_eq!(
            EntryAccount::from_columns(Some(id), None).unwrap(),
            EntryAccount::Wallet(id)
        );
        assert_eq!(
            EntryAccount::from_columns(None, Some(id)).unwrap(),
            EntryAccount::System(id)
        );
        assert!(EntryAccount::from_columns(Some(id), Some(id)).is_err());
        assert!(EntryAccount::from_columns(None, None).is_err());
    }

    #[test]
    fn test_page_from_probe() {
        let full = EntryPage::from_probe(view(3), 2);
        assert_eq!(full.entries.len(), 2);
        assert_eq!(full.next_cursor, Some(full.entries[1].id));

        let last = EntryPage::from_probe(view(2), 2);
        assert_eq!(last.entries.len(), 2);
        assert_eq!(last.next_cursor, None);
    }
}
