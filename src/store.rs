// src/store.rs
use async_trait::async_trait;
use uuid::Uuid;

use crate::asset::AssetType;
use crate::entry::{LedgerEntry, LedgerEntryView};
use crate::error::StoreError;
use crate::transaction::{Transaction, TransactionResult};
use crate::wallet::{SystemWallet, SystemWalletRole, User, Wallet, WalletBalance};

pub(crate) fn hash_idempotency_key(key: &str) -> String {
    blake3::hash(key.as_bytes()).to_hex().to_string()
}

/// Result of the insert-if-absent claim on an idempotency key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// Another transaction, committed or in flight, already owns the key.
    Conflict,
}

/// Durable storage behind the ledger.
///
/// Writes happen only through a [`UnitOfWork`]; the methods here are
/// pass-through reads and idempotent provisioning used by bootstrap.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Open an atomic unit. Dropping it without `commit` rolls it back.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;

    // READ OPERATIONS
    async fn get_transaction(&self, id: Uuid) -> Result<Option<Transaction>, StoreError>;
    async fn get_transaction_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<Transaction>, StoreError>;
    async fn transaction_entries(
        &self,
        transaction_id: Uuid,
    ) -> Result<Vec<LedgerEntry>, StoreError>;
    async fn get_wallet(&self, id: Uuid) -> Result<Option<Wallet>, StoreError>;
    async fn get_system_wallet(
        &self,
        asset_type_id: Uuid,
        role: SystemWalletRole,
    ) -> Result<Option<SystemWallet>, StoreError>;
    async fn list_wallets(&self, user_id: Uuid) -> Result<Vec<WalletBalance>, StoreError>;
    /// Entries of one user wallet, newest first, strictly older than `cursor`.
    async fn list_wallet_entries(
        &self,
        wallet_id: Uuid,
        cursor: Option<Uuid>,
        limit: usize,
    ) -> Result<Vec<LedgerEntryView>, StoreError>;

    // PROVISIONING (idempotent on the natural keys)
    async fn upsert_asset(&self, name: &str, symbol: &str) -> Result<AssetType, StoreError>;
    async fn upsert_user(&self, email: &str) -> Result<User, StoreError>;
    async fn upsert_system_wallet(
        &self,
        asset_type_id: Uuid,
        role: SystemWalletRole,
    ) -> Result<SystemWallet, StoreError>;
    async fn upsert_wallet(&self, user_id: Uuid, asset_type_id: Uuid)
    -> Result<Wallet, StoreError>;
}

/// One atomic, all-or-nothing unit against the store.
///
/// Implementors MUST:
/// 1. Keep every write invisible to other units until `commit`
/// 2. Hold row locks taken by `lock_*` until `commit` or `rollback`
/// 3. Apply `increment_*` as an in-place add on the stored value
/// 4. Report a taken idempotency key as [`InsertOutcome::Conflict`],
///    never as an error
/// 5. Discard all writes and release all locks on `rollback` or drop
#[async_trait]
pub trait UnitOfWork: Send {
    async fn insert_pending(&mut self, transaction: &Transaction)
    -> Result<InsertOutcome, StoreError>;
    async fn find_by_idempotency_key(
        &mut self,
        key: &str,
    ) -> Result<Option<Transaction>, StoreError>;

    async fn find_wallet(&mut self, id: Uuid) -> Result<Option<Wallet>, StoreError>;
    async fn find_system_wallet(
        &mut self,
        asset_type_id: Uuid,
        role: SystemWalletRole,
    ) -> Result<Option<SystemWallet>, StoreError>;

    /// Take the exclusive row lock and return the balance as seen under it.
    async fn lock_wallet(&mut self, id: Uuid) -> Result<i64, StoreError>;
    async fn lock_system_wallet(&mut self, id: Uuid) -> Result<i64, StoreError>;

    /// Add `delta` in place and return the new balance.
    async fn increment_wallet(&mut self, id: Uuid, delta: i64) -> Result<i64, StoreError>;
    async fn increment_system_wallet(&mut self, id: Uuid, delta: i64) -> Result<i64, StoreError>;

    async fn insert_entries(&mut self, entries: &[LedgerEntry]) -> Result<(), StoreError>;
    async fn complete_transaction(
        &mut self,
        id: Uuid,
        result: &TransactionResult,
    ) -> Result<(), StoreError>;

    async fn commit(&mut self) -> Result<(), StoreError>;
    async fn rollback(&mut self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idempotency_hash_is_stable() {
        let a = hash_idempotency_key("order-42");
        let b = hash_idempotency_key("order-42");
        let c = hash_idempotency_key("order-43");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }
}
