// src/adapters/memory.rs
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{Mutex as RowLock, OwnedMutexGuard};
use uuid::Uuid;

use crate::asset::{AssetSummary, AssetType};
use crate::config::LedgerConfig;
use crate::entry::{EntryAccount, LedgerEntry, LedgerEntryView};
use crate::error::StoreError;
use crate::store::{InsertOutcome, LedgerStore, UnitOfWork, hash_idempotency_key};
use crate::transaction::{Transaction, TransactionResult, TransactionStatus};
use crate::wallet::{SystemWallet, SystemWalletRole, User, Wallet, WalletBalance};

#[derive(Default)]
struct MemoryState {
    assets: HashMap<Uuid, AssetType>,
    users: HashMap<Uuid, User>,
    wallets: HashMap<Uuid, Wallet>,
    system_wallets: HashMap<Uuid, SystemWallet>,
    transactions: HashMap<Uuid, Transaction>,
    // committed: key hash -> transaction id
    keys: HashMap<String, Uuid>,
    // claimed by open units: key hash -> pending row
    claims: HashMap<String, Transaction>,
    // commit order
    entries: Vec<LedgerEntry>,
}

impl MemoryState {
    fn committed_by_key(&self, hash: &str) -> Option<Transaction> {
        self.keys
            .get(hash)
            .and_then(|id| self.transactions.get(id))
            .cloned()
    }
}

#[derive(Clone, Default)]
struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    row_locks: Arc<Mutex<HashMap<Uuid, Arc<RowLock<()>>>>>,
}

impl MemoryStore {
    fn row_lock(&self, id: Uuid) -> Arc<RowLock<()>> {
        Arc::clone(self.row_locks.lock().entry(id).or_default())
    }
}

/// In-process ledger store with the same unit-of-work guarantees as the
/// postgres adapter: staged writes, exclusive row locks held until the unit
/// ends, and insert-if-absent idempotency claims.
pub struct MemoryAdapter {
    store: MemoryStore,
    lock_timeout: Duration,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::from_config(&LedgerConfig::default())
    }

    /// Row-lock waits are bounded by `config.lock_timeout`, as on postgres.
    pub fn from_config(config: &LedgerConfig) -> Self {
        Self {
            store: MemoryStore::default(),
            lock_timeout: config.lock_timeout,
        }
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }
}

impl Default for MemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for MemoryAdapter {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        Ok(Box::new(MemoryUnitOfWork::new(
            self.store.clone(),
            self.lock_timeout,
        )))
    }

    async fn get_transaction(&self, id: Uuid) -> Result<Option<Transaction>, StoreError> {
        Ok(self.store.state.lock().transactions.get(&id).cloned())
    }

    async fn get_transaction_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<Transaction>, StoreError> {
        let hash = hash_idempotency_key(key);
        Ok(self.store.state.lock().committed_by_key(&hash))
    }

    async fn transaction_entries(
        &self,
        transaction_id: Uuid,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        let state = self.store.state.lock();
        Ok(state
            .entries
            .iter()
            .filter(|entry| entry.transaction_id == transaction_id)
            .cloned()
            .collect())
    }

    async fn get_wallet(&self, id: Uuid) -> Result<Option<Wallet>, StoreError> {
        Ok(self.store.state.lock().wallets.get(&id).cloned())
    }

    async fn get_system_wallet(
        &self,
        asset_type_id: Uuid,
        role: SystemWalletRole,
    ) -> Result<Option<SystemWallet>, StoreError> {
        let state = self.store.state.lock();
        Ok(state
            .system_wallets
            .values()
            .find(|w| w.asset_type_id == asset_type_id && w.role == role)
            .cloned())
    }

    async fn list_wallets(&self, user_id: Uuid) -> Result<Vec<WalletBalance>, StoreError> {
        let state = self.store.state.lock();

        let mut wallets: Vec<&Wallet> = state
            .wallets
            .values()
            .filter(|w| w.user_id == user_id)
            .collect();
        wallets.sort_by_key(|w| (w.created_at, w.id));

        wallets
            .into_iter()
            .map(|w| {
                let asset = state.assets.get(&w.asset_type_id).ok_or_else(|| {
                    StoreError::Corrupt(format!("wallet {} references a missing asset", w.id))
                })?;
                Ok(WalletBalance {
                    wallet_id: w.id,
                    user_id: w.user_id,
                    asset: AssetSummary::from(asset),
                    balance: w.cached_balance.to_string(),
                })
            })
            .collect()
    }

    async fn list_wallet_entries(
        &self,
        wallet_id: Uuid,
        cursor: Option<Uuid>,
        limit: usize,
    ) -> Result<Vec<LedgerEntryView>, StoreError> {
        let state = self.store.state.lock();

        // Same order as the postgres keyset: (created_at, id) descending.
        let mut newest_first: Vec<&LedgerEntry> = state
            .entries
            .iter()
            .filter(|entry| entry.account == EntryAccount::Wallet(wallet_id))
            .collect();
        newest_first.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        let page: Vec<&LedgerEntry> = match cursor {
            Some(cursor) => newest_first
                .into_iter()
                .skip_while(|entry| entry.id != cursor)
                .skip(1)
                .take(limit)
                .collect(),
            None => newest_first.into_iter().take(limit).collect(),
        };

        page.into_iter()
            .map(|entry| {
                let kind = state
                    .transactions
                    .get(&entry.transaction_id)
                    .map(|tx| tx.kind)
                    .ok_or_else(|| {
                        StoreError::Corrupt(format!("entry {} has no transaction", entry.id))
                    })?;
                Ok(LedgerEntryView {
                    id: entry.id,
                    transaction_id: entry.transaction_id,
                    wallet_id,
                    direction: entry.direction,
                    amount: entry.amount,
                    kind,
                    created_at: entry.created_at,
                })
            })
            .collect()
    }

    async fn upsert_asset(&self, name: &str, symbol: &str) -> Result<AssetType, StoreError> {
        let mut state = self.store.state.lock();
        if let Some(existing) = state.assets.values().find(|a| a.name == name) {
            return Ok(existing.clone());
        }

        let asset = AssetType::new(name, symbol);
        state.assets.insert(asset.id, asset.clone());
        Ok(asset)
    }

    async fn upsert_user(&self, email: &str) -> Result<User, StoreError> {
        let mut state = self.store.state.lock();
        if let Some(existing) = state.users.values().find(|u| u.email == email) {
            return Ok(existing.clone());
        }

        let user = User::new(email);
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn upsert_system_wallet(
        &self,
        asset_type_id: Uuid,
        role: SystemWalletRole,
    ) -> Result<SystemWallet, StoreError> {
        let mut state = self.store.state.lock();
        if !state.assets.contains_key(&asset_type_id) {
            return Err(StoreError::ConstraintViolation(format!(
                "unknown asset type {asset_type_id}"
            )));
        }
        if let Some(existing) = state
            .system_wallets
            .values()
            .find(|w| w.asset_type_id == asset_type_id && w.role == role)
        {
            return Ok(existing.clone());
        }

        let wallet = SystemWallet::new(asset_type_id, role);
        state.system_wallets.insert(wallet.id, wallet.clone());
        Ok(wallet)
    }

    async fn upsert_wallet(
        &self,
        user_id: Uuid,
        asset_type_id: Uuid,
    ) -> Result<Wallet, StoreError> {
        let mut state = self.store.state.lock();
        if !state.users.contains_key(&user_id) {
            return Err(StoreError::ConstraintViolation(format!(
                "unknown user {user_id}"
            )));
        }
        if !state.assets.contains_key(&asset_type_id) {
            return Err(StoreError::ConstraintViolation(format!(
                "unknown asset type {asset_type_id}"
            )));
        }
        if let Some(existing) = state
            .wallets
            .values()
            .find(|w| w.user_id == user_id && w.asset_type_id == asset_type_id)
        {
            return Ok(existing.clone());
        }

        let wallet = Wallet::new(user_id, asset_type_id);
        state.wallets.insert(wallet.id, wallet.clone());
        Ok(wallet)
    }
}

struct MemoryUnitOfWork {
    store: MemoryStore,
    lock_timeout: Duration,
    guards: HashMap<Uuid, OwnedMutexGuard<()>>,
    claim: Option<(String, Transaction)>,
    wallet_deltas: HashMap<Uuid, i64>,
    system_deltas: HashMap<Uuid, i64>,
    entries: Vec<LedgerEntry>,
    finished: bool,
}

impl MemoryUnitOfWork {
    fn new(store: MemoryStore, lock_timeout: Duration) -> Self {
        Self {
            store,
            lock_timeout,
            guards: HashMap::new(),
            claim: None,
            wallet_deltas: HashMap::new(),
            system_deltas: HashMap::new(),
            entries: Vec::new(),
            finished: false,
        }
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.finished {
            return Err(StoreError::Finished);
        }
        Ok(())
    }

    /// Row locks are re-entrant within one unit, as in postgres.
    async fn acquire(&mut self, id: Uuid) -> Result<(), StoreError> {
        if self.guards.contains_key(&id) {
            return Ok(());
        }

        let lock = self.store.row_lock(id);
        let guard = tokio::time::timeout(self.lock_timeout, lock.lock_owned())
            .await
            .map_err(|_| StoreError::LockTimeout)?;
        self.guards.insert(id, guard);
        Ok(())
    }

    fn committed_wallet_balance(&self, id: Uuid) -> Result<i64, StoreError> {
        self.store
            .state
            .lock()
            .wallets
            .get(&id)
            .map(|w| w.cached_balance)
            .ok_or_else(|| StoreError::RowNotFound(format!("wallet {id}")))
    }

    fn committed_system_balance(&self, id: Uuid) -> Result<i64, StoreError> {
        self.store
            .state
            .lock()
            .system_wallets
            .get(&id)
            .map(|w| w.cached_balance)
            .ok_or_else(|| StoreError::RowNotFound(format!("system wallet {id}")))
    }

    fn staged(deltas: &HashMap<Uuid, i64>, id: Uuid) -> i64 {
        deltas.get(&id).copied().unwrap_or(0)
    }

    /// Drop the in-flight claim and every staged write, then free the locks.
    fn discard(&mut self) {
        if let Some((hash, _)) = self.claim.take() {
            self.store.state.lock().claims.remove(&hash);
        }
        self.wallet_deltas.clear();
        self.system_deltas.clear();
        self.entries.clear();
        self.guards.clear();
        self.finished = true;
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn insert_pending(
        &mut self,
        transaction: &Transaction,
    ) -> Result<InsertOutcome, StoreError> {
        self.ensure_open()?;
        let hash = hash_idempotency_key(&transaction.idempotency_key);

        if self.claim.as_ref().is_some_and(|(own, _)| *own == hash) {
            return Ok(InsertOutcome::Conflict);
        }

        let mut state = self.store.state.lock();
        if state.keys.contains_key(&hash) || state.claims.contains_key(&hash) {
            return Ok(InsertOutcome::Conflict);
        }
        state.claims.insert(hash.clone(), transaction.clone());
        drop(state);

        self.claim = Some((hash, transaction.clone()));
        Ok(InsertOutcome::Inserted)
    }

    async fn find_by_idempotency_key(
        &mut self,
        key: &str,
    ) -> Result<Option<Transaction>, StoreError> {
        self.ensure_open()?;
        let hash = hash_idempotency_key(key);

        if let Some((own, transaction)) = &self.claim {
            if *own == hash {
                return Ok(Some(transaction.clone()));
            }
        }

        let state = self.store.state.lock();
        Ok(state
            .committed_by_key(&hash)
            .or_else(|| state.claims.get(&hash).cloned()))
    }

    async fn find_wallet(&mut self, id: Uuid) -> Result<Option<Wallet>, StoreError> {
        self.ensure_open()?;
        let delta = Self::staged(&self.wallet_deltas, id);
        Ok(self.store.state.lock().wallets.get(&id).cloned().map(|mut w| {
            w.cached_balance += delta;
            w
        }))
    }

    async fn find_system_wallet(
        &mut self,
        asset_type_id: Uuid,
        role: SystemWalletRole,
    ) -> Result<Option<SystemWallet>, StoreError> {
        self.ensure_open()?;
        let found = self
            .store
            .state
            .lock()
            .system_wallets
            .values()
            .find(|w| w.asset_type_id == asset_type_id && w.role == role)
            .cloned();

        Ok(found.map(|mut w| {
            w.cached_balance += Self::staged(&self.system_deltas, w.id);
            w
        }))
    }

    async fn lock_wallet(&mut self, id: Uuid) -> Result<i64, StoreError> {
        self.ensure_open()?;
        self.committed_wallet_balance(id)?;
        self.acquire(id).await?;
        Ok(self.committed_wallet_balance(id)? + Self::staged(&self.wallet_deltas, id))
    }

    async fn lock_system_wallet(&mut self, id: Uuid) -> Result<i64, StoreError> {
        self.ensure_open()?;
        self.committed_system_balance(id)?;
        self.acquire(id).await?;
        Ok(self.committed_system_balance(id)? + Self::staged(&self.system_deltas, id))
    }

    async fn increment_wallet(&mut self, id: Uuid, delta: i64) -> Result<i64, StoreError> {
        let current = self.lock_wallet(id).await?;
        let next = current
            .checked_add(delta)
            .ok_or(StoreError::Overflow(id))?;
        if next < 0 {
            return Err(StoreError::ConstraintViolation(format!(
                "wallet {id} balance cannot go negative"
            )));
        }

        *self.wallet_deltas.entry(id).or_insert(0) += delta;
        Ok(next)
    }

    async fn increment_system_wallet(&mut self, id: Uuid, delta: i64) -> Result<i64, StoreError> {
        let current = self.lock_system_wallet(id).await?;
        let next = current
            .checked_add(delta)
            .ok_or(StoreError::Overflow(id))?;

        *self.system_deltas.entry(id).or_insert(0) += delta;
        Ok(next)
    }

    async fn insert_entries(&mut self, entries: &[LedgerEntry]) -> Result<(), StoreError> {
        self.ensure_open()?;
        if let Some(bad) = entries.iter().find(|entry| entry.amount <= 0) {
            return Err(StoreError::ConstraintViolation(format!(
                "entry {} amount must be positive",
                bad.id
            )));
        }

        self.entries.extend_from_slice(entries);
        Ok(())
    }

    async fn complete_transaction(
        &mut self,
        id: Uuid,
        result: &TransactionResult,
    ) -> Result<(), StoreError> {
        self.ensure_open()?;
        match &mut self.claim {
            Some((_, transaction))
                if transaction.id == id && transaction.status == TransactionStatus::Pending =>
            {
                transaction.status = TransactionStatus::Completed;
                transaction.response = Some(result.clone());
                Ok(())
            }
            _ => Err(StoreError::RowNotFound(format!("pending transaction {id}"))),
        }
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        self.ensure_open()?;
        let mut state = self.store.state.lock();

        // Resolve every new balance before touching anything, so a failed
        // commit leaves the committed state as it was.
        let mut wallet_updates = Vec::with_capacity(self.wallet_deltas.len());
        for (id, delta) in &self.wallet_deltas {
            let wallet = state
                .wallets
                .get(id)
                .ok_or_else(|| StoreError::RowNotFound(format!("wallet {id}")))?;
            let next = wallet
                .cached_balance
                .checked_add(*delta)
                .ok_or(StoreError::Overflow(*id))?;
            wallet_updates.push((*id, next));
        }

        let mut system_updates = Vec::with_capacity(self.system_deltas.len());
        for (id, delta) in &self.system_deltas {
            let wallet = state
                .system_wallets
                .get(id)
                .ok_or_else(|| StoreError::RowNotFound(format!("system wallet {id}")))?;
            let next = wallet
                .cached_balance
                .checked_add(*delta)
                .ok_or(StoreError::Overflow(*id))?;
            system_updates.push((*id, next));
        }

        for (id, balance) in wallet_updates {
            if let Some(wallet) = state.wallets.get_mut(&id) {
                wallet.cached_balance = balance;
            }
        }
        for (id, balance) in system_updates {
            if let Some(wallet) = state.system_wallets.get_mut(&id) {
                wallet.cached_balance = balance;
            }
        }

        if let Some((hash, transaction)) = self.claim.take() {
            state.claims.remove(&hash);
            state.keys.insert(hash, transaction.id);
            state.transactions.insert(transaction.id, transaction);
        }
        state.entries.append(&mut self.entries);
        drop(state);

        self.wallet_deltas.clear();
        self.system_deltas.clear();
        // Locks go last, once the new balances are visible.
        self.guards.clear();
        self.finished = true;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.discard();
        Ok(())
    }
}

impl Drop for MemoryUnitOfWork {
    fn drop(&mut self) {
        if !self.finished {
            self.discard();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Direction;
    use crate::transaction::TransactionType;
    use chrono::Duration as ChronoDuration;

    async fn seeded() -> (MemoryAdapter, Wallet, SystemWallet) {
        let adapter = MemoryAdapter::new().with_lock_timeout(Duration::from_millis(100));
        let asset = adapter.upsert_asset("Gold Coins", "GOLD").await.unwrap();
        let user = adapter.upsert_user("user1@test.com").await.unwrap();
        let wallet = adapter.upsert_wallet(user.id, asset.id).await.unwrap();
        let treasury = adapter
            .upsert_system_wallet(asset.id, SystemWalletRole::Treasury)
            .await
            .unwrap();
        (adapter, wallet, treasury)
    }

    #[tokio::test]
    async fn test_staged_writes_invisible_until_commit() {
        let (adapter, wallet, _) = seeded().await;

        let mut uow = adapter.begin().await.unwrap();
        assert_eq!(uow.increment_wallet(wallet.id, 500).await.unwrap(), 500);
        assert_eq!(
            adapter.get_wallet(wallet.id).await.unwrap().unwrap().cached_balance,
            0
        );

        uow.commit().await.unwrap();
        assert_eq!(
            adapter.get_wallet(wallet.id).await.unwrap().unwrap().cached_balance,
            500
        );
    }

    #[tokio::test]
    async fn test_dropped_unit_releases_claim_and_lock() {
        let (adapter, wallet, _) = seeded().await;
        let pending = Transaction::pending("drop-me", TransactionType::Topup);

        {
            let mut uow = adapter.begin().await.unwrap();
            assert_eq!(
                uow.insert_pending(&pending).await.unwrap(),
                InsertOutcome::Inserted
            );
            uow.lock_wallet(wallet.id).await.unwrap();
        }

        let mut next = adapter.begin().await.unwrap();
        assert_eq!(
            next.insert_pending(&Transaction::pending("drop-me", TransactionType::Topup))
                .await
                .unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(next.lock_wallet(wallet.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_in_flight_claim_conflicts_and_reads_pending() {
        let (adapter, _, _) = seeded().await;

        let mut first = adapter.begin().await.unwrap();
        first
            .insert_pending(&Transaction::pending("shared", TransactionType::Bonus))
            .await
            .unwrap();

        let mut second = adapter.begin().await.unwrap();
        assert_eq!(
            second
                .insert_pending(&Transaction::pending("shared", TransactionType::Bonus))
                .await
                .unwrap(),
            InsertOutcome::Conflict
        );
        let seen = second.find_by_idempotency_key("shared").await.unwrap().unwrap();
        assert_eq!(seen.status, TransactionStatus::Pending);
    }

    #[tokio::test]
    async fn test_row_lock_times_out() {
        let (adapter, wallet, _) = seeded().await;

        let mut holder = adapter.begin().await.unwrap();
        holder.lock_wallet(wallet.id).await.unwrap();

        let mut waiter = adapter.begin().await.unwrap();
        assert!(matches!(
            waiter.lock_wallet(wallet.id).await,
            Err(StoreError::LockTimeout)
        ));

        holder.rollback().await.unwrap();
        assert!(waiter.lock_wallet(wallet.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_wallet_cannot_go_negative() {
        let (adapter, wallet, treasury) = seeded().await;

        let mut uow = adapter.begin().await.unwrap();
        assert!(matches!(
            uow.increment_wallet(wallet.id, -1).await,
            Err(StoreError::ConstraintViolation(_))
        ));
        // System wallets may go negative.
        assert_eq!(
            uow.increment_system_wallet(treasury.id, -1).await.unwrap(),
            -1
        );
    }

    #[tokio::test]
    async fn test_finished_unit_rejects_work() {
        let (adapter, wallet, _) = seeded().await;

        let mut uow = adapter.begin().await.unwrap();
        uow.commit().await.unwrap();
        assert!(matches!(
            uow.lock_wallet(wallet.id).await,
            Err(StoreError::Finished)
        ));
        assert!(matches!(uow.commit().await, Err(StoreError::Finished)));
    }

    #[tokio::test]
    async fn test_upserts_are_idempotent() {
        let (adapter, wallet, treasury) = seeded().await;

        let asset = adapter.upsert_asset("Gold Coins", "GOLD").await.unwrap();
        assert_eq!(asset.id, wallet.asset_type_id);

        let again = adapter
            .upsert_system_wallet(asset.id, SystemWalletRole::Treasury)
            .await
            .unwrap();
        assert_eq!(again.id, treasury.id);

        let same_wallet = adapter
            .upsert_wallet(wallet.user_id, asset.id)
            .await
            .unwrap();
        assert_eq!(same_wallet.id, wallet.id);

        assert!(matches!(
            adapter.upsert_wallet(Uuid::now_v7(), asset.id).await,
            Err(StoreError::ConstraintViolation(_))
        ));
    }

    async fn commit_entries(adapter: &MemoryAdapter, key: &str, entries: Vec<LedgerEntry>) {
        let mut uow = adapter.begin().await.unwrap();
        let pending = Transaction::pending(key, TransactionType::Bonus);
        uow.insert_pending(&pending).await.unwrap();
        let entries: Vec<LedgerEntry> = entries
            .into_iter()
            .map(|entry| LedgerEntry {
                transaction_id: pending.id,
                ..entry
            })
            .collect();
        uow.insert_entries(&entries).await.unwrap();
        uow.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_listing_orders_by_creation_time() {
        let (adapter, wallet, treasury) = seeded().await;
        let other = adapter
            .upsert_wallet(
                adapter.upsert_user("user2@test.com").await.unwrap().id,
                wallet.asset_type_id,
            )
            .await
            .unwrap();

        let late =
            LedgerEntry::new(Uuid::nil(), EntryAccount::Wallet(wallet.id), Direction::Credit, 10);
        commit_entries(&adapter, "late", vec![late.clone()]).await;

        // Committed after `late` but stamped an hour earlier.
        let mut early =
            LedgerEntry::new(Uuid::nil(), EntryAccount::Wallet(wallet.id), Direction::Credit, 20);
        early.created_at = late.created_at - ChronoDuration::hours(1);
        let system =
            LedgerEntry::new(Uuid::nil(), EntryAccount::System(treasury.id), Direction::Debit, 20);
        let foreign =
            LedgerEntry::new(Uuid::nil(), EntryAccount::Wallet(other.id), Direction::Credit, 5);
        commit_entries(&adapter, "early", vec![early.clone(), system.clone(), foreign.clone()])
            .await;

        let page = adapter.list_wallet_entries(wallet.id, None, 10).await.unwrap();
        let ids: Vec<Uuid> = page.iter().map(|entry| entry.id).collect();
        assert_eq!(ids, vec![late.id, early.id]);

        let rest = adapter
            .list_wallet_entries(wallet.id, Some(late.id), 10)
            .await
            .unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id, early.id);

        // Cursors that are not this wallet's entries select nothing.
        for cursor in [system.id, foreign.id, Uuid::now_v7()] {
            assert!(
                adapter
                    .list_wallet_entries(wallet.id, Some(cursor), 10)
                    .await
                    .unwrap()
                    .is_empty()
            );
        }
    }

    #[tokio::test]
    async fn test_lock_timeout_follows_config() {
        let config = LedgerConfig {
            lock_timeout: Duration::from_millis(20),
            ..LedgerConfig::default()
        };
        let adapter = MemoryAdapter::from_config(&config);
        assert_eq!(adapter.lock_timeout, Duration::from_millis(20));
        assert_eq!(MemoryAdapter::new().lock_timeout, LedgerConfig::default().lock_timeout);
    }
}
