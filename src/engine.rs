// src/engine.rs
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::{LedgerConfig, PAGE_SIZE_CEILING};
use crate::entry::{EntryPage, LedgerEntry};
use crate::error::LedgerError;
use crate::idempotency::{self, Claim};
use crate::locks;
use crate::movement::Movement;
use crate::store::{LedgerStore, UnitOfWork};
use crate::transaction::{Transaction, TransactionRequest, TransactionResult};
use crate::wallet::{Wallet, WalletBalance};
use crate::writer;

enum Outcome {
    Executed(TransactionResult),
    Replayed(TransactionResult),
}

/// Executes top-ups, bonuses and spends as single atomic units against a
/// [`LedgerStore`], and serves the read side of the ledger.
#[derive(Clone)]
pub struct TransactionEngine {
    store: Arc<dyn LedgerStore>,
    default_page_size: usize,
    max_page_size: usize,
}

impl TransactionEngine {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self::with_config(store, &LedgerConfig::default())
    }

    pub fn with_config(store: Arc<dyn LedgerStore>, config: &LedgerConfig) -> Self {
        Self {
            store,
            default_page_size: config.default_page_size.clamp(1, PAGE_SIZE_CEILING),
            max_page_size: config.max_page_size.clamp(1, PAGE_SIZE_CEILING),
        }
    }

    pub fn store(&self) -> &dyn LedgerStore {
        self.store.as_ref()
    }

    /// Run one request to completion: claim the idempotency key, lock the
    /// wallet pair, validate, write the double-entry pair, commit.
    ///
    /// Any failure rolls the whole unit back, including the PENDING claim,
    /// so the key stays free. A key that already completed returns its
    /// stored result without writing anything.
    #[instrument(
        skip(self, request),
        fields(kind = %request.kind, wallet_id = %request.wallet_id, amount = request.amount)
    )]
    pub async fn execute(
        &self,
        request: TransactionRequest,
    ) -> Result<TransactionResult, LedgerError> {
        let started = Instant::now();
        let kind = request.kind.as_str();

        let outcome = match request.validate() {
            Ok(()) => self.execute_unit(&request).await,
            Err(err) => Err(err),
        };

        let status = match &outcome {
            Ok(Outcome::Executed(_)) => "completed",
            Ok(Outcome::Replayed(_)) => "replayed",
            Err(err) if err.is_domain() => "rejected",
            Err(_) => "failed",
        };
        counter!("ledger.transactions.total", "type" => kind, "status" => status).increment(1);
        histogram!("ledger.transaction.duration_ms", "type" => kind)
            .record(started.elapsed().as_secs_f64() * 1000.0);

        match outcome {
            Ok(Outcome::Executed(result)) => {
                histogram!("ledger.transaction.amount", "type" => kind).record(request.amount as f64);
                info!(
                    transaction_id = %result.transaction_id,
                    balance = %result.balance,
                    "transaction committed"
                );
                Ok(result)
            }
            Ok(Outcome::Replayed(result)) => {
                debug!(transaction_id = %result.transaction_id, "idempotent replay");
                Ok(result)
            }
            Err(err) => {
                warn!(error = %err, kind = %err.kind(), "transaction rejected");
                Err(err)
            }
        }
    }

    pub async fn topup(
        &self,
        wallet_id: Uuid,
        amount: u64,
        idempotency_key: impl Into<String>,
    ) -> Result<TransactionResult, LedgerError> {
        self.execute(TransactionRequest::topup(wallet_id, amount, idempotency_key))
            .await
    }

    pub async fn bonus(
        &self,
        wallet_id: Uuid,
        amount: u64,
        idempotency_key: impl Into<String>,
    ) -> Result<TransactionResult, LedgerError> {
        self.execute(TransactionRequest::bonus(wallet_id, amount, idempotency_key))
            .await
    }

    pub async fn spend(
        &self,
        wallet_id: Uuid,
        amount: u64,
        idempotency_key: impl Into<String>,
    ) -> Result<TransactionResult, LedgerError> {
        self.execute(TransactionRequest::spend(wallet_id, amount, idempotency_key))
            .await
    }

    async fn execute_unit(&self, request: &TransactionRequest) -> Result<Outcome, LedgerError> {
        let mut uow = self.store.begin().await?;

        match Self::run(uow.as_mut(), request).await {
            Ok(Outcome::Executed(result)) => {
                // A failed commit leaves nothing behind; the store discards the unit.
                uow.commit().await?;
                Ok(Outcome::Executed(result))
            }
            Ok(Outcome::Replayed(result)) => {
                Self::release(uow.as_mut()).await;
                Ok(Outcome::Replayed(result))
            }
            Err(err) => {
                Self::release(uow.as_mut()).await;
                Err(err)
            }
        }
    }

    async fn run(
        uow: &mut dyn UnitOfWork,
        request: &TransactionRequest,
    ) -> Result<Outcome, LedgerError> {
        let transaction =
            match idempotency::claim(uow, &request.idempotency_key, request.kind).await? {
                Claim::Fresh(transaction) => transaction,
                Claim::Replay(result) => return Ok(Outcome::Replayed(result)),
            };

        let movement = Movement::plan(request.kind, request.amount)?;

        let wallet = uow
            .find_wallet(request.wallet_id)
            .await?
            .ok_or(LedgerError::WalletNotFound(request.wallet_id))?;

        let system_wallet = uow
            .find_system_wallet(wallet.asset_type_id, movement.counterpart)
            .await?
            .ok_or(LedgerError::SystemWalletMissing {
                asset_type_id: wallet.asset_type_id,
                role: movement.counterpart,
            })?;

        let locked = locks::lock_pair(uow, wallet.id, system_wallet.id).await?;

        // Checked under the lock; this is the double-spend guard.
        movement.ensure_covered(locked.user_balance)?;

        let result = writer::apply(uow, &transaction, &locked, &movement).await?;
        Ok(Outcome::Executed(result))
    }

    async fn release(uow: &mut dyn UnitOfWork) {
        if let Err(err) = uow.rollback().await {
            warn!(error = %err, "rollback failed");
        }
    }

    // READ OPERATIONS

    pub async fn get_transaction(&self, id: Uuid) -> Result<Transaction, LedgerError> {
        self.store
            .get_transaction(id)
            .await?
            .ok_or(LedgerError::TransactionNotFound(id))
    }

    pub async fn get_transaction_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<Transaction>, LedgerError> {
        Ok(self.store.get_transaction_by_idempotency_key(key).await?)
    }

    pub async fn transaction_entries(&self, id: Uuid) -> Result<Vec<LedgerEntry>, LedgerError> {
        let transaction = self.get_transaction(id).await?;
        Ok(self.store.transaction_entries(transaction.id).await?)
    }

    pub async fn get_wallet(&self, id: Uuid) -> Result<Wallet, LedgerError> {
        self.store
            .get_wallet(id)
            .await?
            .ok_or(LedgerError::WalletNotFound(id))
    }

    pub async fn list_wallets(&self, user_id: Uuid) -> Result<Vec<WalletBalance>, LedgerError> {
        Ok(self.store.list_wallets(user_id).await?)
    }

    /// Newest-first page of a wallet's entries. Pass the previous page's
    /// `next_cursor` to continue.
    #[instrument(skip(self))]
    pub async fn wallet_ledger(
        &self,
        wallet_id: Uuid,
        cursor: Option<Uuid>,
        limit: Option<usize>,
    ) -> Result<EntryPage, LedgerError> {
        let wallet = self.get_wallet(wallet_id).await?;
        let limit = limit
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size);

        let probe = self
            .store
            .list_wallet_entries(wallet.id, cursor, limit.saturating_add(1))
            .await?;

        Ok(EntryPage::from_probe(probe, limit))
    }
}
