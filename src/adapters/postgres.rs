// src/adapters/postgres.rs
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{Postgres, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::asset::{AssetSummary, AssetType};
use crate::config::LedgerConfig;
use crate::entry::{EntryAccount, LedgerEntry, LedgerEntryView};
use crate::error::StoreError;
use crate::store::{InsertOutcome, LedgerStore, UnitOfWork, hash_idempotency_key};
use crate::transaction::{Transaction, TransactionResult};
use crate::wallet::{SystemWallet, SystemWalletRole, User, Wallet, WalletBalance};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS ledger_asset_types (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        symbol TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS ledger_users (
        id UUID PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS ledger_wallets (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL REFERENCES ledger_users(id),
        asset_type_id UUID NOT NULL REFERENCES ledger_asset_types(id),
        cached_balance BIGINT NOT NULL DEFAULT 0 CHECK (cached_balance >= 0),
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        UNIQUE (user_id, asset_type_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS ledger_system_wallets (
        id UUID PRIMARY KEY,
        asset_type_id UUID NOT NULL REFERENCES ledger_asset_types(id),
        role TEXT NOT NULL CHECK (role IN ('TREASURY', 'REVENUE')),
        cached_balance BIGINT NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        UNIQUE (asset_type_id, role)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS ledger_transactions (
        id UUID PRIMARY KEY,
        idempotency_key TEXT NOT NULL,
        idempotency_hash TEXT NOT NULL UNIQUE,
        type TEXT NOT NULL CHECK (type IN ('TOPUP', 'BONUS', 'SPEND')),
        status TEXT NOT NULL CHECK (status IN ('PENDING', 'COMPLETED', 'FAILED')),
        response JSONB,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        CHECK (status <> 'COMPLETED' OR response IS NOT NULL)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS ledger_entries (
        id UUID PRIMARY KEY,
        transaction_id UUID NOT NULL REFERENCES ledger_transactions(id),
        wallet_id UUID REFERENCES ledger_wallets(id),
        system_wallet_id UUID REFERENCES ledger_system_wallets(id),
        direction TEXT NOT NULL CHECK (direction IN ('DEBIT', 'CREDIT')),
        amount BIGINT NOT NULL CHECK (amount > 0),
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        CHECK ((wallet_id IS NULL) <> (system_wallet_id IS NULL))
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_ledger_entries_wallet
    ON ledger_entries(wallet_id, created_at DESC, id DESC)
    WHERE wallet_id IS NOT NULL
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_ledger_entries_transaction
    ON ledger_entries(transaction_id)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_ledger_wallets_user
    ON ledger_wallets(user_id)
    "#,
];

const TRANSACTION_COLUMNS: &str = "id, idempotency_key, type, status, response, created_at";
const WALLET_COLUMNS: &str = "id, user_id, asset_type_id, cached_balance, created_at";
const SYSTEM_WALLET_COLUMNS: &str = "id, asset_type_id, role, cached_balance, created_at";
const ENTRY_COLUMNS: &str =
    "id, transaction_id, wallet_id, system_wallet_id, direction, amount, created_at";

/// Ledger store on a Postgres pool.
///
/// Every unit of work is one database transaction with `lock_timeout` and
/// `statement_timeout` scoped to it.
#[derive(Clone)]
pub struct PostgresAdapter {
    pool: PgPool,
    lock_timeout: Duration,
    statement_timeout: Duration,
}

impl PostgresAdapter {
    pub fn from_pool(pool: PgPool) -> Self {
        let defaults = LedgerConfig::default();
        Self {
            pool,
            lock_timeout: defaults.lock_timeout,
            statement_timeout: defaults.statement_timeout,
        }
    }

    pub async fn connect(config: &LedgerConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.database_url)
            .await?;

        info!(max_connections = config.max_connections, "connected to postgres");

        Ok(Self::from_pool(pool).with_timeouts(config.lock_timeout, config.statement_timeout))
    }

    pub fn with_timeouts(mut self, lock_timeout: Duration, statement_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self.statement_timeout = statement_timeout;
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Create the ledger tables and indexes if they do not exist.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for statement in SCHEMA {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;

        debug!("ledger schema ready");
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for PostgresAdapter {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "SELECT set_config('lock_timeout', $1, true), set_config('statement_timeout', $2, true)",
        )
        .bind(format!("{}ms", self.lock_timeout.as_millis()))
        .bind(format!("{}ms", self.statement_timeout.as_millis()))
        .execute(&mut *tx)
        .await?;

        Ok(Box::new(PostgresUnitOfWork { tx: Some(tx) }))
    }

    async fn get_transaction(&self, id: Uuid) -> Result<Option<Transaction>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM ledger_transactions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(transaction_from_row).transpose()
    }

    async fn get_transaction_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<Transaction>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM ledger_transactions WHERE idempotency_hash = $1"
        ))
        .bind(hash_idempotency_key(key))
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(transaction_from_row).transpose()
    }

    async fn transaction_entries(
        &self,
        transaction_id: Uuid,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE transaction_id = $1 ORDER BY id"
        ))
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(entry_from_row).collect()
    }

    async fn get_wallet(&self, id: Uuid) -> Result<Option<Wallet>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {WALLET_COLUMNS} FROM ledger_wallets WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(wallet_from_row).transpose()
    }

    async fn get_system_wallet(
        &self,
        asset_type_id: Uuid,
        role: SystemWalletRole,
    ) -> Result<Option<SystemWallet>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {SYSTEM_WALLET_COLUMNS} FROM ledger_system_wallets
             WHERE asset_type_id = $1 AND role = $2"
        ))
        .bind(asset_type_id)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(system_wallet_from_row).transpose()
    }

    async fn list_wallets(&self, user_id: Uuid) -> Result<Vec<WalletBalance>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT w.id, w.user_id, w.cached_balance,
                   a.id AS asset_id, a.name AS asset_name, a.symbol AS asset_symbol
            FROM ledger_wallets w
            JOIN ledger_asset_types a ON a.id = w.asset_type_id
            WHERE w.user_id = $1
            ORDER BY w.created_at, w.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(WalletBalance {
                    wallet_id: row.try_get("id")?,
                    user_id: row.try_get("user_id")?,
                    asset: AssetSummary {
                        id: row.try_get("asset_id")?,
                        name: row.try_get("asset_name")?,
                        symbol: row.try_get("asset_symbol")?,
                    },
                    balance: row.try_get::<i64, _>("cached_balance")?.to_string(),
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
        // A cursor that is unknown or belongs to another wallet compares
        // against NULL and yields an empty page.
        let rows = sqlx::query(
            r#"
            SELECT e.id, e.transaction_id, e.wallet_id, e.direction, e.amount,
                   e.created_at, t.type
            FROM ledger_entries e
            JOIN ledger_transactions t ON t.id = e.transaction_id
            WHERE e.wallet_id = $1
              AND ($2::uuid IS NULL OR (e.created_at, e.id) < (
                  SELECT c.created_at, c.id FROM ledger_entries c
                  WHERE c.id = $2 AND c.wallet_id = $1
              ))
            ORDER BY e.created_at DESC, e.id DESC
            LIMIT $3
            "#,
        )
        .bind(wallet_id)
        .bind(cursor)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(LedgerEntryView {
                    id: row.try_get("id")?,
                    transaction_id: row.try_get("transaction_id")?,
                    wallet_id: row.try_get("wallet_id")?,
                    direction: row.try_get::<String, _>("direction")?.parse()?,
                    amount: row.try_get("amount")?,
                    kind: row.try_get::<String, _>("type")?.parse()?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    async fn upsert_asset(&self, name: &str, symbol: &str) -> Result<AssetType, StoreError> {
        let asset = AssetType::new(name, symbol);
        let row = sqlx::query(
            r#"
            INSERT INTO ledger_asset_types (id, name, symbol, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, name, symbol, created_at
            "#,
        )
        .bind(asset.id)
        .bind(&asset.name)
        .bind(&asset.symbol)
        .bind(asset.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(AssetType {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            symbol: row.try_get("symbol")?,
            created_at: row.try_get("created_at")?,
        })
    }

    async fn upsert_user(&self, email: &str) -> Result<User, StoreError> {
        let user = User::new(email);
        let row = sqlx::query(
            r#"
            INSERT INTO ledger_users (id, email, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
            RETURNING id, email, created_at
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(User {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            created_at: row.try_get("created_at")?,
        })
    }

    async fn upsert_system_wallet(
        &self,
        asset_type_id: Uuid,
        role: SystemWalletRole,
    ) -> Result<SystemWallet, StoreError> {
        let wallet = SystemWallet::new(asset_type_id, role);
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO ledger_system_wallets (id, asset_type_id, role, cached_balance, created_at)
            VALUES ($1, $2, $3, 0, $4)
            ON CONFLICT (asset_type_id, role) DO UPDATE SET role = EXCLUDED.role
            RETURNING {SYSTEM_WALLET_COLUMNS}
            "#
        ))
        .bind(wallet.id)
        .bind(asset_type_id)
        .bind(role.as_str())
        .bind(wallet.created_at)
        .fetch_one(&self.pool)
        .await?;

        system_wallet_from_row(&row)
    }

    async fn upsert_wallet(
        &self,
        user_id: Uuid,
        asset_type_id: Uuid,
    ) -> Result<Wallet, StoreError> {
        let wallet = Wallet::new(user_id, asset_type_id);
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO ledger_wallets (id, user_id, asset_type_id, cached_balance, created_at)
            VALUES ($1, $2, $3, 0, $4)
            ON CONFLICT (user_id, asset_type_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING {WALLET_COLUMNS}
            "#
        ))
        .bind(wallet.id)
        .bind(user_id)
        .bind(asset_type_id)
        .bind(wallet.created_at)
        .fetch_one(&self.pool)
        .await?;

        wallet_from_row(&row)
    }
}

/// One database transaction. Dropping it unfinished rolls back.
struct PostgresUnitOfWork {
    tx: Option<sqlx::Transaction<'static, Postgres>>,
}

impl PostgresUnitOfWork {
    fn tx(&mut self) -> Result<&mut sqlx::Transaction<'static, Postgres>, StoreError> {
        self.tx.as_mut().ok_or(StoreError::Finished)
    }
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    async fn insert_pending(
        &mut self,
        transaction: &Transaction,
    ) -> Result<InsertOutcome, StoreError> {
        let tx = self.tx()?;

        // A key claimed by another open unit blocks this insert until that
        // unit ends; the savepoint keeps a lock timeout here recoverable.
        sqlx::query("SAVEPOINT idempotency_claim")
            .execute(&mut **tx)
            .await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO ledger_transactions
                (id, idempotency_key, idempotency_hash, type, status, response, created_at)
            VALUES ($1, $2, $3, $4, $5, NULL, $6)
            ON CONFLICT (idempotency_hash) DO NOTHING
            "#,
        )
        .bind(transaction.id)
        .bind(&transaction.idempotency_key)
        .bind(hash_idempotency_key(&transaction.idempotency_key))
        .bind(transaction.kind.as_str())
        .bind(transaction.status.as_str())
        .bind(transaction.created_at)
        .execute(&mut **tx)
        .await
        .map_err(StoreError::from);

        match inserted {
            Ok(result) => {
                sqlx::query("RELEASE SAVEPOINT idempotency_claim")
                    .execute(&mut **tx)
                    .await?;
                if result.rows_affected() == 0 {
                    Ok(InsertOutcome::Conflict)
                } else {
                    Ok(InsertOutcome::Inserted)
                }
            }
            Err(StoreError::LockTimeout) => {
                sqlx::query("ROLLBACK TO SAVEPOINT idempotency_claim")
                    .execute(&mut **tx)
                    .await?;
                Ok(InsertOutcome::Conflict)
            }
            Err(err) => Err(err),
        }
    }

    async fn find_by_idempotency_key(
        &mut self,
        key: &str,
    ) -> Result<Option<Transaction>, StoreError> {
        let tx = self.tx()?;
        let row = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM ledger_transactions WHERE idempotency_hash = $1"
        ))
        .bind(hash_idempotency_key(key))
        .fetch_optional(&mut **tx)
        .await?;

        row.as_ref().map(transaction_from_row).transpose()
    }

    async fn find_wallet(&mut self, id: Uuid) -> Result<Option<Wallet>, StoreError> {
        let tx = self.tx()?;
        let row = sqlx::query(&format!(
            "SELECT {WALLET_COLUMNS} FROM ledger_wallets WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        row.as_ref().map(wallet_from_row).transpose()
    }

    async fn find_system_wallet(
        &mut self,
        asset_type_id: Uuid,
        role: SystemWalletRole,
    ) -> Result<Option<SystemWallet>, StoreError> {
        let tx = self.tx()?;
        let row = sqlx::query(&format!(
            "SELECT {SYSTEM_WALLET_COLUMNS} FROM ledger_system_wallets
             WHERE asset_type_id = $1 AND role = $2"
        ))
        .bind(asset_type_id)
        .bind(role.as_str())
        .fetch_optional(&mut **tx)
        .await?;

        row.as_ref().map(system_wallet_from_row).transpose()
    }

    async fn lock_wallet(&mut self, id: Uuid) -> Result<i64, StoreError> {
        let tx = self.tx()?;
        sqlx::query_scalar::<_, i64>(
            "SELECT cached_balance FROM ledger_wallets WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| StoreError::RowNotFound(format!("wallet {id}")))
    }

    async fn lock_system_wallet(&mut self, id: Uuid) -> Result<i64, StoreError> {
        let tx = self.tx()?;
        sqlx::query_scalar::<_, i64>(
            "SELECT cached_balance FROM ledger_system_wallets WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| StoreError::RowNotFound(format!("system wallet {id}")))
    }

    async fn increment_wallet(&mut self, id: Uuid, delta: i64) -> Result<i64, StoreError> {
        let tx = self.tx()?;
        sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE ledger_wallets SET cached_balance = cached_balance + $2
            WHERE id = $1
            RETURNING cached_balance
            "#,
        )
        .bind(id)
        .bind(delta)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|err| overflow_or(err, id))?
        .ok_or_else(|| StoreError::RowNotFound(format!("wallet {id}")))
    }

    async fn increment_system_wallet(&mut self, id: Uuid, delta: i64) -> Result<i64, StoreError> {
        let tx = self.tx()?;
        sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE ledger_system_wallets SET cached_balance = cached_balance + $2
            WHERE id = $1
            RETURNING cached_balance
            "#,
        )
        .bind(id)
        .bind(delta)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|err| overflow_or(err, id))?
        .ok_or_else(|| StoreError::RowNotFound(format!("system wallet {id}")))
    }

    async fn insert_entries(&mut self, entries: &[LedgerEntry]) -> Result<(), StoreError> {
        let tx = self.tx()?;
        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO ledger_entries
                    (id, transaction_id, wallet_id, system_wallet_id, direction, amount, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(entry.id)
            .bind(entry.transaction_id)
            .bind(entry.account.wallet_id())
            .bind(entry.account.system_wallet_id())
            .bind(entry.direction.as_str())
            .bind(entry.amount)
            .bind(entry.created_at)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    async fn complete_transaction(
        &mut self,
        id: Uuid,
        result: &TransactionResult,
    ) -> Result<(), StoreError> {
        let tx = self.tx()?;
        let updated = sqlx::query(
            r#"
            UPDATE ledger_transactions SET status = 'COMPLETED', response = $2
            WHERE id = $1 AND status = 'PENDING'
            "#,
        )
        .bind(id)
        .bind(Json(result.clone()))
        .execute(&mut **tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::RowNotFound(format!("pending transaction {id}")));
        }
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        let tx = self.tx.take().ok_or(StoreError::Finished)?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        let tx = self.tx.take().ok_or(StoreError::Finished)?;
        tx.rollback().await?;
        Ok(())
    }
}

/// 22003 is numeric_value_out_of_range: the BIGINT add overflowed.
fn overflow_or(err: sqlx::Error, id: Uuid) -> StoreError {
    let overflowed = err
        .as_database_error()
        .and_then(|db_err| db_err.code())
        .is_some_and(|code| code == "22003");
    if overflowed {
        StoreError::Overflow(id)
    } else {
        StoreError::from(err)
    }
}

fn transaction_from_row(row: &PgRow) -> Result<Transaction, StoreError> {
    let response: Option<Json<TransactionResult>> = row.try_get("response")?;
    Ok(Transaction {
        id: row.try_get("id")?,
        idempotency_key: row.try_get("idempotency_key")?,
        kind: row.try_get::<String, _>("type")?.parse()?,
        status: row.try_get::<String, _>("status")?.parse()?,
        response: response.map(|json| json.0),
        created_at: row.try_get("created_at")?,
    })
}

fn wallet_from_row(row: &PgRow) -> Result<Wallet, StoreError> {
    Ok(Wallet {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        asset_type_id: row.try_get("asset_type_id")?,
        cached_balance: row.try_get("cached_balance")?,
        created_at: row.try_get("created_at")?,
    })
}

fn system_wallet_from_row(row: &PgRow) -> Result<SystemWallet, StoreError> {
    Ok(SystemWallet {
        id: row.try_get("id")?,
        asset_type_id: row.try_get("asset_type_id")?,
        role: row.try_get::<String, _>("role")?.parse()?,
        cached_balance: row.try_get("cached_balance")?,
        created_at: row.try_get("created_at")?,
    })
}

fn entry_from_row(row: &PgRow) -> Result<LedgerEntry, StoreError> {
    Ok(LedgerEntry {
        id: row.try_get("id")?,
        transaction_id: row.try_get("transaction_id")?,
        account: EntryAccount::from_columns(
            row.try_get("wallet_id")?,
            row.try_get("system_wallet_id")?,
        )?,
        direction: row.try_get::<String, _>("direction")?.parse()?,
        amount: row.try_get("amount")?,
        created_at: row.try_get("created_at")?,
    })
}
