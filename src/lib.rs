//! Double-entry wallet ledger.
//!
//! Every top-up, bonus and spend runs as one atomic unit: the idempotency
//! key is claimed, the user wallet and its system counterpart are locked in
//! a fixed order, the balance is checked under the lock, and a DEBIT/CREDIT
//! entry pair is written alongside the cached balances.
//!
//! ```no_run
//! use std::sync::Arc;
//! use wallet_ledger::{MemoryAdapter, TransactionEngine};
//!
//! # async fn run(wallet_id: uuid::Uuid) -> Result<(), wallet_ledger::LedgerError> {
//! let engine = TransactionEngine::new(Arc::new(MemoryAdapter::new()));
//! let result = engine.topup(wallet_id, 100, "order-42").await?;
//! println!("{} -> {}", result.transaction_id, result.balance);
//! # Ok(())
//! # }
//! ```

pub mod adapters;
mod asset;
mod bootstrap;
mod config;
mod engine;
mod entry;
mod error;
mod idempotency;
mod locks;
mod movement;
mod store;
mod transaction;
mod wallet;
mod writer;

pub use adapters::{MemoryAdapter, PostgresAdapter};
pub use asset::{AssetSummary, AssetType};
pub use bootstrap::{AssetSpec, BootstrapPlan, BootstrapReport, bootstrap, opening_balance_key};
pub use config::{ConfigError, LedgerConfig};
pub use engine::TransactionEngine;
pub use entry::{Direction, EntryAccount, EntryPage, LedgerEntry, LedgerEntryView};
pub use error::{ErrorKind, LedgerError, StoreError};
pub use store::{InsertOutcome, LedgerStore, UnitOfWork};
pub use transaction::{
    Transaction, TransactionRequest, TransactionResult, TransactionStatus, TransactionType,
};
pub use wallet::{SystemWallet, SystemWalletRole, User, Wallet, WalletBalance};
