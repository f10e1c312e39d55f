// src/error.rs
use thiserror::Error;
use uuid::Uuid;

use crate::wallet::SystemWalletRole;

/// SQLSTATE codes the postgres adapter classifies.
const PG_UNIQUE_VIOLATION: &str = "23505";
const PG_FOREIGN_KEY_VIOLATION: &str = "23503";
const PG_CHECK_VIOLATION: &str = "23514";
const PG_LOCK_NOT_AVAILABLE: &str = "55P03";
const PG_QUERY_CANCELED: &str = "57014";

/// Stable, machine-readable error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    WalletNotFound,
    SystemWalletMissing,
    InsufficientFunds,
    DuplicateInProgress,
    TransactionNotFound,
    InvalidRequest,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WalletNotFound => "WALLET_NOT_FOUND",
            Self::SystemWalletMissing => "SYSTEM_WALLET_MISSING",
            Self::InsufficientFunds => "INSUFFICIENT_FUNDS",
            Self::DuplicateInProgress => "DUPLICATE_IN_PROGRESS",
            Self::TransactionNotFound => "TRANSACTION_NOT_FOUND",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::Internal => "INTERNAL",
        }
    }

    /// HTTP-equivalent status for transports that need one.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::WalletNotFound | Self::TransactionNotFound => 404,
            Self::DuplicateInProgress => 409,
            Self::InsufficientFunds => 422,
            Self::InvalidRequest => 400,
            Self::SystemWalletMissing | Self::Internal => 500,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures raised by a [`LedgerStore`](crate::LedgerStore) implementation.
///
/// Store-specific codes are folded into these variants at the adapter
/// boundary, so nothing above the adapters inspects SQLSTATEs.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("constraint violated: {0}")]
    ConstraintViolation(String),

    #[error("lock wait timed out")]
    LockTimeout,

    #[error("row not found: {0}")]
    RowNotFound(String),

    #[error("balance overflow on {0}")]
    Overflow(Uuid),

    #[error("unit of work already finished")]
    Finished,

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl StoreError {
    /// Whether retrying the same request later can reasonably succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::LockTimeout => true,
            Self::Database(err) => matches!(
                err,
                sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::PoolClosed
            ),
            _ => false,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let (code, constraint) = match err.as_database_error() {
            Some(db_err) => (
                db_err.code().map(|code| code.into_owned()),
                db_err.constraint().unwrap_or("unknown").to_string(),
            ),
            None => return Self::Database(err),
        };

        match code.as_deref() {
            Some(PG_UNIQUE_VIOLATION)
            | Some(PG_CHECK_VIOLATION)
            | Some(PG_FOREIGN_KEY_VIOLATION) => Self::ConstraintViolation(constraint),
            Some(PG_LOCK_NOT_AVAILABLE) | Some(PG_QUERY_CANCELED) => Self::LockTimeout,
            _ => Self::Database(err),
        }
    }
}

/// Errors surfaced by the transaction engine.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Wallet not found: {0}")]
    WalletNotFound(Uuid),

    #[error("{role} wallet missing for asset {asset_type_id}")]
    SystemWalletMissing {
        asset_type_id: Uuid,
        role: SystemWalletRole,
    },

    #[error("Insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: u64, available: i64 },

    #[error("Duplicate request in progress, retry shortly")]
    DuplicateInProgress,

    #[error("Transaction not found: {0}")]
    TransactionNotFound(Uuid),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::WalletNotFound(_) => ErrorKind::WalletNotFound,
            Self::SystemWalletMissing { .. } => ErrorKind::SystemWalletMissing,
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Self::DuplicateInProgress => ErrorKind::DuplicateInProgress,
            Self::TransactionNotFound(_) => ErrorKind::TransactionNotFound,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::Store(_) => ErrorKind::Internal,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Domain rejections are expected outcomes; everything else is a fault.
    pub fn is_domain(&self) -> bool {
        !matches!(self, Self::Store(_))
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::DuplicateInProgress => true,
            Self::Store(err) => err.is_transient(),
            _ => false,
        }
    }
}
