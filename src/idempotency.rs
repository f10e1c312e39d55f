// src/idempotency.rs
use tracing::debug;

use crate::error::{LedgerError, StoreError};
use crate::store::{InsertOutcome, UnitOfWork};
use crate::transaction::{Transaction, TransactionResult, TransactionStatus, TransactionType};

/// What the caller should do after claiming a key.
#[derive(Debug)]
pub enum Claim {
    /// The key was free; a PENDING row now exists inside the unit.
    Fresh(Transaction),
    /// The key already completed; return the stored snapshot.
    Replay(TransactionResult),
}

/// Insert a PENDING transaction for `key`, or resolve the existing owner.
///
/// PENDING and FAILED owners both reject with `DuplicateInProgress`. Failed
/// attempts normally leave no row at all, since the unit rolls back.
pub async fn claim(
    uow: &mut dyn UnitOfWork,
    key: &str,
    kind: TransactionType,
) -> Result<Claim, LedgerError> {
    let transaction = Transaction::pending(key, kind);

    match uow.insert_pending(&transaction).await? {
        InsertOutcome::Inserted => {
            debug!(transaction_id = %transaction.id, "idempotency key claimed");
            Ok(Claim::Fresh(transaction))
        }
        InsertOutcome::Conflict => {
            let existing = uow.find_by_idempotency_key(key).await?;
            resolve_existing(existing)
        }
    }
}

fn resolve_existing(existing: Option<Transaction>) -> Result<Claim, LedgerError> {
    let Some(existing) = existing else {
        // The owner vanished between the insert and the read.
        return Err(LedgerError::DuplicateInProgress);
    };

    match (existing.status, existing.response) {
        (TransactionStatus::Completed, Some(response)) => {
            debug!(transaction_id = %existing.id, "replaying completed transaction");
            Ok(Claim::Replay(response))
        }
        (TransactionStatus::Completed, None) => Err(LedgerError::Store(StoreError::Corrupt(
            format!("completed transaction {} has no response", existing.id),
        ))),
        (TransactionStatus::Pending | TransactionStatus::Failed, _) => {
            Err(LedgerError::DuplicateInProgress)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_status(status: TransactionStatus, response: Option<TransactionResult>) -> Transaction {
        let mut tx = Transaction::pending("key", TransactionType::Topup);
        tx.status = status;
        tx.response = response;
        tx
    }

    #[test]
    fn test_completed_owner_replays_snapshot() {
        let snapshot = TransactionResult {
            transaction_id: "0192".to_string(),
            balance: "1050".to_string(),
        };
        let existing = with_status(TransactionStatus::Completed, Some(snapshot.clone()));

        match resolve_existing(Some(existing)).unwrap() {
            Claim::Replay(result) => assert_eq!(result, snapshot),
            other => panic!("expected replay, got {:?}", other),
        }
    }

    #[test]
    fn test_pending_and_failed_owners_conflict() {
        for status in [TransactionStatus::Pending, TransactionStatus::Failed] {
            let result = resolve_existing(Some(with_status(status, None)));
            assert!(matches!(result, Err(LedgerError::DuplicateInProgress)));
        }
    }

    #[test]
    fn test_vanished_owner_conflicts() {
        assert!(matches!(
            resolve_existing(None),
            Err(LedgerError::DuplicateInProgress)
        ));
    }

    #[test]
    fn test_completed_without_snapshot_is_corrupt() {
        let result = resolve_existing(Some(with_status(TransactionStatus::Completed, None)));
        assert!(matches!(
            result,
            Err(LedgerError::Store(StoreError::Corrupt(_)))
        ));
    }
}
