// src/locks.rs
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::UnitOfWork;

/// Balances observed while both rows are held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockedPair {
    pub wallet_id: Uuid,
    pub system_wallet_id: Uuid,
    pub user_balance: i64,
    pub system_balance: i64,
}

/// Lock the user wallet, then the system wallet.
///
/// Every transaction takes the pair in this order, so two units touching the
/// same rows queue behind each other instead of deadlocking. Locks live until
/// the unit commits or rolls back.
pub async fn lock_pair(
    uow: &mut dyn UnitOfWork,
    wallet_id: Uuid,
    system_wallet_id: Uuid,
) -> Result<LockedPair, StoreError> {
    let user_balance = uow.lock_wallet(wallet_id).await?;
    let system_balance = uow.lock_system_wallet(system_wallet_id).await?;

    debug!(%wallet_id, %system_wallet_id, user_balance, "balances locked");

    Ok(LockedPair {
        wallet_id,
        system_wallet_id,
        user_balance,
        system_balance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::LedgerEntry;
    use crate::store::InsertOutcome;
    use crate::transaction::{Transaction, TransactionResult};
    use crate::wallet::{SystemWallet, SystemWalletRole, Wallet};
    use async_trait::async_trait;

    #[derive(Default)]
    struct RecordingUnit {
        calls: Vec<String>,
        fail_system_lock: bool,
    }

    #[async_trait]
    impl UnitOfWork for RecordingUnit {
        async fn insert_pending(&mut self, _: &Transaction) -> Result<InsertOutcome, StoreError> {
            unreachable!()
        }
        async fn find_by_idempotency_key(
            &mut self,
            _: &str,
        ) -> Result<Option<Transaction>, StoreError> {
            unreachable!()
        }
        async fn find_wallet(&mut self, _: Uuid) -> Result<Option<Wallet>, StoreError> {
            unreachable!()
        }
        async fn find_system_wallet(
            &mut self,
            _: Uuid,
            _: SystemWalletRole,
        ) -> Result<Option<SystemWallet>, StoreError> {
            unreachable!()
        }
        async fn lock_wallet(&mut self, id: Uuid) -> Result<i64, StoreError> {
            self.calls.push(format!("wallet:{id}"));
            Ok(1000)
        }
        async fn lock_system_wallet(&mut self, id: Uuid) -> Result<i64, StoreError> {
            self.calls.push(format!("system:{id}"));
            if self.fail_system_lock {
                return Err(StoreError::LockTimeout);
            }
            Ok(-1000)
        }
        async fn increment_wallet(&mut self, _: Uuid, _: i64) -> Result<i64, StoreError> {
            unreachable!()
        }
        async fn increment_system_wallet(&mut self, _: Uuid, _: i64) -> Result<i64, StoreError> {
            unreachable!()
        }
        async fn insert_entries(&mut self, _: &[LedgerEntry]) -> Result<(), StoreError> {
            unreachable!()
        }
        async fn complete_transaction(
            &mut self,
            _: Uuid,
            _: &TransactionResult,
        ) -> Result<(), StoreError> {
            unreachable!()
        }
        async fn commit(&mut self) -> Result<(), StoreError> {
            unreachable!()
        }
        async fn rollback(&mut self) -> Result<(), StoreError> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn test_user_wallet_locked_before_system_wallet() {
        let mut unit = RecordingUnit::default();
        let wallet = Uuid::now_v7();
        let system = Uuid::now_v7();

        let pair = lock_pair(&mut unit, wallet, system).await.unwrap();

        assert_eq!(
            unit.calls,
            vec![format!("wallet:{wallet}"), format!("system:{system}")]
        );
        assert_eq!(pair.user_balance, 1000);
        assert_eq!(pair.system_balance, -1000);
    }

    #[tokio::test]
    async fn test_lock_failure_propagates() {
        let mut unit = RecordingUnit {
            fail_system_lock: true,
            ..Default::default()
        };

        let result = lock_pair(&mut unit, Uuid::now_v7(), Uuid::now_v7()).await;

        assert!(matches!(result, Err(StoreError::LockTimeout)));
        assert_eq!(unit.calls.len(), 2);
    }
}
