// src/writer.rs
use tracing::debug;

use crate::entry::{EntryAccount, LedgerEntry};
use crate::error::StoreError;
use crate::locks::LockedPair;
use crate::movement::Movement;
use crate::store::UnitOfWork;
use crate::transaction::{Transaction, TransactionResult};

/// Apply both deltas, book the entry pair, and complete the transaction.
///
/// The pair must already be locked inside `uow`.
pub async fn apply(
    uow: &mut dyn UnitOfWork,
    transaction: &Transaction,
    locked: &LockedPair,
    movement: &Movement,
) -> Result<TransactionResult, StoreError> {
    let user_balance = uow
        .increment_wallet(locked.wallet_id, movement.user_delta)
        .await?;
    let system_balance = uow
        .increment_system_wallet(locked.system_wallet_id, movement.system_delta)
        .await?;

    let entries = [
        LedgerEntry::new(
            transaction.id,
            EntryAccount::Wallet(locked.wallet_id),
            movement.user_direction,
            movement.amount,
        ),
        LedgerEntry::new(
            transaction.id,
            EntryAccount::System(locked.system_wallet_id),
            movement.system_direction(),
            movement.amount,
        ),
    ];
    uow.insert_entries(&entries).await?;

    let result = TransactionResult::new(transaction.id, user_balance);
    uow.complete_transaction(transaction.id, &result).await?;

    debug!(
        transaction_id = %transaction.id,
        user_balance,
        system_balance,
        "ledger pair written"
    );

    Ok(result)
}
