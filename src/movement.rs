// src/movement.rs
use crate::entry::Direction;
use crate::error::LedgerError;
use crate::transaction::TransactionType;
use crate::wallet::SystemWalletRole;

/// Signed effect of one request on the user wallet and its counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Movement {
    pub kind: TransactionType,
    pub amount: i64,
    pub user_delta: i64,
    pub system_delta: i64,
    pub user_direction: Direction,
    pub counterpart: SystemWalletRole,
}

impl Movement {
    /// `amount` must already be validated to fit in `1..=i64::MAX`.
    pub fn plan(kind: TransactionType, amount: u64) -> Result<Self, LedgerError> {
        let amount = i64::try_from(amount)
            .ok()
            .filter(|amount| *amount > 0)
            .ok_or_else(|| LedgerError::InvalidRequest(format!("invalid amount: {amount}")))?;

        let user_direction = if kind.credits_user() {
            Direction::Credit
        } else {
            Direction::Debit
        };
        let user_delta = user_direction.signed(amount);

        Ok(Self {
            kind,
            amount,
            user_delta,
            system_delta: -user_delta,
            user_direction,
            counterpart: kind.counterpart_role(),
        })
    }

    pub fn system_direction(&self) -> Direction {
        self.user_direction.opposite()
    }

    /// Reject a spend the locked balance cannot cover. Value-in movements
    /// always pass.
    pub fn ensure_covered(&self, user_balance: i64) -> Result<(), LedgerError> {
        if self.user_delta < 0 && user_balance < self.amount {
            return Err(LedgerError::InsufficientFunds {
                requested: self.amount as u64,
                available: user_balance,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_in_movements() {
        for kind in [TransactionType::Topup, TransactionType::Bonus] {
            let movement = Movement::plan(kind, 100).unwrap();
            assert_eq!(movement.user_delta, 100);
            assert_eq!(movement.system_delta, -100);
            assert_eq!(movement.user_direction, Direction::Credit);
            assert_eq!(movement.system_direction(), Direction::Debit);
            assert_eq!(movement.counterpart, SystemWalletRole::Treasury);
        }
    }

    #[test]
    fn test_spend_movement() {
        let movement = Movement::plan(TransactionType::Spend, 200).unwrap();
        assert_eq!(movement.user_delta, -200);
        assert_eq!(movement.system_delta, 200);
        assert_eq!(movement.user_direction, Direction::Debit);
        assert_eq!(movement.system_direction(), Direction::Credit);
        assert_eq!(movement.counterpart, SystemWalletRole::Revenue);
    }

    #[test]
    fn test_spend_coverage() {
        let movement = Movement::plan(TransactionType::Spend, 300).unwrap();
        assert!(movement.ensure_covered(300).is_ok());
        assert!(movement.ensure_covered(1000).is_ok());

        match movement.ensure_covered(299) {
            Err(LedgerError::InsufficientFunds {
                requested,
                available,
            }) => {
                assert_eq!(requested, 300);
                assert_eq!(available, 299);
            }
            other => panic!("expected InsufficientFunds, got {:?}", other),
        }
    }

    #[test]
    fn test_topup_needs_no_coverage() {
        let movement = Movement::plan(TransactionType::Topup, 9_999_999).unwrap();
        assert!(movement.ensure_covered(0).is_ok());
    }

    #[test]
    fn test_rejects_unrepresentable_amounts() {
        assert!(Movement::plan(TransactionType::Topup, 0).is_err());
        assert!(Movement::plan(TransactionType::Spend, i64::MAX as u64 + 1).is_err());
        assert!(Movement::plan(TransactionType::Bonus, i64::MAX as u64).is_ok());
    }
}
