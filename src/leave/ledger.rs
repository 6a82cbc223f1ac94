use sqlx::{MySql, Transaction};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::model::leave_balance::LeaveBalance;
use crate::model::leave_type::LeaveType;

/// In-memory view of one balance row, mutated by the request lifecycle.
///
/// Invariant for balance-enforced leave types: after any sequence of
/// reserve/commit/release calls, `used + pending <= total + carry_forward`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ledger {
    pub total: f64,
    pub used: f64,
    pub pending: f64,
    pub carry_forward: f64,
}

impl Ledger {
    /// The opening position of a freshly created balance row: the leave
    /// type's annual allowance, nothing used, nothing pending.
    pub fn opening(leave_type: &LeaveType) -> Ledger {
        Ledger {
            total: leave_type.default_days,
            used: 0.0,
            pending: 0.0,
            carry_forward: 0.0,
        }
    }

    pub fn available(&self) -> f64 {
        self.total + self.carry_forward - self.used - self.pending
    }

    /// Available balance as shown to callers doing a pre-check, never
    /// negative. The raw value can dip below zero after direct admin edits.
    pub fn presentable_available(&self) -> f64 {
        self.available().max(0.0)
    }

    /// Tentatively reserve days for a not-yet-decided request.
    ///
    /// `enforce` comes from `LeaveType::enforce_balance`; exempt (unpaid)
    /// types always succeed.
    pub fn reserve(&mut self, days: f64, enforce: bool) -> AppResult<()> {
        if enforce && self.available() < days {
            return Err(AppError::InsufficientBalance {
                requested: days,
                available: self.presentable_available(),
            });
        }
        self.pending += days;
        Ok(())
    }

    /// Move reserved days into `used` (approval).
    pub fn commit(&mut self, days: f64) {
        self.pending = (self.pending - days).max(0.0);
        self.used += days;
    }

    /// Drop reserved days without consuming them (rejection/cancellation).
    pub fn release(&mut self, days: f64) {
        self.pending = (self.pending - days).max(0.0);
    }
}

/// Lock (or lazily create) the balance row for (user, leave type, year).
///
/// Runs inside the caller's transaction; `FOR UPDATE` serializes concurrent
/// submissions for the same user so the balance and overlap checks cannot
/// both pass twice.
pub async fn get_or_create_for_update(
    tx: &mut Transaction<'_, MySql>,
    user_id: u64,
    leave_type: &LeaveType,
    year: i32,
) -> AppResult<LeaveBalance> {
    let select = r#"
        SELECT id, user_id, leave_type_id, year,
               total_days, used_days, pending_days, carry_forward
        FROM leave_balances
        WHERE user_id = ? AND leave_type_id = ? AND year = ?
        FOR UPDATE
    "#;

    if let Some(balance) = sqlx::query_as::<_, LeaveBalance>(select)
        .bind(user_id)
        .bind(leave_type.id)
        .bind(year)
        .fetch_optional(&mut **tx)
        .await?
    {
        return Ok(balance);
    }

    debug!(user_id, leave_type_id = leave_type.id, year, "Creating leave balance lazily");

    let opening = Ledger::opening(leave_type);
    sqlx::query(
        r#"
        INSERT INTO leave_balances
            (user_id, leave_type_id, year, total_days, used_days, pending_days, carry_forward)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(leave_type.id)
    .bind(year)
    .bind(opening.total)
    .bind(opening.used)
    .bind(opening.pending)
    .bind(opening.carry_forward)
    .execute(&mut **tx)
    .await?;

    let balance = sqlx::query_as::<_, LeaveBalance>(select)
        .bind(user_id)
        .bind(leave_type.id)
        .bind(year)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(AppError::NotFound("leave balance"))?;

    Ok(balance)
}

/// Write the mutated day columns back within the same transaction.
pub async fn store(tx: &mut Transaction<'_, MySql>, balance: &LeaveBalance) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE leave_balances
        SET total_days = ?, used_days = ?, pending_days = ?, carry_forward = ?
        WHERE id = ?
        "#,
    )
    .bind(balance.total_days)
    .bind(balance.used_days)
    .bind(balance.pending_days)
    .bind(balance.carry_forward)
    .bind(balance.id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh(total: f64) -> Ledger {
        Ledger {
            total,
            used: 0.0,
            pending: 0.0,
            carry_forward: 0.0,
        }
    }

    #[test]
    fn opening_balance_takes_the_type_allowance() {
        let privilege = LeaveType {
            id: 3,
            code: "PL".into(),
            name: "Privilege Leave".into(),
            is_paid: true,
            default_days: 21.0,
            carry_forward: true,
            max_carry_forward: 10.0,
            enforce_balance: true,
        };
        let ledger = Ledger::opening(&privilege);
        assert_eq!(ledger.total, 21.0);
        assert_eq!(ledger.used, 0.0);
        assert_eq!(ledger.pending, 0.0);
        assert_eq!(ledger.carry_forward, 0.0);
        assert_eq!(ledger.available(), 21.0);
    }

    #[test]
    fn available_includes_carry_forward() {
        let ledger = Ledger {
            total: 21.0,
            used: 3.0,
            pending: 2.0,
            carry_forward: 5.0,
        };
        assert_eq!(ledger.available(), 21.0);
    }

    #[test]
    fn reserve_fails_when_enforced_and_short() {
        let mut ledger = fresh(1.0);
        let err = ledger.reserve(2.0, true).unwrap_err();
        assert!(matches!(err, AppError::InsufficientBalance { .. }));
        // balance untouched on failure
        assert_eq!(ledger.pending, 0.0);
    }

    #[test]
    fn exempt_type_reserves_past_zero() {
        let mut ledger = fresh(0.0);
        ledger.reserve(4.0, false).unwrap();
        assert_eq!(ledger.pending, 4.0);
        assert!(ledger.available() < 0.0);
        assert_eq!(ledger.presentable_available(), 0.0);
    }

    #[test]
    fn reserve_then_release_round_trips() {
        let mut ledger = fresh(21.0);
        ledger.reserve(2.0, true).unwrap();
        assert_eq!(ledger.pending, 2.0);
        ledger.release(2.0);
        assert_eq!(ledger.pending, 0.0);
        assert_eq!(ledger.used, 0.0);
        assert_eq!(ledger.total, 21.0);
    }

    #[test]
    fn commit_moves_pending_to_used() {
        let mut ledger = fresh(21.0);
        ledger.reserve(2.0, true).unwrap();
        ledger.commit(2.0);
        assert_eq!(ledger.used, 2.0);
        assert_eq!(ledger.pending, 0.0);
        assert_eq!(ledger.available(), 19.0);
    }

    #[test]
    fn enforced_sequences_never_overdraw() {
        let mut ledger = fresh(5.0);
        ledger.reserve(3.0, true).unwrap();
        ledger.commit(3.0);
        ledger.reserve(2.0, true).unwrap();
        assert!(ledger.reserve(0.5, true).is_err());
        ledger.release(2.0);
        ledger.reserve(1.5, true).unwrap();
        assert!(ledger.used + ledger.pending <= ledger.total + ledger.carry_forward);
    }
}
