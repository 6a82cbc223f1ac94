use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::leave::ledger::Ledger;

/// Per (user, leave type, year) bookkeeping row.
///
/// Day columns are stored as DOUBLE with 0.5 granularity (half days).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveBalance {
    #[schema(example = 55)]
    pub id: u64,
    #[schema(example = 1)]
    pub user_id: u64,
    #[schema(example = 3)]
    pub leave_type_id: u64,
    #[schema(example = 2024)]
    pub year: i32,
    #[schema(example = 21.0)]
    pub total_days: f64,
    #[schema(example = 2.0)]
    pub used_days: f64,
    #[schema(example = 0.0)]
    pub pending_days: f64,
    #[schema(example = 0.0)]
    pub carry_forward: f64,
}

impl LeaveBalance {
    pub fn ledger(&self) -> Ledger {
        Ledger {
            total: self.total_days,
            used: self.used_days,
            pending: self.pending_days,
            carry_forward: self.carry_forward,
        }
    }

    pub fn apply(&mut self, ledger: Ledger) {
        self.total_days = ledger.total;
        self.used_days = ledger.used;
        self.pending_days = ledger.pending;
        self.carry_forward = ledger.carry_forward;
    }
}
