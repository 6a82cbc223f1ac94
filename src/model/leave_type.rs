use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Catalog entry for a category of absence.
///
/// `enforce_balance = false` marks the type as balance-exempt (unpaid /
/// loss-of-pay leave): reservations always succeed regardless of the
/// available balance.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(
    example = json!({
        "id": 3,
        "code": "PL",
        "name": "Privilege Leave",
        "isPaid": true,
        "defaultDays": 21.0,
        "carryForward": true,
        "maxCarryForward": 10.0,
        "enforceBalance": true
    })
)]
pub struct LeaveType {
    #[schema(example = 3)]
    pub id: u64,
    #[schema(example = "PL")]
    pub code: String,
    #[schema(example = "Privilege Leave")]
    pub name: String,
    #[schema(example = true)]
    pub is_paid: bool,
    #[schema(example = 21.0)]
    pub default_days: f64,
    #[schema(example = true)]
    pub carry_forward: bool,
    #[schema(example = 10.0)]
    pub max_carry_forward: f64,
    #[schema(example = true)]
    pub enforce_balance: bool,
}
