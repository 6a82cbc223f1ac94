use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(
    example = json!({
        "id": 42,
        "userId": 1,
        "leaveTypeId": 3,
        "startDate": "2024-06-03",
        "endDate": "2024-06-04",
        "days": 2.0,
        "dayType": "full",
        "status": "pending",
        "reason": "family event",
        "createdAt": "2024-05-20T09:00:00Z"
    })
)]
pub struct LeaveRequest {
    #[schema(example = 42)]
    pub id: u64,
    #[schema(example = 1)]
    pub user_id: u64,
    #[schema(example = 3)]
    pub leave_type_id: u64,
    #[schema(example = "2024-06-03", value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(example = "2024-06-04", value_type = String, format = "date")]
    pub end_date: NaiveDate,
    #[schema(example = 2.0)]
    pub days: f64,
    /// `full` or `half`.
    #[schema(example = "full")]
    pub day_type: String,
    /// `pending`, `approved`, `rejected` or `cancelled`.
    #[schema(example = "pending")]
    pub status: String,
    #[schema(example = "family event", nullable = true)]
    pub reason: Option<String>,
    #[schema(nullable = true)]
    pub emergency_contact: Option<String>,
    #[schema(example = 7, nullable = true)]
    pub approved_by: Option<u64>,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub approved_at: Option<DateTime<Utc>>,
    #[schema(nullable = true)]
    pub rejection_reason: Option<String>,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub created_at: Option<DateTime<Utc>>,
}
