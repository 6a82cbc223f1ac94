use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[schema(example = 88)]
    pub id: u64,
    #[schema(example = 7)]
    pub user_id: u64,
    #[schema(example = "Leave request submitted")]
    pub title: String,
    #[schema(example = "Jane Doe requested 2 days of Privilege Leave")]
    pub message: String,
    #[schema(example = "leave")]
    pub category: String,
    #[schema(example = "/leave/42", nullable = true)]
    pub link: Option<String>,
    pub is_read: bool,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub created_at: Option<DateTime<Utc>>,
}
