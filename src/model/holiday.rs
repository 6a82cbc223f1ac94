use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Holiday {
    #[schema(example = 5)]
    pub id: u64,
    #[schema(example = "2024-12-25", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(example = "Christmas Day")]
    pub name: String,
    /// e.g. `public`, `optional`, `company`.
    #[schema(example = "public")]
    pub holiday_type: String,
}
