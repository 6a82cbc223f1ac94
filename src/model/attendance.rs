use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    #[schema(example = 301)]
    pub id: u64,
    #[schema(example = 1)]
    pub user_id: u64,
    #[schema(example = "2024-06-03", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(example = "09:02:11", value_type = String)]
    pub check_in: Option<NaiveTime>,
    #[schema(example = "17:45:03", value_type = String, nullable = true)]
    pub check_out: Option<NaiveTime>,
}
