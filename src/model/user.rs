use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(
    example = json!({
        "id": 1,
        "email": "jane.doe@company.com",
        "firstName": "Jane",
        "lastName": "Doe",
        "roleId": 4,
        "departmentId": 10,
        "managerId": 7,
        "hireDate": "2024-01-01",
        "isActive": true
    })
)]
pub struct User {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "jane.doe@company.com")]
    pub email: String,

    #[schema(example = "Jane")]
    pub first_name: String,

    #[schema(example = "Doe")]
    pub last_name: String,

    #[schema(example = 4)]
    pub role_id: u8,

    #[schema(example = 10, nullable = true)]
    pub department_id: Option<u64>,

    #[schema(example = 7, nullable = true)]
    pub manager_id: Option<u64>,

    #[schema(example = "2024-01-01", value_type = String, format = "date")]
    pub hire_date: Option<NaiveDate>,

    #[schema(example = true)]
    pub is_active: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Minimal projection used by the hierarchy builder and team queries.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrgUser {
    pub id: u64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role_id: u8,
    pub department_id: Option<u64>,
    pub manager_id: Option<u64>,
}
