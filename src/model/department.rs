use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    #[schema(example = 10)]
    pub id: u64,
    #[schema(example = "Engineering")]
    pub name: String,
    #[schema(example = "Product engineering teams", nullable = true)]
    pub description: Option<String>,
}
