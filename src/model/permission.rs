use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::authz::resolver::PermissionFlags;

/// Explicit per-(user, module) permission override row.
///
/// Absence of a row means deny-by-default for manager/employee roles;
/// admin and HR never consult these rows.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    #[schema(example = 12)]
    pub id: u64,
    #[schema(example = 1)]
    pub user_id: u64,
    #[schema(example = "leave")]
    pub module: String,
    pub can_read: bool,
    pub can_write: bool,
    pub can_edit: bool,
    pub can_delete: bool,
}

impl Permission {
    pub fn flags(&self) -> PermissionFlags {
        PermissionFlags {
            can_read: self.can_read,
            can_write: self.can_write,
            can_edit: self.can_edit,
            can_delete: self.can_delete,
        }
    }
}
