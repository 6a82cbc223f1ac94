use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::model::permission::Permission;
use crate::model::role::Role;

/// Functional areas used as the unit of permission granularity.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Module {
    Employees,
    Departments,
    Leave,
    LeaveTypes,
    Holidays,
    Attendance,
    Team,
    Reports,
    Admin,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Action {
    Read,
    Write,
    Edit,
    Delete,
    All,
}

#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PermissionFlags {
    pub can_read: bool,
    pub can_write: bool,
    pub can_edit: bool,
    pub can_delete: bool,
}

impl PermissionFlags {
    pub const NONE: PermissionFlags = PermissionFlags {
        can_read: false,
        can_write: false,
        can_edit: false,
        can_delete: false,
    };

    pub const fn rw(can_edit: bool, can_delete: bool) -> PermissionFlags {
        PermissionFlags {
            can_read: true,
            can_write: true,
            can_edit,
            can_delete,
        }
    }

    pub const fn read_only() -> PermissionFlags {
        PermissionFlags {
            can_read: true,
            can_write: false,
            can_edit: false,
            can_delete: false,
        }
    }

    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::Read => self.can_read,
            Action::Write => self.can_write,
            Action::Edit => self.can_edit,
            Action::Delete => self.can_delete,
            Action::All => self.can_read && self.can_write && self.can_edit && self.can_delete,
        }
    }

    /// Menu visibility: any flag grants access to the module at all.
    pub fn has_access(&self) -> bool {
        self.can_read || self.can_write || self.can_edit || self.can_delete
    }
}

/// Static defaults applied to manager/employee roles when no explicit
/// per-(user, module) row exists. Deny-by-default for everything not
/// listed here; never an HR/admin-style blanket grant.
pub fn role_default(role: Role, module: Module) -> PermissionFlags {
    match (role, module) {
        (Role::Manager, Module::Leave) => PermissionFlags::rw(true, false),
        (Role::Manager, Module::Attendance) => PermissionFlags::rw(false, false),
        (Role::Manager, Module::Team) => PermissionFlags::read_only(),
        (Role::Manager, Module::Employees) => PermissionFlags::read_only(),
        (Role::Manager, Module::Holidays) => PermissionFlags::read_only(),
        (Role::Manager, Module::Reports) => PermissionFlags::read_only(),
        (Role::Employee, Module::Leave) => PermissionFlags::rw(false, false),
        (Role::Employee, Module::Attendance) => PermissionFlags::rw(false, false),
        (Role::Employee, Module::Holidays) => PermissionFlags::read_only(),
        _ => PermissionFlags::NONE,
    }
}

/// The permission decision, evaluated in order:
/// 1. admin: always allowed
/// 2. hr: allowed everywhere except writes to the `admin` module
/// 3. explicit per-(user, module) row when present
/// 4. static role defaults, deny-by-default
pub fn resolve(
    role: Role,
    explicit: Option<PermissionFlags>,
    module: Module,
    action: Action,
) -> bool {
    match role {
        Role::Admin => true,
        Role::Hr => module != Module::Admin || action == Action::Read,
        Role::Manager | Role::Employee => explicit
            .unwrap_or_else(|| role_default(role, module))
            .allows(action),
    }
}

/// Effective flags for one module, for menu visibility and the
/// `/permissions/me` endpoint.
pub fn effective_flags(role: Role, explicit: Option<PermissionFlags>, module: Module) -> PermissionFlags {
    match role {
        Role::Admin => PermissionFlags::rw(true, true),
        Role::Hr => {
            if module == Module::Admin {
                PermissionFlags::read_only()
            } else {
                PermissionFlags::rw(true, true)
            }
        }
        Role::Manager | Role::Employee => explicit.unwrap_or_else(|| role_default(role, module)),
    }
}

pub fn all_modules() -> impl Iterator<Item = Module> {
    Module::iter()
}

/// Fetch the explicit override row for (user, module), if any.
pub async fn find_explicit(
    pool: &MySqlPool,
    user_id: u64,
    module: Module,
) -> AppResult<Option<PermissionFlags>> {
    let row = sqlx::query_as::<_, Permission>(
        r#"
        SELECT id, user_id, module, can_read, can_write, can_edit, can_delete
        FROM permissions
        WHERE user_id = ? AND module = ?
        "#,
    )
    .bind(user_id)
    .bind(module.to_string())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|p| p.flags()))
}

/// Gate an API operation. Admin/HR short-circuit without touching the
/// permissions table.
pub async fn authorize(
    pool: &MySqlPool,
    auth: &AuthUser,
    module: Module,
    action: Action,
) -> AppResult<()> {
    let explicit = match auth.role {
        Role::Admin | Role::Hr => None,
        _ => find_explicit(pool, auth.user_id, module).await?,
    };

    if resolve(auth.role, explicit, module, action) {
        Ok(())
    } else {
        Err(AppError::unauthorized(format!(
            "no {action} access to the {module} module"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_is_always_allowed() {
        for module in Module::iter() {
            for action in [Action::Read, Action::Write, Action::Edit, Action::Delete, Action::All] {
                assert!(resolve(Role::Admin, None, module, action));
            }
        }
    }

    #[test]
    fn hr_is_blocked_from_admin_writes_only() {
        assert!(resolve(Role::Hr, None, Module::Admin, Action::Read));
        assert!(!resolve(Role::Hr, None, Module::Admin, Action::Write));
        assert!(!resolve(Role::Hr, None, Module::Admin, Action::Delete));
        assert!(!resolve(Role::Hr, None, Module::Admin, Action::All));
        assert!(resolve(Role::Hr, None, Module::Leave, Action::All));
        assert!(resolve(Role::Hr, None, Module::Employees, Action::Delete));
    }

    #[test]
    fn employee_denied_admin_without_explicit_grant() {
        assert!(!resolve(Role::Employee, None, Module::Admin, Action::Read));
        let grant = PermissionFlags::read_only();
        assert!(resolve(Role::Employee, Some(grant), Module::Admin, Action::Read));
        assert!(!resolve(Role::Employee, Some(grant), Module::Admin, Action::Write));
    }

    #[test]
    fn explicit_row_overrides_role_default() {
        // default gives employees leave write access; an explicit row can
        // revoke it
        assert!(resolve(Role::Employee, None, Module::Leave, Action::Write));
        assert!(!resolve(
            Role::Employee,
            Some(PermissionFlags::NONE),
            Module::Leave,
            Action::Write
        ));
    }

    #[test]
    fn action_all_requires_every_flag() {
        let mut flags = PermissionFlags::rw(true, false);
        assert!(!flags.allows(Action::All));
        flags.can_delete = true;
        assert!(flags.allows(Action::All));
    }

    #[test]
    fn has_access_is_the_or_of_all_flags() {
        assert!(!PermissionFlags::NONE.has_access());
        assert!(PermissionFlags::read_only().has_access());
        let delete_only = PermissionFlags {
            can_delete: true,
            ..PermissionFlags::NONE
        };
        assert!(delete_only.has_access());
    }

    #[test]
    fn module_names_are_stable_wire_strings() {
        assert_eq!(Module::LeaveTypes.to_string(), "leavetypes");
        assert_eq!("leave".parse::<Module>().unwrap(), Module::Leave);
        assert_eq!("all".parse::<Action>().unwrap(), Action::All);
    }
}
