use crate::api::balance::{AdjustBalance, BalanceSummary};
use crate::api::department::DepartmentReq;
use crate::api::holiday::HolidayReq;
use crate::api::leave_request::{
    LeaveDetail, LeaveFilter, LeaveListResponse, RejectLeave, SubmitLeave,
};
use crate::api::leave_type::LeaveTypeReq;
use crate::api::permission::{EffectivePermission, GrantPermission};
use crate::api::users::{CreateUser, SetManager, SetRole, UserListResponse};
use crate::authz::hierarchy::TreeNode;
use crate::authz::resolver::{Action, Module, PermissionFlags};
use crate::leave::lifecycle::LeaveStatus;
use crate::leave::workdays::DayType;
use crate::model::attendance::Attendance;
use crate::model::department::Department;
use crate::model::holiday::Holiday;
use crate::model::leave_balance::LeaveBalance;
use crate::model::leave_request::LeaveRequest;
use crate::model::leave_type::LeaveType;
use crate::model::notification::Notification;
use crate::model::permission::Permission;
use crate::model::user::{OrgUser, User};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM System API",
        version = "1.0.0",
        description = r#"
## Human Resource Management (HRM) System

This API powers a **Human Resource Management (HRM)** system designed to manage core HR operations within an organization.

### 🔹 Key Features
- **User & Organization Management**
  - Create, update, list, and view user profiles; departments, managers, org tree
- **Leave Management**
  - Apply for leave, approve/reject/cancel requests, balances with carry-forward
- **Attendance Management**
  - Daily check-in and check-out tracking
- **Permissions**
  - Role defaults plus per-user module overrides

### 🔐 Security
Most endpoints are protected using **JWT Bearer authentication**.
Only authorized roles such as **Admin** or **HR** can access sensitive operations.

### 📦 Response Format
- JSON-based RESTful responses
- Pagination supported for list endpoints

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::submit_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,
        crate::api::leave_request::cancel_leave,
        crate::api::leave_request::delete_leave,

        crate::api::balance::my_balances,
        crate::api::balance::user_balances,
        crate::api::balance::adjust_balance,
        crate::api::balance::carry_forward,

        crate::api::users::create_user,
        crate::api::users::get_user,
        crate::api::users::list_users,
        crate::api::users::update_user,
        crate::api::users::set_role,
        crate::api::users::set_manager,
        crate::api::users::deactivate_user,

        crate::api::department::create_department,
        crate::api::department::list_departments,
        crate::api::department::update_department,
        crate::api::department::delete_department,

        crate::api::leave_type::create_leave_type,
        crate::api::leave_type::list_leave_types,
        crate::api::leave_type::update_leave_type,
        crate::api::leave_type::delete_leave_type,

        crate::api::holiday::create_holiday,
        crate::api::holiday::list_holidays,
        crate::api::holiday::delete_holiday,

        crate::api::team::team_members,
        crate::api::team::org_tree,

        crate::api::permission::my_permissions,
        crate::api::permission::user_permissions,
        crate::api::permission::grant_permission,
        crate::api::permission::revoke_permission,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::my_attendance,

        crate::api::notification::my_notifications,
        crate::api::notification::mark_read,
        crate::api::notification::mark_all_read
    ),
    components(
        schemas(
            User,
            OrgUser,
            CreateUser,
            SetManager,
            SetRole,
            UserListResponse,
            Department,
            DepartmentReq,
            LeaveType,
            LeaveTypeReq,
            Holiday,
            HolidayReq,
            LeaveRequest,
            LeaveDetail,
            SubmitLeave,
            RejectLeave,
            LeaveFilter,
            LeaveListResponse,
            LeaveStatus,
            DayType,
            LeaveBalance,
            BalanceSummary,
            AdjustBalance,
            TreeNode,
            Module,
            Action,
            PermissionFlags,
            Permission,
            GrantPermission,
            EffectivePermission,
            Attendance,
            Notification
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Users", description = "User and organization management APIs"),
        (name = "Departments", description = "Department catalog APIs"),
        (name = "Leave", description = "Leave request APIs"),
        (name = "LeaveTypes", description = "Leave type catalog APIs"),
        (name = "Balances", description = "Leave balance APIs"),
        (name = "Holidays", description = "Holiday calendar APIs"),
        (name = "Team", description = "Team and org hierarchy APIs"),
        (name = "Permissions", description = "Permission override APIs"),
        (name = "Attendance", description = "Attendance management APIs"),
        (name = "Notifications", description = "In-app notification APIs"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
