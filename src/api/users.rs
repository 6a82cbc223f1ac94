use std::collections::HashMap;

use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::auth::password::hash_password;
use crate::authz::hierarchy;
use crate::authz::resolver::{self, Action, Module};
use crate::error::{AppError, AppResult};
use crate::model::role::Role;
use crate::model::user::User;
use crate::utils::db_utils::{build_update_sql, execute_update};
use crate::utils::availability;

const USER_COLUMNS: &str = r#"
    id, email, first_name, last_name, role_id, department_id,
    manager_id, hire_date, is_active, last_login_at
"#;

/// Wire key to column map for partial updates. Role, password and manager
/// travel through their own endpoints.
const UPDATABLE: &[(&str, &str)] = &[
    ("firstName", "first_name"),
    ("lastName", "last_name"),
    ("departmentId", "department_id"),
    ("hireDate", "hire_date"),
];

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
    #[schema(example = "jane.doe@company.com")]
    pub email: String,
    #[schema(example = "s3cret")]
    pub password: String,
    #[schema(example = "Jane")]
    pub first_name: String,
    #[schema(example = "Doe")]
    pub last_name: String,
    /// `admin`, `hr`, `manager` or `employee`
    #[schema(example = "employee")]
    pub role: String,
    #[schema(example = 10, nullable = true)]
    pub department_id: Option<u64>,
    #[schema(example = 7, nullable = true)]
    pub manager_id: Option<u64>,
    #[schema(example = "2024-01-01", format = "date", value_type = String, nullable = true)]
    pub hire_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct UserQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub department_id: Option<u64>,
    pub role: Option<String>,
    /// Search by name or email
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct UserListResponse {
    pub data: Vec<User>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetManager {
    #[schema(example = 7, nullable = true)]
    pub manager_id: Option<u64>,
}

#[derive(Deserialize, ToSchema)]
pub struct SetRole {
    /// `admin`, `hr`, `manager` or `employee`
    #[schema(example = "manager")]
    pub role: String,
}

/// Create a user (admin/HR).
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created"),
        (status = 409, description = "Email already registered")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn create_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateUser>,
) -> AppResult<HttpResponse> {
    auth.require_hr_or_admin()?;

    let role = Role::from_name(&payload.role)
        .ok_or_else(|| AppError::invalid_input("unknown role"))?;
    if role == Role::Admin {
        // only admins may mint admins
        auth.require_admin()?;
    }

    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || payload.password.is_empty() {
        return Err(AppError::invalid_input("email and password must not be empty"));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO users
            (email, password, first_name, last_name, role_id, department_id, manager_id, hire_date)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&email)
    .bind(hash_password(&payload.password))
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(role.id())
    .bind(payload.department_id)
    .bind(payload.manager_id)
    .bind(payload.hire_date)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) => {
            availability::mark_registered(&email).await;
            info!(user_id = res.last_insert_id(), creator = auth.user_id, "User created");
            Ok(HttpResponse::Created().json(serde_json::json!({
                "message": "User created",
                "id": res.last_insert_id()
            })))
        }
        Err(e) if AppError::is_unique_violation(&e) => {
            Err(AppError::Conflict("email already registered".into()))
        }
        Err(e) => {
            error!(error = %e, "Failed to create user");
            Err(e.into())
        }
    }
}

/// Paginated user list with department/role/search filters.
#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(UserQuery),
    responses((status = 200, description = "Paginated user list", body = UserListResponse)),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn list_users(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<UserQuery>,
) -> AppResult<HttpResponse> {
    resolver::authorize(pool.get_ref(), &auth, Module::Employees, Action::Read).await?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let mut conditions: Vec<&str> = Vec::new();
    let mut bindings: Vec<sqlx::types::JsonValue> = Vec::new();

    if let Some(department_id) = query.department_id {
        conditions.push("department_id = ?");
        bindings.push(department_id.into());
    }

    if let Some(role) = query.role.as_deref() {
        let role = Role::from_name(role).ok_or_else(|| AppError::invalid_input("unknown role"))?;
        conditions.push("role_id = ?");
        bindings.push(u64::from(role.id()).into());
    }

    if let Some(search) = &query.search {
        conditions.push("(first_name LIKE ? OR last_name LIKE ? OR email LIKE ?)");
        let like = format!("%{}%", search);
        bindings.push(like.clone().into());
        bindings.push(like.clone().into());
        bindings.push(like.into());
    }

    let where_clause = if conditions.is_empty() {
        "".to_string()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let count_sql = format!("SELECT COUNT(*) FROM users {}", where_clause);
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for b in &bindings {
        count_query = count_query.bind(b);
    }
    let total = count_query.fetch_one(pool.get_ref()).await?;

    let data_sql = format!(
        "SELECT {USER_COLUMNS} FROM users {} ORDER BY id DESC LIMIT ? OFFSET ?",
        where_clause
    );
    let mut data_query = sqlx::query_as::<_, User>(&data_sql);
    for b in &bindings {
        data_query = data_query.bind(b);
    }
    data_query = data_query.bind(per_page as i64).bind(offset as i64);

    let users = data_query.fetch_all(pool.get_ref()).await?;

    Ok(HttpResponse::Ok().json(UserListResponse {
        data: users,
        page,
        per_page,
        total,
    }))
}

/// Fetch one user: self, HR/admin, or any caller with employees read access.
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = u64, Path, description = "User id")),
    responses(
        (status = 200, description = "User found", body = User),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let user_id = path.into_inner();
    if user_id != auth.user_id {
        resolver::authorize(pool.get_ref(), &auth, Module::Employees, Action::Read).await?;
    }

    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(user_id)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or(AppError::NotFound("user"))?;

    Ok(HttpResponse::Ok().json(user))
}

/// Partial profile update: self or employees edit access.
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    params(("id" = u64, Path, description = "User id")),
    responses(
        (status = 200, description = "User updated"),
        (status = 400, description = "Unknown or empty field set"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> AppResult<HttpResponse> {
    let user_id = path.into_inner();
    if user_id != auth.user_id {
        resolver::authorize(pool.get_ref(), &auth, Module::Employees, Action::Edit).await?;
    }

    let update = build_update_sql("users", UPDATABLE, &body, "id", user_id)?;
    let affected = execute_update(pool.get_ref(), update).await?;

    if affected == 0 {
        return Err(AppError::NotFound("user"));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "User updated" })))
}

/// Change a user's role (admin only).
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}/role",
    params(("id" = u64, Path, description = "User id")),
    request_body = SetRole,
    responses(
        (status = 200, description = "Role updated"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn set_role(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<SetRole>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    let user_id = path.into_inner();

    let role = Role::from_name(&payload.role)
        .ok_or_else(|| AppError::invalid_input("unknown role"))?;

    let result = sqlx::query("UPDATE users SET role_id = ? WHERE id = ?")
        .bind(role.id())
        .bind(user_id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("user"));
    }

    info!(user_id, role = role.as_str(), editor = auth.user_id, "Role changed");
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Role updated" })))
}

/// Reassign a user's manager; the new chain is walked so the reporting
/// structure stays a forest.
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}/manager",
    params(("id" = u64, Path, description = "User id")),
    request_body = SetManager,
    responses(
        (status = 200, description = "Manager updated"),
        (status = 400, description = "Self-management or a reporting cycle"),
        (status = 404, description = "User or manager not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn set_manager(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<SetManager>,
) -> AppResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let user_id = path.into_inner();

    if let Some(manager_id) = payload.manager_id {
        let pairs = sqlx::query_as::<_, (u64, Option<u64>)>("SELECT id, manager_id FROM users")
            .fetch_all(pool.get_ref())
            .await?;
        let parents: HashMap<u64, Option<u64>> = pairs.into_iter().collect();

        if !parents.contains_key(&user_id) {
            return Err(AppError::NotFound("user"));
        }
        hierarchy::validate_manager_change(&parents, user_id, manager_id)?;
    }

    let result = sqlx::query("UPDATE users SET manager_id = ? WHERE id = ?")
        .bind(payload.manager_id)
        .bind(user_id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("user"));
    }

    info!(user_id, manager_id = ?payload.manager_id, editor = auth.user_id, "Manager reassigned");
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Manager updated" })))
}

/// Soft-delete: deactivate the account (admin only). The row and its leave
/// history stay.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(("id" = u64, Path, description = "User id")),
    responses(
        (status = 200, description = "User deactivated"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn deactivate_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    let user_id = path.into_inner();

    let result = sqlx::query("UPDATE users SET is_active = 0 WHERE id = ?")
        .bind(user_id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("user"));
    }

    info!(user_id, editor = auth.user_id, "User deactivated");
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "User deactivated" })))
}
