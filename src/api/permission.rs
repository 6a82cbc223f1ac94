use std::collections::HashMap;

use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::info;
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::authz::resolver::{self, Module, PermissionFlags};
use crate::error::{AppError, AppResult};
use crate::model::permission::Permission;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GrantPermission {
    #[schema(example = "leave")]
    pub module: Module,
    pub can_read: bool,
    pub can_write: bool,
    pub can_edit: bool,
    pub can_delete: bool,
}

/// One entry of the effective permission map.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EffectivePermission {
    #[schema(example = "leave")]
    pub module: Module,
    #[serde(flatten)]
    pub flags: PermissionFlags,
    /// Menu visibility: the OR of all four flags
    #[schema(example = true)]
    pub has_access: bool,
}

async fn explicit_map(pool: &MySqlPool, user_id: u64) -> AppResult<HashMap<String, PermissionFlags>> {
    let rows = sqlx::query_as::<_, Permission>(
        r#"
        SELECT id, user_id, module, can_read, can_write, can_edit, can_delete
        FROM permissions
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|p| (p.module.clone(), p.flags())).collect())
}

/// The caller's effective per-module flags; drives menu visibility.
#[utoipa::path(
    get,
    path = "/api/v1/permissions/me",
    responses((status = 200, description = "Effective permission map", body = [EffectivePermission])),
    security(("bearer_auth" = [])),
    tag = "Permissions"
)]
pub async fn my_permissions(auth: AuthUser, pool: web::Data<MySqlPool>) -> AppResult<HttpResponse> {
    let explicit = explicit_map(pool.get_ref(), auth.user_id).await?;

    let map: Vec<EffectivePermission> = resolver::all_modules()
        .map(|module| {
            let flags = resolver::effective_flags(
                auth.role,
                explicit.get(&module.to_string()).copied(),
                module,
            );
            EffectivePermission {
                module,
                flags,
                has_access: flags.has_access(),
            }
        })
        .collect();

    Ok(HttpResponse::Ok().json(map))
}

/// Explicit override rows for one user (admin).
#[utoipa::path(
    get,
    path = "/api/v1/permissions/{user_id}",
    params(("user_id" = u64, Path, description = "User id")),
    responses((status = 200, description = "Explicit permission rows", body = [Permission])),
    security(("bearer_auth" = [])),
    tag = "Permissions"
)]
pub async fn user_permissions(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    let user_id = path.into_inner();

    let rows = sqlx::query_as::<_, Permission>(
        r#"
        SELECT id, user_id, module, can_read, can_write, can_edit, can_delete
        FROM permissions
        WHERE user_id = ?
        ORDER BY module
        "#,
    )
    .bind(user_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(rows))
}

/// Upsert an explicit override row for (user, module) (admin).
#[utoipa::path(
    put,
    path = "/api/v1/permissions/{user_id}",
    params(("user_id" = u64, Path, description = "User id")),
    request_body = GrantPermission,
    responses(
        (status = 200, description = "Permission stored"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Permissions"
)]
pub async fn grant_permission(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<GrantPermission>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    let user_id = path.into_inner();

    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)")
        .bind(user_id)
        .fetch_one(pool.get_ref())
        .await?;
    if !exists {
        return Err(AppError::NotFound("user"));
    }

    sqlx::query(
        r#"
        INSERT INTO permissions (user_id, module, can_read, can_write, can_edit, can_delete)
        VALUES (?, ?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            can_read = VALUES(can_read),
            can_write = VALUES(can_write),
            can_edit = VALUES(can_edit),
            can_delete = VALUES(can_delete)
        "#,
    )
    .bind(user_id)
    .bind(payload.module.to_string())
    .bind(payload.can_read)
    .bind(payload.can_write)
    .bind(payload.can_edit)
    .bind(payload.can_delete)
    .execute(pool.get_ref())
    .await?;

    info!(user_id, module = %payload.module, editor = auth.user_id, "Permission stored");
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Permission stored" })))
}

/// Remove the explicit override so the role default applies again (admin).
#[utoipa::path(
    delete,
    path = "/api/v1/permissions/{user_id}/{module}",
    params(
        ("user_id" = u64, Path, description = "User id"),
        ("module" = String, Path, description = "Module name")
    ),
    responses(
        (status = 200, description = "Permission removed"),
        (status = 404, description = "No explicit permission for that module")
    ),
    security(("bearer_auth" = [])),
    tag = "Permissions"
)]
pub async fn revoke_permission(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<(u64, String)>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    let (user_id, module) = path.into_inner();

    let module: Module = module
        .parse()
        .map_err(|_| AppError::invalid_input("unknown module"))?;

    let result = sqlx::query("DELETE FROM permissions WHERE user_id = ? AND module = ?")
        .bind(user_id)
        .bind(module.to_string())
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("permission"));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Permission removed" })))
}
