use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::model::leave_type::LeaveType;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveTypeReq {
    #[schema(example = "PL")]
    pub code: String,
    #[schema(example = "Privilege Leave")]
    pub name: String,
    #[schema(example = true)]
    pub is_paid: bool,
    #[schema(example = 21.0)]
    pub default_days: f64,
    #[serde(default)]
    #[schema(example = true)]
    pub carry_forward: bool,
    #[serde(default)]
    #[schema(example = 10.0)]
    pub max_carry_forward: f64,
    /// false marks the type balance-exempt (loss-of-pay leave)
    #[serde(default = "default_enforce")]
    #[schema(example = true)]
    pub enforce_balance: bool,
}

fn default_enforce() -> bool {
    true
}

/// Create a leave type; the code is unique.
#[utoipa::path(
    post,
    path = "/api/v1/leave-types",
    request_body = LeaveTypeReq,
    responses(
        (status = 201, description = "Leave type created"),
        (status = 409, description = "Duplicate leave type code")
    ),
    security(("bearer_auth" = [])),
    tag = "LeaveTypes"
)]
pub async fn create_leave_type(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<LeaveTypeReq>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;

    if payload.code.trim().is_empty() || payload.name.trim().is_empty() {
        return Err(AppError::invalid_input("code and name must not be empty"));
    }
    if payload.default_days < 0.0 || payload.max_carry_forward < 0.0 {
        return Err(AppError::invalid_input("day counts cannot be negative"));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO leave_types
            (code, name, is_paid, default_days, carry_forward, max_carry_forward, enforce_balance)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.code.trim())
    .bind(payload.name.trim())
    .bind(payload.is_paid)
    .bind(payload.default_days)
    .bind(payload.carry_forward)
    .bind(payload.max_carry_forward)
    .bind(payload.enforce_balance)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) => {
            info!(leave_type_id = res.last_insert_id(), code = %payload.code, "Leave type created");
            Ok(HttpResponse::Created().json(serde_json::json!({
                "message": "Leave type created",
                "id": res.last_insert_id()
            })))
        }
        Err(e) if AppError::is_unique_violation(&e) => {
            Err(AppError::Conflict("leave type code already exists".into()))
        }
        Err(e) => Err(e.into()),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/leave-types",
    responses((status = 200, description = "All leave types", body = [LeaveType])),
    security(("bearer_auth" = [])),
    tag = "LeaveTypes"
)]
pub async fn list_leave_types(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> AppResult<HttpResponse> {
    let types = sqlx::query_as::<_, LeaveType>(
        r#"
        SELECT id, code, name, is_paid, default_days, carry_forward,
               max_carry_forward, enforce_balance
        FROM leave_types
        ORDER BY code
        "#,
    )
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(types))
}

#[utoipa::path(
    put,
    path = "/api/v1/leave-types/{id}",
    params(("id" = u64, Path, description = "Leave type id")),
    request_body = LeaveTypeReq,
    responses(
        (status = 200, description = "Leave type updated"),
        (status = 404, description = "Leave type not found"),
        (status = 409, description = "Duplicate leave type code")
    ),
    security(("bearer_auth" = [])),
    tag = "LeaveTypes"
)]
pub async fn update_leave_type(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<LeaveTypeReq>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    let leave_type_id = path.into_inner();

    let result = sqlx::query(
        r#"
        UPDATE leave_types
        SET code = ?, name = ?, is_paid = ?, default_days = ?,
            carry_forward = ?, max_carry_forward = ?, enforce_balance = ?
        WHERE id = ?
        "#,
    )
    .bind(payload.code.trim())
    .bind(payload.name.trim())
    .bind(payload.is_paid)
    .bind(payload.default_days)
    .bind(payload.carry_forward)
    .bind(payload.max_carry_forward)
    .bind(payload.enforce_balance)
    .bind(leave_type_id)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) if res.rows_affected() == 0 => Err(AppError::NotFound("leave type")),
        Ok(_) => Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Leave type updated" }))),
        Err(e) if AppError::is_unique_violation(&e) => {
            Err(AppError::Conflict("leave type code already exists".into()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Delete a leave type; blocked while balances or requests reference it so
/// accrued bookkeeping is never cascaded away.
#[utoipa::path(
    delete,
    path = "/api/v1/leave-types/{id}",
    params(("id" = u64, Path, description = "Leave type id")),
    responses(
        (status = 200, description = "Leave type deleted"),
        (status = 404, description = "Leave type not found"),
        (status = 409, description = "Leave type still referenced")
    ),
    security(("bearer_auth" = [])),
    tag = "LeaveTypes"
)]
pub async fn delete_leave_type(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    let leave_type_id = path.into_inner();

    let referenced = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT (SELECT COUNT(*) FROM leave_balances WHERE leave_type_id = ?)
             + (SELECT COUNT(*) FROM leave_requests WHERE leave_type_id = ?)
        "#,
    )
    .bind(leave_type_id)
    .bind(leave_type_id)
    .fetch_one(pool.get_ref())
    .await?;

    if referenced > 0 {
        return Err(AppError::Conflict(
            "leave type is referenced by balances or requests".into(),
        ));
    }

    let result = sqlx::query("DELETE FROM leave_types WHERE id = ?")
        .bind(leave_type_id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("leave type"));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Leave type deleted" })))
}
