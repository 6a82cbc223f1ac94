use actix_web::{HttpResponse, web};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::model::leave_balance::LeaveBalance;
use crate::model::leave_type::LeaveType;

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct BalanceQuery {
    /// Defaults to the current calendar year
    #[schema(example = 2024)]
    pub year: Option<i32>,
}

/// One balance row joined with its leave type, plus the derived
/// available figure (clamped to zero for presentation).
#[derive(Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSummary {
    #[schema(example = 55)]
    pub id: u64,
    #[schema(example = 1)]
    pub user_id: u64,
    #[schema(example = 3)]
    pub leave_type_id: u64,
    #[schema(example = "PL")]
    pub code: String,
    #[schema(example = "Privilege Leave")]
    pub name: String,
    #[schema(example = 2024)]
    pub year: i32,
    #[schema(example = 21.0)]
    pub total_days: f64,
    #[schema(example = 2.0)]
    pub used_days: f64,
    #[schema(example = 0.0)]
    pub pending_days: f64,
    #[schema(example = 0.0)]
    pub carry_forward: f64,
    #[sqlx(skip)]
    #[schema(example = 19.0)]
    pub available: f64,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdjustBalance {
    #[schema(example = 3)]
    pub leave_type_id: u64,
    #[schema(example = 2024)]
    pub year: i32,
    #[schema(example = 24.0, nullable = true)]
    pub total_days: Option<f64>,
    #[schema(example = 5.0, nullable = true)]
    pub carry_forward: Option<f64>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct CarryForwardQuery {
    /// The year being closed; leftovers roll into year + 1
    #[schema(example = 2024)]
    pub year: i32,
}

async fn balances_for(pool: &MySqlPool, user_id: u64, year: i32) -> AppResult<Vec<BalanceSummary>> {
    let mut rows = sqlx::query_as::<_, BalanceSummary>(
        r#"
        SELECT b.id, b.user_id, b.leave_type_id, t.code, t.name, b.year,
               b.total_days, b.used_days, b.pending_days, b.carry_forward
        FROM leave_balances b
        JOIN leave_types t ON t.id = b.leave_type_id
        WHERE b.user_id = ? AND b.year = ?
        ORDER BY t.code
        "#,
    )
    .bind(user_id)
    .bind(year)
    .fetch_all(pool)
    .await?;

    for row in &mut rows {
        row.available =
            (row.total_days + row.carry_forward - row.used_days - row.pending_days).max(0.0);
    }
    Ok(rows)
}

/// The caller's own balances for a year.
#[utoipa::path(
    get,
    path = "/api/v1/balances/me",
    params(BalanceQuery),
    responses((status = 200, description = "Own balance rows", body = [BalanceSummary])),
    security(("bearer_auth" = [])),
    tag = "Balances"
)]
pub async fn my_balances(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<BalanceQuery>,
) -> AppResult<HttpResponse> {
    let year = query.year.unwrap_or_else(|| Utc::now().year());
    let rows = balances_for(pool.get_ref(), auth.user_id, year).await?;
    Ok(HttpResponse::Ok().json(rows))
}

/// Another user's balances: their manager or HR/admin only.
#[utoipa::path(
    get,
    path = "/api/v1/balances/{user_id}",
    params(
        ("user_id" = u64, Path, description = "User whose balances to fetch"),
        BalanceQuery
    ),
    responses(
        (status = 200, description = "Balance rows", body = [BalanceSummary]),
        (status = 403, description = "Not the user's manager or HR/admin"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Balances"
)]
pub async fn user_balances(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    query: web::Query<BalanceQuery>,
) -> AppResult<HttpResponse> {
    let user_id = path.into_inner();

    if user_id != auth.user_id && !auth.is_privileged() {
        let manager_id =
            sqlx::query_scalar::<_, Option<u64>>("SELECT manager_id FROM users WHERE id = ?")
                .bind(user_id)
                .fetch_optional(pool.get_ref())
                .await?
                .ok_or(AppError::NotFound("user"))?;
        if manager_id != Some(auth.user_id) {
            return Err(AppError::unauthorized("no access to this user's balances"));
        }
    }

    let year = query.year.unwrap_or_else(|| Utc::now().year());
    let rows = balances_for(pool.get_ref(), user_id, year).await?;
    Ok(HttpResponse::Ok().json(rows))
}

/// Direct balance edit (HR/admin). No availability enforcement here: an
/// over-commit is allowed and simply shows as zero available.
#[utoipa::path(
    put,
    path = "/api/v1/balances/{user_id}",
    params(("user_id" = u64, Path, description = "User whose balance to adjust")),
    request_body = AdjustBalance,
    responses(
        (status = 200, description = "Balance adjusted"),
        (status = 404, description = "User or leave type not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Balances"
)]
pub async fn adjust_balance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<AdjustBalance>,
) -> AppResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let user_id = path.into_inner();

    let mut tx = pool.begin().await?;

    let leave_type = sqlx::query_as::<_, LeaveType>(
        r#"
        SELECT id, code, name, is_paid, default_days, carry_forward,
               max_carry_forward, enforce_balance
        FROM leave_types
        WHERE id = ?
        "#,
    )
    .bind(payload.leave_type_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("leave type"))?;

    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)")
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
    if !exists {
        return Err(AppError::NotFound("user"));
    }

    let mut balance =
        crate::leave::ledger::get_or_create_for_update(&mut tx, user_id, &leave_type, payload.year)
            .await?;

    if let Some(total) = payload.total_days {
        balance.total_days = total;
    }
    if let Some(cf) = payload.carry_forward {
        balance.carry_forward = cf;
    }
    crate::leave::ledger::store(&mut tx, &balance).await?;

    tx.commit().await?;

    info!(user_id, leave_type = %leave_type.code, year = payload.year, editor = auth.user_id, "Balance adjusted");
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Balance adjusted" })))
}

/// Year-end roll: for every carry-forward leave type, move the unused
/// remainder of `year` (capped at `max_carry_forward`) into year + 1.
#[utoipa::path(
    post,
    path = "/api/v1/balances/carry-forward",
    params(CarryForwardQuery),
    responses((status = 200, description = "Carry-forward applied")),
    security(("bearer_auth" = [])),
    tag = "Balances"
)]
pub async fn carry_forward(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<CarryForwardQuery>,
) -> AppResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let year = query.year;

    let mut tx = pool.begin().await?;

    let rows = sqlx::query_as::<_, LeaveBalance>(
        r#"
        SELECT b.id, b.user_id, b.leave_type_id, b.year,
               b.total_days, b.used_days, b.pending_days, b.carry_forward
        FROM leave_balances b
        JOIN leave_types t ON t.id = b.leave_type_id
        WHERE b.year = ? AND t.carry_forward = 1
        FOR UPDATE
        "#,
    )
    .bind(year)
    .fetch_all(&mut *tx)
    .await?;

    let mut rolled = 0usize;
    for row in rows {
        let cap = sqlx::query_scalar::<_, f64>(
            "SELECT max_carry_forward FROM leave_types WHERE id = ?",
        )
        .bind(row.leave_type_id)
        .fetch_one(&mut *tx)
        .await?;

        let leftover =
            (row.total_days + row.carry_forward - row.used_days - row.pending_days).max(0.0);
        let amount = leftover.min(cap);
        if amount <= 0.0 {
            continue;
        }

        // upsert the next-year row; total defaults from the leave type when
        // the row does not exist yet
        sqlx::query(
            r#"
            INSERT INTO leave_balances
                (user_id, leave_type_id, year, total_days, used_days, pending_days, carry_forward)
            SELECT ?, ?, ?, t.default_days, 0, 0, ?
            FROM leave_types t WHERE t.id = ?
            ON DUPLICATE KEY UPDATE carry_forward = VALUES(carry_forward)
            "#,
        )
        .bind(row.user_id)
        .bind(row.leave_type_id)
        .bind(year + 1)
        .bind(amount)
        .bind(row.leave_type_id)
        .execute(&mut *tx)
        .await?;
        rolled += 1;
    }

    tx.commit().await?;

    info!(year, rolled, editor = auth.user_id, "Carry-forward applied");
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Carry-forward applied",
        "rolled": rolled
    })))
}
