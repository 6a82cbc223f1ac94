use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::authz::resolver::{self, Action, Module};
use crate::error::{AppError, AppResult};
use crate::model::attendance::Attendance;

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct AttendanceQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Check-in for today. The (user, date) uniqueness constraint turns a
/// second punch into a conflict.
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-in",
    responses(
        (status = 200, description = "Checked in successfully"),
        (status = 409, description = "Already checked in today")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_in(auth: AuthUser, pool: web::Data<MySqlPool>) -> AppResult<HttpResponse> {
    resolver::authorize(pool.get_ref(), &auth, Module::Attendance, Action::Write).await?;

    let result = sqlx::query(
        r#"
        INSERT INTO attendance (user_id, date, check_in)
        VALUES (?, CURDATE(), CURTIME())
        "#,
    )
    .bind(auth.user_id)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(_) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "Checked in successfully"
        }))),
        Err(e) if AppError::is_unique_violation(&e) => {
            Err(AppError::Conflict("already checked in today".into()))
        }
        Err(e) => {
            tracing::error!(error = %e, user_id = auth.user_id, "Check-in failed");
            Err(e.into())
        }
    }
}

/// Check-out: closes today's open check-in.
#[utoipa::path(
    put,
    path = "/api/v1/attendance/check-out",
    responses(
        (status = 200, description = "Checked out successfully"),
        (status = 409, description = "No active check-in found for today")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_out(auth: AuthUser, pool: web::Data<MySqlPool>) -> AppResult<HttpResponse> {
    resolver::authorize(pool.get_ref(), &auth, Module::Attendance, Action::Write).await?;

    let result = sqlx::query(
        r#"
        UPDATE attendance
        SET check_out = CURTIME()
        WHERE user_id = ?
        AND date = CURDATE()
        AND check_out IS NULL
        "#,
    )
    .bind(auth.user_id)
    .execute(pool.get_ref())
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::InvalidState(
            "no active check-in found for today".into(),
        ));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Checked out successfully"
    })))
}

/// The caller's own attendance history, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/attendance",
    params(AttendanceQuery),
    responses((status = 200, description = "Attendance rows", body = [Attendance])),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn my_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AttendanceQuery>,
) -> AppResult<HttpResponse> {
    resolver::authorize(pool.get_ref(), &auth, Module::Attendance, Action::Read).await?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(31).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let rows = sqlx::query_as::<_, Attendance>(
        r#"
        SELECT id, user_id, date, check_in, check_out
        FROM attendance
        WHERE user_id = ?
        ORDER BY date DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(auth.user_id)
    .bind(per_page as i64)
    .bind(offset as i64)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(rows))
}
