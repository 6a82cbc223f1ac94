use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::model::notification::Notification;

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct NotificationQuery {
    /// Only unread notifications
    pub unread: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// The caller's notifications, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    params(NotificationQuery),
    responses((status = 200, description = "Notifications", body = [Notification])),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn my_notifications(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<NotificationQuery>,
) -> AppResult<HttpResponse> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let mut sql = String::from(
        "SELECT id, user_id, title, message, category, link, is_read, created_at \
         FROM notifications WHERE user_id = ?",
    );
    if query.unread == Some(true) {
        sql.push_str(" AND is_read = 0");
    }
    sql.push_str(" ORDER BY created_at DESC LIMIT ? OFFSET ?");

    let rows = sqlx::query_as::<_, Notification>(&sql)
        .bind(auth.user_id)
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(rows))
}

/// Mark one of the caller's notifications as read.
#[utoipa::path(
    put,
    path = "/api/v1/notifications/{id}/read",
    params(("id" = u64, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Notification marked read"),
        (status = 404, description = "Notification not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn mark_read(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let notification_id = path.into_inner();

    let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ?")
        .bind(notification_id)
        .bind(auth.user_id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("notification"));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Notification marked read" })))
}

/// Mark everything read.
#[utoipa::path(
    put,
    path = "/api/v1/notifications/read-all",
    responses((status = 200, description = "All notifications marked read")),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn mark_all_read(auth: AuthUser, pool: web::Data<MySqlPool>) -> AppResult<HttpResponse> {
    sqlx::query("UPDATE notifications SET is_read = 1 WHERE user_id = ? AND is_read = 0")
        .bind(auth.user_id)
        .execute(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "All notifications marked read" })))
}
