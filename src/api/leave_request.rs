use std::collections::HashSet;

use actix_web::{HttpResponse, web};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::{MySql, MySqlPool, Transaction};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::authz::resolver::{self, Action, Module};
use crate::error::{AppError, AppResult};
use crate::leave::ledger;
use crate::leave::lifecycle::{self, LeaveStatus};
use crate::leave::workdays::{DayType, working_days};
use crate::model::leave_request::LeaveRequest;
use crate::model::leave_type::LeaveType;
use crate::model::role::Role;
use crate::notify;

const REQUEST_COLUMNS: &str = r#"
    id, user_id, leave_type_id, start_date, end_date, days,
    day_type, status, reason, emergency_contact,
    approved_by, approved_at, rejection_reason, created_at
"#;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitLeave {
    #[schema(example = 3)]
    pub leave_type_id: u64,
    #[schema(example = "2024-06-03", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2024-06-04", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    /// `full` or `half`
    #[serde(rename = "type")]
    #[schema(example = "full")]
    pub day_type: DayType,
    #[schema(example = "family event", nullable = true)]
    pub reason: Option<String>,
    #[schema(nullable = true)]
    pub emergency_contact: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RejectLeave {
    #[schema(example = "team is at capacity that week", nullable = true)]
    pub rejection_reason: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveDetail {
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub request: LeaveRequest,
    pub leave_type: LeaveType,
    #[schema(example = 7, nullable = true)]
    pub manager_id: Option<u64>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    /// Filter by user ID (privileged callers only)
    #[schema(example = 123)]
    pub user_id: Option<u64>,
    /// Filter by leave status
    #[schema(example = "pending")]
    pub status: Option<String>,
    /// Pagination page number (start with 1)
    #[schema(example = 1)]
    pub page: Option<u64>,
    /// Pagination per page number
    #[schema(example = 10)]
    pub per_page: Option<u64>,
}

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveRequest>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

async fn fetch_leave_type(
    tx: &mut Transaction<'_, MySql>,
    leave_type_id: u64,
) -> AppResult<LeaveType> {
    sqlx::query_as::<_, LeaveType>(
        r#"
        SELECT id, code, name, is_paid, default_days, carry_forward,
               max_carry_forward, enforce_balance
        FROM leave_types
        WHERE id = ?
        "#,
    )
    .bind(leave_type_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(AppError::NotFound("leave type"))
}

async fn fetch_request_for_update(
    tx: &mut Transaction<'_, MySql>,
    request_id: u64,
) -> AppResult<LeaveRequest> {
    let sql = format!("SELECT {REQUEST_COLUMNS} FROM leave_requests WHERE id = ? FOR UPDATE");
    sqlx::query_as::<_, LeaveRequest>(&sql)
        .bind(request_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(AppError::NotFound("leave request"))
}

async fn fetch_manager_id(
    tx: &mut Transaction<'_, MySql>,
    user_id: u64,
) -> AppResult<Option<u64>> {
    let row = sqlx::query_scalar::<_, Option<u64>>("SELECT manager_id FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?;
    row.ok_or(AppError::NotFound("user"))
}

async fn holidays_in_range(
    tx: &mut Transaction<'_, MySql>,
    start: NaiveDate,
    end: NaiveDate,
) -> AppResult<HashSet<NaiveDate>> {
    let dates = sqlx::query_scalar::<_, NaiveDate>(
        "SELECT date FROM holidays WHERE date BETWEEN ? AND ?",
    )
    .bind(start)
    .bind(end)
    .fetch_all(&mut **tx)
    .await?;
    Ok(dates.into_iter().collect())
}

/// Submit a leave request.
///
/// Runs the whole reserve-then-create sequence in one transaction: the
/// balance row is locked before the overlap and availability checks so two
/// concurrent submissions for the same user cannot both pass.
#[utoipa::path(
    post,
    path = "/api/v1/leave",
    request_body = SubmitLeave,
    responses(
        (status = 201, description = "Leave request created", body = LeaveDetail),
        (status = 400, description = "Invalid dates or no working days in range"),
        (status = 409, description = "Overlapping request already exists"),
        (status = 422, description = "Insufficient balance")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn submit_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<SubmitLeave>,
) -> AppResult<HttpResponse> {
    resolver::authorize(pool.get_ref(), &auth, Module::Leave, Action::Write).await?;
    lifecycle::validate_range(payload.start_date, payload.end_date)?;

    let mut tx = pool.begin().await?;

    let leave_type = fetch_leave_type(&mut tx, payload.leave_type_id).await?;
    let manager_id = fetch_manager_id(&mut tx, auth.user_id).await?;

    let holidays = holidays_in_range(&mut tx, payload.start_date, payload.end_date).await?;
    let days = working_days(
        payload.start_date,
        payload.end_date,
        payload.day_type,
        &holidays,
    );
    lifecycle::ensure_positive_days(days)?;

    // the balance row lock comes first: concurrent submissions for the
    // same user serialize here, so the loser's overlap read below sees the
    // winner's committed request
    let year = payload.start_date.year();
    let mut balance =
        ledger::get_or_create_for_update(&mut tx, auth.user_id, &leave_type, year).await?;

    // overlap: one non-terminal request per user per calendar date
    let existing = sqlx::query_as::<_, (NaiveDate, NaiveDate)>(
        r#"
        SELECT start_date, end_date
        FROM leave_requests
        WHERE user_id = ? AND status IN ('pending', 'approved')
        FOR UPDATE
        "#,
    )
    .bind(auth.user_id)
    .fetch_all(&mut *tx)
    .await?;

    if existing
        .iter()
        .any(|&(s, e)| lifecycle::ranges_overlap(payload.start_date, payload.end_date, s, e))
    {
        return Err(AppError::OverlappingRequest);
    }

    let mut entry = balance.ledger();
    entry.reserve(days, leave_type.enforce_balance)?;
    balance.apply(entry);
    ledger::store(&mut tx, &balance).await?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO leave_requests
            (user_id, leave_type_id, start_date, end_date, days, day_type,
             status, reason, emergency_contact)
        VALUES (?, ?, ?, ?, ?, ?, 'pending', ?, ?)
        "#,
    )
    .bind(auth.user_id)
    .bind(leave_type.id)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(days)
    .bind(payload.day_type.to_string())
    .bind(&payload.reason)
    .bind(&payload.emergency_contact)
    .execute(&mut *tx)
    .await?;

    let request_id = inserted.last_insert_id();

    // notify the manager plus every HR/admin user, minus the requester and
    // the manager (no duplicate notices)
    let mut recipients = Vec::new();
    if let Some(m) = manager_id {
        recipients.push(m);
    }
    let staff = sqlx::query_scalar::<_, u64>(
        "SELECT id FROM users WHERE role_id IN (1, 2) AND is_active = 1 AND id != ?",
    )
    .bind(auth.user_id)
    .fetch_all(&mut *tx)
    .await?;
    recipients.extend(staff);
    recipients.retain(|&id| id != auth.user_id);

    let title = "Leave request submitted";
    let message = format!(
        "{} requested {} day(s) of {} ({} to {})",
        auth.email, days, leave_type.name, payload.start_date, payload.end_date
    );
    let link = format!("/leave/{request_id}");
    notify::notify_all(&mut tx, &recipients, title, &message, "leave", Some(&link)).await;

    tx.commit().await?;

    info!(request_id, user_id = auth.user_id, days, "Leave request submitted");

    let request = fetch_request(pool.get_ref(), request_id).await?;
    Ok(HttpResponse::Created().json(LeaveDetail {
        request,
        leave_type,
        manager_id,
    }))
}

async fn fetch_request(pool: &MySqlPool, request_id: u64) -> AppResult<LeaveRequest> {
    let sql = format!("SELECT {REQUEST_COLUMNS} FROM leave_requests WHERE id = ?");
    sqlx::query_as::<_, LeaveRequest>(&sql)
        .bind(request_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("leave request"))
}

/// Approve a pending request (requester's manager or HR/admin).
#[utoipa::path(
    put,
    path = "/api/v1/leave/{id}/approve",
    params(("id" = u64, Path, description = "Leave request id")),
    responses(
        (status = 200, description = "Leave approved"),
        (status = 403, description = "Not the requester's manager or HR/admin"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Request is not pending")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let request_id = path.into_inner();
    let mut tx = pool.begin().await?;

    let request = fetch_request_for_update(&mut tx, request_id).await?;
    let requester_manager = fetch_manager_id(&mut tx, request.user_id).await?;
    lifecycle::ensure_can_decide(auth.role, auth.user_id, requester_manager)?;
    lifecycle::ensure_pending(LeaveStatus::parse(&request.status)?)?;

    let leave_type = fetch_leave_type(&mut tx, request.leave_type_id).await?;
    let year = request.start_date.year();
    let mut balance =
        ledger::get_or_create_for_update(&mut tx, request.user_id, &leave_type, year).await?;
    let mut entry = balance.ledger();
    entry.commit(request.days);
    balance.apply(entry);
    ledger::store(&mut tx, &balance).await?;

    sqlx::query(
        r#"
        UPDATE leave_requests
        SET status = 'approved', approved_by = ?, approved_at = NOW()
        WHERE id = ?
        "#,
    )
    .bind(auth.user_id)
    .bind(request_id)
    .execute(&mut *tx)
    .await?;

    let message = format!(
        "Your {} request ({} to {}) was approved",
        leave_type.name, request.start_date, request.end_date
    );
    let link = format!("/leave/{request_id}");
    notify::notify(&mut tx, request.user_id, "Leave approved", &message, "leave", Some(&link))
        .await;

    tx.commit().await?;

    info!(request_id, approver = auth.user_id, "Leave approved");
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Leave approved" })))
}

/// Reject a pending request (requester's manager or HR/admin).
#[utoipa::path(
    put,
    path = "/api/v1/leave/{id}/reject",
    params(("id" = u64, Path, description = "Leave request id")),
    request_body = RejectLeave,
    responses(
        (status = 200, description = "Leave rejected"),
        (status = 403, description = "Not the requester's manager or HR/admin"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Request is not pending")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<RejectLeave>,
) -> AppResult<HttpResponse> {
    let request_id = path.into_inner();
    let mut tx = pool.begin().await?;

    let request = fetch_request_for_update(&mut tx, request_id).await?;
    let requester_manager = fetch_manager_id(&mut tx, request.user_id).await?;
    lifecycle::ensure_can_decide(auth.role, auth.user_id, requester_manager)?;
    lifecycle::ensure_pending(LeaveStatus::parse(&request.status)?)?;

    let leave_type = fetch_leave_type(&mut tx, request.leave_type_id).await?;
    let year = request.start_date.year();
    let mut balance =
        ledger::get_or_create_for_update(&mut tx, request.user_id, &leave_type, year).await?;
    let mut entry = balance.ledger();
    entry.release(request.days);
    balance.apply(entry);
    ledger::store(&mut tx, &balance).await?;

    sqlx::query(
        r#"
        UPDATE leave_requests
        SET status = 'rejected', approved_by = ?, approved_at = NOW(), rejection_reason = ?
        WHERE id = ?
        "#,
    )
    .bind(auth.user_id)
    .bind(&payload.rejection_reason)
    .bind(request_id)
    .execute(&mut *tx)
    .await?;

    let message = match &payload.rejection_reason {
        Some(reason) => format!(
            "Your {} request ({} to {}) was rejected: {}",
            leave_type.name, request.start_date, request.end_date, reason
        ),
        None => format!(
            "Your {} request ({} to {}) was rejected",
            leave_type.name, request.start_date, request.end_date
        ),
    };
    let link = format!("/leave/{request_id}");
    notify::notify(&mut tx, request.user_id, "Leave rejected", &message, "leave", Some(&link))
        .await;

    tx.commit().await?;

    info!(request_id, approver = auth.user_id, "Leave rejected");
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Leave rejected" })))
}

/// Cancel one's own pending request.
#[utoipa::path(
    put,
    path = "/api/v1/leave/{id}/cancel",
    params(("id" = u64, Path, description = "Leave request id")),
    responses(
        (status = 200, description = "Leave cancelled"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Request is not pending")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn cancel_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let request_id = path.into_inner();
    let mut tx = pool.begin().await?;

    let request = fetch_request_for_update(&mut tx, request_id).await?;
    lifecycle::ensure_owner(auth.user_id, request.user_id)?;
    lifecycle::ensure_pending(LeaveStatus::parse(&request.status)?)?;

    let leave_type = fetch_leave_type(&mut tx, request.leave_type_id).await?;
    let year = request.start_date.year();
    let mut balance =
        ledger::get_or_create_for_update(&mut tx, request.user_id, &leave_type, year).await?;
    let mut entry = balance.ledger();
    entry.release(request.days);
    balance.apply(entry);
    ledger::store(&mut tx, &balance).await?;

    sqlx::query("UPDATE leave_requests SET status = 'cancelled' WHERE id = ?")
        .bind(request_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!(request_id, user_id = auth.user_id, "Leave cancelled");
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Leave cancelled" })))
}

/// Hard-delete a request (owner or admin).
///
/// Approved requests are never deleted; a pending one releases its
/// reservation first.
#[utoipa::path(
    delete,
    path = "/api/v1/leave/{id}",
    params(("id" = u64, Path, description = "Leave request id")),
    responses(
        (status = 200, description = "Leave request deleted"),
        (status = 403, description = "Not the owner or admin"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Approved requests cannot be deleted")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn delete_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let request_id = path.into_inner();
    let mut tx = pool.begin().await?;

    let request = fetch_request_for_update(&mut tx, request_id).await?;
    lifecycle::ensure_owner_or_admin(auth.role, auth.user_id, request.user_id)?;
    let status = LeaveStatus::parse(&request.status)?;
    lifecycle::ensure_deletable(status)?;

    if status == LeaveStatus::Pending {
        let leave_type = fetch_leave_type(&mut tx, request.leave_type_id).await?;
        let year = request.start_date.year();
        let mut balance =
            ledger::get_or_create_for_update(&mut tx, request.user_id, &leave_type, year).await?;
        let mut entry = balance.ledger();
        entry.release(request.days);
        balance.apply(entry);
        ledger::store(&mut tx, &balance).await?;
    }

    sqlx::query("DELETE FROM leave_requests WHERE id = ?")
        .bind(request_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!(request_id, user_id = auth.user_id, "Leave request deleted");
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Leave request deleted" })))
}

/// Fetch one request: visible to its owner, the owner's manager, or HR/admin.
#[utoipa::path(
    get,
    path = "/api/v1/leave/{id}",
    params(("id" = u64, Path, description = "Leave request id")),
    responses(
        (status = 200, description = "Leave request found", body = LeaveDetail),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let request_id = path.into_inner();
    let request = fetch_request(pool.get_ref(), request_id).await?;

    let manager_id =
        sqlx::query_scalar::<_, Option<u64>>("SELECT manager_id FROM users WHERE id = ?")
            .bind(request.user_id)
            .fetch_optional(pool.get_ref())
            .await?
            .ok_or(AppError::NotFound("user"))?;

    let is_owner = auth.user_id == request.user_id;
    let is_manager = manager_id == Some(auth.user_id);
    if !(is_owner || is_manager || auth.is_privileged()) {
        return Err(AppError::unauthorized("no access to this leave request"));
    }

    let leave_type = sqlx::query_as::<_, LeaveType>(
        r#"
        SELECT id, code, name, is_paid, default_days, carry_forward,
               max_carry_forward, enforce_balance
        FROM leave_types
        WHERE id = ?
        "#,
    )
    .bind(request.leave_type_id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or(AppError::NotFound("leave type"))?;

    Ok(HttpResponse::Ok().json(LeaveDetail {
        request,
        leave_type,
        manager_id,
    }))
}

/// Paginated list, scoped by role: employees see their own requests,
/// managers their team's, HR/admin everything.
#[utoipa::path(
    get,
    path = "/api/v1/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveFilter>,
) -> AppResult<HttpResponse> {
    resolver::authorize(pool.get_ref(), &auth, Module::Leave, Action::Read).await?;

    let per_page = query.per_page.unwrap_or(10).min(100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    match auth.role {
        Role::Admin | Role::Hr => {
            if let Some(user_id) = query.user_id {
                where_sql.push_str(" AND lr.user_id = ?");
                args.push(FilterValue::U64(user_id));
            }
        }
        Role::Manager => {
            // own requests plus direct reports and same-department users
            where_sql.push_str(
                " AND (lr.user_id = ? OR lr.user_id IN ( \
                   SELECT u.id FROM users u WHERE u.manager_id = ? \
                   OR (u.department_id IS NOT NULL AND u.department_id = \
                       (SELECT department_id FROM users WHERE id = ?))))",
            );
            args.push(FilterValue::U64(auth.user_id));
            args.push(FilterValue::U64(auth.user_id));
            args.push(FilterValue::U64(auth.user_id));
        }
        Role::Employee => {
            where_sql.push_str(" AND lr.user_id = ?");
            args.push(FilterValue::U64(auth.user_id));
        }
    }

    if let Some(status) = query.status.as_deref() {
        where_sql.push_str(" AND lr.status = ?");
        args.push(FilterValue::Str(status));
    }

    let count_sql = format!("SELECT COUNT(*) FROM leave_requests lr{}", where_sql);

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(*s),
        };
    }
    let total = count_q.fetch_one(pool.get_ref()).await?;

    let data_sql = format!(
        r#"
        SELECT lr.id, lr.user_id, lr.leave_type_id, lr.start_date, lr.end_date,
               lr.days, lr.day_type, lr.status, lr.reason, lr.emergency_contact,
               lr.approved_by, lr.approved_at, lr.rejection_reason, lr.created_at
        FROM leave_requests lr
        {}
        ORDER BY lr.created_at DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );

    let mut data_q = sqlx::query_as::<_, LeaveRequest>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::Str(s) => data_q.bind(s),
        };
    }

    let requests = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data: requests,
        page: page as u32,
        per_page: per_page as u32,
        total,
    }))
}
