use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::model::holiday::Holiday;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HolidayReq {
    #[schema(example = "2024-12-25", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "Christmas Day")]
    pub name: String,
    #[serde(default = "default_type")]
    #[schema(example = "public")]
    pub holiday_type: String,
}

fn default_type() -> String {
    "public".to_string()
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct HolidayQuery {
    #[schema(example = "2024-01-01", format = "date", value_type = String)]
    pub from: Option<NaiveDate>,
    #[schema(example = "2024-12-31", format = "date", value_type = String)]
    pub to: Option<NaiveDate>,
}

/// Declare a holiday (HR/admin). One holiday per calendar date.
#[utoipa::path(
    post,
    path = "/api/v1/holidays",
    request_body = HolidayReq,
    responses(
        (status = 201, description = "Holiday created"),
        (status = 409, description = "A holiday already exists on that date")
    ),
    security(("bearer_auth" = [])),
    tag = "Holidays"
)]
pub async fn create_holiday(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<HolidayReq>,
) -> AppResult<HttpResponse> {
    auth.require_hr_or_admin()?;

    if payload.name.trim().is_empty() {
        return Err(AppError::invalid_input("name must not be empty"));
    }

    let result = sqlx::query("INSERT INTO holidays (date, name, holiday_type) VALUES (?, ?, ?)")
        .bind(payload.date)
        .bind(payload.name.trim())
        .bind(&payload.holiday_type)
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(res) => Ok(HttpResponse::Created().json(serde_json::json!({
            "message": "Holiday created",
            "id": res.last_insert_id()
        }))),
        Err(e) if AppError::is_unique_violation(&e) => {
            Err(AppError::Conflict("a holiday already exists on that date".into()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Holiday calendar, optionally restricted to a date range.
#[utoipa::path(
    get,
    path = "/api/v1/holidays",
    params(HolidayQuery),
    responses((status = 200, description = "Holidays in range", body = [Holiday])),
    security(("bearer_auth" = [])),
    tag = "Holidays"
)]
pub async fn list_holidays(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<HolidayQuery>,
) -> AppResult<HttpResponse> {
    let mut sql = String::from("SELECT id, date, name, holiday_type FROM holidays WHERE 1=1");
    if query.from.is_some() {
        sql.push_str(" AND date >= ?");
    }
    if query.to.is_some() {
        sql.push_str(" AND date <= ?");
    }
    sql.push_str(" ORDER BY date");

    let mut q = sqlx::query_as::<_, Holiday>(&sql);
    if let Some(from) = query.from {
        q = q.bind(from);
    }
    if let Some(to) = query.to {
        q = q.bind(to);
    }

    let holidays = q.fetch_all(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(holidays))
}

#[utoipa::path(
    delete,
    path = "/api/v1/holidays/{id}",
    params(("id" = u64, Path, description = "Holiday id")),
    responses(
        (status = 200, description = "Holiday deleted"),
        (status = 404, description = "Holiday not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Holidays"
)]
pub async fn delete_holiday(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let holiday_id = path.into_inner();

    let result = sqlx::query("DELETE FROM holidays WHERE id = ?")
        .bind(holiday_id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("holiday"));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Holiday deleted" })))
}
