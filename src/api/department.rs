use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::model::department::Department;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentReq {
    #[schema(example = "Engineering")]
    pub name: String,
    #[schema(example = "Product engineering teams", nullable = true)]
    pub description: Option<String>,
}

/// Create a department; the name is unique.
#[utoipa::path(
    post,
    path = "/api/v1/departments",
    request_body = DepartmentReq,
    responses(
        (status = 201, description = "Department created"),
        (status = 409, description = "Duplicate department name")
    ),
    security(("bearer_auth" = [])),
    tag = "Departments"
)]
pub async fn create_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<DepartmentReq>,
) -> AppResult<HttpResponse> {
    auth.require_hr_or_admin()?;

    if payload.name.trim().is_empty() {
        return Err(AppError::invalid_input("name must not be empty"));
    }

    let result = sqlx::query("INSERT INTO departments (name, description) VALUES (?, ?)")
        .bind(payload.name.trim())
        .bind(&payload.description)
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(res) => {
            info!(department_id = res.last_insert_id(), "Department created");
            Ok(HttpResponse::Created().json(serde_json::json!({
                "message": "Department created",
                "id": res.last_insert_id()
            })))
        }
        Err(e) if AppError::is_unique_violation(&e) => {
            Err(AppError::Conflict("department name already exists".into()))
        }
        Err(e) => Err(e.into()),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/departments",
    responses((status = 200, description = "All departments", body = [Department])),
    security(("bearer_auth" = [])),
    tag = "Departments"
)]
pub async fn list_departments(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> AppResult<HttpResponse> {
    // the catalog is visible to every signed-in user
    let departments = sqlx::query_as::<_, Department>(
        "SELECT id, name, description FROM departments ORDER BY name",
    )
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(departments))
}

/// Rename or re-describe a department. Users reference departments by id,
/// so a rename is this single row update.
#[utoipa::path(
    put,
    path = "/api/v1/departments/{id}",
    params(("id" = u64, Path, description = "Department id")),
    request_body = DepartmentReq,
    responses(
        (status = 200, description = "Department updated"),
        (status = 404, description = "Department not found"),
        (status = 409, description = "Duplicate department name")
    ),
    security(("bearer_auth" = [])),
    tag = "Departments"
)]
pub async fn update_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<DepartmentReq>,
) -> AppResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let department_id = path.into_inner();

    let result = sqlx::query("UPDATE departments SET name = ?, description = ? WHERE id = ?")
        .bind(payload.name.trim())
        .bind(&payload.description)
        .bind(department_id)
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(res) if res.rows_affected() == 0 => Err(AppError::NotFound("department")),
        Ok(_) => Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Department updated" }))),
        Err(e) if AppError::is_unique_violation(&e) => {
            Err(AppError::Conflict("department name already exists".into()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Delete a department; blocked while users still belong to it.
#[utoipa::path(
    delete,
    path = "/api/v1/departments/{id}",
    params(("id" = u64, Path, description = "Department id")),
    responses(
        (status = 200, description = "Department deleted"),
        (status = 404, description = "Department not found"),
        (status = 409, description = "Department still has members")
    ),
    security(("bearer_auth" = [])),
    tag = "Departments"
)]
pub async fn delete_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    let department_id = path.into_inner();

    let members =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE department_id = ?")
            .bind(department_id)
            .fetch_one(pool.get_ref())
            .await?;
    if members > 0 {
        return Err(AppError::Conflict(format!(
            "department still has {members} member(s)"
        )));
    }

    let result = sqlx::query("DELETE FROM departments WHERE id = ?")
        .bind(department_id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("department"));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Department deleted" })))
}
