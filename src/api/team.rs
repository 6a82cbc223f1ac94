use actix_web::{HttpResponse, web};
use sqlx::MySqlPool;

use crate::auth::auth::AuthUser;
use crate::authz::hierarchy::{self, TreeNode};
use crate::authz::resolver::{self, Action, Module};
use crate::error::{AppError, AppResult};
use crate::model::user::OrgUser;

const ORG_COLUMNS: &str =
    "id, email, first_name, last_name, role_id, department_id, manager_id";

async fn active_org_users(pool: &MySqlPool) -> AppResult<Vec<OrgUser>> {
    let sql = format!("SELECT {ORG_COLUMNS} FROM users WHERE is_active = 1");
    Ok(sqlx::query_as::<_, OrgUser>(&sql).fetch_all(pool).await?)
}

/// The caller's team: direct reports plus same-department colleagues.
/// HR/admin see everyone.
#[utoipa::path(
    get,
    path = "/api/v1/team",
    responses((status = 200, description = "Team members", body = [OrgUser])),
    security(("bearer_auth" = [])),
    tag = "Team"
)]
pub async fn team_members(auth: AuthUser, pool: web::Data<MySqlPool>) -> AppResult<HttpResponse> {
    resolver::authorize(pool.get_ref(), &auth, Module::Team, Action::Read).await?;

    let users = active_org_users(pool.get_ref()).await?;

    if auth.is_privileged() {
        return Ok(HttpResponse::Ok().json(users));
    }

    let me = users
        .iter()
        .find(|u| u.id == auth.user_id)
        .cloned()
        .ok_or(AppError::NotFound("user"))?;

    let team: Vec<OrgUser> = users
        .into_iter()
        .filter(|u| u.id != me.id && hierarchy::in_team_scope(&me, u))
        .collect();

    Ok(HttpResponse::Ok().json(team))
}

/// The full reporting forest (HR/admin or team read access).
#[utoipa::path(
    get,
    path = "/api/v1/team/tree",
    responses((status = 200, description = "Reporting forest", body = [TreeNode])),
    security(("bearer_auth" = [])),
    tag = "Team"
)]
pub async fn org_tree(auth: AuthUser, pool: web::Data<MySqlPool>) -> AppResult<HttpResponse> {
    resolver::authorize(pool.get_ref(), &auth, Module::Team, Action::Read).await?;

    let users = active_org_users(pool.get_ref()).await?;
    let forest = hierarchy::build_tree(users);
    Ok(HttpResponse::Ok().json(forest))
}
