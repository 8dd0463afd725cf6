use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, patch},
};

use crate::{
    dto::{
        auth::RegisterRequest,
        users::{AdminList, UpdateRoleRequest},
    },
    error::AppResult,
    middleware::{auth::AuthUser, validate::ValidatedJson},
    models::User,
    response::ApiResponse,
    routes::params::{Pagination, parse_id},
    services::admin_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admins", get(list_admins).post(add_admin))
        .route("/admins/{id}", delete(delete_admin))
        .route("/admins/{id}/role", patch(change_admin_role))
}

#[utoipa::path(
    get,
    path = "/api/manager/admins",
    params(Pagination),
    responses(
        (status = 200, description = "Admins page", body = ApiResponse<AdminList>),
        (status = 403, description = "Manager only")
    ),
    security(("bearer_auth" = [])),
    tag = "Manager"
)]
pub async fn list_admins(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<AdminList>>> {
    let resp = admin_service::list_admins(&state, &user, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/manager/admins",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Admin created", body = ApiResponse<User>),
        (status = 409, description = "Email already in use")
    ),
    security(("bearer_auth" = [])),
    tag = "Manager"
)]
pub async fn add_admin(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<User>>)> {
    let resp = admin_service::add_admin(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    delete,
    path = "/api/manager/admins/{id}",
    params(("id" = String, Path, description = "Admin user ID")),
    responses(
        (status = 200, description = "Admin deleted"),
        (status = 404, description = "Admin not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Manager"
)]
pub async fn delete_admin(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = admin_service::delete_admin(&state, &user, parse_id(&id)?).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/manager/admins/{id}/role",
    params(("id" = String, Path, description = "Admin user ID")),
    request_body = UpdateRoleRequest,
    responses((status = 200, description = "Role changed")),
    security(("bearer_auth" = [])),
    tag = "Manager"
)]
pub async fn change_admin_role(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateRoleRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = admin_service::change_admin_role(&state, &user, parse_id(&id)?, payload.role).await?;
    Ok(Json(resp))
}
