use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    routing::{get, patch, post},
};

use crate::{
    dto::users::{AvatarResponse, ChangePasswordRequest, UpdateProfileRequest},
    error::AppResult,
    middleware::{auth::AuthUser, validate::ValidatedJson},
    models::User,
    response::ApiResponse,
    services::user_service,
    state::AppState,
    upload::{MULTIPART_BODY_LIMIT, UploadKind, read_multipart},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/me",
            get(get_me).patch(update_me).delete(delete_me),
        )
        .route("/me/change-password", patch(change_password))
        .route(
            "/me/avatar",
            post(upload_avatar).layer(DefaultBodyLimit::max(MULTIPART_BODY_LIMIT)),
        )
}

#[utoipa::path(
    get,
    path = "/api/users/me",
    responses(
        (status = 200, description = "Own profile", body = ApiResponse<User>),
        (status = 401, description = "Not authorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = user_service::get_profile(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/users/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = ApiResponse<User>)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_me(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(payload): ValidatedJson<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = user_service::update_profile(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/users/me",
    responses(
        (status = 200, description = "Profile soft-deleted"),
        (status = 403, description = "Only regular users can delete their account")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn delete_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = user_service::delete_profile(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/users/me/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Invalid old password")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(payload): ValidatedJson<ChangePasswordRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = user_service::change_password(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/users/me/avatar",
    request_body(content = String, content_type = "multipart/form-data", description = "Single image in the `avatar` field"),
    responses(
        (status = 200, description = "Avatar stored", body = ApiResponse<AvatarResponse>),
        (status = 400, description = "No file or not an image")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn upload_avatar(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<AvatarResponse>>> {
    let form = read_multipart(multipart, UploadKind::Avatar).await?;
    let resp = user_service::upload_avatar(&state, &user, form.files.into_iter().next()).await?;
    Ok(Json(resp))
}
