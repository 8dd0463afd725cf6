use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    dto::wishlist::Wishlist,
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::parse_id,
    services::wishlist_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_wishlist))
        .route("/{item_id}", post(add_item).delete(remove_item))
}

#[utoipa::path(
    get,
    path = "/api/wishlist",
    responses((status = 200, description = "Own wishlist", body = ApiResponse<Wishlist>)),
    security(("bearer_auth" = [])),
    tag = "Wishlist"
)]
pub async fn get_wishlist(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Wishlist>>> {
    let resp = wishlist_service::get_wishlist(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/wishlist/{item_id}",
    params(("item_id" = String, Path, description = "Item ID")),
    responses(
        (status = 201, description = "Item added", body = ApiResponse<Wishlist>),
        (status = 404, description = "Item not found"),
        (status = 409, description = "Item already in wishlist")
    ),
    security(("bearer_auth" = [])),
    tag = "Wishlist"
)]
pub async fn add_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_id): Path<String>,
) -> AppResult<(StatusCode, Json<ApiResponse<Wishlist>>)> {
    let resp = wishlist_service::add_item(&state, &user, parse_id(&item_id)?).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    delete,
    path = "/api/wishlist/{item_id}",
    params(("item_id" = String, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item removed"),
        (status = 404, description = "Item not found in wishlist")
    ),
    security(("bearer_auth" = [])),
    tag = "Wishlist"
)]
pub async fn remove_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_id): Path<String>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = wishlist_service::remove_item(&state, &user, parse_id(&item_id)?).await?;
    Ok(Json(resp))
}
