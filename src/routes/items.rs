use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::get,
};

use crate::{
    dto::items::{CreateItemRequest, ItemList, UpdateItemRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Item,
    response::ApiResponse,
    routes::params::{ItemQuery, parse_id},
    services::item_service,
    state::AppState,
    upload::{MULTIPART_BODY_LIMIT, UploadKind, read_multipart},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route(
            "/{id}",
            get(get_item).patch(update_item).delete(delete_item),
        )
        .layer(DefaultBodyLimit::max(MULTIPART_BODY_LIMIT))
}

#[utoipa::path(
    get,
    path = "/api/items",
    params(ItemQuery),
    responses(
        (status = 200, description = "Items page", body = ApiResponse<ItemList>)
    ),
    tag = "Items"
)]
pub async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<ItemQuery>,
) -> AppResult<Json<ApiResponse<ItemList>>> {
    let resp = item_service::list_items(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/items/{id}",
    params(("id" = String, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item", body = ApiResponse<Item>),
        (status = 404, description = "Item not found")
    ),
    tag = "Items"
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Item>>> {
    let resp = item_service::get_item(&state, parse_id(&id)?).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/items",
    request_body(
        content = String,
        content_type = "multipart/form-data",
        description = "Text fields name, description, price, stock, category; up to 5 files in `images`"
    ),
    responses(
        (status = 201, description = "Item created", body = ApiResponse<Item>),
        (status = 400, description = "Validation or upload error")
    ),
    security(("bearer_auth" = [])),
    tag = "Items"
)]
pub async fn create_item(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<ApiResponse<Item>>)> {
    let form = read_multipart(multipart, UploadKind::ItemImage).await?;
    let payload = CreateItemRequest::from_form(&form)?;
    let resp = item_service::create_item(&state, &user, payload, form.files).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    patch,
    path = "/api/items/{id}",
    params(("id" = String, Path, description = "Item ID")),
    request_body(
        content = String,
        content_type = "multipart/form-data",
        description = "Any of name, description, price, stock, category; new `images` replace the gallery"
    ),
    responses(
        (status = 200, description = "Item updated", body = ApiResponse<Item>),
        (status = 404, description = "Item not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Items"
)]
pub async fn update_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<Item>>> {
    let id = parse_id(&id)?;
    let form = read_multipart(multipart, UploadKind::ItemImage).await?;
    let payload = UpdateItemRequest::from_form(&form)?;
    let resp = item_service::update_item(&state, &user, id, payload, form.files).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/items/{id}",
    params(("id" = String, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item soft-deleted"),
        (status = 404, description = "Item not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Items"
)]
pub async fn delete_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = item_service::delete_item(&state, &user, parse_id(&id)?).await?;
    Ok(Json(resp))
}
