use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};

use crate::{
    dto::reviews::{CreateReviewRequest, ReviewList, ReviewWithAuthor, UpdateReviewRequest},
    error::AppResult,
    middleware::{auth::AuthUser, validate::ValidatedJson},
    models::Review,
    response::ApiResponse,
    routes::params::{ReviewQuery, parse_id},
    services::review_service,
    state::AppState,
};

/// `GET`/`POST` on `/{id}` take an item id; `PUT`/`DELETE` take a review id.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_all_reviews)).route(
        "/{id}",
        get(list_item_reviews)
            .post(add_review)
            .put(update_review)
            .delete(delete_review),
    )
}

#[utoipa::path(
    get,
    path = "/api/reviews/{id}",
    params(("id" = String, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Reviews for the item", body = ApiResponse<Vec<ReviewWithAuthor>>)
    ),
    tag = "Reviews"
)]
pub async fn list_item_reviews(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Vec<ReviewWithAuthor>>>> {
    let resp = review_service::list_item_reviews(&state, parse_id(&id)?).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/reviews/{id}",
    params(("id" = String, Path, description = "Item ID")),
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Review added", body = ApiResponse<Review>),
        (status = 403, description = "Item not purchased and received"),
        (status = 409, description = "Already reviewed")
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn add_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<CreateReviewRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Review>>)> {
    let resp = review_service::add_review(&state, &user, parse_id(&id)?, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/reviews/{id}",
    params(("id" = String, Path, description = "Review ID")),
    request_body = UpdateReviewRequest,
    responses(
        (status = 200, description = "Review updated", body = ApiResponse<Review>),
        (status = 404, description = "Review not found or not yours")
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn update_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateReviewRequest>,
) -> AppResult<Json<ApiResponse<Review>>> {
    let resp = review_service::update_review(&state, &user, parse_id(&id)?, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/reviews/{id}",
    params(("id" = String, Path, description = "Review ID")),
    responses(
        (status = 200, description = "Review soft-deleted"),
        (status = 404, description = "Review not found or not yours")
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn delete_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = review_service::delete_review(&state, &user, parse_id(&id)?).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/reviews",
    params(ReviewQuery),
    responses(
        (status = 200, description = "All reviews page", body = ApiResponse<ReviewList>),
        (status = 403, description = "Admin or Manager only")
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn list_all_reviews(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ReviewQuery>,
) -> AppResult<Json<ApiResponse<ReviewList>>> {
    let resp = review_service::list_all_reviews(&state, &user, query).await?;
    Ok(Json(resp))
}
