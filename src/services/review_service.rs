use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, Iterable, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
};
use uuid::Uuid;

use crate::{
    dto::reviews::{CreateReviewRequest, ReviewList, ReviewWithAuthor, UpdateReviewRequest},
    entity::{
        OrderItems, Orders, Users,
        order_items::Column as OrderItemCol,
        orders::Column as OrderCol,
        reviews::{ActiveModel as ReviewActive, Column as ReviewCol, Entity as Reviews, Model as ReviewModel},
        users::Model as UserModel,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_capability},
    models::{Capability, OrderStatus, Review},
    response::{ApiResponse, Meta, total_pages},
    routes::params::{ReviewQuery, ReviewSortBy},
    services::{item_service::load_live_item, order_of},
    state::AppState,
};

fn with_author((review, author): (ReviewModel, Option<UserModel>)) -> ReviewWithAuthor {
    ReviewWithAuthor {
        review: review.into(),
        user_name: author.map(|u| u.name),
    }
}

pub async fn list_item_reviews(
    state: &AppState,
    item_id: Uuid,
) -> AppResult<ApiResponse<Vec<ReviewWithAuthor>>> {
    let reviews = Reviews::find()
        .filter(
            Condition::all()
                .add(ReviewCol::ItemId.eq(item_id))
                .add(ReviewCol::IsDeleted.eq(false)),
        )
        .order_by_desc(ReviewCol::CreatedAt)
        .find_also_related(Users)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(with_author)
        .collect();

    Ok(ApiResponse::success(
        "Reviews fetched successfully",
        reviews,
        Some(Meta::empty()),
    ))
}

/// True when the user has a shipped or delivered order containing the item.
async fn has_received(state: &AppState, user_id: Uuid, item_id: Uuid) -> AppResult<bool> {
    let count = OrderItems::find()
        .inner_join(Orders)
        .filter(
            Condition::all()
                .add(OrderItemCol::ItemId.eq(item_id))
                .add(OrderCol::UserId.eq(user_id))
                .add(OrderCol::Status.is_in(OrderStatus::iter().filter(|s| s.is_fulfilled()))),
        )
        .count(&state.orm)
        .await?;
    Ok(count > 0)
}

async fn active_review(
    state: &AppState,
    user_id: Uuid,
    item_id: Uuid,
) -> AppResult<Option<ReviewModel>> {
    Ok(Reviews::find()
        .filter(
            Condition::all()
                .add(ReviewCol::UserId.eq(user_id))
                .add(ReviewCol::ItemId.eq(item_id))
                .add(ReviewCol::IsDeleted.eq(false)),
        )
        .one(&state.orm)
        .await?)
}

pub async fn add_review(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
    payload: CreateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    ensure_capability(user, Capability::WriteReviews)?;
    load_live_item(state, item_id).await?;

    if !has_received(state, user.user_id, item_id).await? {
        return Err(AppError::forbidden(
            "You can only review items you have purchased and received.",
        ));
    }
    if active_review(state, user.user_id, item_id).await?.is_some() {
        return Err(AppError::conflict("You have already reviewed this item."));
    }

    let now = Utc::now().fixed_offset();
    let review = ReviewActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        item_id: Set(item_id),
        rating: Set(payload.rating),
        comment: Set(payload.comment),
        is_deleted: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.orm)
    .await
    .map_err(|err| match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::conflict("You have already reviewed this item.")
        }
        _ => err.into(),
    })?;

    tracing::info!(review_id = %review.id, item_id = %item_id, "review added");
    Ok(ApiResponse::success(
        "Review added successfully",
        review.into(),
        Some(Meta::empty()),
    ))
}

async fn own_review(state: &AppState, id: Uuid, user_id: Uuid) -> AppResult<Option<ReviewModel>> {
    Ok(Reviews::find()
        .filter(
            Condition::all()
                .add(ReviewCol::Id.eq(id))
                .add(ReviewCol::UserId.eq(user_id))
                .add(ReviewCol::IsDeleted.eq(false)),
        )
        .one(&state.orm)
        .await?)
}

pub async fn update_review(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    ensure_capability(user, Capability::WriteReviews)?;
    let review = own_review(state, id, user.user_id).await?.ok_or_else(|| {
        AppError::not_found("Review not found or you are not authorized to update it.")
    })?;

    let mut active: ReviewActive = review.into();
    if let Some(rating) = payload.rating {
        active.rating = Set(rating);
    }
    if let Some(comment) = payload.comment {
        active.comment = Set(Some(comment));
    }
    active.updated_at = Set(Utc::now().fixed_offset());
    let review = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Review updated successfully",
        review.into(),
        Some(Meta::empty()),
    ))
}

pub async fn delete_review(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_capability(user, Capability::WriteReviews)?;
    let review = own_review(state, id, user.user_id).await?.ok_or_else(|| {
        AppError::not_found("Review not found or you are not authorized to delete it.")
    })?;

    let mut active: ReviewActive = review.into();
    active.is_deleted = Set(true);
    active.updated_at = Set(Utc::now().fixed_offset());
    active.update(&state.orm).await?;

    Ok(ApiResponse::message("Review soft-deleted successfully"))
}

pub async fn list_all_reviews(
    state: &AppState,
    user: &AuthUser,
    query: ReviewQuery,
) -> AppResult<ApiResponse<ReviewList>> {
    ensure_capability(user, Capability::ModerateReviews)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all().add(ReviewCol::IsDeleted.eq(false));
    if let Some(item_id) = query.item_id {
        condition = condition.add(ReviewCol::ItemId.eq(item_id));
    }
    if let Some(user_id) = query.user_id {
        condition = condition.add(ReviewCol::UserId.eq(user_id));
    }
    if let Some(rating) = query.rating {
        condition = condition.add(ReviewCol::Rating.eq(rating));
    }

    let total = Reviews::find()
        .filter(condition.clone())
        .count(&state.orm)
        .await?;

    let sort_col = match query.sort_by.unwrap_or_default() {
        ReviewSortBy::CreatedAt => ReviewCol::CreatedAt,
        ReviewSortBy::Rating => ReviewCol::Rating,
    };
    let reviews = Reviews::find()
        .filter(condition)
        .order_by(sort_col, order_of(query.sort_order))
        .limit(limit)
        .offset(offset)
        .find_also_related(Users)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(with_author)
        .collect();

    let data = ReviewList {
        reviews,
        total_pages: total_pages(total, limit),
        current_page: page,
    };
    Ok(ApiResponse::success(
        "Reviews fetched successfully",
        data,
        Some(Meta::new(page, limit, total)),
    ))
}
