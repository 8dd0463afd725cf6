use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set, SqlErr,
};
use uuid::Uuid;

use crate::{
    dto::wishlist::{Wishlist, WishlistEntry},
    entity::{
        Items,
        items::Model as ItemModel,
        wishlist_items::{ActiveModel as WishlistActive, Column as WishlistCol, Entity as WishlistItems},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_capability},
    models::Capability,
    response::{ApiResponse, Meta},
    services::item_service::load_live_item,
    state::AppState,
};

fn entry(item: ItemModel) -> WishlistEntry {
    WishlistEntry {
        id: item.id,
        name: item.name,
        price: item.price,
        images: item.images,
    }
}

async fn load_wishlist(state: &AppState, user_id: Uuid) -> AppResult<Wishlist> {
    let items = WishlistItems::find()
        .filter(WishlistCol::UserId.eq(user_id))
        .order_by_asc(WishlistCol::CreatedAt)
        .find_also_related(Items)
        .all(&state.orm)
        .await?
        .into_iter()
        .filter_map(|(_, item)| item)
        .filter(|item| !item.is_deleted)
        .map(entry)
        .collect();
    Ok(Wishlist { user_id, items })
}

pub async fn get_wishlist(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Wishlist>> {
    ensure_capability(user, Capability::ManageWishlist)?;
    let wishlist = load_wishlist(state, user.user_id).await?;
    Ok(ApiResponse::success(
        "Wishlist fetched successfully",
        wishlist,
        Some(Meta::empty()),
    ))
}

pub async fn add_item(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
) -> AppResult<ApiResponse<Wishlist>> {
    ensure_capability(user, Capability::ManageWishlist)?;
    load_live_item(state, item_id).await?;

    WishlistActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        item_id: Set(item_id),
        created_at: Set(Utc::now().fixed_offset()),
    }
    .insert(&state.orm)
    .await
    .map_err(|err| match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::conflict("Item already in wishlist"),
        _ => err.into(),
    })?;

    let wishlist = load_wishlist(state, user.user_id).await?;
    Ok(ApiResponse::success(
        "Item added to wishlist successfully",
        wishlist,
        Some(Meta::empty()),
    ))
}

pub async fn remove_item(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_capability(user, Capability::ManageWishlist)?;
    let result = WishlistItems::delete_many()
        .filter(
            Condition::all()
                .add(WishlistCol::UserId.eq(user.user_id))
                .add(WishlistCol::ItemId.eq(item_id)),
        )
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::not_found("Item not found in wishlist"));
    }
    Ok(ApiResponse::message("Item removed from wishlist successfully"))
}
