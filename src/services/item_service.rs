use chrono::Utc;
use sea_orm::sea_query::{Expr, extension::postgres::PgExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::items::{CreateItemRequest, ItemList, UpdateItemRequest},
    entity::items::{ActiveModel, Column, Entity as Items, Model as ItemModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_capability},
    models::{Capability, Item},
    response::{ApiResponse, Meta, total_pages},
    routes::params::{ItemQuery, ItemSortBy, search_term},
    services::order_of,
    state::AppState,
    upload::{MAX_ITEM_IMAGES, UploadKind, UploadedFile, store_files},
};

pub async fn list_items(state: &AppState, query: ItemQuery) -> AppResult<ApiResponse<ItemList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all().add(Column::IsDeleted.eq(false));

    if let Some(pattern) = search_term(query.search.as_ref()) {
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }
    if let Some(category) = query.category.as_ref().filter(|c| !c.is_empty()) {
        condition = condition.add(Column::Category.eq(category.clone()));
    }
    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::Price.gte(min_price));
    }
    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }

    let sort_col = match query.sort_by.unwrap_or_default() {
        ItemSortBy::CreatedAt => Column::CreatedAt,
        ItemSortBy::Price => Column::Price,
        ItemSortBy::Name => Column::Name,
        ItemSortBy::Stock => Column::Stock,
    };
    let finder = Items::find()
        .filter(condition)
        .order_by(sort_col, order_of(query.sort_order));

    let total = finder.clone().count(&state.orm).await?;
    let items = finder
        .limit(limit)
        .offset(offset)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Item::from)
        .collect();

    let data = ItemList {
        items,
        total_pages: total_pages(total, limit),
        current_page: page,
    };
    Ok(ApiResponse::success(
        "Items fetched successfully",
        data,
        Some(Meta::new(page, limit, total)),
    ))
}

pub(crate) async fn load_live_item(state: &AppState, id: Uuid) -> AppResult<ItemModel> {
    Items::find_by_id(id)
        .one(&state.orm)
        .await?
        .filter(|item| !item.is_deleted)
        .ok_or_else(|| AppError::not_found("Item not found"))
}

pub async fn get_item(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Item>> {
    let item = load_live_item(state, id).await?;
    Ok(ApiResponse::success(
        "Item fetched successfully",
        item.into(),
        Some(Meta::empty()),
    ))
}

pub async fn create_item(
    state: &AppState,
    user: &AuthUser,
    payload: CreateItemRequest,
    images: Vec<UploadedFile>,
) -> AppResult<ApiResponse<Item>> {
    ensure_capability(user, Capability::ManageCatalog)?;
    payload.validate()?;
    if images.len() > MAX_ITEM_IMAGES {
        return Err(AppError::bad_request("Maximum 5 images allowed per item"));
    }

    let image_urls = store_files(&state.config.upload_dir, UploadKind::ItemImage, &images).await?;
    let now = Utc::now().fixed_offset();
    let item = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        description: Set(payload.description),
        price: Set(payload.price),
        stock: Set(payload.stock),
        category: Set(payload.category),
        images: Set(image_urls),
        is_deleted: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(item_id = %item.id, by = %user.user_id, "item created");
    Ok(ApiResponse::success(
        "Item created successfully",
        item.into(),
        Some(Meta::empty()),
    ))
}

/// Uploaded images replace the gallery; no upload keeps it.
pub async fn update_item(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateItemRequest,
    images: Vec<UploadedFile>,
) -> AppResult<ApiResponse<Item>> {
    ensure_capability(user, Capability::ManageCatalog)?;
    payload.validate()?;
    if images.len() > MAX_ITEM_IMAGES {
        return Err(AppError::bad_request("Maximum 5 images allowed per item"));
    }

    let existing = load_live_item(state, id).await?;
    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(stock) = payload.stock {
        active.stock = Set(stock);
    }
    if let Some(category) = payload.category {
        active.category = Set(category);
    }
    if !images.is_empty() {
        let urls = store_files(&state.config.upload_dir, UploadKind::ItemImage, &images).await?;
        active.images = Set(urls);
    }
    active.updated_at = Set(Utc::now().fixed_offset());

    let item = active.update(&state.orm).await?;
    Ok(ApiResponse::success(
        "Item updated successfully",
        item.into(),
        Some(Meta::empty()),
    ))
}

pub async fn delete_item(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_capability(user, Capability::ManageCatalog)?;
    let existing = load_live_item(state, id).await?;

    let mut active: ActiveModel = existing.into();
    active.is_deleted = Set(true);
    active.updated_at = Set(Utc::now().fixed_offset());
    active.update(&state.orm).await?;

    tracing::info!(item_id = %id, by = %user.user_id, "item soft-deleted");
    Ok(ApiResponse::message("Item soft-deleted successfully"))
}
