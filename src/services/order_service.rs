use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::orders::{
        Buyer, CreateOrderRequest, OrderLine, OrderLineRequest, OrderList, OrderWithItems,
        OrderedItem,
    },
    entity::{
        items::{Column as ItemCol, Entity as Items, Model as ItemModel},
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        users::{Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_capability},
    models::{Capability, Order, OrderStatus, PaymentStatus},
    response::{ApiResponse, Meta, total_pages},
    routes::params::{AllOrdersQuery, MyOrdersQuery, OrderSortBy},
    services::order_of,
    state::AppState,
};

/// Check one requested line against the locked catalog row and return the unit price to charge.
///
/// The catalog price always wins. A client-supplied price is only compared.
pub fn reserve_line(item: Option<&ItemModel>, line: &OrderLineRequest) -> AppResult<i64> {
    let item = item.filter(|i| !i.is_deleted).ok_or_else(|| {
        AppError::not_found(format!(
            "Item with ID {} not found or is deleted",
            line.item_id
        ))
    })?;

    if line.quantity < 1 {
        return Err(AppError::bad_request("Quantity must be at least 1"));
    }
    if item.stock < line.quantity {
        return Err(AppError::InsufficientStock {
            item: item.name.clone(),
            available: item.stock,
        });
    }
    if let Some(client_price) = line.price {
        if client_price != item.price {
            return Err(AppError::PriceMismatch {
                item: item.name.clone(),
            });
        }
    }
    Ok(item.price)
}

fn line_total(total: i64, price: i64, quantity: i32) -> AppResult<i64> {
    price
        .checked_mul(i64::from(quantity))
        .and_then(|subtotal| total.checked_add(subtotal))
        .ok_or_else(|| AppError::bad_request("Order total is too large"))
}

async fn lines_by_order<C: ConnectionTrait>(
    conn: &C,
    order_ids: Vec<Uuid>,
) -> AppResult<HashMap<Uuid, Vec<OrderItemModel>>> {
    let mut grouped: HashMap<Uuid, Vec<OrderItemModel>> = HashMap::new();
    if order_ids.is_empty() {
        return Ok(grouped);
    }
    let lines = OrderItems::find()
        .filter(OrderItemCol::OrderId.is_in(order_ids))
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(conn)
        .await?;
    for line in lines {
        grouped.entry(line.order_id).or_default().push(line);
    }
    Ok(grouped)
}

async fn with_lines<C: ConnectionTrait>(
    conn: &C,
    orders: Vec<OrderModel>,
) -> AppResult<Vec<OrderWithItems>> {
    let mut grouped = lines_by_order(conn, orders.iter().map(|o| o.id).collect()).await?;

    let mut item_ids: Vec<Uuid> = grouped.values().flatten().map(|l| l.item_id).collect();
    item_ids.sort_unstable();
    item_ids.dedup();
    let items: HashMap<Uuid, ItemModel> = if item_ids.is_empty() {
        HashMap::new()
    } else {
        Items::find()
            .filter(ItemCol::Id.is_in(item_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|item| (item.id, item))
            .collect()
    };

    Ok(orders
        .into_iter()
        .map(|order| {
            let lines = grouped
                .remove(&order.id)
                .unwrap_or_default()
                .into_iter()
                .map(|line| OrderLine {
                    item: items.get(&line.item_id).map(|item| OrderedItem {
                        id: item.id,
                        name: item.name.clone(),
                        price: item.price,
                        images: item.images.clone(),
                    }),
                    line: line.into(),
                })
                .collect();
            OrderWithItems {
                order: order.into(),
                items: lines,
                user: None,
            }
        })
        .collect())
}

/// Attach buyer name and email for staff listings.
async fn with_buyers<C: ConnectionTrait>(
    conn: &C,
    mut orders: Vec<OrderWithItems>,
) -> AppResult<Vec<OrderWithItems>> {
    let mut user_ids: Vec<Uuid> = orders.iter().map(|o| o.order.user_id).collect();
    user_ids.sort_unstable();
    user_ids.dedup();
    if user_ids.is_empty() {
        return Ok(orders);
    }

    let buyers: HashMap<Uuid, Buyer> = Users::find()
        .filter(UserCol::Id.is_in(user_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|u| (u.id, Buyer { name: u.name, email: u.email }))
        .collect();
    for order in &mut orders {
        order.user = buyers.get(&order.order.user_id).cloned();
    }
    Ok(orders)
}

/// Put every line's quantity back on its item.
async fn restore_stock<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<()> {
    let lines = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .all(conn)
        .await?;
    let now = Utc::now().fixed_offset();
    for line in lines {
        Items::update_many()
            .col_expr(ItemCol::Stock, Expr::col(ItemCol::Stock).add(line.quantity))
            .col_expr(ItemCol::UpdatedAt, Expr::value(now))
            .filter(ItemCol::Id.eq(line.item_id))
            .exec(conn)
            .await?;
    }
    Ok(())
}

pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_capability(user, Capability::PlaceOrders)?;
    if payload.items.is_empty() {
        return Err(AppError::bad_request("Order must contain at least one item"));
    }

    let txn = state.orm.begin().await?;
    let now = Utc::now().fixed_offset();

    let mut total_price: i64 = 0;
    let mut reserved: Vec<(Uuid, i32, i64)> = Vec::with_capacity(payload.items.len());
    for line in &payload.items {
        let item = Items::find_by_id(line.item_id)
            .lock(LockType::Update)
            .one(&txn)
            .await?;
        let price = reserve_line(item.as_ref(), line)?;
        total_price = line_total(total_price, price, line.quantity)?;

        // reduce stock
        Items::update_many()
            .col_expr(ItemCol::Stock, Expr::col(ItemCol::Stock).sub(line.quantity))
            .col_expr(ItemCol::UpdatedAt, Expr::value(now))
            .filter(ItemCol::Id.eq(line.item_id))
            .exec(&txn)
            .await?;

        reserved.push((line.item_id, line.quantity, price));
    }

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        total_price: Set(total_price),
        address: Set(payload.address.trim().to_string()),
        status: Set(OrderStatus::Pending),
        payment_status: Set(PaymentStatus::Pending),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;

    for (item_id, quantity, price) in reserved {
        OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            item_id: Set(item_id),
            quantity: Set(quantity),
            price: Set(price),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;
    }

    let order_id = order.id;
    let data = with_lines(&txn, vec![order])
        .await?
        .pop()
        .ok_or_else(|| AppError::not_found("Order not found"))?;
    txn.commit().await?;

    tracing::info!(order_id = %order_id, user_id = %user.user_id, total_price, "order created");
    Ok(ApiResponse::success(
        "Order created successfully",
        data,
        Some(Meta::empty()),
    ))
}

pub async fn list_my_orders(
    state: &AppState,
    user: &AuthUser,
    query: MyOrdersQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_capability(user, Capability::PlaceOrders)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let finder = Orders::find()
        .filter(condition)
        .order_by(sort_column(query.sort_by), order_of(query.sort_order));
    let total = finder.clone().count(&state.orm).await?;
    let orders = finder.limit(limit).offset(offset).all(&state.orm).await?;

    let data = OrderList {
        orders: with_lines(&state.orm, orders).await?,
        total_pages: total_pages(total, limit),
        current_page: page,
    };
    Ok(ApiResponse::success(
        "Orders fetched successfully",
        data,
        Some(Meta::new(page, limit, total)),
    ))
}

fn sort_column(sort_by: Option<OrderSortBy>) -> OrderCol {
    match sort_by.unwrap_or_default() {
        OrderSortBy::CreatedAt => OrderCol::CreatedAt,
        OrderSortBy::TotalPrice => OrderCol::TotalPrice,
        OrderSortBy::Status => OrderCol::Status,
    }
}

pub async fn get_my_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_capability(user, Capability::PlaceOrders)?;
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::Id.eq(id))
                .add(OrderCol::UserId.eq(user.user_id)),
        )
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))?;

    let data = with_lines(&state.orm, vec![order])
        .await?
        .pop()
        .ok_or_else(|| AppError::not_found("Order not found"))?;
    Ok(ApiResponse::success(
        "Order fetched successfully",
        data,
        Some(Meta::empty()),
    ))
}

pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_capability(user, Capability::PlaceOrders)?;
    let txn = state.orm.begin().await?;

    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::Id.eq(id))
                .add(OrderCol::UserId.eq(user.user_id)),
        )
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))?;

    if order.status != OrderStatus::Pending {
        return Err(AppError::bad_request("Only pending orders can be cancelled"));
    }

    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::Cancelled);
    active.updated_at = Set(Utc::now().fixed_offset());
    active.update(&txn).await?;

    restore_stock(&txn, id).await?;
    txn.commit().await?;

    tracing::info!(order_id = %id, user_id = %user.user_id, "order cancelled");
    Ok(ApiResponse::message("Order cancelled successfully"))
}

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: AllOrdersQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_capability(user, Capability::ManageOrders)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }
    if let Some(payment_status) = query.payment_status {
        condition = condition.add(OrderCol::PaymentStatus.eq(payment_status));
    }
    if let Some(user_id) = query.user_id {
        condition = condition.add(OrderCol::UserId.eq(user_id));
    }

    let finder = Orders::find()
        .filter(condition)
        .order_by(sort_column(query.sort_by), order_of(query.sort_order));
    let total = finder.clone().count(&state.orm).await?;
    let orders = finder.limit(limit).offset(offset).all(&state.orm).await?;

    let orders = with_lines(&state.orm, orders).await?;
    let data = OrderList {
        orders: with_buyers(&state.orm, orders).await?,
        total_pages: total_pages(total, limit),
        current_page: page,
    };
    Ok(ApiResponse::success(
        "Orders fetched successfully",
        data,
        Some(Meta::new(page, limit, total)),
    ))
}

/// Staff status change. Moving to Cancelled restores stock the same way a buyer cancellation does.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    status: OrderStatus,
) -> AppResult<ApiResponse<Order>> {
    ensure_capability(user, Capability::ManageOrders)?;
    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))?;

    if !order.status.can_transition_to(status) {
        return Err(AppError::InvalidStatusTransition {
            from: order.status,
            to: status,
        });
    }

    let mut active: OrderActive = order.into();
    active.status = Set(status);
    active.updated_at = Set(Utc::now().fixed_offset());
    let order = active.update(&txn).await?;

    if status == OrderStatus::Cancelled {
        restore_stock(&txn, id).await?;
    }
    txn.commit().await?;

    tracing::info!(order_id = %id, status = %status, by = %user.user_id, "order status updated");
    Ok(ApiResponse::success(
        format!("Order status updated to {status}"),
        order.into(),
        Some(Meta::empty()),
    ))
}

pub async fn update_payment_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payment_status: PaymentStatus,
) -> AppResult<ApiResponse<Order>> {
    ensure_capability(user, Capability::ManageOrders)?;
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))?;

    let mut active: OrderActive = order.into();
    active.payment_status = Set(payment_status);
    active.updated_at = Set(Utc::now().fixed_offset());
    let order = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Payment status updated",
        order.into(),
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(stock: i32, price: i64) -> ItemModel {
        let now = Utc::now().fixed_offset();
        ItemModel {
            id: Uuid::new_v4(),
            name: "Mug".into(),
            description: None,
            price,
            stock,
            category: "kitchen".into(),
            images: Vec::new(),
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn line(item: &ItemModel, quantity: i32, price: Option<i64>) -> OrderLineRequest {
        OrderLineRequest {
            item_id: item.id,
            quantity,
            price,
        }
    }

    #[test]
    fn reserves_at_catalog_price() {
        let mug = item(5, 1200);
        assert_eq!(reserve_line(Some(&mug), &line(&mug, 3, None)).unwrap(), 1200);
        assert_eq!(reserve_line(Some(&mug), &line(&mug, 5, Some(1200))).unwrap(), 1200);
    }

    #[test]
    fn rejects_more_than_available() {
        let mug = item(2, 1200);
        let err = reserve_line(Some(&mug), &line(&mug, 3, None)).unwrap_err();
        assert_eq!(err.to_string(), "Not enough stock for item Mug. Available: 2");
        assert_eq!(err.code(), "insufficient_stock");
    }

    #[test]
    fn rejects_missing_or_deleted_items() {
        let mut mug = item(5, 1200);
        let err = reserve_line(None, &line(&mug, 1, None)).unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::NOT_FOUND);
        assert!(err.to_string().contains(&mug.id.to_string()));

        mug.is_deleted = true;
        assert!(reserve_line(Some(&mug), &line(&mug, 1, None)).is_err());
    }

    #[test]
    fn rejects_client_price_drift() {
        let mug = item(5, 1200);
        let err = reserve_line(Some(&mug), &line(&mug, 1, Some(1))).unwrap_err();
        assert_eq!(err.code(), "price_mismatch");
    }

    #[test]
    fn totals_accumulate_and_guard_overflow() {
        assert_eq!(line_total(0, 1200, 3).unwrap(), 3600);
        assert_eq!(line_total(3600, 500, 2).unwrap(), 4600);
        assert!(line_total(i64::MAX, 1, 1).is_err());
    }
}
