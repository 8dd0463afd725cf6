mod common;

use sea_orm::EntityTrait;
use storefront_api::{
    dto::{
        orders::{CreateOrderRequest, OrderLineRequest},
        reviews::CreateReviewRequest,
    },
    entity::Items,
    error::AppError,
    middleware::auth::AuthUser,
    models::{OrderStatus, PaymentStatus, Role},
    routes::params::{AllOrdersQuery, MyOrdersQuery},
    services::{order_service, review_service, wishlist_service},
    state::AppState,
};
use uuid::Uuid;

fn order_of(item_id: Uuid, quantity: i32, price: Option<i64>) -> CreateOrderRequest {
    CreateOrderRequest {
        items: vec![OrderLineRequest {
            item_id,
            quantity,
            price,
        }],
        address: "12 Market Street".into(),
    }
}

async fn stock_of(state: &AppState, item_id: Uuid) -> anyhow::Result<i32> {
    let item = Items::find_by_id(item_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("item disappeared"))?;
    Ok(item.stock)
}

// Order placement reserves stock, cancellation returns it, reviews open once the order ships.
#[tokio::test]
async fn order_stock_and_review_flow() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, _mailer) = common::setup_state(&database_url).await?;

    let shopper = common::create_user(
        &state,
        Role::User,
        &common::unique_email("shopper"),
        "secret1",
        true,
    )
    .await?;
    let admin = common::create_user(
        &state,
        Role::Admin,
        &common::unique_email("admin"),
        "secret1",
        true,
    )
    .await?;
    let item_id = common::create_item(&state, "Flow Lamp", 1000, 5).await?;

    let placed = order_service::create_order(&state, &shopper, order_of(item_id, 3, Some(1000)))
        .await?
        .data
        .expect("order data");
    assert_eq!(placed.order.total_price, 3000);
    assert_eq!(placed.order.status, OrderStatus::Pending);
    assert_eq!(placed.items.len(), 1);
    let line_item = placed.items[0].item.as_ref().expect("item details");
    assert_eq!(line_item.name, "Flow Lamp");
    assert_eq!(line_item.price, 1000);
    assert!(placed.user.is_none());
    assert_eq!(stock_of(&state, item_id).await?, 2);

    let err = order_service::create_order(&state, &shopper, order_of(item_id, 3, None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock { available: 2, .. }));
    assert_eq!(stock_of(&state, item_id).await?, 2);

    let err = order_service::create_order(&state, &shopper, order_of(item_id, 1, Some(999)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PriceMismatch { .. }));
    assert_eq!(stock_of(&state, item_id).await?, 2);

    // Reviews stay closed while the order is pending.
    let review = || CreateReviewRequest {
        rating: 5,
        comment: Some("Bright and sturdy".into()),
    };
    let err = review_service::add_review(&state, &shopper, item_id, review())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    order_service::update_order_status(&state, &admin, placed.order.id, OrderStatus::Processing)
        .await?;
    let shipped =
        order_service::update_order_status(&state, &admin, placed.order.id, OrderStatus::Shipped)
            .await?;
    assert_eq!(shipped.message, "Order status updated to Shipped");

    let err =
        order_service::update_order_status(&state, &admin, placed.order.id, OrderStatus::Pending)
            .await
            .unwrap_err();
    assert!(matches!(err, AppError::InvalidStatusTransition { .. }));

    let paid =
        order_service::update_payment_status(&state, &admin, placed.order.id, PaymentStatus::Paid)
            .await?
            .data
            .expect("order data");
    assert_eq!(paid.payment_status, PaymentStatus::Paid);

    review_service::add_review(&state, &shopper, item_id, review()).await?;
    let err = review_service::add_review(&state, &shopper, item_id, review())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let listed = review_service::list_item_reviews(&state, item_id)
        .await?
        .data
        .expect("reviews");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].user_name.as_deref(), Some("Test User"));

    // A second pending order can be cancelled and returns its stock.
    let second = order_service::create_order(&state, &shopper, order_of(item_id, 1, None))
        .await?
        .data
        .expect("order data");
    assert_eq!(stock_of(&state, item_id).await?, 1);

    order_service::cancel_order(&state, &shopper, second.order.id).await?;
    assert_eq!(stock_of(&state, item_id).await?, 2);

    let err = order_service::cancel_order(&state, &shopper, second.order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let staff_view = order_service::list_all_orders(
        &state,
        &admin,
        AllOrdersQuery {
            user_id: Some(shopper.user_id),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("orders");
    assert_eq!(staff_view.orders.len(), 2);
    let buyer = staff_view.orders[0].user.as_ref().expect("buyer details");
    assert_eq!(buyer.name, "Test User");
    assert!(buyer.email.starts_with("shopper-"));

    let page = order_service::list_my_orders(
        &state,
        &shopper,
        MyOrdersQuery {
            limit: Some(1),
            ..Default::default()
        },
    )
    .await?;
    let meta = page.meta.expect("meta");
    assert_eq!(meta.total, Some(2));
    let orders = page.data.expect("orders");
    assert_eq!(orders.orders.len(), 1);
    assert_eq!(orders.total_pages, 2);
    assert_eq!(orders.current_page, 1);

    // Orders belong to their owner only.
    let stranger = AuthUser {
        user_id: admin.user_id,
        role: Role::User,
    };
    let err = order_service::get_my_order(&state, &stranger, placed.order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    Ok(())
}

#[tokio::test]
async fn wishlist_membership_flow() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, _mailer) = common::setup_state(&database_url).await?;

    let shopper = common::create_user(
        &state,
        Role::User,
        &common::unique_email("wisher"),
        "secret1",
        true,
    )
    .await?;
    let wanted = common::create_item(&state, "Wish Kettle", 2500, 3).await?;
    let other = common::create_item(&state, "Wish Toaster", 3100, 3).await?;

    let wishlist = wishlist_service::add_item(&state, &shopper, wanted)
        .await?
        .data
        .expect("wishlist");
    assert_eq!(wishlist.user_id, shopper.user_id);
    assert_eq!(wishlist.items.len(), 1);
    assert_eq!(wishlist.items[0].id, wanted);

    let err = wishlist_service::add_item(&state, &shopper, wanted)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let err = wishlist_service::remove_item(&state, &shopper, other)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    wishlist_service::remove_item(&state, &shopper, wanted).await?;
    let wishlist = wishlist_service::get_wishlist(&state, &shopper)
        .await?
        .data
        .expect("wishlist");
    assert!(wishlist.items.is_empty());

    Ok(())
}

// A failing line undoes the decrements made for earlier lines of the same order.
#[tokio::test]
async fn failed_line_rolls_back_whole_order() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, _mailer) = common::setup_state(&database_url).await?;

    let shopper = common::create_user(
        &state,
        Role::User,
        &common::unique_email("rollback"),
        "secret1",
        true,
    )
    .await?;
    let plenty = common::create_item(&state, "Rollback Chair", 4000, 5).await?;
    let scarce = common::create_item(&state, "Rollback Table", 9000, 1).await?;

    let request = CreateOrderRequest {
        items: vec![
            OrderLineRequest {
                item_id: plenty,
                quantity: 3,
                price: None,
            },
            OrderLineRequest {
                item_id: scarce,
                quantity: 2,
                price: None,
            },
        ],
        address: "12 Market Street".into(),
    };
    let err = order_service::create_order(&state, &shopper, request)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock { available: 1, .. }));

    assert_eq!(stock_of(&state, plenty).await?, 5);
    assert_eq!(stock_of(&state, scarce).await?, 1);

    let orders = order_service::list_my_orders(&state, &shopper, MyOrdersQuery::default())
        .await?
        .data
        .expect("orders");
    assert!(orders.orders.is_empty());

    Ok(())
}

// Two buyers racing for the same stock: the row lock lets only one through.
#[tokio::test]
async fn concurrent_orders_cannot_overdraw_stock() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, _mailer) = common::setup_state(&database_url).await?;

    let first = common::create_user(
        &state,
        Role::User,
        &common::unique_email("racer-one"),
        "secret1",
        true,
    )
    .await?;
    let second = common::create_user(
        &state,
        Role::User,
        &common::unique_email("racer-two"),
        "secret1",
        true,
    )
    .await?;
    let item_id = common::create_item(&state, "Race Bicycle", 150_000, 5).await?;

    let (one, two) = tokio::join!(
        order_service::create_order(&state, &first, order_of(item_id, 3, None)),
        order_service::create_order(&state, &second, order_of(item_id, 3, None)),
    );

    let succeeded = [one.is_ok(), two.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(succeeded, 1);
    let err = one.err().or(two.err()).expect("one order must fail");
    assert!(matches!(err, AppError::InsufficientStock { available: 2, .. }));
    assert_eq!(stock_of(&state, item_id).await?, 2);

    Ok(())
}
