use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{Order, OrderItem, OrderStatus, PaymentStatus};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    pub item_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    /// Optional client-side price; checked against the catalog, never trusted.
    #[validate(range(min = 0, message = "Price must be a positive number"))]
    pub price: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    #[validate(
        length(min = 1, message = "Order must contain at least one item"),
        nested
    )]
    pub items: Vec<OrderLineRequest>,
    #[validate(length(min = 1, message = "Shipping address is required"))]
    pub address: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentStatusRequest {
    pub payment_status: PaymentStatus,
}

/// Current catalog view of an ordered item.
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderedItem {
    pub id: Uuid,
    pub name: String,
    pub price: i64,
    pub images: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderLine {
    #[serde(flatten)]
    pub line: OrderItem,
    pub item: Option<OrderedItem>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Buyer {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderLine>,
    /// Filled on staff listings only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Buyer>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderList {
    pub orders: Vec<OrderWithItems>,
    pub total_pages: u64,
    pub current_page: u64,
}
