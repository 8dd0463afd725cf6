use sea_orm::Order;

use crate::routes::params::SortOrder;

pub mod admin_service;
pub mod auth_service;
pub mod item_service;
pub mod order_service;
pub mod review_service;
pub mod token_service;
pub mod user_service;
pub mod wishlist_service;

pub(crate) fn order_of(sort_order: Option<SortOrder>) -> Order {
    match sort_order.unwrap_or_default() {
        SortOrder::Asc => Order::Asc,
        SortOrder::Desc => Order::Desc,
    }
}
