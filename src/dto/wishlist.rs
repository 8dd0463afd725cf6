use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct WishlistEntry {
    pub id: Uuid,
    pub name: String,
    pub price: i64,
    pub images: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Wishlist {
    pub user_id: Uuid,
    pub items: Vec<WishlistEntry>,
}
