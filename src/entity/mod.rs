pub mod items;
pub mod order_items;
pub mod orders;
pub mod reviews;
pub mod users;
pub mod wishlist_items;

pub use items::Entity as Items;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use reviews::Entity as Reviews;
pub use users::Entity as Users;
pub use wishlist_items::Entity as WishlistItems;
