use axum::Router;

use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod doc;
pub mod health;
pub mod items;
pub mod manager;
pub mod orders;
pub mod params;
pub mod reviews;
pub mod users;
pub mod wishlist;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/admin", admin::router())
        .nest("/manager", manager::router())
        .nest("/items", items::router())
        .nest("/orders", orders::router())
        .nest("/reviews", reviews::router())
        .nest("/wishlist", wishlist::router())
}
