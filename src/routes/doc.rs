use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{
            AccessTokenResponse, AuthResponse, ForgotPasswordRequest, LoginRequest,
            RegisterRequest, ResetPasswordRequest, VerifyOtpRequest,
        },
        items::{CreateItemRequest, ItemList, UpdateItemRequest},
        orders::{
            Buyer, CreateOrderRequest, OrderLine, OrderLineRequest, OrderList, OrderWithItems,
            OrderedItem,
            UpdateOrderStatusRequest, UpdatePaymentStatusRequest,
        },
        reviews::{CreateReviewRequest, ReviewList, ReviewWithAuthor, UpdateReviewRequest},
        users::{
            AdminList, AvatarResponse, ChangePasswordRequest, UpdateProfileRequest,
            UpdateRoleRequest, UserList,
        },
        wishlist::{Wishlist, WishlistEntry},
    },
    error::ErrorData,
    models::{Item, Order, OrderItem, OrderStatus, PaymentStatus, Review, Role, User},
    response::{ApiResponse, Meta},
    routes::{admin, auth, health, items, manager, orders, params, reviews, users, wishlist},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::verify_otp,
        auth::login,
        auth::refresh,
        auth::logout,
        auth::forgot_password,
        auth::reset_password,
        users::get_me,
        users::update_me,
        users::delete_me,
        users::change_password,
        users::upload_avatar,
        admin::list_users,
        admin::get_user,
        admin::block_user,
        admin::unblock_user,
        admin::change_user_role,
        admin::delete_user,
        admin::update_profile,
        manager::list_admins,
        manager::add_admin,
        manager::delete_admin,
        manager::change_admin_role,
        items::list_items,
        items::get_item,
        items::create_item,
        items::update_item,
        items::delete_item,
        orders::create_order,
        orders::list_my_orders,
        orders::get_order,
        orders::cancel_order,
        orders::list_all_orders,
        orders::update_status,
        orders::update_payment_status,
        reviews::list_item_reviews,
        reviews::add_review,
        reviews::update_review,
        reviews::delete_review,
        reviews::list_all_reviews,
        wishlist::get_wishlist,
        wishlist::add_item,
        wishlist::remove_item
    ),
    components(
        schemas(
            Role,
            OrderStatus,
            PaymentStatus,
            User,
            Item,
            Order,
            OrderItem,
            Review,
            RegisterRequest,
            VerifyOtpRequest,
            LoginRequest,
            ForgotPasswordRequest,
            ResetPasswordRequest,
            AuthResponse,
            AccessTokenResponse,
            UpdateProfileRequest,
            ChangePasswordRequest,
            UpdateRoleRequest,
            AvatarResponse,
            UserList,
            AdminList,
            CreateItemRequest,
            UpdateItemRequest,
            ItemList,
            CreateOrderRequest,
            OrderLineRequest,
            UpdateOrderStatusRequest,
            UpdatePaymentStatusRequest,
            OrderWithItems,
            OrderLine,
            OrderedItem,
            Buyer,
            OrderList,
            CreateReviewRequest,
            UpdateReviewRequest,
            ReviewWithAuthor,
            ReviewList,
            Wishlist,
            WishlistEntry,
            ErrorData,
            params::SortOrder,
            params::ItemSortBy,
            params::OrderSortBy,
            params::ReviewSortBy,
            params::UserSortBy,
            Meta,
            ApiResponse<User>,
            ApiResponse<Item>,
            ApiResponse<ItemList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<ReviewList>,
            ApiResponse<Wishlist>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration with OTP, login and tokens"),
        (name = "Users", description = "Own profile endpoints"),
        (name = "Admin", description = "User management for Admins and Managers"),
        (name = "Manager", description = "Admin account management"),
        (name = "Items", description = "Catalog endpoints"),
        (name = "Orders", description = "Order placement and fulfilment"),
        (name = "Reviews", description = "Purchase-gated reviews"),
        (name = "Wishlist", description = "Wishlist endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_group_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/api/auth/verify-otp",
            "/api/users/me",
            "/api/admin/users/{id}/block",
            "/api/manager/admins",
            "/api/items/{id}",
            "/api/orders/{id}/payment-status",
            "/api/reviews/{id}",
            "/api/wishlist/{item_id}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} missing");
        }
        assert!(
            doc.components
                .as_ref()
                .is_some_and(|c| c.security_schemes.contains_key("bearer_auth"))
        );
    }
}
