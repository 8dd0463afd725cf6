use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{OrderStatus, PaymentStatus, Role},
};

pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;
const MAX_OFFSET: u64 = i64::MAX as u64;

#[derive(Debug, Default, Clone, Copy, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct Pagination {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl Pagination {
    pub fn new(page: Option<u64>, limit: Option<u64>) -> Self {
        Self { page, limit }
    }

    /// `(page, limit, offset)` with page >= 1 and limit clamped to `1..=MAX_LIMIT`.
    ///
    /// The offset saturates at `i64::MAX`, the largest OFFSET Postgres accepts.
    pub fn normalize(&self) -> (u64, u64, u64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = (page - 1).saturating_mul(limit).min(MAX_OFFSET);
        (page, limit, offset)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Default, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum ItemSortBy {
    #[default]
    CreatedAt,
    Price,
    Name,
    Stock,
}

#[derive(Debug, Default, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum OrderSortBy {
    #[default]
    CreatedAt,
    TotalPrice,
    Status,
}

#[derive(Debug, Default, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum ReviewSortBy {
    #[default]
    CreatedAt,
    Rating,
}

#[derive(Debug, Default, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum UserSortBy {
    #[default]
    CreatedAt,
    Name,
    Email,
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ItemQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Case-insensitive match on name or description.
    pub search: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub sort_by: Option<ItemSortBy>,
    pub sort_order: Option<SortOrder>,
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct MyOrdersQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<OrderStatus>,
    pub sort_by: Option<OrderSortBy>,
    pub sort_order: Option<SortOrder>,
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AllOrdersQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub user_id: Option<Uuid>,
    pub sort_by: Option<OrderSortBy>,
    pub sort_order: Option<SortOrder>,
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ReviewQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub item_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub rating: Option<i32>,
    pub sort_by: Option<ReviewSortBy>,
    pub sort_order: Option<SortOrder>,
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct UserQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Case-insensitive match on name, email or phone.
    pub search: Option<String>,
    pub role: Option<Role>,
    pub is_blocked: Option<bool>,
    pub is_deleted: Option<bool>,
    pub sort_by: Option<UserSortBy>,
    pub sort_order: Option<SortOrder>,
}

macro_rules! impl_pagination {
    ($($query:ty),*) => {
        $(impl $query {
            pub fn pagination(&self) -> Pagination {
                Pagination::new(self.page, self.limit)
            }
        })*
    };
}

impl_pagination!(ItemQuery, MyOrdersQuery, AllOrdersQuery, ReviewQuery, UserQuery);

/// Ids arrive as raw path segments so that garbage reads as a missing resource.
pub fn parse_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::not_found("Resource not found"))
}

/// Blank search strings are treated as absent.
pub fn search_term(search: Option<&String>) -> Option<String> {
    search
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{s}%"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_clamps() {
        assert_eq!(Pagination::default().normalize(), (1, 10, 0));
        assert_eq!(Pagination::new(Some(3), Some(20)).normalize(), (3, 20, 40));
        assert_eq!(Pagination::new(Some(0), Some(0)).normalize(), (1, 1, 0));
        assert_eq!(Pagination::new(Some(2), Some(1000)).normalize(), (2, 100, 100));
    }

    #[test]
    fn huge_page_saturates_offset() {
        let (page, limit, offset) = Pagination::new(Some(u64::MAX), Some(10)).normalize();
        assert_eq!((page, limit), (u64::MAX, 10));
        assert_eq!(offset, i64::MAX as u64);

        let (_, _, offset) = Pagination::new(Some(u64::MAX / 2), None).normalize();
        assert_eq!(offset, i64::MAX as u64);

        let query: ItemQuery = serde_urlencoded_from("page=18446744073709551615");
        assert_eq!(query.pagination().normalize().2, i64::MAX as u64);
    }

    #[test]
    fn query_strings_parse_without_flatten() {
        let query: ItemQuery = serde_urlencoded_from(
            "page=2&limit=5&search=mug&minPrice=100&sortBy=price&sortOrder=asc",
        );
        assert_eq!(query.pagination().normalize(), (2, 5, 5));
        assert_eq!(query.min_price, Some(100));
        assert!(matches!(query.sort_by, Some(ItemSortBy::Price)));
        assert_eq!(query.sort_order, Some(SortOrder::Asc));

        let query: UserQuery = serde_urlencoded_from("isBlocked=true&role=Admin");
        assert_eq!(query.is_blocked, Some(true));
        assert_eq!(query.role, Some(Role::Admin));
    }

    fn serde_urlencoded_from<T: serde::de::DeserializeOwned>(raw: &str) -> T {
        let uri: axum::http::Uri = format!("/?{raw}").parse().unwrap();
        axum::extract::Query::<T>::try_from_uri(&uri).unwrap().0
    }

    #[test]
    fn malformed_ids_are_not_found() {
        let err = parse_id("not-a-uuid").unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::NOT_FOUND);
        assert!(parse_id(&Uuid::new_v4().to_string()).is_ok());
    }

    #[test]
    fn blank_search_is_ignored() {
        assert_eq!(search_term(Some(&"  ".to_string())), None);
        assert_eq!(search_term(Some(&"Mug".to_string())).as_deref(), Some("%Mug%"));
        assert_eq!(search_term(None), None);
    }
}
