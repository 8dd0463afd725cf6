use std::borrow::Cow;

use validator::ValidationError;

pub mod auth;
pub mod items;
pub mod orders;
pub mod reviews;
pub mod users;
pub mod wishlist;

/// Ten digits, nothing else.
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if phone.len() == 10 && phone.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("phone").with_message(Cow::Borrowed("Invalid phone number")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    use crate::dto::{auth::RegisterRequest, orders::CreateOrderRequest, reviews::CreateReviewRequest};

    #[test]
    fn phone_must_be_ten_digits() {
        assert!(validate_phone("0123456789").is_ok());
        assert!(validate_phone("012345678").is_err());
        assert!(validate_phone("01234567ab").is_err());
    }

    #[test]
    fn register_request_reports_first_problem() {
        let req = RegisterRequest {
            email: "not-an-email".into(),
            password: "secret1".into(),
            name: "Jane".into(),
            phone: "0123456789".into(),
        };
        let err = crate::error::AppError::from(req.validate().unwrap_err());
        assert_eq!(err.to_string(), "Invalid email address");
    }

    #[test]
    fn order_requires_lines_and_address() {
        let req: CreateOrderRequest =
            serde_json::from_value(serde_json::json!({ "items": [], "address": "" })).unwrap();
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("items"));
        assert!(fields.contains_key("address"));
    }

    #[test]
    fn order_lines_are_validated() {
        let req: CreateOrderRequest = serde_json::from_value(serde_json::json!({
            "items": [{ "itemId": uuid::Uuid::new_v4(), "quantity": 0 }],
            "address": "1 Main St"
        }))
        .unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn empty_order_reports_line_count_message() {
        let req: CreateOrderRequest = serde_json::from_value(serde_json::json!({
            "items": [],
            "address": "1 Main St"
        }))
        .unwrap();
        let errors = req.validate().unwrap_err();
        let items = &errors.field_errors()["items"];
        assert_eq!(
            items[0].message.as_deref(),
            Some("Order must contain at least one item")
        );
        assert!(items[0].params.contains_key("value"));
    }

    #[test]
    fn rating_is_bounded() {
        let ok = CreateReviewRequest { rating: 5, comment: None };
        assert!(ok.validate().is_ok());
        let bad = CreateReviewRequest { rating: 6, comment: None };
        assert!(bad.validate().is_err());
        let bad = CreateReviewRequest { rating: 0, comment: Some("meh".into()) };
        assert!(bad.validate().is_err());
    }
}
