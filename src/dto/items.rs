use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::Item,
    upload::MultipartForm,
};

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct CreateItemRequest {
    #[validate(length(min = 1, message = "Item name is required"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 1, message = "Price must be a positive number"))]
    pub price: i64,
    #[serde(default)]
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: i32,
    #[validate(length(min = 1, message = "Category is required"))]
    pub category: String,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateItemRequest {
    #[validate(length(min = 1, message = "Item name is required"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 1, message = "Price must be a positive number"))]
    pub price: Option<i64>,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: Option<i32>,
    #[validate(length(min = 1, message = "Category is required"))]
    pub category: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemList {
    pub items: Vec<Item>,
    pub total_pages: u64,
    pub current_page: u64,
}

fn parse_field<T: std::str::FromStr>(
    form: &MultipartForm,
    name: &str,
    message: &str,
) -> AppResult<Option<T>> {
    match form.text(name).map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| AppError::bad_request(message)),
        None => Ok(None),
    }
}

fn text_field(form: &MultipartForm, name: &str) -> Option<String> {
    form.text(name).map(|v| v.trim().to_string())
}

impl CreateItemRequest {
    /// Build from multipart text fields; rule checks happen in `validate()`.
    pub fn from_form(form: &MultipartForm) -> AppResult<Self> {
        Ok(Self {
            name: text_field(form, "name").unwrap_or_default(),
            description: text_field(form, "description").filter(|d| !d.is_empty()),
            price: parse_field(form, "price", "Price must be a number")?.unwrap_or_default(),
            stock: parse_field(form, "stock", "Stock must be an integer")?.unwrap_or_default(),
            category: text_field(form, "category").unwrap_or_default(),
        })
    }
}

impl UpdateItemRequest {
    pub fn from_form(form: &MultipartForm) -> AppResult<Self> {
        Ok(Self {
            name: text_field(form, "name"),
            description: text_field(form, "description"),
            price: parse_field(form, "price", "Price must be a number")?,
            stock: parse_field(form, "stock", "Stock must be an integer")?,
            category: text_field(form, "category"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    fn form(pairs: &[(&str, &str)]) -> MultipartForm {
        MultipartForm {
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            files: Vec::new(),
        }
    }

    #[test]
    fn create_request_from_text_fields() {
        let req = CreateItemRequest::from_form(&form(&[
            ("name", " Mug "),
            ("price", "1299"),
            ("stock", "5"),
            ("category", "kitchen"),
        ]))
        .unwrap();
        assert_eq!(req.name, "Mug");
        assert_eq!(req.price, 1299);
        assert_eq!(req.stock, 5);
        assert!(req.description.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn non_numeric_price_is_rejected() {
        let err = CreateItemRequest::from_form(&form(&[("price", "cheap")])).unwrap_err();
        assert_eq!(err.to_string(), "Price must be a number");
    }

    #[test]
    fn missing_fields_fail_validation() {
        let req = CreateItemRequest::from_form(&form(&[("price", "10")])).unwrap();
        assert!(req.validate().is_err());

        let req = UpdateItemRequest::from_form(&form(&[("stock", "-1")])).unwrap();
        assert!(req.validate().is_err());
    }
}
