//! Product Aggregate

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
pub const ACCEPTED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/webp"];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub is_sold: bool,
    pub collection: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn is_available(&self) -> bool { !self.is_sold }

    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        let hit = |s: &Option<String>| s.as_deref().is_some_and(|v| v.to_lowercase().contains(&needle));
        self.name.to_lowercase().contains(&needle) || hit(&self.description) || hit(&self.collection)
    }
}

/// Admin-supplied fields for creating or editing a product.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct ProductInput {
    #[validate(length(min = 3, message = "name must be at least 3 characters"))]
    pub name: String,
    pub description: Option<String>,
    pub collection: Option<String>,
    #[validate(custom = "validate_price")]
    pub price: Decimal,
    pub image_url: Option<String>,
}

impl ProductInput {
    /// Blank optional strings are stored as absent.
    pub fn normalized(mut self) -> Self {
        let blank_to_none = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        self.name = self.name.trim().to_string();
        self.description = blank_to_none(self.description);
        self.collection = blank_to_none(self.collection);
        self.image_url = blank_to_none(self.image_url);
        self
    }
}

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if *price > Decimal::ZERO { return Ok(()); }
    let mut err = ValidationError::new("positive");
    err.message = Some(Cow::from("price must be a positive number"));
    Err(err)
}

/// Metadata of an uploaded product image, checked before it is forwarded to storage.
#[derive(Clone, Debug)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub size: usize,
}

impl ImageUpload {
    pub fn check(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.size > MAX_IMAGE_BYTES {
            let mut err = ValidationError::new("max_size");
            err.message = Some(Cow::from("image must be at most 5MB"));
            errors.add("image", err);
        }
        if !ACCEPTED_IMAGE_TYPES.contains(&self.content_type.as_str()) {
            let mut err = ValidationError::new("content_type");
            err.message = Some(Cow::from("only .jpg, .jpeg, .png and .webp images are accepted"));
            errors.add("image", err);
        }
        if self.file_name.trim().is_empty() {
            let mut err = ValidationError::new("required");
            err.message = Some(Cow::from("image file name is required"));
            errors.add("image", err);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Storage object name: timestamp prefix plus a sanitized file name.
    pub fn object_name(&self, now: DateTime<Utc>) -> String {
        let clean: String = self
            .file_name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '-' })
            .collect();
        format!("{}-{}", now.timestamp_millis(), clean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, price: i64) -> ProductInput {
        ProductInput { name: name.into(), description: None, collection: None, price: Decimal::new(price, 0), image_url: None }
    }

    #[test]
    fn test_product_input_rules() {
        assert!(input("Anillo Sello", 25000).validate().is_ok());
        let errs = input("An", 0).validate().unwrap_err();
        let fields = errs.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("price"));
        assert!(input("Cadena", -10).validate().is_err());
    }

    #[test]
    fn test_normalized_drops_blank_fields() {
        let mut i = input("  Aros Colgantes ", 18500);
        i.collection = Some("   ".into());
        i.description = Some(" minimalista ".into());
        let i = i.normalized();
        assert_eq!(i.name, "Aros Colgantes");
        assert_eq!(i.collection, None);
        assert_eq!(i.description.as_deref(), Some("minimalista"));
    }

    #[test]
    fn test_image_checks() {
        let ok = ImageUpload { file_name: "ring.png".into(), content_type: "image/png".into(), size: 1024 };
        assert!(ok.check().is_ok());
        let big = ImageUpload { size: MAX_IMAGE_BYTES + 1, ..ok.clone() };
        assert!(big.check().unwrap_err().field_errors().contains_key("image"));
        let gif = ImageUpload { content_type: "image/gif".into(), ..ok.clone() };
        assert!(gif.check().is_err());
        assert!(ok.object_name(Utc::now()).ends_with("-ring.png"));
    }

    #[test]
    fn test_search_matching() {
        let p = Product {
            id: 1, name: "Anillo Infinito".into(), description: Some("ideal para regalar".into()), price: Decimal::new(19900, 0),
            image_url: None, is_sold: false, collection: Some("Verano".into()), created_at: Utc::now(),
        };
        assert!(p.matches("anillo"));
        assert!(p.matches("REGALAR"));
        assert!(p.matches("vera"));
        assert!(!p.matches("cadena"));
        assert!(p.is_available());
    }
}
