//! Shipping address models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use bookshelf_core::{AddressId, UserId};

/// A required shipping field was missing or blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{0} is required")]
pub struct ShippingDetailsError(pub &'static str);

/// Shipping details submitted at checkout.
///
/// Stored as a fresh `addresses` row owned by the order, so later edits by the
/// customer never change where a past order was shipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ShippingDetails {
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: String,
    pub city: String,
    #[serde(default)]
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl ShippingDetails {
    /// Check that every required field is present.
    ///
    /// # Errors
    ///
    /// Returns the first blank required field.
    pub fn validate(&self) -> Result<(), ShippingDetailsError> {
        let required = [
            ("full_name", &self.full_name),
            ("address_line1", &self.address_line1),
            ("city", &self.city),
            ("postal_code", &self.postal_code),
            ("country", &self.country),
        ];
        match required.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(ShippingDetailsError(field)),
            None => Ok(()),
        }
    }
}

/// A stored shipping address.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub details: ShippingDetails,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn details() -> ShippingDetails {
        ShippingDetails {
            full_name: "Ada Reader".to_string(),
            phone: String::new(),
            address_line1: "1 Library Way".to_string(),
            address_line2: String::new(),
            city: "Springfield".to_string(),
            state: String::new(),
            postal_code: "12345".to_string(),
            country: "US".to_string(),
        }
    }

    #[test]
    fn test_validate_accepts_complete_details() {
        assert_eq!(details().validate(), Ok(()));
    }

    #[test]
    fn test_validate_reports_blank_field() {
        let mut d = details();
        d.city = "   ".to_string();
        assert_eq!(d.validate(), Err(ShippingDetailsError("city")));
    }

    #[test]
    fn test_optional_fields_default() {
        let json = r#"{
            "full_name": "Ada Reader",
            "address_line1": "1 Library Way",
            "city": "Springfield",
            "postal_code": "12345",
            "country": "US"
        }"#;
        let parsed: ShippingDetails = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, details());
    }
}
