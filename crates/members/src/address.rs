use serde::{Deserialize, Serialize};

use shop_core::{DomainError, DomainResult, ValueObject};

/// Postal address used for members and deliveries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    city: String,
    street: String,
    zipcode: String,
}

impl ValueObject for Address {}

impl Address {
    pub fn new(
        city: impl Into<String>,
        street: impl Into<String>,
        zipcode: impl Into<String>,
    ) -> DomainResult<Self> {
        let address = Self {
            city: city.into(),
            street: street.into(),
            zipcode: zipcode.into(),
        };
        if address.city.trim().is_empty() {
            return Err(DomainError::validation("city cannot be empty"));
        }
        Ok(address)
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn street(&self) -> &str {
        &self.street
    }

    pub fn zipcode(&self) -> &str {
        &self.zipcode
    }
}

impl core::fmt::Display for Address {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} {} ({})", self.city, self.street, self.zipcode)
    }
}
