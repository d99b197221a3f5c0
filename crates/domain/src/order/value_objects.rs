//! Value objects for the order domain.

use common::{Money, ProductId};
use serde::{Deserialize, Serialize};

use crate::cart::CartLine;
use crate::product::Product;

/// A required request field was missing or blank.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field} is required")]
pub struct ValidationError {
    pub field: &'static str,
}

impl ValidationError {
    pub fn missing(field: &'static str) -> Self {
        Self { field }
    }
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::missing(field))
    } else {
        Ok(())
    }
}

/// Delivery address captured on the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub full_name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    /// Contact number for the carrier.
    #[serde(default)]
    pub phone: Option<String>,
}

impl ShippingAddress {
    /// Checks that every required field is non-blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("shipping_address.full_name", &self.full_name)?;
        require("shipping_address.street", &self.street)?;
        require("shipping_address.city", &self.city)?;
        require("shipping_address.state", &self.state)?;
        require("shipping_address.postal_code", &self.postal_code)?;
        require("shipping_address.country", &self.country)
    }
}

/// How the customer intends to pay (e.g. `"card"`, `"cash_on_delivery"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentMethod(String);

impl PaymentMethod {
    /// Parses a payment method, trimming surrounding whitespace.
    pub fn parse(method: impl AsRef<str>) -> Result<Self, ValidationError> {
        let method = method.as_ref().trim();
        require("payment_method", method)?;
        Ok(Self(method.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A purchased item, frozen at the time the order was placed.
///
/// Later catalog edits never change a line that has been recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub name: String,
    /// Price per unit when the order was placed.
    pub price: Money,
    pub quantity: u32,
    pub size: String,
    pub color: String,
    /// First product image, or empty when the product had none.
    pub image: String,
}

impl OrderLine {
    /// Captures the current catalog state of `product` for a cart line.
    pub fn snapshot(product: &Product, line: &CartLine) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            price: product.price,
            quantity: line.quantity,
            size: line.size.clone(),
            color: line.color.clone(),
            image: product.primary_image().unwrap_or_default().to_string(),
        }
    }

    /// Returns `price * quantity`.
    pub fn total_price(&self) -> Money {
        self.price.multiply(self.quantity)
    }
}
