//! Catalog product and its stock counters.

use common::{Money, ProductId};
use serde::{Deserialize, Serialize};

/// A catalog product as seen by the order core.
///
/// `stock` and `sold` are unsigned, so neither can ever go below zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Price per unit.
    pub price: Money,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    /// Units available for sale.
    pub stock: u32,
    /// Units sold so far.
    #[serde(default)]
    pub sold: u32,
}

/// A reservation asked for more units than are available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("insufficient stock: requested {requested}, available {available}")]
pub struct InsufficientStock {
    pub requested: u32,
    pub available: u32,
}

impl Product {
    /// Creates a product with a fresh id and no sales.
    pub fn new(name: impl Into<String>, price: Money, stock: u32) -> Self {
        Self {
            id: ProductId::new(),
            name: name.into(),
            description: String::new(),
            price,
            images: Vec::new(),
            sizes: Vec::new(),
            colors: Vec::new(),
            stock,
            sold: 0,
        }
    }

    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    pub fn has_stock_for(&self, quantity: u32) -> bool {
        self.stock >= quantity
    }

    /// Moves `quantity` units from stock to sold, or fails without
    /// touching either counter.
    pub fn reserve(&mut self, quantity: u32) -> Result<(), InsufficientStock> {
        if !self.has_stock_for(quantity) {
            return Err(InsufficientStock {
                requested: quantity,
                available: self.stock,
            });
        }
        self.stock -= quantity;
        self.sold = self.sold.saturating_add(quantity);
        Ok(())
    }

    /// Returns `quantity` units to stock. `sold` is clamped at zero.
    pub fn restore(&mut self, quantity: u32) {
        self.stock = self.stock.saturating_add(quantity);
        self.sold = self.sold.saturating_sub(quantity);
    }
}
