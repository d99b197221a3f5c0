//! Shopping cart owned by a single user.

use chrono::{DateTime, Utc};
use common::{CartId, CartLineId, Money, ProductId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::product::Product;

/// Errors raised by cart rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// A required field was missing or blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Quantity must be at least one.
    #[error("Invalid quantity: {quantity} (must be at least 1)")]
    InvalidQuantity { quantity: u32 },

    /// The requested quantity exceeds what the product has in stock.
    #[error("Insufficient stock for {product_name}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        product_name: String,
        requested: u32,
        available: u32,
    },

    /// The cart total would no longer fit in the money representation.
    #[error("Cart total exceeds the largest supported amount")]
    AmountTooLarge,

    /// No line with this id exists in the cart.
    #[error("Cart line not found: {0}")]
    LineNotFound(CartLineId),

    /// The line refers to a different product than the one supplied.
    #[error("Cart line {line_id} does not hold product {product_id}")]
    ProductMismatch {
        line_id: CartLineId,
        product_id: ProductId,
    },
}

/// One `(product, size, color)` selection inside a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: CartLineId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub size: String,
    pub color: String,
    /// Unit price captured when the line was added.
    pub price: Money,
}

impl CartLine {
    fn matches(&self, product_id: ProductId, size: &str, color: &str) -> bool {
        self.product_id == product_id && self.size == size && self.color == color
    }

    pub fn total_price(&self) -> Money {
        self.price.multiply(self.quantity)
    }
}

/// A user's cart. Lines keep insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub lines: Vec<CartLine>,
    /// Running `Σ price × quantity` over all lines.
    pub total_price: Money,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Creates an empty cart for a user.
    pub fn new(user_id: UserId) -> Self {
        Self {
            id: CartId::new(),
            user_id,
            lines: Vec::new(),
            total_price: Money::zero(),
            updated_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, line_id: CartLineId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.id == line_id)
    }

    /// Adds `quantity` of `product` in the given size and color.
    ///
    /// An existing line with the same product, size and color has its
    /// quantity increased instead of a duplicate line being created. The
    /// resulting line quantity must be covered by the product's stock.
    pub fn add_item(
        &mut self,
        product: &Product,
        quantity: u32,
        size: &str,
        color: &str,
    ) -> Result<CartLineId, CartError> {
        let size = size.trim();
        let color = color.trim();
        if size.is_empty() {
            return Err(CartError::MissingField("size"));
        }
        if color.is_empty() {
            return Err(CartError::MissingField("color"));
        }
        if quantity == 0 {
            return Err(CartError::InvalidQuantity { quantity });
        }

        let existing = self
            .lines
            .iter()
            .position(|line| line.matches(product.id, size, color));

        let new_quantity = match existing {
            Some(index) => self.lines[index].quantity.saturating_add(quantity),
            None => quantity,
        };
        check_stock(product, new_quantity)?;
        let price = existing.map_or(product.price, |index| self.lines[index].price);
        self.total_after(existing, price, new_quantity)?;

        let line_id = match existing {
            Some(index) => {
                let line = &mut self.lines[index];
                line.quantity = new_quantity;
                line.id
            }
            None => {
                let line = CartLine {
                    id: CartLineId::new(),
                    product_id: product.id,
                    quantity,
                    size: size.to_string(),
                    color: color.to_string(),
                    price: product.price,
                };
                let id = line.id;
                self.lines.push(line);
                id
            }
        };

        self.touch();
        Ok(line_id)
    }

    /// Sets the quantity of an existing line.
    pub fn update_quantity(
        &mut self,
        line_id: CartLineId,
        product: &Product,
        quantity: u32,
    ) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity { quantity });
        }

        let index = self
            .lines
            .iter()
            .position(|line| line.id == line_id)
            .ok_or(CartError::LineNotFound(line_id))?;
        if self.lines[index].product_id != product.id {
            return Err(CartError::ProductMismatch {
                line_id,
                product_id: product.id,
            });
        }
        check_stock(product, quantity)?;
        self.total_after(Some(index), self.lines[index].price, quantity)?;

        self.lines[index].quantity = quantity;
        self.touch();
        Ok(())
    }

    /// Removes a line. Removing an unknown line is a no-op.
    pub fn remove_line(&mut self, line_id: CartLineId) {
        self.lines.retain(|line| line.id != line_id);
        self.touch();
    }

    /// Removes every line and resets the running total.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.touch();
    }

    /// Total if the line at `index` (or a new line when `None`) held
    /// `quantity` units at `price`.
    fn total_after(
        &self,
        index: Option<usize>,
        price: Money,
        quantity: u32,
    ) -> Result<Money, CartError> {
        self.lines
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != index)
            .fold(price.checked_multiply(quantity), |acc, (_, line)| {
                acc?.checked_add(line.price.checked_multiply(line.quantity)?)
            })
            .ok_or(CartError::AmountTooLarge)
    }

    fn touch(&mut self) {
        self.total_price = self.lines.iter().map(CartLine::total_price).sum();
        self.updated_at = Utc::now();
    }
}

fn check_stock(product: &Product, quantity: u32) -> Result<(), CartError> {
    if product.has_stock_for(quantity) {
        Ok(())
    } else {
        Err(CartError::InsufficientStock {
            product_id: product.id,
            product_name: product.name.clone(),
            requested: quantity,
            available: product.stock,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tee(stock: u32) -> Product {
        Product::new("Graphic Tee", Money::from_cents(2000), stock)
    }

    #[test]
    fn test_new_cart_is_empty() {
        let cart = Cart::new(UserId::new());
        assert!(cart.is_empty());
        assert!(cart.total_price.is_zero());
    }

    #[test]
    fn test_add_item_captures_price_and_total() {
        let product = tee(10);
        let mut cart = Cart::new(UserId::new());

        let line_id = cart.add_item(&product, 2, "M", "black").unwrap();

        let line = cart.line(line_id).unwrap();
        assert_eq!(line.price, Money::from_cents(2000));
        assert_eq!(line.quantity, 2);
        assert_eq!(cart.total_price.cents(), 4000);
    }

    #[test]
    fn test_same_product_size_color_merges_into_one_line() {
        let product = tee(10);
        let mut cart = Cart::new(UserId::new());

        let first = cart.add_item(&product, 2, "M", "black").unwrap();
        let second = cart.add_item(&product, 3, "M", "black").unwrap();

        assert_eq!(first, second);
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].quantity, 5);
        assert_eq!(cart.total_price.cents(), 10_000);
    }

    #[test]
    fn test_different_size_creates_new_line() {
        let product = tee(10);
        let mut cart = Cart::new(UserId::new());

        cart.add_item(&product, 1, "M", "black").unwrap();
        cart.add_item(&product, 1, "L", "black").unwrap();

        assert_eq!(cart.lines.len(), 2);
        assert_eq!(cart.lines[0].size, "M");
        assert_eq!(cart.lines[1].size, "L");
    }

    #[test]
    fn test_merge_is_checked_against_stock() {
        let product = tee(4);
        let mut cart = Cart::new(UserId::new());

        cart.add_item(&product, 3, "M", "black").unwrap();
        let err = cart.add_item(&product, 2, "M", "black").unwrap_err();

        assert!(matches!(
            err,
            CartError::InsufficientStock {
                requested: 5,
                available: 4,
                ..
            }
        ));
        assert_eq!(cart.lines[0].quantity, 3);
    }

    #[test]
    fn test_add_item_requires_size_color_and_quantity() {
        let product = tee(4);
        let mut cart = Cart::new(UserId::new());

        assert_eq!(
            cart.add_item(&product, 1, " ", "black"),
            Err(CartError::MissingField("size"))
        );
        assert_eq!(
            cart.add_item(&product, 1, "M", ""),
            Err(CartError::MissingField("color"))
        );
        assert_eq!(
            cart.add_item(&product, 0, "M", "black"),
            Err(CartError::InvalidQuantity { quantity: 0 })
        );
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity() {
        let product = tee(10);
        let mut cart = Cart::new(UserId::new());
        let line_id = cart.add_item(&product, 1, "S", "white").unwrap();

        cart.update_quantity(line_id, &product, 6).unwrap();

        assert_eq!(cart.lines[0].quantity, 6);
        assert_eq!(cart.total_price.cents(), 12_000);
    }

    #[test]
    fn test_update_unknown_line_fails() {
        let product = tee(10);
        let mut cart = Cart::new(UserId::new());
        let missing = CartLineId::new();

        assert_eq!(
            cart.update_quantity(missing, &product, 1),
            Err(CartError::LineNotFound(missing))
        );
    }

    #[test]
    fn test_total_overflow_is_rejected() {
        let pricey = Product::new("Vault", Money::from_cents(i64::MAX / 2), 10);
        let mut cart = Cart::new(UserId::new());
        let line_id = cart.add_item(&pricey, 1, "One Size", "gold").unwrap();

        assert_eq!(
            cart.add_item(&pricey, 2, "One Size", "gold"),
            Err(CartError::AmountTooLarge)
        );
        assert_eq!(
            cart.update_quantity(line_id, &pricey, 3),
            Err(CartError::AmountTooLarge)
        );
        assert_eq!(
            cart.add_item(&pricey, 2, "One Size", "silver"),
            Err(CartError::AmountTooLarge)
        );

        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].quantity, 1);
        assert_eq!(cart.total_price.cents(), i64::MAX / 2);
    }

    #[test]
    fn test_update_beyond_stock_fails() {
        let product = tee(2);
        let mut cart = Cart::new(UserId::new());
        let line_id = cart.add_item(&product, 1, "S", "white").unwrap();

        let err = cart.update_quantity(line_id, &product, 3).unwrap_err();
        assert!(matches!(err, CartError::InsufficientStock { .. }));
        assert_eq!(cart.lines[0].quantity, 1);
    }

    #[test]
    fn test_remove_and_clear_reset_total() {
        let product = tee(10);
        let other = Product::new("Cap", Money::from_cents(1500), 10);
        let mut cart = Cart::new(UserId::new());
        let tee_line = cart.add_item(&product, 1, "S", "white").unwrap();
        cart.add_item(&other, 2, "One Size", "navy").unwrap();

        cart.remove_line(tee_line);
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.total_price.cents(), 3000);

        cart.clear();
        assert!(cart.is_empty());
        assert!(cart.total_price.is_zero());
    }
}
