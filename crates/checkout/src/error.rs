//! Checkout error types.

use common::{CartLineId, OrderId, ProductId, UserId};
use domain::{AmountOverflow, CartError, OrderError, OrderStatus, ValidationError};
use store::StoreError;
use thiserror::Error;

/// Errors surfaced by the checkout workflows.
///
/// Every variant except `Store` is a business-rule outcome and is never
/// retried by this crate.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// A request field was missing, blank or out of range.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The user's cart has no lines.
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// A line asks for more units than the product has in stock.
    #[error("Insufficient stock for {product_name}")]
    InsufficientStock {
        product_id: ProductId,
        product_name: String,
    },

    /// The actor may not perform this operation.
    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    /// The order's current status forbids the requested change.
    #[error("Invalid status transition: cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("Cart not found for user {0}")]
    CartNotFound(UserId),

    #[error("Cart line not found: {0}")]
    CartLineNotFound(CartLineId),

    /// Another writer changed the order between read and write.
    #[error("Order {0} was modified concurrently")]
    Conflict(OrderId),

    /// Storage failure.
    #[error("Storage error: {0}")]
    Store(StoreError),
}

impl CheckoutError {
    /// Short machine-readable label, used as a metrics dimension.
    pub fn reason(&self) -> &'static str {
        match self {
            CheckoutError::Validation(_) => "validation",
            CheckoutError::EmptyCart => "empty_cart",
            CheckoutError::ProductNotFound(_) => "product_not_found",
            CheckoutError::InsufficientStock { .. } => "insufficient_stock",
            CheckoutError::NotAuthorized(_) => "not_authorized",
            CheckoutError::InvalidTransition { .. } => "invalid_transition",
            CheckoutError::OrderNotFound(_) => "order_not_found",
            CheckoutError::CartNotFound(_) => "cart_not_found",
            CheckoutError::CartLineNotFound(_) => "cart_line_not_found",
            CheckoutError::Conflict(_) => "conflict",
            CheckoutError::Store(_) => "store",
        }
    }
}

impl From<StoreError> for CheckoutError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ProductNotFound(id) => CheckoutError::ProductNotFound(id),
            StoreError::OrderNotFound(id) => CheckoutError::OrderNotFound(id),
            StoreError::ConcurrencyConflict { order_id, .. } => CheckoutError::Conflict(order_id),
            StoreError::InsufficientStock { product_id, .. } => CheckoutError::InsufficientStock {
                product_id,
                product_name: product_id.to_string(),
            },
            other => CheckoutError::Store(other),
        }
    }
}

impl From<OrderError> for CheckoutError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::InvalidTransition { from, to } => {
                CheckoutError::InvalidTransition { from, to }
            }
            OrderError::NotAuthorized { .. } => CheckoutError::NotAuthorized(err.to_string()),
            OrderError::EmptyStatusUpdate => CheckoutError::Validation(err.to_string()),
        }
    }
}

impl From<CartError> for CheckoutError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::InsufficientStock {
                product_id,
                product_name,
                ..
            } => CheckoutError::InsufficientStock {
                product_id,
                product_name,
            },
            CartError::LineNotFound(line_id) => CheckoutError::CartLineNotFound(line_id),
            CartError::MissingField(_)
            | CartError::InvalidQuantity { .. }
            | CartError::ProductMismatch { .. }
            | CartError::AmountTooLarge => CheckoutError::Validation(err.to_string()),
        }
    }
}

impl From<AmountOverflow> for CheckoutError {
    fn from(err: AmountOverflow) -> Self {
        CheckoutError::Validation(err.to_string())
    }
}

impl From<ValidationError> for CheckoutError {
    fn from(err: ValidationError) -> Self {
        CheckoutError::Validation(err.to_string())
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
