use common::{OrderId, ProductId};
use thiserror::Error;

/// Errors that can occur when interacting with storage.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No product exists with this id.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The ledger refused a reservation because stock was too low.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// No order exists with this id.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// An order with this id was already recorded.
    #[error("Order already exists: {0}")]
    DuplicateOrder(OrderId),

    /// The order changed since it was read.
    #[error(
        "Concurrency conflict for order {order_id}: expected revision {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        order_id: OrderId,
        expected: u64,
        actual: u64,
    },

    /// A stored value could not be mapped back into the domain.
    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    /// The backend is not accepting writes.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;
