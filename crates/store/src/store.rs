use async_trait::async_trait;
use common::{OrderId, ProductId, UserId};
use domain::{Cart, Order, Product};

use crate::{OrderPage, OrderQuery, Result};

/// Read and write access to catalog products.
///
/// Stock counters are NOT changed through this trait; use [`StockLedger`].
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Fetches the current catalog record of a product.
    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>>;

    /// Inserts or replaces a product. Used by catalog seeding and tests.
    async fn save_product(&self, product: &Product) -> Result<()>;
}

/// The single authority over a product's `stock` and `sold` counters.
///
/// Both operations are atomic per product: a reservation is one
/// conditional decrement, so concurrent callers can never drive stock
/// below zero.
#[async_trait]
pub trait StockLedger: Send + Sync {
    /// Moves `quantity` units from stock to sold.
    ///
    /// Fails with `InsufficientStock` when `stock < quantity` and with
    /// `ProductNotFound` for unknown products; neither counter changes on
    /// failure. Returns the product with its updated counters.
    async fn reserve(&self, product_id: ProductId, quantity: u32) -> Result<Product>;

    /// Returns `quantity` units to stock, decrementing sold (clamped at
    /// zero). Returns `None` when the product no longer exists.
    async fn restore(&self, product_id: ProductId, quantity: u32) -> Result<Option<Product>>;
}

/// Storage of per-user carts.
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Fetches the user's cart, if one was ever created.
    async fn get_cart(&self, user_id: UserId) -> Result<Option<Cart>>;

    /// Inserts or replaces the user's cart with all of its lines.
    async fn save_cart(&self, cart: &Cart) -> Result<()>;

    /// Removes every line from the user's cart and zeroes its total.
    /// Clearing a missing cart is a no-op.
    async fn clear_cart(&self, user_id: UserId) -> Result<()>;
}

/// Storage of placed orders. Orders are never deleted.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Records a newly placed order with all of its lines.
    async fn insert_order(&self, order: &Order) -> Result<()>;

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Writes the status envelope of `order`.
    ///
    /// Succeeds only if the stored revision still equals `order.revision`,
    /// otherwise fails with `ConcurrencyConflict`. Returns the order with
    /// its new revision.
    async fn update_order(&self, order: &Order) -> Result<Order>;

    /// Returns the orders matching `query`, newest first.
    async fn query_orders(&self, query: &OrderQuery) -> Result<OrderPage>;
}

/// Everything the storefront needs from one storage backend.
pub trait StorefrontStore:
    ProductRepository + StockLedger + CartRepository + OrderRepository + Clone + 'static
{
}

impl<T> StorefrontStore for T where
    T: ProductRepository + StockLedger + CartRepository + OrderRepository + Clone + 'static
{
}
