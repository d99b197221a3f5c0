use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use common::{Money, OrderId, ProductId, UserId};
use domain::{Cart, Order, Product};
use tokio::sync::RwLock;

use crate::{
    OrderPage, OrderQuery, Result, StoreError,
    store::{CartRepository, OrderRepository, ProductRepository, StockLedger},
};

/// In-memory product catalog and stock ledger.
///
/// Every reservation runs under the write lock, so the stock check and
/// the decrement are a single step.
#[derive(Clone, Default)]
pub struct InMemoryProductStore {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
}

impl InMemoryProductStore {
    /// Creates a new empty product store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `products`.
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let map = products.into_iter().map(|p| (p.id, p)).collect();
        Self {
            products: Arc::new(RwLock::new(map)),
        }
    }

    /// Removes a product from the catalog.
    pub async fn remove_product(&self, product_id: ProductId) -> Option<Product> {
        self.products.write().await.remove(&product_id)
    }

    /// Returns the number of products stored.
    pub async fn product_count(&self) -> usize {
        self.products.read().await.len()
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductStore {
    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        Ok(self.products.read().await.get(&product_id).cloned())
    }

    async fn save_product(&self, product: &Product) -> Result<()> {
        self.products
            .write()
            .await
            .insert(product.id, product.clone());
        Ok(())
    }
}

#[async_trait]
impl StockLedger for InMemoryProductStore {
    async fn reserve(&self, product_id: ProductId, quantity: u32) -> Result<Product> {
        let mut products = self.products.write().await;
        let product = products
            .get_mut(&product_id)
            .ok_or(StoreError::ProductNotFound(product_id))?;

        product
            .reserve(quantity)
            .map_err(|e| StoreError::InsufficientStock {
                product_id,
                requested: e.requested,
                available: e.available,
            })?;

        Ok(product.clone())
    }

    async fn restore(&self, product_id: ProductId, quantity: u32) -> Result<Option<Product>> {
        let mut products = self.products.write().await;
        Ok(products.get_mut(&product_id).map(|product| {
            product.restore(quantity);
            product.clone()
        }))
    }
}

/// In-memory cart storage keyed by user.
#[derive(Clone, Default)]
pub struct InMemoryCartStore {
    carts: Arc<RwLock<HashMap<UserId, Cart>>>,
}

impl InMemoryCartStore {
    /// Creates a new empty cart store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CartRepository for InMemoryCartStore {
    async fn get_cart(&self, user_id: UserId) -> Result<Option<Cart>> {
        Ok(self.carts.read().await.get(&user_id).cloned())
    }

    async fn save_cart(&self, cart: &Cart) -> Result<()> {
        self.carts.write().await.insert(cart.user_id, cart.clone());
        Ok(())
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<()> {
        if let Some(cart) = self.carts.write().await.get_mut(&user_id) {
            cart.lines.clear();
            cart.total_price = Money::zero();
            cart.updated_at = Utc::now();
        }
        Ok(())
    }
}

/// In-memory order storage for testing and single-node deployments.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
    fail_on_insert: Arc<AtomicBool>,
}

impl InMemoryOrderStore {
    /// Creates a new empty order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the store to reject subsequent inserts.
    pub fn set_fail_on_insert(&self, fail: bool) {
        self.fail_on_insert.store(fail, Ordering::SeqCst);
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        if self.fail_on_insert.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("order inserts disabled".to_string()));
        }

        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id) {
            return Err(StoreError::DuplicateOrder(order.id));
        }
        orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.orders.read().await.get(&order_id).cloned())
    }

    async fn update_order(&self, order: &Order) -> Result<Order> {
        let mut orders = self.orders.write().await;
        let stored = orders
            .get_mut(&order.id)
            .ok_or(StoreError::OrderNotFound(order.id))?;

        if stored.revision != order.revision {
            return Err(StoreError::ConcurrencyConflict {
                order_id: order.id,
                expected: order.revision,
                actual: stored.revision,
            });
        }

        // Lines and prices are immutable; only the envelope is written.
        stored.order_status = order.order_status;
        stored.payment_status = order.payment_status;
        stored.is_paid = order.is_paid;
        stored.paid_at = order.paid_at;
        stored.is_delivered = order.is_delivered;
        stored.delivered_at = order.delivered_at;
        stored.updated_at = order.updated_at;
        stored.revision += 1;

        Ok(stored.clone())
    }

    async fn query_orders(&self, query: &OrderQuery) -> Result<OrderPage> {
        let orders = self.orders.read().await;
        let mut matching: Vec<_> = orders
            .values()
            .filter(|order| query.matches(order))
            .cloned()
            .collect();

        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.id.as_uuid().cmp(&a.id.as_uuid()))
        });

        let total = matching.len() as u64;
        let offset = query.offset.unwrap_or(0);
        let orders = matching
            .into_iter()
            .skip(offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();

        Ok(OrderPage { orders, total })
    }
}

/// All in-memory stores behind one handle, for single-node deployments.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    pub products: InMemoryProductStore,
    pub carts: InMemoryCartStore,
    pub orders: InMemoryOrderStore,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductRepository for InMemoryStore {
    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        self.products.get_product(product_id).await
    }

    async fn save_product(&self, product: &Product) -> Result<()> {
        self.products.save_product(product).await
    }
}

#[async_trait]
impl StockLedger for InMemoryStore {
    async fn reserve(&self, product_id: ProductId, quantity: u32) -> Result<Product> {
        self.products.reserve(product_id, quantity).await
    }

    async fn restore(&self, product_id: ProductId, quantity: u32) -> Result<Option<Product>> {
        self.products.restore(product_id, quantity).await
    }
}

#[async_trait]
impl CartRepository for InMemoryStore {
    async fn get_cart(&self, user_id: UserId) -> Result<Option<Cart>> {
        self.carts.get_cart(user_id).await
    }

    async fn save_cart(&self, cart: &Cart) -> Result<()> {
        self.carts.save_cart(cart).await
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<()> {
        self.carts.clear_cart(user_id).await
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        self.orders.insert_order(order).await
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        self.orders.get_order(order_id).await
    }

    async fn update_order(&self, order: &Order) -> Result<Order> {
        self.orders.update_order(order).await
    }

    async fn query_orders(&self, query: &OrderQuery) -> Result<OrderPage> {
        self.orders.query_orders(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use domain::{
        OrderLine, OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress, price_lines,
    };

    fn product(stock: u32) -> Product {
        Product::new("Silk Dress", Money::from_cents(12_000), stock)
    }

    fn order_for(user_id: UserId) -> Order {
        let line = OrderLine {
            product_id: ProductId::new(),
            name: "Silk Dress".to_string(),
            price: Money::from_cents(12_000),
            quantity: 1,
            size: "S".to_string(),
            color: "green".to_string(),
            image: String::new(),
        };
        let pricing = price_lines([(line.price, line.quantity)]).unwrap();
        Order::place(
            user_id,
            vec![line],
            ShippingAddress {
                full_name: "Test User".to_string(),
                street: "1 Main St".to_string(),
                city: "Springfield".to_string(),
                state: "IL".to_string(),
                postal_code: "62701".to_string(),
                country: "US".to_string(),
                phone: None,
            },
            PaymentMethod::parse("card").unwrap(),
            pricing,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn reserve_decrements_stock_and_increments_sold() {
        let p = product(5);
        let store = InMemoryProductStore::with_products([p.clone()]);

        let updated = store.reserve(p.id, 2).await.unwrap();
        assert_eq!(updated.stock, 3);
        assert_eq!(updated.sold, 2);

        let stored = store.get_product(p.id).await.unwrap().unwrap();
        assert_eq!(stored.stock, 3);
    }

    #[tokio::test]
    async fn reserve_rejects_over_commitment() {
        let p = product(1);
        let store = InMemoryProductStore::with_products([p.clone()]);

        let result = store.reserve(p.id, 2).await;
        assert!(matches!(
            result,
            Err(StoreError::InsufficientStock {
                requested: 2,
                available: 1,
                ..
            })
        ));

        let stored = store.get_product(p.id).await.unwrap().unwrap();
        assert_eq!(stored.stock, 1);
        assert_eq!(stored.sold, 0);
    }

    #[tokio::test]
    async fn reserve_unknown_product() {
        let store = InMemoryProductStore::new();
        let id = ProductId::new();
        let result = store.reserve(id, 1).await;
        assert!(matches!(result, Err(StoreError::ProductNotFound(p)) if p == id));
    }

    #[tokio::test]
    async fn concurrent_reservations_never_oversell() {
        let p = product(10);
        let store = InMemoryProductStore::with_products([p.clone()]);

        let handles: Vec<_> = (0..25)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.reserve(p.id, 1).await })
            })
            .collect();

        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                succeeded += 1;
            }
        }

        assert_eq!(succeeded, 10);
        let stored = store.get_product(p.id).await.unwrap().unwrap();
        assert_eq!(stored.stock, 0);
        assert_eq!(stored.sold, 10);
    }

    #[tokio::test]
    async fn restore_missing_product_returns_none() {
        let store = InMemoryProductStore::new();
        assert!(store.restore(ProductId::new(), 3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clear_cart_empties_lines_and_total() {
        let store = InMemoryCartStore::new();
        let user_id = UserId::new();
        let p = product(5);
        let mut cart = Cart::new(user_id);
        cart.add_item(&p, 2, "S", "green").unwrap();
        store.save_cart(&cart).await.unwrap();

        store.clear_cart(user_id).await.unwrap();

        let stored = store.get_cart(user_id).await.unwrap().unwrap();
        assert!(stored.is_empty());
        assert!(stored.total_price.is_zero());
        assert_eq!(stored.id, cart.id);
    }

    #[tokio::test]
    async fn clear_missing_cart_is_noop() {
        let store = InMemoryCartStore::new();
        store.clear_cart(UserId::new()).await.unwrap();
    }

    #[tokio::test]
    async fn insert_and_get_order() {
        let store = InMemoryOrderStore::new();
        let order = order_for(UserId::new());

        store.insert_order(&order).await.unwrap();

        assert_eq!(store.get_order(order.id).await.unwrap(), Some(order.clone()));
        assert!(matches!(
            store.insert_order(&order).await,
            Err(StoreError::DuplicateOrder(_))
        ));
    }

    #[tokio::test]
    async fn insert_fails_when_disabled() {
        let store = InMemoryOrderStore::new();
        store.set_fail_on_insert(true);

        let result = store.insert_order(&order_for(UserId::new())).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn update_bumps_revision_and_detects_stale_writes() {
        let store = InMemoryOrderStore::new();
        let order = order_for(UserId::new());
        store.insert_order(&order).await.unwrap();

        let mut first = order.clone();
        first.order_status = OrderStatus::Processing;
        let updated = store.update_order(&first).await.unwrap();
        assert_eq!(updated.revision, 2);
        assert_eq!(updated.order_status, OrderStatus::Processing);

        let mut stale = order.clone();
        stale.payment_status = PaymentStatus::Paid;
        let result = store.update_order(&stale).await;
        assert!(matches!(
            result,
            Err(StoreError::ConcurrencyConflict {
                expected: 1,
                actual: 2,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn update_unknown_order() {
        let store = InMemoryOrderStore::new();
        let result = store.update_order(&order_for(UserId::new())).await;
        assert!(matches!(result, Err(StoreError::OrderNotFound(_))));
    }

    #[tokio::test]
    async fn query_filters_sorts_and_pages() {
        let store = InMemoryOrderStore::new();
        let alice = UserId::new();
        let bob = UserId::new();
        let base = Utc::now();

        for i in 0..5 {
            let mut order = order_for(alice);
            order.created_at = base - Duration::minutes(i);
            if i == 0 {
                order.order_status = OrderStatus::Shipped;
            }
            store.insert_order(&order).await.unwrap();
        }
        store.insert_order(&order_for(bob)).await.unwrap();

        let page = store
            .query_orders(&OrderQuery::for_user(alice))
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert!(
            page.orders
                .windows(2)
                .all(|w| w[0].created_at >= w[1].created_at)
        );

        let page = store
            .query_orders(&OrderQuery::for_user(alice).page(2, 2))
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.orders.len(), 2);

        let page = store
            .query_orders(&OrderQuery::new().status(OrderStatus::Shipped))
            .await
            .unwrap();
        assert_eq!(page.total, 1);

        let page = store
            .query_orders(&OrderQuery::new().to_created_at(base - Duration::minutes(3)))
            .await
            .unwrap();
        assert_eq!(page.total, 2);
    }
}
