//! Cart-to-order conversion.

use std::time::Instant;

use chrono::Utc;
use common::ProductId;
use domain::{Order, OrderLine, PaymentMethod, PlaceOrder, price_lines};
use store::{CartRepository, OrderRepository, ProductRepository, StockLedger, StoreError};

use crate::error::{CheckoutError, Result};
use crate::reader::CartSnapshotReader;

/// Turns a user's cart into an order.
///
/// Stock reservation and the order write are applied as one unit: if any
/// reservation or the write fails, every reservation made in the same
/// pass is restored in reverse order before the error is returned.
pub struct CheckoutService<C, P, L, O>
where
    C: CartRepository,
    P: ProductRepository,
    L: StockLedger,
    O: OrderRepository,
{
    reader: CartSnapshotReader<C, P>,
    carts: C,
    ledger: L,
    orders: O,
}

impl<C, P, L, O> CheckoutService<C, P, L, O>
where
    C: CartRepository + Clone,
    P: ProductRepository,
    L: StockLedger,
    O: OrderRepository,
{
    /// Creates a new checkout service.
    pub fn new(carts: C, products: P, ledger: L, orders: O) -> Self {
        Self {
            reader: CartSnapshotReader::new(carts.clone(), products),
            carts,
            ledger,
            orders,
        }
    }

    /// Places an order from the user's current cart.
    ///
    /// On success the order is `pending`/`pending`, stock has moved to sold
    /// for every line and the cart is empty.
    #[tracing::instrument(skip(self, cmd), fields(user_id = %cmd.user_id))]
    pub async fn place_order(&self, cmd: PlaceOrder) -> Result<Order> {
        let start = Instant::now();

        let result = self.assemble(cmd).await;

        metrics::histogram!("order_placement_duration_seconds")
            .record(start.elapsed().as_secs_f64());
        match &result {
            Ok(order) => {
                metrics::counter!("orders_placed_total").increment(1);
                tracing::info!(
                    order_id = %order.id,
                    total = %order.total_price,
                    lines = order.lines.len(),
                    "order placed"
                );
            }
            Err(e) => {
                metrics::counter!("order_placement_failures_total", "reason" => e.reason())
                    .increment(1);
                tracing::warn!(error = %e, "order placement failed");
            }
        }

        result
    }

    async fn assemble(&self, cmd: PlaceOrder) -> Result<Order> {
        // 1. Validate caller input
        cmd.shipping_address.validate()?;
        let payment_method = PaymentMethod::parse(&cmd.payment_method)?;

        // 2. Load the cart against the current catalog
        let snapshot = self.reader.load(cmd.user_id).await?;

        // 3. Advisory stock check and line snapshots at the current price
        let mut lines = Vec::with_capacity(snapshot.lines.len());
        for entry in &snapshot.lines {
            let product = entry
                .product
                .as_ref()
                .ok_or(CheckoutError::ProductNotFound(entry.line.product_id))?;

            if !product.has_stock_for(entry.line.quantity) {
                return Err(CheckoutError::InsufficientStock {
                    product_id: product.id,
                    product_name: product.name.clone(),
                });
            }

            lines.push(OrderLine::snapshot(product, &entry.line));
        }

        // 4. Price the order
        let pricing = price_lines(lines.iter().map(|line| (line.price, line.quantity)))?;

        // 5. Reserve stock line by line; the ledger is authoritative
        let mut reserved: Vec<(ProductId, u32)> = Vec::with_capacity(lines.len());
        for line in &lines {
            match self.ledger.reserve(line.product_id, line.quantity).await {
                Ok(_) => {
                    metrics::counter!("stock_reservations_total").increment(1);
                    reserved.push((line.product_id, line.quantity));
                }
                Err(e) => {
                    tracing::warn!(
                        product_id = %line.product_id,
                        quantity = line.quantity,
                        error = %e,
                        "stock reservation rejected"
                    );
                    self.compensate(&reserved).await;
                    return Err(match e {
                        StoreError::InsufficientStock { product_id, .. } => {
                            CheckoutError::InsufficientStock {
                                product_id,
                                product_name: line.name.clone(),
                            }
                        }
                        other => other.into(),
                    });
                }
            }
        }

        // 6. Persist the order
        let order = Order::place(
            cmd.user_id,
            lines,
            cmd.shipping_address,
            payment_method,
            pricing,
            Utc::now(),
        );

        if let Err(e) = self.orders.insert_order(&order).await {
            tracing::error!(order_id = %order.id, error = %e, "failed to persist order");
            self.compensate(&reserved).await;
            return Err(e.into());
        }

        // 7. Empty the cart. The order already stands, so a failure here
        // is logged and not surfaced.
        if let Err(e) = self.carts.clear_cart(cmd.user_id).await {
            tracing::error!(
                order_id = %order.id,
                error = %e,
                "failed to clear cart after order placement"
            );
        }

        Ok(order)
    }

    /// Restores `reserved` in reverse order of reservation.
    #[tracing::instrument(skip(self, reserved), fields(count = reserved.len()))]
    async fn compensate(&self, reserved: &[(ProductId, u32)]) {
        for (product_id, quantity) in reserved.iter().rev() {
            match self.ledger.restore(*product_id, *quantity).await {
                Ok(Some(_)) => {
                    metrics::counter!("stock_compensations_total").increment(1);
                }
                Ok(None) => {
                    tracing::warn!(%product_id, "product vanished before compensation");
                }
                Err(e) => {
                    tracing::error!(
                        %product_id,
                        quantity,
                        error = %e,
                        "stock compensation failed"
                    );
                }
            }
        }
    }
}
