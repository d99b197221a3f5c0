//! Order lifecycle: cancellation, admin status overrides and queries.

use chrono::{DateTime, Utc};
use common::OrderId;
use domain::{Actor, CancelOrder, Order, OrderStatus, UpdateOrderStatus};
use store::{DEFAULT_PAGE_SIZE, OrderQuery, OrderRepository, StockLedger, StoreError};

use crate::error::{CheckoutError, Result};

/// Filters for the admin order listing.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// 1-based page number; `None` means the first page.
    pub page: Option<usize>,
}

/// One page of the admin order listing.
#[derive(Debug, Clone)]
pub struct OrderListing {
    pub orders: Vec<Order>,
    pub page: usize,
    pub pages: u64,
    pub total: u64,
}

/// Drives orders through their status envelope after placement.
///
/// Every status write is a compare-and-set on the order revision. Stock
/// is returned only after the write that cancelled the order succeeded,
/// so a given order restores its stock at most once.
pub struct OrderLifecycle<O, L>
where
    O: OrderRepository,
    L: StockLedger,
{
    orders: O,
    ledger: L,
}

impl<O, L> OrderLifecycle<O, L>
where
    O: OrderRepository,
    L: StockLedger,
{
    /// Creates a new order lifecycle service.
    pub fn new(orders: O, ledger: L) -> Self {
        Self { orders, ledger }
    }

    /// Loads an order visible to `actor`.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId, actor: Actor) -> Result<Order> {
        let order = self.load(order_id).await?;
        order.ensure_accessible_by(&actor)?;
        Ok(order)
    }

    /// Returns the actor's own orders, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_my_orders(&self, actor: Actor) -> Result<Vec<Order>> {
        let page = self
            .orders
            .query_orders(&OrderQuery::for_user(actor.user_id))
            .await?;
        Ok(page.orders)
    }

    /// Returns one page of all orders. Admin only.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, actor: Actor, filter: OrderFilter) -> Result<OrderListing> {
        ensure_admin(&actor, "list orders")?;

        let page = filter.page.unwrap_or(1).max(1);
        let mut query = OrderQuery::new().page(page, DEFAULT_PAGE_SIZE);
        if let Some(status) = filter.status {
            query = query.status(status);
        }
        if let Some(start) = filter.start_date {
            query = query.from_created_at(start);
        }
        if let Some(end) = filter.end_date {
            query = query.to_created_at(end);
        }

        let result = self.orders.query_orders(&query).await?;
        Ok(OrderListing {
            pages: result.page_count(DEFAULT_PAGE_SIZE),
            total: result.total,
            orders: result.orders,
            page,
        })
    }

    /// Cancels a `pending` or `processing` order and returns its stock.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id))]
    pub async fn cancel(&self, cmd: CancelOrder) -> Result<Order> {
        let mut order = self.load(cmd.order_id).await?;
        order.ensure_accessible_by(&cmd.actor)?;
        order.cancel(Utc::now())?;

        let cancelled = match self.orders.update_order(&order).await {
            Ok(updated) => updated,
            Err(StoreError::ConcurrencyConflict { .. }) => {
                return Err(self.explain_lost_cancel(cmd.order_id).await);
            }
            Err(e) => return Err(e.into()),
        };

        self.restore_stock(&cancelled).await;
        metrics::counter!("orders_cancelled_total").increment(1);
        tracing::info!(
            order_id = %cancelled.id,
            cancelled_by = %cmd.actor.user_id,
            "order cancelled"
        );

        Ok(cancelled)
    }

    /// Applies an administrative status override.
    ///
    /// No forward-only progression is enforced. Setting `cancelled` follows
    /// the cancellation rule and returns stock.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id))]
    pub async fn update_status(&self, cmd: UpdateOrderStatus) -> Result<Order> {
        ensure_admin(&cmd.actor, "update order status")?;
        if cmd.order_status.is_none() && cmd.payment_status.is_none() {
            return Err(domain::OrderError::EmptyStatusUpdate.into());
        }

        let mut order = self.load(cmd.order_id).await?;
        let was_cancelled = order.is_cancelled();
        order.apply_status_update(cmd.order_status, cmd.payment_status, Utc::now())?;

        let updated = self.orders.update_order(&order).await?;

        if !was_cancelled && updated.is_cancelled() {
            self.restore_stock(&updated).await;
            metrics::counter!("orders_cancelled_total").increment(1);
        }
        tracing::info!(
            order_id = %updated.id,
            order_status = %updated.order_status,
            payment_status = %updated.payment_status,
            "order status updated"
        );

        Ok(updated)
    }

    async fn load(&self, order_id: OrderId) -> Result<Order> {
        self.orders
            .get_order(order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound(order_id))
    }

    /// Re-reads an order whose cancel write lost a revision race and
    /// reports why the cancel no longer applies.
    async fn explain_lost_cancel(&self, order_id: OrderId) -> CheckoutError {
        match self.load(order_id).await {
            Ok(current) if !current.order_status.can_cancel() => {
                CheckoutError::InvalidTransition {
                    from: current.order_status,
                    to: OrderStatus::Cancelled,
                }
            }
            Ok(_) => CheckoutError::Conflict(order_id),
            Err(e) => e,
        }
    }

    /// Returns every line's quantity to stock. Missing products are skipped.
    async fn restore_stock(&self, order: &Order) {
        for line in &order.lines {
            match self.ledger.restore(line.product_id, line.quantity).await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    tracing::warn!(
                        order_id = %order.id,
                        product_id = %line.product_id,
                        "skipping stock restore for missing product"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        order_id = %order.id,
                        product_id = %line.product_id,
                        quantity = line.quantity,
                        error = %e,
                        "failed to restore stock for cancelled order"
                    );
                }
            }
        }
    }
}

fn ensure_admin(actor: &Actor, action: &str) -> Result<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(CheckoutError::NotAuthorized(format!(
            "user {} may not {action}",
            actor.user_id
        )))
    }
}

