//! Order aggregate.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, UserId};
use serde::{Deserialize, Serialize};

use crate::actor::Actor;
use crate::pricing::PriceBreakdown;

use super::{OrderError, OrderLine, OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress};

/// Order aggregate root.
///
/// Lines and prices are fixed when the order is placed. Only the status
/// envelope (`order_status`, `payment_status` and their derived flags)
/// changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub lines: Vec<OrderLine>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,

    pub items_price: Money,
    pub shipping_price: Money,
    pub tax_price: Money,
    pub total_price: Money,

    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,

    /// Storage revision for optimistic concurrency. Starts at 1.
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Builds a freshly placed order in `pending`/`pending` status.
    pub fn place(
        user_id: UserId,
        lines: Vec<OrderLine>,
        shipping_address: ShippingAddress,
        payment_method: PaymentMethod,
        pricing: PriceBreakdown,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: OrderId::new(),
            user_id,
            lines,
            shipping_address,
            payment_method,
            items_price: pricing.items_subtotal,
            shipping_price: pricing.shipping,
            tax_price: pricing.tax,
            total_price: pricing.total,
            order_status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            is_paid: false,
            paid_at: None,
            is_delivered: false,
            delivered_at: None,
            revision: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn pricing(&self) -> PriceBreakdown {
        PriceBreakdown {
            items_subtotal: self.items_price,
            shipping: self.shipping_price,
            tax: self.tax_price,
            total: self.total_price,
        }
    }

    /// Returns the total quantity of all lines.
    pub fn total_quantity(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    pub fn is_cancelled(&self) -> bool {
        self.order_status == OrderStatus::Cancelled
    }

    /// Fails unless the actor owns this order or is an admin.
    pub fn ensure_accessible_by(&self, actor: &Actor) -> Result<(), OrderError> {
        if actor.can_access(self.user_id) {
            Ok(())
        } else {
            Err(OrderError::NotAuthorized {
                order_id: self.id,
                user_id: actor.user_id,
            })
        }
    }

    /// Moves the order to `cancelled`.
    ///
    /// Only `pending` and `processing` orders can be cancelled. Returning
    /// the stock is the caller's job.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), OrderError> {
        if !self.order_status.can_cancel() {
            return Err(OrderError::InvalidTransition {
                from: self.order_status,
                to: OrderStatus::Cancelled,
            });
        }

        self.order_status = OrderStatus::Cancelled;
        self.updated_at = now;
        Ok(())
    }

    /// Applies an administrative status override.
    ///
    /// Progression is not enforced: an admin may move a pending order
    /// straight to delivered. Two rules still hold: moving to `cancelled`
    /// follows [`Order::cancel`], and a cancelled order's fulfillment
    /// status is final.
    pub fn apply_status_update(
        &mut self,
        order_status: Option<OrderStatus>,
        payment_status: Option<PaymentStatus>,
        now: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        if order_status.is_none() && payment_status.is_none() {
            return Err(OrderError::EmptyStatusUpdate);
        }

        if let Some(status) = order_status {
            match status {
                OrderStatus::Cancelled => self.cancel(now)?,
                _ if self.is_cancelled() => {
                    return Err(OrderError::InvalidTransition {
                        from: self.order_status,
                        to: status,
                    });
                }
                OrderStatus::Delivered => {
                    self.order_status = status;
                    self.is_delivered = true;
                    self.delivered_at = Some(now);
                }
                _ => self.order_status = status,
            }
        }

        if let Some(status) = payment_status {
            self.payment_status = status;
            if status == PaymentStatus::Paid {
                self.is_paid = true;
                self.paid_at = Some(now);
            }
        }

        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::price_lines;
    use common::ProductId;

    fn place_order(status: OrderStatus) -> Order {
        let lines = vec![
            OrderLine {
                product_id: ProductId::new(),
                name: "Wool Coat".to_string(),
                price: Money::from_dollars(20),
                quantity: 2,
                size: "M".to_string(),
                color: "camel".to_string(),
                image: String::new(),
            },
            OrderLine {
                product_id: ProductId::new(),
                name: "Gloves".to_string(),
                price: Money::from_dollars(15),
                quantity: 1,
                size: "S".to_string(),
                color: "black".to_string(),
                image: String::new(),
            },
        ];
        let pricing = price_lines(lines.iter().map(|l| (l.price, l.quantity))).unwrap();
        let mut order = Order::place(
            UserId::new(),
            lines,
            ShippingAddress {
                full_name: "Grace Hopper".to_string(),
                street: "1 Navy Yard".to_string(),
                city: "Arlington".to_string(),
                state: "VA".to_string(),
                postal_code: "22202".to_string(),
                country: "US".to_string(),
                phone: Some("555-0100".to_string()),
            },
            PaymentMethod::parse("card").unwrap(),
            pricing,
            Utc::now(),
        );
        order.order_status = status;
        order
    }

    #[test]
    fn test_place_sets_initial_envelope_and_totals() {
        let order = place_order(OrderStatus::Pending);

        assert_eq!(order.order_status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert!(!order.is_paid && !order.is_delivered);
        assert_eq!(order.revision, 1);
        assert_eq!(order.items_price, Money::from_dollars(55));
        assert_eq!(order.total_price, Money::from_cents(7325));
        assert_eq!(order.total_quantity(), 3);
    }

    #[test]
    fn test_access_is_limited_to_owner_and_admin() {
        let order = place_order(OrderStatus::Pending);

        assert!(order.ensure_accessible_by(&Actor::customer(order.user_id)).is_ok());
        assert!(order.ensure_accessible_by(&Actor::admin(UserId::new())).is_ok());
        assert!(matches!(
            order.ensure_accessible_by(&Actor::customer(UserId::new())),
            Err(OrderError::NotAuthorized { .. })
        ));
    }

    #[test]
    fn test_cancel_from_pending_and_processing() {
        for status in [OrderStatus::Pending, OrderStatus::Processing] {
            let mut order = place_order(status);
            order.cancel(Utc::now()).unwrap();
            assert!(order.is_cancelled());
        }
    }

    #[test]
    fn test_cancel_after_shipping_or_twice_fails() {
        for status in [
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            let mut order = place_order(status);
            let err = order.cancel(Utc::now()).unwrap_err();
            assert_eq!(
                err,
                OrderError::InvalidTransition {
                    from: status,
                    to: OrderStatus::Cancelled
                }
            );
            assert_eq!(order.order_status, status);
        }
    }

    #[test]
    fn test_delivered_sets_flag_and_timestamp() {
        let mut order = place_order(OrderStatus::Shipped);
        let now = Utc::now();

        order
            .apply_status_update(Some(OrderStatus::Delivered), None, now)
            .unwrap();

        assert_eq!(order.order_status, OrderStatus::Delivered);
        assert!(order.is_delivered);
        assert_eq!(order.delivered_at, Some(now));
        assert!(!order.is_paid);
    }

    #[test]
    fn test_paid_sets_flag_and_timestamp() {
        let mut order = place_order(OrderStatus::Pending);
        let now = Utc::now();

        order
            .apply_status_update(None, Some(PaymentStatus::Paid), now)
            .unwrap();

        assert_eq!(order.payment_status, PaymentStatus::Paid);
        assert!(order.is_paid);
        assert_eq!(order.paid_at, Some(now));
        assert_eq!(order.order_status, OrderStatus::Pending);
    }

    #[test]
    fn test_failed_payment_does_not_mark_paid() {
        let mut order = place_order(OrderStatus::Pending);
        order
            .apply_status_update(None, Some(PaymentStatus::Failed), Utc::now())
            .unwrap();
        assert!(!order.is_paid);
        assert!(order.paid_at.is_none());
    }

    /// Admin overrides skip the normal progression. This is deliberately
    /// loose and pinned here so a change to it is a visible decision.
    #[test]
    fn test_admin_override_allows_pending_straight_to_delivered() {
        let mut order = place_order(OrderStatus::Pending);
        order
            .apply_status_update(Some(OrderStatus::Delivered), None, Utc::now())
            .unwrap();
        assert_eq!(order.order_status, OrderStatus::Delivered);

        order
            .apply_status_update(Some(OrderStatus::Processing), None, Utc::now())
            .unwrap();
        assert_eq!(order.order_status, OrderStatus::Processing);
    }

    #[test]
    fn test_override_to_cancelled_follows_cancel_rule() {
        let mut order = place_order(OrderStatus::Shipped);
        let err = order
            .apply_status_update(Some(OrderStatus::Cancelled), None, Utc::now())
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { .. }));

        let mut order = place_order(OrderStatus::Processing);
        order
            .apply_status_update(Some(OrderStatus::Cancelled), None, Utc::now())
            .unwrap();
        assert!(order.is_cancelled());
    }

    #[test]
    fn test_cancelled_order_status_is_final_but_payment_can_change() {
        let mut order = place_order(OrderStatus::Cancelled);

        let err = order
            .apply_status_update(Some(OrderStatus::Pending), None, Utc::now())
            .unwrap_err();
        assert_eq!(
            err,
            OrderError::InvalidTransition {
                from: OrderStatus::Cancelled,
                to: OrderStatus::Pending
            }
        );

        order
            .apply_status_update(None, Some(PaymentStatus::Refunded), Utc::now())
            .unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Refunded);
    }

    #[test]
    fn test_empty_update_is_rejected() {
        let mut order = place_order(OrderStatus::Pending);
        assert_eq!(
            order.apply_status_update(None, None, Utc::now()),
            Err(OrderError::EmptyStatusUpdate)
        );
    }

    #[test]
    fn test_serialization_roundtrip_keeps_snapshot() {
        let order = place_order(OrderStatus::Processing);
        let json = serde_json::to_string(&order).unwrap();
        let restored: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, order);
    }
}
