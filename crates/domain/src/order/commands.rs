//! Order commands.

use common::{OrderId, UserId};

use crate::actor::Actor;

use super::{OrderStatus, PaymentStatus, ShippingAddress};

/// Command to turn a user's cart into an order.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    /// The user whose cart is checked out.
    pub user_id: UserId,

    pub shipping_address: ShippingAddress,

    /// Raw payment method as supplied by the caller; validated on execution.
    pub payment_method: String,
}

impl PlaceOrder {
    /// Creates a new PlaceOrder command.
    pub fn new(
        user_id: UserId,
        shipping_address: ShippingAddress,
        payment_method: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            shipping_address,
            payment_method: payment_method.into(),
        }
    }
}

/// Command to cancel an order and return its stock.
#[derive(Debug, Clone)]
pub struct CancelOrder {
    pub order_id: OrderId,

    /// Who is asking; must be the owner or an admin.
    pub actor: Actor,
}

impl CancelOrder {
    /// Creates a new CancelOrder command.
    pub fn new(order_id: OrderId, actor: Actor) -> Self {
        Self { order_id, actor }
    }
}

/// Command for an administrative status override.
#[derive(Debug, Clone)]
pub struct UpdateOrderStatus {
    pub order_id: OrderId,
    pub actor: Actor,
    pub order_status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
}

impl UpdateOrderStatus {
    /// Creates a command that changes nothing; chain the setters below.
    pub fn new(order_id: OrderId, actor: Actor) -> Self {
        Self {
            order_id,
            actor,
            order_status: None,
            payment_status: None,
        }
    }

    pub fn order_status(mut self, status: OrderStatus) -> Self {
        self.order_status = Some(status);
        self
    }

    pub fn payment_status(mut self, status: PaymentStatus) -> Self {
        self.payment_status = Some(status);
        self
    }
}
