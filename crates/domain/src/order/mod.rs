//! Order aggregate and related types.

mod aggregate;
mod commands;
mod state;
mod value_objects;

pub use aggregate::Order;
pub use commands::{CancelOrder, PlaceOrder, UpdateOrderStatus};
pub use state::{OrderStatus, PaymentStatus, UnknownStatus};
pub use value_objects::{OrderLine, PaymentMethod, ShippingAddress, ValidationError};

use common::{OrderId, UserId};
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// The order's current status does not allow the requested change.
    #[error("Invalid status transition: cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// The actor is neither the order's owner nor an admin.
    #[error("User {user_id} is not authorized to access order {order_id}")]
    NotAuthorized { order_id: OrderId, user_id: UserId },

    /// A status update named neither an order nor a payment status.
    #[error("Status update must set order_status or payment_status")]
    EmptyStatusUpdate,
}
