//! Domain layer for the storefront order core.
//!
//! This crate holds the pure business rules, with no storage or I/O:
//! - Product stock counters and their reserve/restore rules
//! - Cart line merging and quantity checks
//! - Order aggregate with its status envelope
//! - Pricing engine (subtotal, shipping, tax, total)

pub mod actor;
pub mod cart;
pub mod order;
pub mod pricing;
pub mod product;

pub use actor::{Actor, Role, UnknownRole};
pub use cart::{Cart, CartError, CartLine};
pub use order::{
    CancelOrder, Order, OrderError, OrderLine, OrderStatus, PaymentMethod, PaymentStatus,
    PlaceOrder, ShippingAddress, UnknownStatus, UpdateOrderStatus, ValidationError,
};
pub use pricing::{AmountOverflow, PriceBreakdown, price_lines};
pub use product::{InsufficientStock, Product};
