//! Order placement workflow for the storefront.
//!
//! This crate coordinates the mutable records involved in checkout:
//! - Converting a cart into an order with all-or-nothing stock reservation
//! - Cancelling orders and returning their stock
//! - Administrative status overrides and order queries
//! - Cart maintenance ahead of checkout
//!
//! If stock reservation or the order write fails part way, reservations
//! already applied are compensated in reverse order.

pub mod cart;
pub mod error;
pub mod lifecycle;
pub mod reader;
pub mod service;

pub use cart::CartService;
pub use error::{CheckoutError, Result};
pub use lifecycle::{OrderFilter, OrderLifecycle, OrderListing};
pub use reader::{CartSnapshot, CartSnapshotReader, SnapshotLine};
pub use service::CheckoutService;
