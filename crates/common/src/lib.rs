//! Shared identifier and money types for the storefront backend.

mod money;
mod types;

pub use money::Money;
pub use types::{CartId, CartLineId, OrderId, ProductId, UserId};
