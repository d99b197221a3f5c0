pub mod cart;
pub mod health;
pub mod metrics;
pub mod orders;

use checkout::{CartService, CheckoutService, OrderLifecycle};
use store::StorefrontStore;

/// Shared application state accessible from all handlers.
pub struct AppState<S: StorefrontStore> {
    pub checkout: CheckoutService<S, S, S, S>,
    pub lifecycle: OrderLifecycle<S, S>,
    pub carts: CartService<S, S>,
}

impl<S: StorefrontStore> AppState<S> {
    /// Wires every service to the same storage backend.
    pub fn new(store: S) -> Self {
        Self {
            checkout: CheckoutService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                store.clone(),
            ),
            lifecycle: OrderLifecycle::new(store.clone(), store.clone()),
            carts: CartService::new(store.clone(), store),
        }
    }
}
