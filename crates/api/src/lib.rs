//! HTTP API server with observability for the storefront order core.
//!
//! Provides REST endpoints for carts, checkout and order management,
//! with structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod seed;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{InMemoryStore, StorefrontStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: StorefrontStore>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/orders",
            post(routes::orders::create::<S>).get(routes::orders::list::<S>),
        )
        .route("/orders/my-orders", get(routes::orders::my_orders::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/cancel", put(routes::orders::cancel::<S>))
        .route("/orders/{id}/status", put(routes::orders::update_status::<S>))
        .route(
            "/cart",
            get(routes::cart::get::<S>).delete(routes::cart::clear::<S>),
        )
        .route("/cart/items", post(routes::cart::add_item::<S>))
        .route(
            "/cart/items/{line_id}",
            put(routes::cart::update_item::<S>).delete(routes::cart::remove_item::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state backed by in-memory stores.
pub fn create_default_state() -> (Arc<AppState<InMemoryStore>>, InMemoryStore) {
    let store = InMemoryStore::new();
    (Arc::new(AppState::new(store.clone())), store)
}

/// Registers descriptions for the metrics emitted by the checkout core.
pub fn describe_metrics() {
    metrics::describe_counter!("orders_placed_total", "Orders successfully placed");
    metrics::describe_counter!(
        "order_placement_failures_total",
        "Order placements that failed, labelled by reason"
    );
    metrics::describe_histogram!(
        "order_placement_duration_seconds",
        metrics::Unit::Seconds,
        "Time spent placing an order"
    );
    metrics::describe_counter!("stock_reservations_total", "Successful stock reservations");
    metrics::describe_counter!(
        "stock_compensations_total",
        "Reservations rolled back after a failed placement"
    );
    metrics::describe_counter!("orders_cancelled_total", "Orders cancelled");
}
