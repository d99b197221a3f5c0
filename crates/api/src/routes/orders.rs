//! Order placement, lifecycle and query endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, NaiveDate, Utc};
use checkout::{OrderFilter, OrderListing};
use common::OrderId;
use domain::{
    CancelOrder, Order, OrderStatus, PaymentStatus, PlaceOrder, ShippingAddress,
    UpdateOrderStatus,
};
use serde::{Deserialize, Serialize};
use store::StorefrontStore;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::routes::AppState;

// -- Request types --

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct ShippingAddressRequest {
    pub full_name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub phone: Option<String>,
}

impl From<ShippingAddressRequest> for ShippingAddress {
    fn from(req: ShippingAddressRequest) -> Self {
        ShippingAddress {
            full_name: req.full_name,
            street: req.street,
            city: req.city,
            state: req.state,
            postal_code: req.postal_code,
            country: req.country,
            phone: req.phone.filter(|p| !p.trim().is_empty()),
        }
    }
}

#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    pub shipping_address: Option<ShippingAddressRequest>,
    #[serde(default)]
    pub payment_method: String,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub order_status: Option<String>,
    pub payment_status: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct ListOrdersParams {
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page: Option<usize>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: String,
    pub lines: Vec<OrderLineResponse>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub items_price_cents: i64,
    pub shipping_price_cents: i64,
    pub tax_price_cents: i64,
    pub total_price_cents: i64,
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct OrderLineResponse {
    pub product_id: String,
    pub name: String,
    pub price_cents: i64,
    pub quantity: u32,
    pub size: String,
    pub color: String,
    pub image: String,
}

#[derive(Serialize)]
pub struct OrderListResponse {
    pub orders: Vec<OrderResponse>,
    pub page: usize,
    pub pages: u64,
    pub total: u64,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id.to_string(),
            user_id: order.user_id.to_string(),
            lines: order
                .lines
                .into_iter()
                .map(|line| OrderLineResponse {
                    product_id: line.product_id.to_string(),
                    name: line.name,
                    price_cents: line.price.cents(),
                    quantity: line.quantity,
                    size: line.size,
                    color: line.color,
                    image: line.image,
                })
                .collect(),
            shipping_address: order.shipping_address,
            payment_method: order.payment_method.to_string(),
            items_price_cents: order.items_price.cents(),
            shipping_price_cents: order.shipping_price.cents(),
            tax_price_cents: order.tax_price.cents(),
            total_price_cents: order.total_price.cents(),
            order_status: order.order_status,
            payment_status: order.payment_status,
            is_paid: order.is_paid,
            paid_at: order.paid_at,
            is_delivered: order.is_delivered,
            delivered_at: order.delivered_at,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

impl From<OrderListing> for OrderListResponse {
    fn from(listing: OrderListing) -> Self {
        Self {
            orders: listing.orders.into_iter().map(OrderResponse::from).collect(),
            page: listing.page,
            pages: listing.pages,
            total: listing.total,
        }
    }
}

// -- Handlers --

/// POST /orders: place an order from the caller's cart.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: StorefrontStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let address = req
        .shipping_address
        .ok_or_else(|| ApiError::BadRequest("shipping_address is required".to_string()))?;

    let order = state
        .checkout
        .place_order(PlaceOrder::new(
            actor.user_id,
            address.into(),
            req.payment_method,
        ))
        .await?;

    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /orders: list all orders (admin).
#[tracing::instrument(skip(state, params))]
pub async fn list<S: StorefrontStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    Query(params): Query<ListOrdersParams>,
) -> Result<Json<OrderListResponse>, ApiError> {
    let filter = OrderFilter {
        status: params
            .status
            .as_deref()
            .map(parse_order_status)
            .transpose()?,
        start_date: params
            .start_date
            .as_deref()
            .map(|d| parse_date("start_date", d))
            .transpose()?,
        end_date: params
            .end_date
            .as_deref()
            .map(|d| parse_date("end_date", d))
            .transpose()?,
        page: params.page,
    };

    let listing = state.lifecycle.list_orders(actor, filter).await?;
    Ok(Json(listing.into()))
}

/// GET /orders/my-orders: the caller's own orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn my_orders<S: StorefrontStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.lifecycle.list_my_orders(actor).await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// GET /orders/{id}: load one order (owner or admin).
#[tracing::instrument(skip(state))]
pub async fn get<S: StorefrontStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state.lifecycle.get_order(order_id, actor).await?;
    Ok(Json(order.into()))
}

/// PUT /orders/{id}/cancel: cancel an order and return its stock.
#[tracing::instrument(skip(state))]
pub async fn cancel<S: StorefrontStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state
        .lifecycle
        .cancel(CancelOrder::new(order_id, actor))
        .await?;
    Ok(Json(order.into()))
}

/// PUT /orders/{id}/status: administrative status override.
#[tracing::instrument(skip(state, req))]
pub async fn update_status<S: StorefrontStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;

    let mut cmd = UpdateOrderStatus::new(order_id, actor);
    if let Some(status) = req.order_status.as_deref() {
        cmd = cmd.order_status(parse_order_status(status)?);
    }
    if let Some(status) = req.payment_status.as_deref() {
        cmd = cmd.payment_status(
            status
                .trim()
                .parse()
                .map_err(|e: domain::UnknownStatus| ApiError::BadRequest(e.to_string()))?,
        );
    }

    let order = state.lifecycle.update_status(cmd).await?;
    Ok(Json(order.into()))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    id.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid order ID: {e}")))
}

fn parse_order_status(status: &str) -> Result<OrderStatus, ApiError> {
    status
        .trim()
        .parse()
        .map_err(|e: domain::UnknownStatus| ApiError::BadRequest(e.to_string()))
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC).
fn parse_date(field: &str, value: &str) -> Result<DateTime<Utc>, ApiError> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Ok(timestamp.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid {field}: {value}")))
}
