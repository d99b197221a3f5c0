//! Cart endpoints for the calling user.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use common::{CartLineId, ProductId};
use domain::Cart;
use serde::{Deserialize, Serialize};
use store::StorefrontStore;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::routes::AppState;

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct AddItemRequest {
    pub product_id: String,
    pub quantity: u32,
    pub size: String,
    pub color: String,
}

#[derive(Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: u32,
}

#[derive(Serialize)]
pub struct CartResponse {
    pub id: String,
    pub user_id: String,
    pub lines: Vec<CartLineResponse>,
    pub total_price_cents: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct CartLineResponse {
    pub id: String,
    pub product_id: String,
    pub quantity: u32,
    pub size: String,
    pub color: String,
    pub price_cents: i64,
    pub total_price_cents: i64,
}

impl From<Cart> for CartResponse {
    fn from(cart: Cart) -> Self {
        Self {
            id: cart.id.to_string(),
            user_id: cart.user_id.to_string(),
            lines: cart
                .lines
                .iter()
                .map(|line| CartLineResponse {
                    id: line.id.to_string(),
                    product_id: line.product_id.to_string(),
                    quantity: line.quantity,
                    size: line.size.clone(),
                    color: line.color.clone(),
                    price_cents: line.price.cents(),
                    total_price_cents: line.total_price().cents(),
                })
                .collect(),
            total_price_cents: cart.total_price.cents(),
            updated_at: cart.updated_at,
        }
    }
}

/// GET /cart
#[tracing::instrument(skip(state))]
pub async fn get<S: StorefrontStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state.carts.get_cart(actor.user_id).await?;
    Ok(Json(cart.into()))
}

/// DELETE /cart
#[tracing::instrument(skip(state))]
pub async fn clear<S: StorefrontStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state.carts.clear(actor.user_id).await?;
    Ok(Json(cart.into()))
}

/// POST /cart/items
#[tracing::instrument(skip(state, req))]
pub async fn add_item<S: StorefrontStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let product_id: ProductId = req
        .product_id
        .trim()
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid product ID: {e}")))?;

    let cart = state
        .carts
        .add_item(actor.user_id, product_id, req.quantity, &req.size, &req.color)
        .await?;
    Ok(Json(cart.into()))
}

/// PUT /cart/items/{line_id}
#[tracing::instrument(skip(state, req))]
pub async fn update_item<S: StorefrontStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    Path(line_id): Path<String>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let line_id = parse_line_id(&line_id)?;
    let cart = state
        .carts
        .update_item(actor.user_id, line_id, req.quantity)
        .await?;
    Ok(Json(cart.into()))
}

/// DELETE /cart/items/{line_id}
#[tracing::instrument(skip(state))]
pub async fn remove_item<S: StorefrontStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(actor): CurrentUser,
    Path(line_id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
    let line_id = parse_line_id(&line_id)?;
    let cart = state.carts.remove_item(actor.user_id, line_id).await?;
    Ok(Json(cart.into()))
}

fn parse_line_id(id: &str) -> Result<CartLineId, ApiError> {
    id.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid cart line ID: {e}")))
}
