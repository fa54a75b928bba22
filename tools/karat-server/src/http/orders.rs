//! Checkout, receipts, order history, metal prices and health.

use axum::extract::{Query, State};
use axum::http::{header, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use karat_cache::SessionId;
use karat_commerce::checkout::receipt_file_name;
use karat_commerce::prelude::*;
use serde::Deserialize;
use serde_json::{json, Value};

use super::cart::restore_cart;
use super::error::{ApiError, JsonBody};
use super::AppState;

const ORDER_ID_HEADER: HeaderName = HeaderName::from_static("x-order-id");

#[derive(Debug, Default, Deserialize)]
pub struct BillParams {
    pub order_id: Option<String>,
}

fn receipt_attachment(order_id: &OrderId, text: String) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", receipt_file_name(order_id));
    (
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
            (ORDER_ID_HEADER, order_id.to_string()),
        ],
        text,
    )
        .into_response()
}

/// Check out the session's cart and answer with the receipt.
///
/// The cart is emptied up front so a concurrent checkout of the same session
/// finds nothing to order; on failure the lines go back.
pub async fn place_order(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    JsonBody(request): JsonBody<CheckoutRequest>,
) -> Result<Response, ApiError> {
    let mut cart = state.carts.update(&session, |cart: &mut Cart| -> Result<Cart, ApiError> {
        let taken = cart.clone();
        cart.clear();
        Ok(taken)
    })?;
    let taken = cart.clone();

    match state.checkout.place_order(&mut cart, request).await {
        Ok(outcome) => Ok(receipt_attachment(&outcome.order.id, outcome.receipt_text)),
        Err(err) => {
            if let Err(restore_err) = restore_cart(&state, &session, &taken) {
                tracing::error!(session = %session, error = %restore_err.message(), "failed to restore cart");
            }
            Err(err.into())
        }
    }
}

pub async fn download_bill(
    State(state): State<AppState>,
    Query(params): Query<BillParams>,
) -> Result<Response, ApiError> {
    let order_id = params
        .order_id
        .as_deref()
        .and_then(OrderId::parse)
        .ok_or_else(|| ApiError::bad_request("Missing order_id"))?;
    let text = state.checkout.receipts().load(&order_id).await?;
    Ok(receipt_attachment(&order_id, text))
}

pub async fn order_history(
    State(state): State<AppState>,
) -> Result<Json<Vec<OrderSummary>>, ApiError> {
    Ok(Json(state.store().order_history().await?))
}

pub async fn metal_prices(State(state): State<AppState>) -> Json<MetalPricesView> {
    Json(state.prices.metal_prices().await.to_view())
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let timestamp = chrono::Utc::now().to_rfc3339();
    let storage = state.store().backend();
    match state.store().ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "healthy", "storage": storage, "timestamp": timestamp })),
        ),
        Err(e) => {
            tracing::error!(storage, error = %e, "health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "unhealthy",
                    "storage": storage,
                    "error": e.to_string(),
                    "timestamp": timestamp,
                })),
            )
        }
    }
}
