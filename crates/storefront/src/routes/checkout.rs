//! Checkout route handler.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use serde::Serialize;
use tracing::instrument;

use bookshelf_core::{OrderId, OrderNumber, Price};

use crate::error::{AppError, AppJson, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::ShippingDetails;
use crate::services::CheckoutRequest;
use crate::services::checkout::{IDEMPOTENCY_KEY_HEADER, IdempotencyKey};
use crate::state::AppState;

/// Body returned by a successful checkout.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub success: bool,
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub total_amount: Price,
}

fn idempotency_key(headers: &HeaderMap) -> Result<Option<IdempotencyKey>> {
    let Some(value) = headers.get(IDEMPOTENCY_KEY_HEADER) else {
        return Ok(None);
    };
    let raw = value
        .to_str()
        .map_err(|_| AppError::BadRequest("Idempotency-Key must be ASCII".to_string()))?;
    IdempotencyKey::parse(raw)
        .map(Some)
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

/// Place an order from the caller's cart.
///
/// Returns 201 for a new order and 200 when an earlier order with the same
/// `Idempotency-Key` is returned.
#[instrument(skip(state, user, headers, shipping), fields(user_id = %user.id))]
pub async fn place_order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    headers: HeaderMap,
    AppJson(shipping): AppJson<ShippingDetails>,
) -> Result<(StatusCode, Json<CheckoutResponse>)> {
    shipping
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let request = CheckoutRequest {
        shipping,
        idempotency_key: idempotency_key(&headers)?,
    };
    let placed = state.checkout().place_order(user.id, &request).await?;

    add_breadcrumb(
        "checkout",
        "Order placed",
        Some(&[("order_number", placed.order_number.as_str())]),
    );

    let status = if placed.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((
        status,
        Json(CheckoutResponse {
            success: true,
            order_id: placed.order_id,
            order_number: placed.order_number,
            total_amount: placed.total_amount,
        }),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_missing_header_is_none() {
        assert!(idempotency_key(&HeaderMap::new()).unwrap().is_none());
    }

    #[test]
    fn test_header_is_parsed() {
        let mut headers = HeaderMap::new();
        headers.insert(IDEMPOTENCY_KEY_HEADER, HeaderValue::from_static("order-42"));
        assert_eq!(
            idempotency_key(&headers).unwrap().unwrap().as_str(),
            "order-42"
        );
    }

    #[test]
    fn test_blank_header_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(IDEMPOTENCY_KEY_HEADER, HeaderValue::from_static("  "));
        assert!(matches!(
            idempotency_key(&headers),
            Err(AppError::BadRequest(_))
        ));
    }
}
