use super::AppState;
use crate::{models::CheckoutRequest, services::checkout::CheckoutOutcome, ApiResponse, ApiResult};
use axum::{
    extract::{Path, State},
    routing::{post, put},
    Json, Router,
};

pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/:order_number", put(submit_checkout))
        .route("/:order_number/confirm", post(confirm_checkout))
}

/// Submit checkout details and pay for an order
pub async fn submit_checkout(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
    Json(request): Json<CheckoutRequest>,
) -> ApiResult<CheckoutOutcome> {
    let outcome = state
        .services
        .checkout
        .submit(&order_number, request)
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// Settle the payment once the shopper is back from the SCA challenge
pub async fn confirm_checkout(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> ApiResult<CheckoutOutcome> {
    let outcome = state.services.checkout.confirm(&order_number).await?;
    Ok(Json(ApiResponse::success(outcome)))
}
