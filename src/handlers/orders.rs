use super::{common::created_response, common::validate_input, AppState};
use crate::{
    errors::ServiceError,
    models::{Distributor, Order},
    ApiResponse, ApiResult,
};
use axum::{
    extract::{Path, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

pub fn orders_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(register_order))
        .route("/:order_number", get(get_order))
}

/// Order placed by the storefront, ready for checkout
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RegisterOrderRequest {
    #[validate(length(min = 1, max = 64))]
    pub number: String,
    #[validate(custom = "validate_total")]
    pub total: Decimal,
    pub distributor: Distributor,
    pub order_cycle_id: Uuid,
}

fn validate_total(total: &Decimal) -> Result<(), ValidationError> {
    if *total <= Decimal::ZERO {
        return Err(ValidationError::new("total_must_be_positive"));
    }
    Ok(())
}

/// Register an order
pub async fn register_order(
    State(state): State<AppState>,
    Json(payload): Json<RegisterOrderRequest>,
) -> Result<Response, ServiceError> {
    validate_input(&payload)?;

    let order = Order::new(
        payload.number,
        payload.total,
        payload.distributor,
        payload.order_cycle_id,
    );
    let order = state.services.checkout.register_order(order).await?;
    Ok(created_response(order))
}

/// Get an order with its payments
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> ApiResult<Order> {
    let order = state.services.checkout.find_order(&order_number).await?;
    Ok(Json(ApiResponse::success(order)))
}
