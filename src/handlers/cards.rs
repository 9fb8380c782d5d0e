use super::{common::validate_input, AppState};
use crate::{
    models::{CardBrand, CreditCard},
    ApiResponse, ApiResult,
};
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

pub fn cards_routes() -> Router<AppState> {
    Router::new().route("/", get(list_saved_cards))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SavedCardsQuery {
    #[validate(email)]
    pub email: String,
}

/// Saved card as offered to the shopper; gateway ids stay server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedCardResponse {
    pub id: Uuid,
    pub brand: CardBrand,
    pub last_digits: String,
    pub month: u32,
    pub year: i32,
    pub name: String,
}

impl From<CreditCard> for SavedCardResponse {
    fn from(card: CreditCard) -> Self {
        Self {
            id: card.id,
            brand: card.brand,
            last_digits: card.last_digits,
            month: card.month,
            year: card.year,
            name: card.name,
        }
    }
}

/// List the cards a customer saved for reuse
pub async fn list_saved_cards(
    State(state): State<AppState>,
    Query(query): Query<SavedCardsQuery>,
) -> ApiResult<Vec<SavedCardResponse>> {
    validate_input(&query)?;

    let cards = state.services.checkout.saved_cards(&query.email).await?;
    Ok(Json(ApiResponse::success(
        cards.into_iter().map(SavedCardResponse::from).collect(),
    )))
}
