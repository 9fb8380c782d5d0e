use super::card_brand::CardBrand;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cardholder-facing details of a card, as submitted by the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDetails {
    pub brand: CardBrand,
    pub last_digits: String,
    pub month: u32,
    pub year: i32,
    pub name: String,
}

/// Payment source backing a [`super::payment::Payment`].
///
/// `gateway_customer_profile_id` is set only for cards saved for reuse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditCard {
    pub id: Uuid,
    /// Owner of a saved card
    pub user_email: Option<String>,
    pub brand: CardBrand,
    pub last_digits: String,
    pub month: u32,
    pub year: i32,
    pub name: String,
    /// Provider payment-method id
    pub gateway_payment_profile_id: String,
    /// Provider customer id
    pub gateway_customer_profile_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CreditCard {
    /// A card used for this order only.
    pub fn single_use(details: CardDetails, payment_method_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_email: None,
            brand: details.brand,
            last_digits: details.last_digits,
            month: details.month,
            year: details.year,
            name: details.name,
            gateway_payment_profile_id: payment_method_id.into(),
            gateway_customer_profile_id: None,
            created_at: Utc::now(),
        }
    }

    /// A card stored against a gateway customer for later checkouts.
    pub fn saved(
        details: CardDetails,
        owner_email: impl Into<String>,
        payment_method_id: impl Into<String>,
        customer_id: impl Into<String>,
    ) -> Self {
        Self {
            user_email: Some(owner_email.into()),
            gateway_customer_profile_id: Some(customer_id.into()),
            ..Self::single_use(details, payment_method_id)
        }
    }

    pub fn is_saved(&self) -> bool {
        self.gateway_customer_profile_id.is_some()
    }

    pub fn belongs_to(&self, email: &str) -> bool {
        self.user_email
            .as_deref()
            .map(|owner| owner.eq_ignore_ascii_case(email))
            .unwrap_or(false)
    }
}
