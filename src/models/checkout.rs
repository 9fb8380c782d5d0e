use super::{card_brand::CardBrand, credit_card::CardDetails};
use crate::errors::ServiceError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Address {
    #[validate(length(min = 1, max = 255))]
    pub firstname: String,
    #[validate(length(min = 1, max = 255))]
    pub lastname: String,
    #[validate(length(min = 1, max = 255))]
    pub address1: String,
    #[serde(default)]
    pub address2: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub city: String,
    #[validate(length(min = 1, max = 32))]
    pub zipcode: String,
    #[validate(length(min = 1, max = 64))]
    pub phone: String,
    #[serde(default)]
    pub state_name: Option<String>,
    #[validate(length(equal = 2))]
    pub country_code: String,
}

/// Card fields posted by the storefront after Stripe.js tokenised the card.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CardAttributes {
    /// Payment-method id returned by Stripe.js
    #[serde(alias = "gateway_payment_profile_id")]
    #[validate(length(min = 1))]
    pub token: String,
    #[validate(length(min = 1))]
    pub cc_type: String,
    #[validate(length(equal = 4))]
    pub last_digits: String,
    #[validate(range(min = 1, max = 12))]
    pub month: u32,
    #[validate(range(min = 2000, max = 2200))]
    pub year: i32,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[serde(default)]
    pub save_requested_by_customer: bool,
}

impl CardAttributes {
    pub fn details(&self) -> Result<CardDetails, ServiceError> {
        Ok(CardDetails {
            brand: CardBrand::from_cc_type(&self.cc_type)?,
            last_digits: self.last_digits.clone(),
            month: self.month,
            year: self.year,
            name: self.name.clone(),
        })
    }
}

/// One checkout submission for an order.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub shipping_method_id: String,
    pub bill_address: Address,
    #[serde(default)]
    pub ship_address: Option<Address>,
    #[serde(default)]
    pub existing_card_id: Option<Uuid>,
    #[serde(default)]
    pub source: Option<CardAttributes>,
}

impl CheckoutRequest {
    /// Validates the request and every nested address and card section.
    pub fn check(&self) -> Result<(), ServiceError> {
        self.validate()?;
        self.bill_address.validate()?;
        if let Some(address) = &self.ship_address {
            address.validate()?;
        }
        if let Some(source) = &self.source {
            source.validate()?;
        }
        Ok(())
    }
}
