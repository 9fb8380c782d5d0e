use super::credit_card::CreditCard;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentState {
    /// Waiting on the shopper to authorise the charge (SCA)
    Pending,
    Completed,
    Failed,
}

/// One attempt to pay an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub amount: Decimal,
    pub state: PaymentState,
    pub source: CreditCard,
    /// Payment intent id, when the gateway got that far
    pub response_code: Option<String>,
    /// Amount in minor units as reported by the gateway
    pub amount_charged: Option<i64>,
    /// SCA authorisation page for pending payments
    pub redirect_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(amount: Decimal, state: PaymentState, source: CreditCard) -> Self {
        Self {
            id: Uuid::new_v4(),
            amount,
            state,
            source,
            response_code: None,
            amount_charged: None,
            redirect_url: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.state == PaymentState::Completed
    }

    pub fn is_pending(&self) -> bool {
        self.state == PaymentState::Pending
    }
}
