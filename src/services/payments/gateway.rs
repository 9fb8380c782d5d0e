use crate::models::Order;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;

/// Failure reported by the payment provider, carrying the provider's own text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProviderError {
    pub message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Per-order data sent along with every gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayContext {
    pub order_number: String,
    /// Connected account the hub is paid into
    pub connected_account: Option<String>,
}

impl GatewayContext {
    pub fn for_order(order: &Order) -> Self {
        Self {
            order_number: order.number.clone(),
            connected_account: order.distributor.stripe_account_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerProfile {
    pub customer_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedPaymentMethod {
    pub payment_method_id: String,
    pub customer_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentRequest {
    /// Minor units of `currency`
    pub amount: i64,
    pub currency: String,
    pub payment_method_id: String,
    pub customer_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IntentStatus {
    Succeeded,
    RequiresCapture,
    RequiresAction,
    RequiresPaymentMethod,
    RequiresConfirmation,
    Processing,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl IntentStatus {
    /// Funds are secured, either captured or authorised for capture.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Succeeded | Self::RequiresCapture)
    }

    /// The intent may still move funds without a new confirmation.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::RequiresAction | Self::Processing)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentReceipt {
    pub intent_id: String,
    pub amount_charged: i64,
    pub status: IntentStatus,
    /// Authorisation page when the intent requires customer action
    pub redirect_url: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_customer(
        &self,
        email: &str,
        ctx: &GatewayContext,
    ) -> Result<CustomerProfile, ProviderError>;

    async fn attach_payment_method(
        &self,
        payment_method_id: &str,
        customer_id: &str,
        ctx: &GatewayContext,
    ) -> Result<AttachedPaymentMethod, ProviderError>;

    async fn create_payment_intent(
        &self,
        request: &IntentRequest,
        ctx: &GatewayContext,
    ) -> Result<IntentReceipt, ProviderError>;

    /// Current state of an intent, e.g. after the shopper returns from an SCA challenge.
    async fn retrieve_payment_intent(
        &self,
        intent_id: &str,
        ctx: &GatewayContext,
    ) -> Result<IntentReceipt, ProviderError>;

    async fn cancel_payment_intent(
        &self,
        intent_id: &str,
        ctx: &GatewayContext,
    ) -> Result<IntentReceipt, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrecognised_statuses_deserialize_as_unknown() {
        let status: IntentStatus = serde_json::from_str("\"requires_action\"").unwrap();
        assert_eq!(status, IntentStatus::RequiresAction);

        let status: IntentStatus = serde_json::from_str("\"something_new\"").unwrap();
        assert_eq!(status, IntentStatus::Unknown);
        assert!(!status.is_settled());
        assert!(IntentStatus::RequiresCapture.is_settled());
        assert!(IntentStatus::RequiresAction.is_in_flight());
        assert!(!IntentStatus::Canceled.is_in_flight());
    }
}
