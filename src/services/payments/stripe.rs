use super::gateway::{
    AttachedPaymentMethod, CustomerProfile, GatewayContext, IntentReceipt, IntentRequest,
    IntentStatus, PaymentGateway, ProviderError,
};
use crate::{config::GatewayConfig, errors::ServiceError};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, info, instrument, warn};

const STRIPE_ACCOUNT_HEADER: &str = "Stripe-Account";
const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";
const ORDER_NUMBER_METADATA: &str = "metadata[order_number]";

/// Stripe REST client for the checkout payment flow
#[derive(Clone)]
pub struct StripeGateway {
    config: GatewayConfig,
    client: reqwest::Client,
}

impl StripeGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| {
                ServiceError::InternalError(format!("Failed to build Stripe client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    fn authorized(
        &self,
        method: Method,
        path: &str,
        ctx: &GatewayContext,
    ) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .request(method, self.endpoint(path))
            .basic_auth(&self.config.secret_key, Some(""));

        if let Some(account) = &ctx.connected_account {
            request = request.header(STRIPE_ACCOUNT_HEADER, account);
        }
        request
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        idempotency_key: Option<String>,
        ctx: &GatewayContext,
    ) -> Result<T, ProviderError> {
        let mut request = self.authorized(Method::POST, path, ctx).form(params);
        if let Some(key) = idempotency_key {
            request = request.header(IDEMPOTENCY_KEY_HEADER, key);
        }
        dispatch(path, request).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        ctx: &GatewayContext,
    ) -> Result<T, ProviderError> {
        dispatch(path, self.authorized(Method::GET, path, ctx)).await
    }
}

async fn dispatch<T: DeserializeOwned>(
    path: &str,
    request: reqwest::RequestBuilder,
) -> Result<T, ProviderError> {
    let response = request.send().await.map_err(|e| {
        warn!(path, error = %e, "Stripe request failed");
        if e.is_timeout() {
            ProviderError::new("The payment gateway did not respond in time")
        } else {
            ProviderError::new(format!("Could not reach the payment gateway: {}", e))
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = error_message(status, &body);
        warn!(path, %status, %message, "Stripe API error");
        return Err(ProviderError::new(message));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| ProviderError::new(format!("Failed to parse Stripe response: {}", e)))
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip(self, email), fields(order_number = %ctx.order_number))]
    async fn create_customer(
        &self,
        email: &str,
        ctx: &GatewayContext,
    ) -> Result<CustomerProfile, ProviderError> {
        let params = [
            ("email", email.to_string()),
            (ORDER_NUMBER_METADATA, ctx.order_number.clone()),
        ];

        let customer: StripeObject = self.post_form("/v1/customers", &params, None, ctx).await?;
        info!(customer_id = %customer.id, "Stripe customer created");

        Ok(CustomerProfile {
            customer_id: customer.id,
        })
    }

    #[instrument(skip(self), fields(order_number = %ctx.order_number))]
    async fn attach_payment_method(
        &self,
        payment_method_id: &str,
        customer_id: &str,
        ctx: &GatewayContext,
    ) -> Result<AttachedPaymentMethod, ProviderError> {
        let path = format!("/v1/payment_methods/{}/attach", payment_method_id);
        let params = [("customer", customer_id.to_string())];
        // The attach endpoint accepts no metadata; the order rides on the idempotency key.
        let key = format!(
            "attach-{}-{}-{}",
            ctx.order_number, payment_method_id, customer_id
        );

        let method: StripePaymentMethod = self.post_form(&path, &params, Some(key), ctx).await?;
        debug!(payment_method_id = %method.id, "Payment method attached");

        Ok(AttachedPaymentMethod {
            customer_id: method.customer.unwrap_or_else(|| customer_id.to_string()),
            payment_method_id: method.id,
        })
    }

    #[instrument(skip(self, request), fields(order_number = %ctx.order_number, amount = request.amount))]
    async fn create_payment_intent(
        &self,
        request: &IntentRequest,
        ctx: &GatewayContext,
    ) -> Result<IntentReceipt, ProviderError> {
        let mut params = vec![
            ("amount", request.amount.to_string()),
            ("currency", request.currency.to_lowercase()),
            ("payment_method", request.payment_method_id.clone()),
            ("payment_method_types[]", "card".to_string()),
            ("confirm", "true".to_string()),
            (ORDER_NUMBER_METADATA, ctx.order_number.clone()),
        ];
        if let Some(customer_id) = &request.customer_id {
            params.push(("customer", customer_id.clone()));
        }
        if let Some(return_url) = &self.config.return_url {
            params.push(("return_url", return_url.clone()));
        }

        let intent: StripePaymentIntent = self
            .post_form("/v1/payment_intents", &params, None, ctx)
            .await?;
        info!(intent_id = %intent.id, status = %intent.status, "PaymentIntent created");

        Ok(intent.into_receipt())
    }

    #[instrument(skip(self), fields(order_number = %ctx.order_number))]
    async fn retrieve_payment_intent(
        &self,
        intent_id: &str,
        ctx: &GatewayContext,
    ) -> Result<IntentReceipt, ProviderError> {
        let path = format!("/v1/payment_intents/{}", intent_id);
        let intent: StripePaymentIntent = self.get_json(&path, ctx).await?;
        debug!(intent_id = %intent.id, status = %intent.status, "PaymentIntent retrieved");

        Ok(intent.into_receipt())
    }

    #[instrument(skip(self), fields(order_number = %ctx.order_number))]
    async fn cancel_payment_intent(
        &self,
        intent_id: &str,
        ctx: &GatewayContext,
    ) -> Result<IntentReceipt, ProviderError> {
        let path = format!("/v1/payment_intents/{}/cancel", intent_id);
        let params = [("cancellation_reason", "abandoned".to_string())];
        let intent: StripePaymentIntent = self.post_form(&path, &params, None, ctx).await?;
        info!(intent_id = %intent.id, status = %intent.status, "PaymentIntent canceled");

        Ok(intent.into_receipt())
    }
}

/// Stripe's error text, falling back to the HTTP status line.
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<StripeErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error.message)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| format!("Payment gateway responded with {}", status))
}

#[derive(Debug, Deserialize)]
struct StripeObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StripePaymentMethod {
    id: String,
    #[serde(default)]
    customer: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripePaymentIntent {
    id: String,
    amount: i64,
    #[serde(default)]
    amount_received: Option<i64>,
    status: IntentStatus,
    #[serde(default)]
    next_action: Option<NextAction>,
}

impl StripePaymentIntent {
    fn into_receipt(self) -> IntentReceipt {
        let redirect_url = self
            .next_action
            .and_then(|action| action.redirect_to_url)
            .map(|redirect| redirect.url);

        IntentReceipt {
            intent_id: self.id,
            amount_charged: self
                .amount_received
                .filter(|received| *received > 0)
                .unwrap_or(self.amount),
            status: self.status,
            redirect_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NextAction {
    #[serde(default)]
    redirect_to_url: Option<RedirectToUrl>,
}

#[derive(Debug, Deserialize)]
struct RedirectToUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    #[serde(default)]
    message: Option<String>,
}
