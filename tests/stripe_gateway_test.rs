//! Tests for the Stripe REST client against a wiremock server.

use hub_checkout::{
    config::GatewayConfig,
    services::payments::{
        GatewayContext, IntentRequest, IntentStatus, PaymentGateway, StripeGateway,
    },
};
use serde_json::json;
use std::time::Duration;
use wiremock::{
    matchers::{basic_auth, body_string_contains, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

const SECRET_KEY: &str = "sk_test_4eC39HqLyjWDarjtT1zdp7dc";

fn gateway(server: &MockServer) -> StripeGateway {
    let mut config = GatewayConfig::new(SECRET_KEY);
    config.api_base = server.uri();
    config.timeout_secs = 1;
    config.return_url = Some("https://shop.example.org/checkout/return".into());
    StripeGateway::new(config).expect("stripe client")
}

fn context(connected_account: Option<&str>) -> GatewayContext {
    GatewayContext {
        order_number: "R644360121".into(),
        connected_account: connected_account.map(str::to_string),
    }
}

fn intent_request(customer_id: Option<&str>) -> IntentRequest {
    IntentRequest {
        amount: 1234,
        currency: "AUD".into(),
        payment_method_id: "pm_123".into(),
        customer_id: customer_id.map(str::to_string),
    }
}

#[tokio::test]
async fn creates_customers_with_the_order_number() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/customers"))
        .and(basic_auth(SECRET_KEY, ""))
        .and(body_string_contains("email=shopper%40example.org"))
        .and(body_string_contains("metadata%5Border_number%5D=R644360121"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "cus_A123" })))
        .expect(1)
        .mount(&server)
        .await;

    let profile = gateway(&server)
        .create_customer("shopper@example.org", &context(None))
        .await
        .unwrap();

    assert_eq!(profile.customer_id, "cus_A123");
}

#[tokio::test]
async fn attaches_payment_methods_with_an_order_scoped_idempotency_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payment_methods/pm_123/attach"))
        .and(basic_auth(SECRET_KEY, ""))
        .and(body_string_contains("customer=cus_A123"))
        .and(header("Idempotency-Key", "attach-R644360121-pm_123-cus_A123"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": "new_pm_123", "customer": "cus_A123" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let attached = gateway(&server)
        .attach_payment_method("pm_123", "cus_A123", &context(None))
        .await
        .unwrap();

    assert_eq!(attached.payment_method_id, "new_pm_123");
    assert_eq!(attached.customer_id, "cus_A123");
}

#[tokio::test]
async fn confirms_payment_intents_on_the_connected_account() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payment_intents"))
        .and(header("Stripe-Account", "acct_hub"))
        .and(body_string_contains("amount=1234"))
        .and(body_string_contains("currency=aud"))
        .and(body_string_contains("payment_method=pm_123"))
        .and(body_string_contains("customer=cus_A123"))
        .and(body_string_contains("confirm=true"))
        .and(body_string_contains("metadata%5Border_number%5D=R644360121"))
        .and(body_string_contains("return_url="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pi_1",
            "amount": 1234,
            "amount_received": 1234,
            "status": "succeeded"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let receipt = gateway(&server)
        .create_payment_intent(&intent_request(Some("cus_A123")), &context(Some("acct_hub")))
        .await
        .unwrap();

    assert_eq!(receipt.intent_id, "pi_1");
    assert_eq!(receipt.amount_charged, 1234);
    assert_eq!(receipt.status, IntentStatus::Succeeded);
    assert_eq!(receipt.redirect_url, None);
}

#[tokio::test]
async fn omits_the_account_header_and_customer_when_not_needed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payment_intents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pi_2",
            "amount": 1234,
            "status": "requires_capture"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let receipt = gateway(&server)
        .create_payment_intent(&intent_request(None), &context(None))
        .await
        .unwrap();
    assert!(receipt.status.is_settled());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("stripe-account").is_none());
    let body = String::from_utf8(requests[0].body.clone()).unwrap();
    assert!(!body.contains("customer="));
}

#[tokio::test]
async fn retrieves_intents_on_the_connected_account() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/payment_intents/pi_sca"))
        .and(basic_auth(SECRET_KEY, ""))
        .and(header("Stripe-Account", "acct_hub"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pi_sca",
            "amount": 1234,
            "amount_received": 1234,
            "status": "succeeded"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let receipt = gateway(&server)
        .retrieve_payment_intent("pi_sca", &context(Some("acct_hub")))
        .await
        .unwrap();

    assert_eq!(receipt.intent_id, "pi_sca");
    assert_eq!(receipt.status, IntentStatus::Succeeded);
    assert_eq!(receipt.amount_charged, 1234);
}

#[tokio::test]
async fn cancels_abandoned_intents() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payment_intents/pi_sca/cancel"))
        .and(basic_auth(SECRET_KEY, ""))
        .and(body_string_contains("cancellation_reason=abandoned"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pi_sca",
            "amount": 1234,
            "status": "canceled"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let receipt = gateway(&server)
        .cancel_payment_intent("pi_sca", &context(None))
        .await
        .unwrap();

    assert_eq!(receipt.status, IntentStatus::Canceled);
}

#[tokio::test]
async fn reports_stripe_error_messages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payment_intents"))
        .respond_with(ResponseTemplate::new(402).set_body_json(json!({
            "error": {
                "type": "card_error",
                "code": "card_declined",
                "message": "Your card was declined."
            }
        })))
        .mount(&server)
        .await;

    let err = gateway(&server)
        .create_payment_intent(&intent_request(None), &context(None))
        .await
        .unwrap_err();

    assert_eq!(err.message, "Your card was declined.");
}

#[tokio::test]
async fn reports_the_status_when_stripe_sends_no_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/customers"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let err = gateway(&server)
        .create_customer("shopper@example.org", &context(None))
        .await
        .unwrap_err();

    assert_eq!(err.message, "Payment gateway responded with 503 Service Unavailable");
}

#[tokio::test]
async fn slow_responses_time_out_as_gateway_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payment_intents"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": "pi_3", "amount": 1234, "status": "succeeded" }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let err = gateway(&server)
        .create_payment_intent(&intent_request(None), &context(None))
        .await
        .unwrap_err();

    assert_eq!(err.message, "The payment gateway did not respond in time");
}
