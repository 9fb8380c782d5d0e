#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use hub_checkout::{
    config::{AppConfig, GatewayConfig},
    events::{self, EventSender},
    handlers::AppServices,
    repositories::{CardRepository, InMemoryCardRepository, InMemoryOrderRepository, OrderRepository},
    services::payments::{PaymentGateway, StripeGateway},
    AppState,
};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::MockServer;

pub const SECRET_KEY: &str = "sk_test_4eC39HqLyjWDarjtT1zdp7dc";

/// Application router wired to a wiremock stand-in for the Stripe API.
pub struct TestApp {
    router: Router,
    pub stripe: MockServer,
    pub orders: Arc<InMemoryOrderRepository>,
    pub cards: Arc<InMemoryCardRepository>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let stripe = MockServer::start().await;

        let mut gateway_config = GatewayConfig::new(SECRET_KEY);
        gateway_config.api_base = stripe.uri();
        gateway_config.currency = "aud".to_string();
        gateway_config.timeout_secs = 2;

        let cfg = AppConfig::new(
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
            gateway_config.clone(),
        );

        let (event_tx, event_rx) = mpsc::channel(64);
        let event_task = tokio::spawn(events::process_events(event_rx));
        let event_sender = EventSender::new(event_tx);

        let orders = Arc::new(InMemoryOrderRepository::new());
        let cards = Arc::new(InMemoryCardRepository::new());
        let gateway: Arc<dyn PaymentGateway> =
            Arc::new(StripeGateway::new(gateway_config).expect("stripe client"));

        let order_repository: Arc<dyn OrderRepository> = orders.clone();
        let card_repository: Arc<dyn CardRepository> = cards.clone();
        let services = AppServices::new(
            &cfg,
            order_repository,
            card_repository,
            gateway,
            event_sender,
        );

        let state = AppState {
            config: cfg,
            services,
        };

        Self {
            router: hub_checkout::app_router(state),
            stripe,
            orders,
            cards,
            _event_task: event_task,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Registers an order through the API.
    pub async fn register_order(&self, number: &str, total: &str, stripe_account: Option<&str>) {
        let response = self
            .request(
                Method::POST,
                "/api/v1/orders",
                Some(json!({
                    "number": number,
                    "total": total,
                    "distributor": {
                        "id": Uuid::new_v4(),
                        "name": "Fresh Fields Hub",
                        "stripe_account_id": stripe_account,
                    },
                    "order_cycle_id": Uuid::new_v4(),
                })),
            )
            .await;
        assert_eq!(response.status(), 201, "order registration failed");
    }

    pub async fn checkout(&self, order_number: &str, body: Value) -> Response {
        self.request(
            Method::PUT,
            &format!("/api/v1/checkout/{}", order_number),
            Some(body),
        )
        .await
    }

    pub async fn order(&self, order_number: &str) -> Value {
        let response = self
            .request(
                Method::GET,
                &format!("/api/v1/orders/{}", order_number),
                None,
            )
            .await;
        assert_eq!(response.status(), 200);
        response_json(response).await["data"].clone()
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// Checkout submission with a fresh Stripe.js card.
pub fn checkout_with_new_card(token: &str, save: bool) -> Value {
    json!({
        "email": "shopper@example.org",
        "shipping_method_id": "pickup",
        "bill_address": {
            "firstname": "Ada",
            "lastname": "Grower",
            "address1": "1 Orchard Lane",
            "city": "Melbourne",
            "zipcode": "3000",
            "phone": "0400000000",
            "country_code": "AU"
        },
        "source": {
            "gateway_payment_profile_id": token,
            "cc_type": "visa",
            "last_digits": "4242",
            "month": 10,
            "year": 2030,
            "name": "Ada Grower",
            "save_requested_by_customer": save
        }
    })
}

/// Checkout submission paying with a saved card.
pub fn checkout_with_saved_card(card_id: Uuid) -> Value {
    let mut body = checkout_with_new_card("pm_resubmitted", false);
    body["existing_card_id"] = json!(card_id);
    body["source"]["cc_type"] = json!("mastercard");
    body["source"]["last_digits"] = json!("5555");
    body
}

pub fn customer_body(id: &str) -> Value {
    json!({ "id": id, "object": "customer", "email": "shopper@example.org" })
}

pub fn payment_method_body(id: &str, customer: &str) -> Value {
    json!({ "id": id, "object": "payment_method", "customer": customer })
}

pub fn intent_body(id: &str, amount: i64, status: &str) -> Value {
    let amount_received = if status == "succeeded" { amount } else { 0 };
    json!({
        "id": id,
        "object": "payment_intent",
        "amount": amount,
        "amount_received": amount_received,
        "currency": "aud",
        "status": status
    })
}

pub fn stripe_error(message: &str) -> Value {
    json!({ "error": { "type": "card_error", "message": message } })
}
