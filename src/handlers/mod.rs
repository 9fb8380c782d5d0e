pub mod cards;
pub mod checkout;
pub mod common;
pub mod orders;

use crate::{
    config::AppConfig,
    events::EventSender,
    repositories::{CardRepository, OrderRepository},
    services::{
        checkout::CheckoutService,
        payments::{PaymentGateway, PaymentOrchestrator},
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub checkout: Arc<CheckoutService>,
}

impl AppServices {
    /// Wire the checkout service over the given storage and payment gateway.
    pub fn new(
        config: &AppConfig,
        orders: Arc<dyn OrderRepository>,
        cards: Arc<dyn CardRepository>,
        gateway: Arc<dyn PaymentGateway>,
        event_sender: EventSender,
    ) -> Self {
        let orchestrator = PaymentOrchestrator::new(
            gateway,
            config.gateway.currency.clone(),
            config.gateway_error_flash.clone(),
        );

        Self {
            checkout: Arc::new(CheckoutService::new(
                orders,
                cards,
                orchestrator,
                event_sender,
            )),
        }
    }
}
