use crate::{
    errors::ServiceError,
    events::{Event, EventSender},
    models::{CheckoutRequest, CreditCard, Order, OrderState, PaymentState},
    repositories::{CardRepository, OrderRepository},
    services::payments::{CardSourceResolver, PaymentOrchestrator, Settlement},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

/// What the storefront needs after a checkout submission went through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutOutcome {
    pub order_number: String,
    pub path: String,
    pub state: OrderState,
    pub payment_state: PaymentState,
    pub completed_payments: usize,
    /// Where to send the shopper to authorise the payment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}

/// Service for checking out and paying food-hub orders
pub struct CheckoutService {
    orders: Arc<dyn OrderRepository>,
    cards: Arc<dyn CardRepository>,
    resolver: CardSourceResolver,
    orchestrator: PaymentOrchestrator,
    event_sender: EventSender,
}

impl CheckoutService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        cards: Arc<dyn CardRepository>,
        orchestrator: PaymentOrchestrator,
        event_sender: EventSender,
    ) -> Self {
        Self {
            resolver: CardSourceResolver::new(cards.clone()),
            orders,
            cards,
            orchestrator,
            event_sender,
        }
    }

    /// Applies the checkout details to the order and pays for it.
    #[instrument(skip(self, request))]
    pub async fn submit(
        &self,
        order_number: &str,
        request: CheckoutRequest,
    ) -> Result<CheckoutOutcome, ServiceError> {
        request.check()?;

        let mut order = self.find_order(order_number).await?;
        ensure_unpaid(&order)?;

        let had_pending = order.pending_payment().is_some();
        if let Some(settlement) = self.orchestrator.release_pending(&mut order).await? {
            info!(order_number = %order.number, "Pending payment was authorised before resubmission");
            return self.record_settlement(order, settlement).await;
        }
        if had_pending {
            self.orders.save(&order).await?;
        }

        order.email = Some(request.email.clone());
        order.shipping_method_id = Some(request.shipping_method_id.clone());
        order.ship_address = request
            .ship_address
            .clone()
            .or_else(|| Some(request.bill_address.clone()));
        order.bill_address = Some(request.bill_address.clone());
        order.state = OrderState::Payment;

        let plan = self.resolver.resolve(&request, &order).await?;

        match self.orchestrator.process(&mut order, plan).await {
            Ok(settlement) => self.record_settlement(order, settlement).await,
            Err(err) => self.record_failure(order, err).await,
        }
    }

    /// Completes or fails the payment left pending by an SCA challenge.
    #[instrument(skip(self))]
    pub async fn confirm(&self, order_number: &str) -> Result<CheckoutOutcome, ServiceError> {
        let mut order = self.find_order(order_number).await?;
        ensure_unpaid(&order)?;

        match self.orchestrator.confirm(&mut order).await {
            Ok(settlement) => self.record_settlement(order, settlement).await,
            Err(err) => self.record_failure(order, err).await,
        }
    }

    async fn record_failure(
        &self,
        order: Order,
        err: ServiceError,
    ) -> Result<CheckoutOutcome, ServiceError> {
        self.orders.save(&order).await?;
        if let ServiceError::GatewayError(message) = &err {
            self.event_sender
                .send_or_log(Event::PaymentFailed {
                    order_number: order.number.clone(),
                    message: message.clone(),
                })
                .await;
        }
        Err(err)
    }

    async fn record_settlement(
        &self,
        order: Order,
        settlement: Settlement,
    ) -> Result<CheckoutOutcome, ServiceError> {
        if let Some(card) = &settlement.saved_card {
            // Cards paid with from the wallet are already stored.
            if self.cards.find_by_id(card.id).await?.is_none() {
                self.cards.save(card).await?;
                self.event_sender
                    .send_or_log(Event::CardSaved { card_id: card.id })
                    .await;
            }
        }
        self.orders.save(&order).await?;

        let event = match settlement.state {
            PaymentState::Pending => Event::PaymentAwaitingAuthorization {
                order_number: order.number.clone(),
                payment_id: settlement.payment_id,
            },
            _ => Event::PaymentCompleted {
                order_number: order.number.clone(),
                payment_id: settlement.payment_id,
            },
        };
        self.event_sender.send_or_log(event).await;

        info!(order_number = %order.number, state = %order.state, "Checkout processed");

        Ok(CheckoutOutcome {
            path: order.path(),
            state: order.state,
            payment_state: settlement.state,
            completed_payments: order.completed_payments().count(),
            redirect_url: settlement.redirect_url,
            order_number: order.number,
        })
    }

    /// Stores an order placed by the storefront so it can be checked out.
    #[instrument(skip(self, order), fields(order_number = %order.number))]
    pub async fn register_order(&self, order: Order) -> Result<Order, ServiceError> {
        if self.orders.find_by_number(&order.number).await?.is_some() {
            return Err(ServiceError::InvalidOperation(format!(
                "Order {} already exists",
                order.number
            )));
        }

        self.orders.save(&order).await?;
        self.event_sender
            .send_or_log(Event::OrderRegistered(order.number.clone()))
            .await;
        Ok(order)
    }

    pub async fn find_order(&self, order_number: &str) -> Result<Order, ServiceError> {
        self.orders
            .find_by_number(order_number)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_number)))
    }

    pub async fn saved_cards(&self, email: &str) -> Result<Vec<CreditCard>, ServiceError> {
        self.cards.find_by_owner(email).await
    }
}

fn ensure_unpaid(order: &Order) -> Result<(), ServiceError> {
    if order.is_paid() {
        return Err(ServiceError::InvalidOperation(format!(
            "Order {} has already been paid",
            order.number
        )));
    }
    Ok(())
}
