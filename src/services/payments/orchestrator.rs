use super::{
    card_source::CardSourcePlan,
    gateway::{
        GatewayContext, IntentReceipt, IntentRequest, IntentStatus, PaymentGateway, ProviderError,
    },
};
use crate::{
    errors::ServiceError,
    models::{CreditCard, Order, Payment, PaymentState},
};
use metrics::counter;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

const ERROR_PLACEHOLDER: &str = "%{error}";

/// Result of a payment attempt that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub payment_id: Uuid,
    pub state: PaymentState,
    pub redirect_url: Option<String>,
    /// Card to keep in the customer's wallet
    pub saved_card: Option<CreditCard>,
}

#[derive(Debug)]
enum Step {
    CreateCustomer,
    AttachPaymentMethod {
        customer_id: String,
    },
    CreateIntent {
        payment_method_id: String,
        customer_id: Option<String>,
    },
    Done {
        payment_method_id: String,
        customer_id: Option<String>,
        receipt: IntentReceipt,
    },
}

impl Step {
    fn first(plan: &CardSourcePlan) -> Self {
        match plan {
            CardSourcePlan::UseExisting { card } => Step::CreateIntent {
                payment_method_id: card.gateway_payment_profile_id.clone(),
                customer_id: card.gateway_customer_profile_id.clone(),
            },
            CardSourcePlan::UseOnce { token, .. } => Step::CreateIntent {
                payment_method_id: token.clone(),
                customer_id: None,
            },
            CardSourcePlan::SaveNew { .. } => Step::CreateCustomer,
        }
    }
}

/// Drives the gateway calls a [`CardSourcePlan`] needs and records the payment on the order.
pub struct PaymentOrchestrator {
    gateway: Arc<dyn PaymentGateway>,
    currency: String,
    customer_error_template: String,
}

impl PaymentOrchestrator {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        currency: impl Into<String>,
        customer_error_template: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            currency: currency.into(),
            customer_error_template: customer_error_template.into(),
        }
    }

    /// Runs the plan to completion or to its first failing step.
    ///
    /// Exactly one payment is appended to the order unless the order cannot be
    /// charged at all. Failures leave the order in its current state and come
    /// back as [`ServiceError::GatewayError`]; remote objects created before the
    /// failure are left in place.
    #[instrument(skip(self, order, plan), fields(order_number = %order.number, plan = plan.label()))]
    pub async fn process(
        &self,
        order: &mut Order,
        plan: CardSourcePlan,
    ) -> Result<Settlement, ServiceError> {
        let amount = order.amount_in_minor_units()?;
        let ctx = GatewayContext::for_order(order);
        let label = plan.label();

        let mut step = Step::first(&plan);
        let (payment_method_id, customer_id, receipt) = loop {
            step = match step {
                Step::Done {
                    payment_method_id,
                    customer_id,
                    receipt,
                } => break (payment_method_id, customer_id, receipt),
                current => match self.advance(&plan, current, amount, &ctx).await {
                    Ok(next) => next,
                    Err(err) => {
                        let source = source_card(&plan, plan.payment_method_id(), None);
                        order
                            .payments
                            .push(Payment::new(order.total, PaymentState::Failed, source));
                        counter!("checkout.payments.failed", 1, "plan" => label);
                        warn!(error = %err, "Payment step failed");
                        return Err(err);
                    }
                },
            };
        };

        let source = source_card(&plan, &payment_method_id, customer_id.as_deref());
        let mut payment = Payment::new(order.total, PaymentState::Failed, source);
        payment.response_code = Some(receipt.intent_id.clone());
        payment.amount_charged = Some(receipt.amount_charged);

        if receipt.status.is_settled() {
            payment.state = PaymentState::Completed;
            let settlement = Settlement {
                payment_id: payment.id,
                state: payment.state,
                redirect_url: None,
                saved_card: matches!(plan, CardSourcePlan::SaveNew { .. })
                    .then(|| payment.source.clone())
                    .filter(CreditCard::is_saved),
            };
            order.payments.push(payment);
            order.complete();
            counter!("checkout.payments.completed", 1, "plan" => label);
            info!(intent_id = %receipt.intent_id, amount_charged = receipt.amount_charged, "Payment completed");
            return Ok(settlement);
        }

        if receipt.status == IntentStatus::RequiresAction {
            payment.state = PaymentState::Pending;
            payment.redirect_url = receipt.redirect_url.clone();
            let settlement = Settlement {
                payment_id: payment.id,
                state: payment.state,
                redirect_url: receipt.redirect_url,
                saved_card: None,
            };
            order.payments.push(payment);
            counter!("checkout.payments.requires_action", 1, "plan" => label);
            info!(intent_id = %receipt.intent_id, "Payment requires customer authorisation");
            return Ok(settlement);
        }

        order.payments.push(payment);
        counter!("checkout.payments.failed", 1, "plan" => label);
        warn!(intent_id = %receipt.intent_id, status = %receipt.status, "Payment was not completed");
        Err(ServiceError::GatewayError(format!(
            "The payment could not be completed (status: {})",
            receipt.status
        )))
    }

    /// Re-reads the intent behind the order's pending payment after an SCA challenge.
    ///
    /// A settled intent completes the payment and the order; an intent still
    /// awaiting the shopper stays pending; anything else fails the payment.
    #[instrument(skip(self, order), fields(order_number = %order.number))]
    pub async fn confirm(&self, order: &mut Order) -> Result<Settlement, ServiceError> {
        let intent_id = pending_intent_id(order).ok_or_else(|| {
            ServiceError::InvalidOperation(format!(
                "Order {} has no payment awaiting authorisation",
                order.number
            ))
        })?;
        let ctx = GatewayContext::for_order(order);

        let receipt = self
            .gateway
            .retrieve_payment_intent(&intent_id, &ctx)
            .await
            .map_err(gateway_failure)?;
        self.apply_intent_state(order, receipt)
    }

    /// Clears a pending payment before a new attempt so two live intents never
    /// exist for one order.
    ///
    /// Returns a settlement when the pending intent turns out to have been paid
    /// meanwhile. Otherwise the intent is canceled at the gateway and the
    /// payment marked failed.
    #[instrument(skip(self, order), fields(order_number = %order.number))]
    pub async fn release_pending(
        &self,
        order: &mut Order,
    ) -> Result<Option<Settlement>, ServiceError> {
        let Some(intent_id) = pending_intent_id(order) else {
            return Ok(None);
        };
        let ctx = GatewayContext::for_order(order);

        let receipt = self
            .gateway
            .retrieve_payment_intent(&intent_id, &ctx)
            .await
            .map_err(gateway_failure)?;

        match receipt.status {
            status if status.is_settled() => self.apply_intent_state(order, receipt).map(Some),
            IntentStatus::Processing => Err(ServiceError::InvalidOperation(format!(
                "A payment for order {} is still being processed",
                order.number
            ))),
            IntentStatus::Canceled => {
                fail_pending(order);
                Ok(None)
            }
            _ => {
                self.gateway
                    .cancel_payment_intent(&intent_id, &ctx)
                    .await
                    .map_err(gateway_failure)?;
                fail_pending(order);
                counter!("checkout.payments.released", 1);
                info!(intent_id = %intent_id, "Pending payment released");
                Ok(None)
            }
        }
    }

    fn apply_intent_state(
        &self,
        order: &mut Order,
        receipt: IntentReceipt,
    ) -> Result<Settlement, ServiceError> {
        let order_number = order.number.clone();
        let payment = order.pending_payment_mut().ok_or_else(|| {
            ServiceError::InvalidOperation(format!(
                "Order {} has no payment awaiting authorisation",
                order_number
            ))
        })?;

        if receipt.status.is_settled() {
            payment.state = PaymentState::Completed;
            payment.amount_charged = Some(receipt.amount_charged);
            payment.redirect_url = None;
            let settlement = Settlement {
                payment_id: payment.id,
                state: payment.state,
                redirect_url: None,
                saved_card: Some(payment.source.clone()).filter(CreditCard::is_saved),
            };
            order.complete();
            counter!("checkout.payments.completed", 1, "plan" => "confirmed");
            info!(intent_id = %receipt.intent_id, amount_charged = receipt.amount_charged, "Authorised payment completed");
            return Ok(settlement);
        }

        if receipt.status.is_in_flight() {
            if receipt.redirect_url.is_some() {
                payment.redirect_url = receipt.redirect_url;
            }
            debug!(intent_id = %receipt.intent_id, status = %receipt.status, "Payment still awaiting authorisation");
            return Ok(Settlement {
                payment_id: payment.id,
                state: payment.state,
                redirect_url: payment.redirect_url.clone(),
                saved_card: None,
            });
        }

        payment.state = PaymentState::Failed;
        payment.redirect_url = None;
        counter!("checkout.payments.failed", 1, "plan" => "confirmed");
        warn!(intent_id = %receipt.intent_id, status = %receipt.status, "Authorisation did not complete the payment");
        Err(ServiceError::GatewayError(format!(
            "The payment could not be completed (status: {})",
            receipt.status
        )))
    }

    async fn advance(
        &self,
        plan: &CardSourcePlan,
        step: Step,
        amount: i64,
        ctx: &GatewayContext,
    ) -> Result<Step, ServiceError> {
        match (step, plan) {
            (Step::CreateCustomer, CardSourcePlan::SaveNew { email, .. }) => {
                let profile = self
                    .gateway
                    .create_customer(email, ctx)
                    .await
                    .map_err(|e| self.customer_failure(e))?;
                Ok(Step::AttachPaymentMethod {
                    customer_id: profile.customer_id,
                })
            }
            (Step::AttachPaymentMethod { customer_id }, CardSourcePlan::SaveNew { token, .. }) => {
                let attached = self
                    .gateway
                    .attach_payment_method(token, &customer_id, ctx)
                    .await
                    .map_err(gateway_failure)?;
                Ok(Step::CreateIntent {
                    payment_method_id: attached.payment_method_id,
                    customer_id: Some(attached.customer_id),
                })
            }
            (
                Step::CreateIntent {
                    payment_method_id,
                    customer_id,
                },
                _,
            ) => {
                let request = IntentRequest {
                    amount,
                    currency: self.currency.clone(),
                    payment_method_id: payment_method_id.clone(),
                    customer_id: customer_id.clone(),
                };
                let receipt = self
                    .gateway
                    .create_payment_intent(&request, ctx)
                    .await
                    .map_err(gateway_failure)?;
                Ok(Step::Done {
                    payment_method_id,
                    customer_id,
                    receipt,
                })
            }
            (step, _) => Err(ServiceError::InternalError(format!(
                "Payment step {:?} does not apply to a {} plan",
                step,
                plan.label()
            ))),
        }
    }

    fn customer_failure(&self, err: ProviderError) -> ServiceError {
        ServiceError::GatewayError(
            self.customer_error_template
                .replace(ERROR_PLACEHOLDER, &err.message),
        )
    }
}

fn gateway_failure(err: ProviderError) -> ServiceError {
    ServiceError::GatewayError(err.message)
}

fn pending_intent_id(order: &Order) -> Option<String> {
    order
        .pending_payment()
        .and_then(|payment| payment.response_code.clone())
}

fn fail_pending(order: &mut Order) {
    if let Some(payment) = order.pending_payment_mut() {
        payment.state = PaymentState::Failed;
        payment.redirect_url = None;
    }
}

/// The payment source recorded for this attempt.
fn source_card(
    plan: &CardSourcePlan,
    payment_method_id: &str,
    customer_id: Option<&str>,
) -> CreditCard {
    match (plan, customer_id) {
        (CardSourcePlan::UseExisting { card }, _) => card.clone(),
        (CardSourcePlan::SaveNew { email, details, .. }, Some(customer_id)) => {
            CreditCard::saved(details.clone(), email.as_str(), payment_method_id, customer_id)
        }
        (CardSourcePlan::SaveNew { details, .. }, None)
        | (CardSourcePlan::UseOnce { details, .. }, _) => {
            CreditCard::single_use(details.clone(), payment_method_id)
        }
    }
}
