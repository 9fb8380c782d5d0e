use super::{checkout::Address, payment::Payment};
use crate::errors::ServiceError;
use chrono::{DateTime, Utc};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderState {
    Cart,
    /// Details collected, waiting for a successful payment
    Payment,
    Complete,
}

/// The hub selling the order and, when set, the Stripe account it is paid into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distributor {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub stripe_account_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub number: String,
    pub email: Option<String>,
    pub total: Decimal,
    pub distributor: Distributor,
    pub order_cycle_id: Uuid,
    pub state: OrderState,
    pub shipping_method_id: Option<String>,
    pub bill_address: Option<Address>,
    pub ship_address: Option<Address>,
    pub payments: Vec<Payment>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn new(
        number: impl Into<String>,
        total: Decimal,
        distributor: Distributor,
        order_cycle_id: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            number: number.into(),
            email: None,
            total,
            distributor,
            order_cycle_id,
            state: OrderState::Cart,
            shipping_method_id: None,
            bill_address: None,
            ship_address: None,
            payments: Vec::new(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Location of the order resource handed back to the storefront.
    pub fn path(&self) -> String {
        format!("/orders/{}", self.number)
    }

    pub fn completed_payments(&self) -> impl Iterator<Item = &Payment> {
        self.payments.iter().filter(|p| p.is_completed())
    }

    /// Payment still waiting on the shopper's SCA authorisation, if any.
    pub fn pending_payment(&self) -> Option<&Payment> {
        self.payments.iter().find(|p| p.is_pending())
    }

    pub fn pending_payment_mut(&mut self) -> Option<&mut Payment> {
        self.payments.iter_mut().find(|p| p.is_pending())
    }

    pub fn is_paid(&self) -> bool {
        self.state == OrderState::Complete || self.completed_payments().next().is_some()
    }

    /// Order total in the currency's minor unit, as gateways expect amounts.
    pub fn amount_in_minor_units(&self) -> Result<i64, ServiceError> {
        if self.total <= Decimal::ZERO {
            return Err(ServiceError::InvalidOperation(format!(
                "Order {} has no amount to charge",
                self.number
            )));
        }

        (self.total * Decimal::ONE_HUNDRED)
            .round()
            .to_i64()
            .ok_or_else(|| {
                ServiceError::InvalidOperation(format!(
                    "Order {} total {} is out of range",
                    self.number, self.total
                ))
            })
    }

    pub fn complete(&mut self) {
        self.state = OrderState::Complete;
        self.completed_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        card_brand::CardBrand,
        credit_card::{CardDetails, CreditCard},
        payment::PaymentState,
    };
    use rust_decimal_macros::dec;

    fn order(total: Decimal) -> Order {
        Order::new(
            "R644360121",
            total,
            Distributor {
                id: Uuid::new_v4(),
                name: "Fresh Fields Hub".into(),
                stripe_account_id: None,
            },
            Uuid::new_v4(),
        )
    }

    #[test]
    fn converts_total_to_minor_units() {
        assert_eq!(order(dec!(12.34)).amount_in_minor_units().unwrap(), 1234);
        assert_eq!(order(dec!(20)).amount_in_minor_units().unwrap(), 2000);
    }

    #[test]
    fn empty_orders_cannot_be_charged() {
        assert!(order(dec!(0)).amount_in_minor_units().is_err());
    }

    #[test]
    fn failed_payments_do_not_mark_the_order_paid() {
        let mut order = order(dec!(12.34));
        let card = CreditCard::single_use(
            CardDetails {
                brand: CardBrand::Visa,
                last_digits: "4242".into(),
                month: 10,
                year: 2030,
                name: "Ada Grower".into(),
            },
            "pm_123",
        );
        order
            .payments
            .push(Payment::new(order.total, PaymentState::Failed, card.clone()));
        assert!(!order.is_paid());

        order
            .payments
            .push(Payment::new(order.total, PaymentState::Completed, card));
        assert!(order.is_paid());
        assert_eq!(order.completed_payments().count(), 1);
        assert_eq!(order.path(), "/orders/R644360121");
    }

    #[test]
    fn pending_payments_are_found_but_not_paid() {
        let mut order = order(dec!(12.34));
        let card = CreditCard::single_use(
            CardDetails {
                brand: CardBrand::Visa,
                last_digits: "4242".into(),
                month: 10,
                year: 2030,
                name: "Ada Grower".into(),
            },
            "pm_123",
        );
        order
            .payments
            .push(Payment::new(order.total, PaymentState::Failed, card.clone()));
        assert!(order.pending_payment().is_none());

        let pending = Payment::new(order.total, PaymentState::Pending, card);
        let pending_id = pending.id;
        order.payments.push(pending);

        assert_eq!(order.pending_payment().map(|p| p.id), Some(pending_id));
        assert!(!order.is_paid());
    }
}
