use crate::{
    errors::ServiceError,
    models::{CardDetails, CheckoutRequest, CreditCard, Order},
    repositories::CardRepository,
};
use std::sync::Arc;
use tracing::{debug, instrument};

/// How a checkout submission will be paid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardSourcePlan {
    /// A card saved on an earlier checkout; carried unchanged
    UseExisting { card: CreditCard },
    /// A new card the customer wants kept for next time
    SaveNew {
        token: String,
        email: String,
        details: CardDetails,
    },
    /// A new card for this order only
    UseOnce { token: String, details: CardDetails },
}

impl CardSourcePlan {
    pub fn label(&self) -> &'static str {
        match self {
            Self::UseExisting { .. } => "use_existing",
            Self::SaveNew { .. } => "save_new",
            Self::UseOnce { .. } => "use_once",
        }
    }

    /// Payment-method id known before any gateway call.
    pub fn payment_method_id(&self) -> &str {
        match self {
            Self::UseExisting { card } => &card.gateway_payment_profile_id,
            Self::SaveNew { token, .. } | Self::UseOnce { token, .. } => token,
        }
    }
}

pub struct CardSourceResolver {
    cards: Arc<dyn CardRepository>,
}

impl CardSourceResolver {
    pub fn new(cards: Arc<dyn CardRepository>) -> Self {
        Self { cards }
    }

    /// Classifies the submitted payment. Reads the wallet for stored cards; never writes.
    #[instrument(skip(self, request, order), fields(order_number = %order.number))]
    pub async fn resolve(
        &self,
        request: &CheckoutRequest,
        order: &Order,
    ) -> Result<CardSourcePlan, ServiceError> {
        if let Some(card_id) = request.existing_card_id {
            let card = self.cards.find_by_id(card_id).await?.ok_or_else(|| {
                ServiceError::InvalidRequest(format!("Saved card {} was not found", card_id))
            })?;

            if !card.belongs_to(&request.email) {
                return Err(ServiceError::InvalidRequest(format!(
                    "Saved card {} was not found",
                    card_id
                )));
            }

            debug!(%card_id, "Paying with saved card");
            return Ok(CardSourcePlan::UseExisting { card });
        }

        let source = request.source.as_ref().ok_or_else(|| {
            ServiceError::InvalidRequest(
                "Choose a saved card or enter new card details".to_string(),
            )
        })?;
        let details = source.details()?;

        if source.save_requested_by_customer {
            Ok(CardSourcePlan::SaveNew {
                token: source.token.clone(),
                email: request.email.clone(),
                details,
            })
        } else {
            Ok(CardSourcePlan::UseOnce {
                token: source.token.clone(),
                details,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{Address, CardAttributes, CardBrand, Distributor},
        repositories::InMemoryCardRepository,
    };
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn order() -> Order {
        let mut order = Order::new(
            "R100200300",
            dec!(12.34),
            Distributor {
                id: Uuid::new_v4(),
                name: "Fresh Fields Hub".into(),
                stripe_account_id: None,
            },
            Uuid::new_v4(),
        );
        order.email = Some("shopper@example.org".into());
        order
    }

    fn request(source: Option<CardAttributes>, existing_card_id: Option<Uuid>) -> CheckoutRequest {
        CheckoutRequest {
            email: "shopper@example.org".into(),
            shipping_method_id: "pickup".into(),
            bill_address: Address {
                firstname: "Ada".into(),
                lastname: "Grower".into(),
                address1: "1 Orchard Lane".into(),
                address2: None,
                city: "Melbourne".into(),
                zipcode: "3000".into(),
                phone: "0400000000".into(),
                state_name: None,
                country_code: "AU".into(),
            },
            ship_address: None,
            existing_card_id,
            source,
        }
    }

    fn attributes(cc_type: &str, save: bool) -> CardAttributes {
        CardAttributes {
            token: "pm_new".into(),
            cc_type: cc_type.into(),
            last_digits: "4444".into(),
            month: 4,
            year: 2031,
            name: "Ada Grower".into(),
            save_requested_by_customer: save,
        }
    }

    fn saved_card(owner: &str) -> CreditCard {
        CreditCard::saved(
            CardDetails {
                brand: CardBrand::Visa,
                last_digits: "4242".into(),
                month: 10,
                year: 2030,
                name: "Ada Grower".into(),
            },
            owner,
            "pm_saved",
            "cus_saved",
        )
    }

    async fn resolver_with(cards: &[CreditCard]) -> CardSourceResolver {
        let repository = InMemoryCardRepository::new();
        for card in cards {
            repository.save(card).await.unwrap();
        }
        CardSourceResolver::new(Arc::new(repository))
    }

    #[tokio::test]
    async fn stored_cards_are_carried_unchanged() {
        let card = saved_card("Shopper@Example.org");
        let resolver = resolver_with(&[card.clone()]).await;

        let plan = resolver
            .resolve(&request(None, Some(card.id)), &order())
            .await
            .unwrap();

        assert_eq!(plan, CardSourcePlan::UseExisting { card });
        assert_eq!(plan.payment_method_id(), "pm_saved");
    }

    #[tokio::test]
    async fn stored_card_wins_over_new_card_details() {
        let card = saved_card("shopper@example.org");
        let resolver = resolver_with(&[card.clone()]).await;

        let plan = resolver
            .resolve(
                &request(Some(attributes("visa", true)), Some(card.id)),
                &order(),
            )
            .await
            .unwrap();

        assert_eq!(plan.label(), "use_existing");
    }

    #[tokio::test]
    async fn new_cards_follow_the_save_flag() {
        let resolver = resolver_with(&[]).await;

        let plan = resolver
            .resolve(&request(Some(attributes("mastercard", true)), None), &order())
            .await
            .unwrap();
        assert_matches!(
            plan,
            CardSourcePlan::SaveNew { ref token, ref email, ref details }
                if token == "pm_new" && email == "shopper@example.org" && details.brand == CardBrand::Master
        );

        let plan = resolver
            .resolve(&request(Some(attributes("amex", false)), None), &order())
            .await
            .unwrap();
        assert_matches!(
            plan,
            CardSourcePlan::UseOnce { ref details, .. } if details.brand == CardBrand::AmericanExpress
        );
    }

    #[tokio::test]
    async fn rejects_cards_owned_by_someone_else() {
        let card = saved_card("neighbour@example.org");
        let resolver = resolver_with(&[card.clone()]).await;

        let result = resolver.resolve(&request(None, Some(card.id)), &order()).await;
        assert_matches!(result, Err(ServiceError::InvalidRequest(_)));

        let result = resolver
            .resolve(&request(None, Some(Uuid::new_v4())), &order())
            .await;
        assert_matches!(result, Err(ServiceError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn ownership_follows_the_submitted_email() {
        let card = saved_card("earlier@example.org");
        let resolver = resolver_with(&[card.clone()]).await;
        let mut order = order();
        order.email = Some("earlier@example.org".into());

        let result = resolver.resolve(&request(None, Some(card.id)), &order).await;

        assert_matches!(result, Err(ServiceError::InvalidRequest(message)) if message.contains("was not found"));
    }

    #[tokio::test]
    async fn rejects_missing_and_unknown_sources() {
        let resolver = resolver_with(&[]).await;

        let result = resolver.resolve(&request(None, None), &order()).await;
        assert_matches!(result, Err(ServiceError::InvalidRequest(_)));

        let result = resolver
            .resolve(&request(Some(attributes("laser", false)), None), &order())
            .await;
        assert_matches!(result, Err(ServiceError::UnknownCardBrand(_)));
    }
}
