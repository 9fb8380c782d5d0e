use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use super::CardRepository;
use crate::errors::ServiceError;
use crate::models::CreditCard;

/// In-process wallet of saved cards
#[derive(Debug, Default)]
pub struct InMemoryCardRepository {
    cards: DashMap<Uuid, CreditCard>,
}

impl InMemoryCardRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CardRepository for InMemoryCardRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CreditCard>, ServiceError> {
        Ok(self.cards.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_by_owner(&self, email: &str) -> Result<Vec<CreditCard>, ServiceError> {
        let mut cards: Vec<CreditCard> = self
            .cards
            .iter()
            .filter(|entry| entry.value().belongs_to(email))
            .map(|entry| entry.value().clone())
            .collect();
        cards.sort_by_key(|card| card.created_at);
        Ok(cards)
    }

    async fn save(&self, card: &CreditCard) -> Result<(), ServiceError> {
        if !card.is_saved() {
            return Err(ServiceError::InvalidOperation(
                "Only cards stored against a gateway customer can be saved".to_string(),
            ));
        }
        self.cards.insert(card.id, card.clone());
        Ok(())
    }
}
