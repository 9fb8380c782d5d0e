use crate::{
    errors::ServiceError,
    models::{CreditCard, Order},
};
use async_trait::async_trait;
use uuid::Uuid;

pub mod card_repository;
pub mod order_repository;

pub use card_repository::InMemoryCardRepository;
pub use order_repository::InMemoryOrderRepository;

/// Storage for orders and their payments
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_by_number(&self, number: &str) -> Result<Option<Order>, ServiceError>;

    /// Inserts or replaces the order keyed by its number.
    async fn save(&self, order: &Order) -> Result<(), ServiceError>;
}

/// Storage for cards customers saved for reuse
#[async_trait]
pub trait CardRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CreditCard>, ServiceError>;

    async fn find_by_owner(&self, email: &str) -> Result<Vec<CreditCard>, ServiceError>;

    async fn save(&self, card: &CreditCard) -> Result<(), ServiceError>;
}
