use async_trait::async_trait;
use dashmap::DashMap;

use super::OrderRepository;
use crate::errors::ServiceError;
use crate::models::Order;

/// In-process order store keyed by order number
#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    orders: DashMap<String, Order>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn find_by_number(&self, number: &str) -> Result<Option<Order>, ServiceError> {
        Ok(self.orders.get(number).map(|entry| entry.value().clone()))
    }

    async fn save(&self, order: &Order) -> Result<(), ServiceError> {
        self.orders.insert(order.number.clone(), order.clone());
        Ok(())
    }
}
