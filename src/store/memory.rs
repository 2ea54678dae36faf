use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{NewOrder, Order, OrderStatus};
use crate::error::{DexflowError, Result};

use super::{OrderPatch, OrderStore};

/// In-memory order store.
///
/// Non-durable; stands in for PostgreSQL in tests and local dry runs.
#[derive(Default)]
pub struct MemoryOrderStore {
    orders: RwLock<HashMap<Uuid, Order>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn create_order(&self, new_order: NewOrder) -> Result<Order> {
        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            user_id: new_order.user_id,
            kind: new_order.kind,
            token_in: new_order.token_in,
            token_out: new_order.token_out,
            amount: new_order.amount,
            limit_price: new_order.limit_price,
            status: OrderStatus::Pending,
            attempts: 0,
            last_error: None,
            executed_price: None,
            tx_signature: None,
            chosen_dex: None,
            chosen_quote: None,
            slippage_tolerance: new_order.slippage_tolerance,
            created_at: now,
            updated_at: now,
        };

        self.orders.write().await.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        patch: OrderPatch,
    ) -> Result<Order> {
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(&id).ok_or(DexflowError::NotFound(id))?;

        order.status = status;
        order.updated_at = Utc::now();
        if let Some(attempts) = patch.attempts {
            order.attempts = attempts;
        }
        if let Some(last_error) = patch.last_error {
            order.last_error = Some(last_error);
        }
        if let Some(executed_price) = patch.executed_price {
            order.executed_price = Some(executed_price);
        }
        if let Some(tx_signature) = patch.tx_signature {
            order.tx_signature = Some(tx_signature);
        }
        if let Some(chosen_dex) = patch.chosen_dex {
            order.chosen_dex = Some(chosen_dex);
        }
        if let Some(chosen_quote) = patch.chosen_quote {
            order.chosen_quote = Some(chosen_quote);
        }

        Ok(order.clone())
    }
}
