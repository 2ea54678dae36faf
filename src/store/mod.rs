//! Order persistence.
//!
//! The store is the single source of truth for order state. Writes are
//! unconditional (no optimistic locking): intake guarantees at most one
//! in-flight job per order, so the executor never races itself.

mod memory;
mod postgres;

pub use memory::MemoryOrderStore;
pub use postgres::PostgresOrderStore;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{NewOrder, Order, OrderStatus, QuoteSnapshot};
use crate::error::Result;

/// Sparse partial update applied alongside a status write.
///
/// Only fields set to `Some` are written; every write stamps `updated_at`.
#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
    pub attempts: Option<i32>,
    pub last_error: Option<String>,
    pub executed_price: Option<Decimal>,
    pub tx_signature: Option<String>,
    pub chosen_dex: Option<String>,
    pub chosen_quote: Option<QuoteSnapshot>,
}

/// Thin accessor over persisted order rows
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist a new order in `pending` status.
    async fn create_order(&self, new_order: NewOrder) -> Result<Order>;

    /// Fetch an order by id.
    async fn get_order(&self, id: Uuid) -> Result<Option<Order>>;

    /// Write a status plus any patch fields, stamping `updated_at`.
    async fn update_status(&self, id: Uuid, status: OrderStatus, patch: OrderPatch)
        -> Result<Order>;
}
