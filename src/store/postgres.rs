use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::info;
use uuid::Uuid;

use crate::domain::{NewOrder, Order, OrderKind, OrderStatus, QuoteSnapshot};
use crate::error::{DexflowError, Result};

use super::{OrderPatch, OrderStore};

/// PostgreSQL order store
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Create a new PostgreSQL store
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Create a store from an existing connection pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn row_to_order(row: &PgRow) -> Result<Order> {
    let status: String = row.get("status");
    let kind: String = row.get("kind");
    let chosen_quote: Option<serde_json::Value> = row.get("chosen_quote");

    Ok(Order {
        id: row.get("id"),
        user_id: row.get("user_id"),
        kind: OrderKind::try_from(kind.as_str()).map_err(DexflowError::Internal)?,
        token_in: row.get("token_in"),
        token_out: row.get("token_out"),
        amount: row.get("amount"),
        limit_price: row.get("limit_price"),
        status: OrderStatus::try_from(status.as_str()).map_err(DexflowError::Internal)?,
        attempts: row.get("attempts"),
        last_error: row.get("last_error"),
        executed_price: row.get("executed_price"),
        tx_signature: row.get("tx_signature"),
        chosen_dex: row.get("chosen_dex"),
        chosen_quote: chosen_quote
            .map(serde_json::from_value::<QuoteSnapshot>)
            .transpose()?,
        slippage_tolerance: row.get("slippage_tolerance"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn create_order(&self, new_order: NewOrder) -> Result<Order> {
        let row = sqlx::query(
            r#"
            INSERT INTO orders (
                id, user_id, kind, token_in, token_out, amount, limit_price,
                status, slippage_tolerance
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_order.user_id)
        .bind(new_order.kind.as_str())
        .bind(&new_order.token_in)
        .bind(&new_order.token_out)
        .bind(new_order.amount)
        .bind(new_order.limit_price)
        .bind(new_order.slippage_tolerance)
        .fetch_one(&self.pool)
        .await?;

        row_to_order(&row)
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>> {
        let row = sqlx::query("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_order).transpose()
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        patch: OrderPatch,
    ) -> Result<Order> {
        // Build the SET list from whichever patch fields are present; the
        // bind order below must mirror the placeholder order here.
        let mut sets = vec!["status = $2".to_string(), "updated_at = NOW()".to_string()];
        let mut idx = 3;

        if patch.attempts.is_some() {
            sets.push(format!("attempts = ${idx}"));
            idx += 1;
        }
        if patch.last_error.is_some() {
            sets.push(format!("last_error = ${idx}"));
            idx += 1;
        }
        if patch.executed_price.is_some() {
            sets.push(format!("executed_price = ${idx}"));
            idx += 1;
        }
        if patch.tx_signature.is_some() {
            sets.push(format!("tx_signature = ${idx}"));
            idx += 1;
        }
        if patch.chosen_dex.is_some() {
            sets.push(format!("chosen_dex = ${idx}"));
            idx += 1;
        }
        if patch.chosen_quote.is_some() {
            sets.push(format!("chosen_quote = ${idx}"));
        }

        let sql = format!(
            "UPDATE orders SET {} WHERE id = $1 RETURNING *",
            sets.join(", ")
        );

        let mut query = sqlx::query(&sql).bind(id).bind(status.as_str());
        if let Some(attempts) = patch.attempts {
            query = query.bind(attempts);
        }
        if let Some(last_error) = patch.last_error {
            query = query.bind(last_error);
        }
        if let Some(executed_price) = patch.executed_price {
            query = query.bind(executed_price);
        }
        if let Some(tx_signature) = patch.tx_signature {
            query = query.bind(tx_signature);
        }
        if let Some(chosen_dex) = patch.chosen_dex {
            query = query.bind(chosen_dex);
        }
        if let Some(chosen_quote) = &patch.chosen_quote {
            query = query.bind(serde_json::to_value(chosen_quote)?);
        }

        let row = query
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DexflowError::NotFound(id))?;

        row_to_order(&row)
    }
}
