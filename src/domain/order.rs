use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    Limit,
    Market,
    Sniper,
}

impl OrderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderKind::Limit => "limit",
            OrderKind::Market => "market",
            OrderKind::Sniper => "sniper",
        }
    }
}

impl std::fmt::Display for OrderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for OrderKind {
    type Error = String;

    fn try_from(raw: &str) -> std::result::Result<Self, Self::Error> {
        match raw {
            "limit" => Ok(OrderKind::Limit),
            "market" => Ok(OrderKind::Market),
            "sniper" => Ok(OrderKind::Sniper),
            other => Err(format!("unknown order kind: {other}")),
        }
    }
}

/// Order status
///
/// Statuses advance forward through the pipeline stages within a successful
/// attempt; `Failed` is only ever forced once retries are exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Persisted by intake, not yet picked up
    Pending,
    /// Quote aggregation in progress
    Routing,
    /// Source chosen, swap being prepared
    Building,
    /// Swap submitted, awaiting settlement
    Submitted,
    /// Swap settled
    Confirmed,
    /// Retries exhausted
    Failed,
}

impl OrderStatus {
    /// Terminal statuses never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Confirmed | OrderStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Routing => "routing",
            OrderStatus::Building => "building",
            OrderStatus::Submitted => "submitted",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for OrderStatus {
    type Error = String;

    fn try_from(raw: &str) -> std::result::Result<Self, Self::Error> {
        match raw {
            "pending" => Ok(OrderStatus::Pending),
            "routing" => Ok(OrderStatus::Routing),
            "building" => Ok(OrderStatus::Building),
            "submitted" => Ok(OrderStatus::Submitted),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "failed" => Ok(OrderStatus::Failed),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

/// Snapshot of the quote an order was routed on.
///
/// Stored on the order row; a typed record rather than a free-form payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub price: Option<Decimal>,
    pub fee: Option<Decimal>,
    pub liquidity: Option<Decimal>,
}

/// A trade order (tracked in our system)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: String,
    pub kind: OrderKind,
    pub token_in: String,
    pub token_out: String,
    pub amount: Decimal,
    pub limit_price: Option<Decimal>,
    pub status: OrderStatus,
    /// Failed execution attempts so far
    pub attempts: i32,
    pub last_error: Option<String>,
    pub executed_price: Option<Decimal>,
    pub tx_signature: Option<String>,
    pub chosen_dex: Option<String>,
    pub chosen_quote: Option<QuoteSnapshot>,
    pub slippage_tolerance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Minimum acceptable out-amount given the expected price, after
    /// applying the order's slippage tolerance.
    pub fn min_amount_out(&self, expected_price: Decimal) -> Decimal {
        self.amount * expected_price * (Decimal::ONE - self.slippage_tolerance)
    }
}

/// Fields intake provides when creating an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub user_id: String,
    pub kind: OrderKind,
    pub token_in: String,
    pub token_out: String,
    pub amount: Decimal,
    pub limit_price: Option<Decimal>,
    pub slippage_tolerance: Decimal,
}

impl NewOrder {
    /// Build a limit order with the default slippage tolerance.
    pub fn limit(
        user_id: &str,
        token_in: &str,
        token_out: &str,
        amount: Decimal,
        limit_price: Decimal,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            kind: OrderKind::Limit,
            token_in: token_in.to_string(),
            token_out: token_out.to_string(),
            amount,
            limit_price: Some(limit_price),
            slippage_tolerance: crate::config::default_slippage_tolerance(),
        }
    }

    /// Build a market order with the default slippage tolerance.
    pub fn market(user_id: &str, token_in: &str, token_out: &str, amount: Decimal) -> Self {
        Self {
            user_id: user_id.to_string(),
            kind: OrderKind::Market,
            token_in: token_in.to_string(),
            token_out: token_out.to_string(),
            amount,
            limit_price: None,
            slippage_tolerance: crate::config::default_slippage_tolerance(),
        }
    }

    pub fn with_slippage(mut self, tolerance: Decimal) -> Self {
        self.slippage_tolerance = tolerance;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn terminal_statuses() {
        assert!(OrderStatus::Confirmed.is_terminal());
        assert!(OrderStatus::Failed.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Submitted.is_terminal());
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Routing,
            OrderStatus::Building,
            OrderStatus::Submitted,
            OrderStatus::Confirmed,
            OrderStatus::Failed,
        ] {
            assert_eq!(OrderStatus::try_from(status.as_str()).unwrap(), status);
        }
        assert!(OrderStatus::try_from("settled").is_err());
    }

    #[test]
    fn min_amount_out_applies_slippage() {
        let order = Order {
            id: Uuid::new_v4(),
            user_id: "u1".to_string(),
            kind: OrderKind::Limit,
            token_in: "SOL".to_string(),
            token_out: "USDC".to_string(),
            amount: dec!(2),
            limit_price: Some(dec!(25.5)),
            status: OrderStatus::Pending,
            attempts: 0,
            last_error: None,
            executed_price: None,
            tx_signature: None,
            chosen_dex: None,
            chosen_quote: None,
            slippage_tolerance: dec!(0.01),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        // 2 * 25.0 * 0.99 = 49.5
        assert_eq!(order.min_amount_out(dec!(25.0)), dec!(49.500));
    }
}
