//! Per-order status events fanned out to live observers.
//!
//! Events are ephemeral: published on a channel keyed by order id, delivered
//! at most once to whoever is subscribed at publish time, never persisted.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{DexQuote, OrderStatus};

/// One quote in a routing summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceQuote {
    pub source: String,
    pub price: Decimal,
    pub fee: Decimal,
    pub liquidity: Decimal,
}

impl From<&DexQuote> for SourceQuote {
    fn from(quote: &DexQuote) -> Self {
        Self {
            source: quote.source.clone(),
            price: quote.price,
            fee: quote.fee,
            liquidity: quote.liquidity,
        }
    }
}

/// All quotes gathered for an attempt plus the one that won
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteSummary {
    pub sources: Vec<SourceQuote>,
    pub chosen: String,
}

impl QuoteSummary {
    pub fn new(quotes: &[DexQuote], chosen: &str) -> Self {
        Self {
            sources: quotes.iter().map(SourceQuote::from).collect(),
            chosen: chosen.to_string(),
        }
    }
}

/// Optional detail payload attached to an update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quotes: Option<QuoteSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executed_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt: Option<i32>,
}

/// Status event for one order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<UpdateDetails>,
}

impl OrderUpdate {
    pub fn new(order_id: Uuid, status: OrderStatus) -> Self {
        Self {
            order_id,
            status,
            timestamp: Utc::now(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: UpdateDetails) -> Self {
        self.details = Some(details);
        self
    }
}
