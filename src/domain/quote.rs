use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::QuoteSnapshot;

/// Raw quote from a single liquidity source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub price: Decimal,
    /// Fee fraction in [0, 1]
    pub fee: Decimal,
    pub liquidity: Decimal,
}

/// A source's quote with the fee already priced in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DexQuote {
    pub source: String,
    pub price: Decimal,
    pub fee: Decimal,
    pub liquidity: Decimal,
    /// price * (1 - fee)
    pub net_price: Decimal,
}

impl DexQuote {
    pub fn new(source: &str, quote: Quote) -> Self {
        let net_price = quote.price * (Decimal::ONE - quote.fee);
        Self {
            source: source.to_string(),
            price: quote.price,
            fee: quote.fee,
            liquidity: quote.liquidity,
            net_price,
        }
    }

    pub fn quote(&self) -> Quote {
        Quote {
            price: self.price,
            fee: self.fee,
            liquidity: self.liquidity,
        }
    }
}

/// The source selected for one execution attempt
#[derive(Debug, Clone)]
pub struct RoutingDecision {
    pub source: String,
    /// Expected net (post-fee) price
    pub expected_price: Decimal,
    pub fee: Decimal,
    pub quote: Quote,
}

impl RoutingDecision {
    pub fn snapshot(&self) -> QuoteSnapshot {
        QuoteSnapshot {
            price: Some(self.quote.price),
            fee: Some(self.fee),
            liquidity: Some(self.quote.liquidity),
        }
    }
}
