//! Best-price routing across quote sources.
//!
//! Fan-out is partial-failure tolerant: each source is queried concurrently
//! under its own timeout and captured as success or failure independently,
//! so one dead venue never takes down routing.

use futures::future::join_all;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info};

use crate::domain::{DexQuote, RoutingDecision};

use super::source::QuoteSource;

pub struct DexRouter {
    sources: Vec<Arc<dyn QuoteSource>>,
    quote_timeout: Duration,
}

impl DexRouter {
    pub fn new(sources: Vec<Arc<dyn QuoteSource>>, quote_timeout: Duration) -> Self {
        Self {
            sources,
            quote_timeout,
        }
    }

    /// Quote the pair on every source concurrently and rank the survivors
    /// by net price, best proceeds first. Empty when every source failed.
    pub async fn quotes(
        &self,
        token_in: &str,
        token_out: &str,
        amount: Decimal,
        base_price: Decimal,
    ) -> Vec<DexQuote> {
        let fetches = self.sources.iter().map(|source| {
            let source = Arc::clone(source);
            let quote_timeout = self.quote_timeout;
            async move {
                let name = source.name().to_string();
                match timeout(quote_timeout, source.quote(base_price, amount)).await {
                    Ok(Ok(quote)) => Some(DexQuote::new(&name, quote)),
                    Ok(Err(e)) => {
                        error!(source = %name, error = %e, "failed to get quote");
                        None
                    }
                    Err(_) => {
                        error!(
                            source = %name,
                            timeout_ms = quote_timeout.as_millis() as u64,
                            "quote timed out"
                        );
                        None
                    }
                }
            }
        });

        let mut quotes: Vec<DexQuote> = join_all(fetches).await.into_iter().flatten().collect();
        quotes.sort_by(|a, b| b.net_price.cmp(&a.net_price));

        if quotes.is_empty() {
            error!(token_in, token_out, "no quotes from any source");
        }

        quotes
    }

    /// Pick the best-ranked quote as the routing decision for this attempt.
    pub fn select_best(&self, quotes: &[DexQuote]) -> Option<RoutingDecision> {
        let best = quotes.first()?;

        info!(
            chosen = %best.source,
            net_price = %best.net_price,
            price = %best.price,
            fee = %best.fee,
            candidates = quotes.len(),
            "dex routing decision"
        );

        Some(RoutingDecision {
            source: best.source.clone(),
            expected_price: best.net_price,
            fee: best.fee,
            quote: best.quote(),
        })
    }
}
