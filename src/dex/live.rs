//! Live venue integrations.
//!
//! The on-chain SDK wiring is not part of this service yet; in live mode
//! every quote and swap fails with a clear error.

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::warn;

use crate::domain::Quote;
use crate::error::{DexflowError, Result};

use super::source::QuoteSource;
use super::swap::{SwapAdapter, SwapOutcome, SwapRequest};

/// Placeholder for a live venue quote integration
pub struct LiveSource {
    name: &'static str,
}

impl LiveSource {
    pub fn raydium() -> Self {
        Self { name: "Raydium" }
    }

    pub fn meteora() -> Self {
        Self { name: "Meteora" }
    }
}

#[async_trait]
impl QuoteSource for LiveSource {
    fn name(&self) -> &str {
        self.name
    }

    async fn quote(&self, _base_price: Decimal, _amount: Decimal) -> Result<Quote> {
        warn!(source = self.name, "live quote integration not available");
        Err(DexflowError::QuoteSource {
            venue: self.name.to_string(),
            reason: "live integration not available".to_string(),
        })
    }
}

/// Placeholder for live swap submission
pub struct LiveSwapAdapter;

#[async_trait]
impl SwapAdapter for LiveSwapAdapter {
    async fn execute_swap(&self, source: &str, _request: &SwapRequest) -> Result<SwapOutcome> {
        warn!(source, "live swap integration not available");
        Err(DexflowError::SwapExecution {
            venue: source.to_string(),
            reason: "live integration not available".to_string(),
        })
    }
}
