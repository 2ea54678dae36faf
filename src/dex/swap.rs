use async_trait::async_trait;
use rand::Rng;
use rust_decimal::Decimal;
use std::ops::Range;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;

/// Normalized order parameters handed to the adapter
#[derive(Debug, Clone)]
pub struct SwapRequest {
    pub token_in: String,
    pub token_out: String,
    pub amount: Decimal,
    /// Limit price when the order has one, otherwise the expected net price
    pub limit_price: Decimal,
    /// Slippage protection floor for the out-amount
    pub min_amount_out: Decimal,
}

/// Successful swap submission
#[derive(Debug, Clone)]
pub struct SwapOutcome {
    pub tx_signature: String,
    pub executed_price: Decimal,
}

/// Submits a swap on the chosen venue.
///
/// One implementation is selected at startup from the execution mode; the
/// executor bounds each call with a timeout.
#[async_trait]
pub trait SwapAdapter: Send + Sync {
    async fn execute_swap(&self, source: &str, request: &SwapRequest) -> Result<SwapOutcome>;
}

/// Executed-price band of the simulated adapter, in basis points of the
/// request's limit price: fills land in [0.995, 1.005).
pub const SIMULATED_FILL_BPS: Range<i64> = 9_950..10_050;

/// Simulated adapter: fills after a settlement-like latency at a price
/// inside [`SIMULATED_FILL_BPS`], with a synthetic signature.
pub struct SimulatedSwapAdapter {
    latency_ms: Range<u64>,
}

impl Default for SimulatedSwapAdapter {
    fn default() -> Self {
        Self {
            latency_ms: 2_000..3_000,
        }
    }
}

impl SimulatedSwapAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the simulated latency (tests, demos).
    pub fn with_latency_ms(mut self, latency_ms: Range<u64>) -> Self {
        self.latency_ms = latency_ms;
        self
    }
}

#[async_trait]
impl SwapAdapter for SimulatedSwapAdapter {
    async fn execute_swap(&self, source: &str, request: &SwapRequest) -> Result<SwapOutcome> {
        let (delay_ms, fill_bps) = {
            let mut rng = rand::thread_rng();
            (
                rng.gen_range(self.latency_ms.clone()),
                rng.gen_range(SIMULATED_FILL_BPS),
            )
        };
        sleep(Duration::from_millis(delay_ms)).await;

        let executed_price = request.limit_price * Decimal::new(fill_bps, 4);
        let suffix = Uuid::new_v4().simple().to_string();
        let tx_signature = format!("sim-{}-{}", source.to_lowercase(), &suffix[..10]);

        debug!(
            source,
            %tx_signature,
            %executed_price,
            min_amount_out = %request.min_amount_out,
            delay_ms,
            "simulated swap executed"
        );

        Ok(SwapOutcome {
            tx_signature,
            executed_price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test(start_paused = true)]
    async fn simulated_fill_stays_in_declared_band() {
        let adapter = SimulatedSwapAdapter::new().with_latency_ms(1..2);
        let request = SwapRequest {
            token_in: "SOL".to_string(),
            token_out: "USDC".to_string(),
            amount: dec!(1.0),
            limit_price: dec!(25.5),
            min_amount_out: dec!(25.0),
        };

        for _ in 0..16 {
            let outcome = adapter.execute_swap("Raydium", &request).await.unwrap();
            assert!(outcome.executed_price >= dec!(25.5) * dec!(0.995));
            assert!(outcome.executed_price <= dec!(25.5) * dec!(1.005));
            assert!(outcome.tx_signature.starts_with("sim-raydium-"));
        }
    }
}
