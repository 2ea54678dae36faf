use async_trait::async_trait;
use rand::Rng;
use rust_decimal::Decimal;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use crate::domain::Quote;
use crate::error::Result;

/// A liquidity venue that can price a token pair
#[async_trait]
pub trait QuoteSource: Send + Sync {
    fn name(&self) -> &str;

    /// Quote the pair around a reference price. May fail; callers bound the
    /// call with a timeout so a hung source cannot stall the fan-out.
    async fn quote(&self, base_price: Decimal, amount: Decimal) -> Result<Quote>;
}

/// Simulated venue: responds after a short latency with the base price
/// scaled by a random factor inside the venue's variance band.
pub struct SimulatedSource {
    name: &'static str,
    fee: Decimal,
    liquidity: Decimal,
    /// Price factor band in basis points of the base price
    variance_bps: (i64, i64),
}

impl SimulatedSource {
    pub fn raydium() -> Self {
        Self {
            name: "Raydium",
            fee: Decimal::new(3, 3),         // 0.003
            liquidity: Decimal::new(100_000, 0),
            variance_bps: (9_800, 10_200),   // 0.98x..1.02x
        }
    }

    pub fn meteora() -> Self {
        Self {
            name: "Meteora",
            fee: Decimal::new(2, 3),         // 0.002
            liquidity: Decimal::new(80_000, 0),
            variance_bps: (9_700, 10_200),   // 0.97x..1.02x
        }
    }
}

#[async_trait]
impl QuoteSource for SimulatedSource {
    fn name(&self) -> &str {
        self.name
    }

    async fn quote(&self, base_price: Decimal, amount: Decimal) -> Result<Quote> {
        // Draw before the await: the rng handle must not cross it.
        let (delay_ms, factor_bps) = {
            let mut rng = rand::thread_rng();
            (
                rng.gen_range(200..400u64),
                rng.gen_range(self.variance_bps.0..self.variance_bps.1),
            )
        };
        sleep(Duration::from_millis(delay_ms)).await;

        let price = base_price * Decimal::new(factor_bps, 4);
        debug!(
            source = self.name,
            %price,
            fee = %self.fee,
            %amount,
            delay_ms,
            "simulated quote"
        );

        Ok(Quote {
            price,
            fee: self.fee,
            liquidity: self.liquidity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test(start_paused = true)]
    async fn simulated_quote_stays_in_variance_band() {
        let source = SimulatedSource::raydium();
        for _ in 0..16 {
            let quote = source.quote(dec!(25.0), dec!(1.0)).await.unwrap();
            assert!(quote.price >= dec!(24.5), "price {} below band", quote.price);
            assert!(quote.price <= dec!(25.5), "price {} above band", quote.price);
            assert_eq!(quote.fee, dec!(0.003));
            assert_eq!(quote.liquidity, dec!(100000));
        }
    }
}
