use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Admission gate shared by all workers.
///
/// Enforces a minimum spacing of `60_000 / orders_per_minute` ms between the
/// starts of successive executions, independent of worker concurrency. The
/// shaping is approximate: the read of the last-start timestamp and the
/// stamp after the wait are separate critical sections, so under
/// concurrency > 1 two workers can observe the same stale value and start
/// close together. The shared timestamp itself is mutex-protected.
pub struct RateLimiter {
    interval: Duration,
    last_started: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(orders_per_minute: u32) -> Self {
        let per_minute = orders_per_minute.max(1) as u64;
        Self {
            interval: Duration::from_millis(60_000 / per_minute),
            last_started: Mutex::new(None),
        }
    }

    /// Minimum spacing between execution starts.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait out the remainder of the spacing interval, then record a new
    /// execution start.
    pub async fn acquire(&self) {
        let wait = {
            let last = self.last_started.lock().await;
            match *last {
                Some(started) => self.interval.saturating_sub(started.elapsed()),
                None => Duration::ZERO,
            }
        };

        if !wait.is_zero() {
            sleep(wait).await;
        }

        *self.last_started.lock().await = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_acquire_is_immediate() {
        let limiter = RateLimiter::new(100);
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn sequential_acquires_are_spaced_by_the_interval() {
        // 100 orders/min -> 600ms spacing
        let limiter = RateLimiter::new(100);
        assert_eq!(limiter.interval(), Duration::from_millis(600));

        limiter.acquire().await;
        let second_start = Instant::now();
        limiter.acquire().await;

        assert!(second_start.elapsed() >= Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_interval_passes_straight_through() {
        let limiter = RateLimiter::new(100);
        limiter.acquire().await;
        sleep(Duration::from_millis(700)).await;

        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(1));
    }
}
