use std::time::Duration;

/// Exponential redelivery delay for the k-th retry, zero-based:
/// `base_ms * 2^attempt_index`. Saturates instead of overflowing.
pub fn backoff_delay(attempt_index: u32, base_ms: u64) -> Duration {
    Duration::from_millis(base_ms.saturating_mul(2u64.saturating_pow(attempt_index)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_per_attempt() {
        assert_eq!(backoff_delay(0, 500), Duration::from_millis(500));
        assert_eq!(backoff_delay(1, 500), Duration::from_millis(1_000));
        assert_eq!(backoff_delay(2, 500), Duration::from_millis(2_000));
        assert_eq!(backoff_delay(3, 500), Duration::from_millis(4_000));
    }

    #[test]
    fn saturates_instead_of_overflowing() {
        let delay = backoff_delay(u32::MAX, u64::MAX);
        assert_eq!(delay, Duration::from_millis(u64::MAX));
    }
}
