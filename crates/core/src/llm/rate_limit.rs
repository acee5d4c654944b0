//! Token bucket gating model calls.
//!
//! The bucket starts full at `burst` tokens and refills at `calls_per_minute / 60` tokens per
//! second. With the default burst of 1 the calls are evenly spaced, so no rolling minute ever
//! sees more than `calls_per_minute` calls.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
pub struct RateLimiter {
    capacity: f64,
    tokens: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn per_minute(calls_per_minute: u32, burst: u32) -> anyhow::Result<Self> {
        anyhow::ensure!(calls_per_minute >= 1, "calls_per_minute must be >= 1");
        anyhow::ensure!(burst >= 1, "burst must be >= 1");

        Ok(Self {
            capacity: burst as f64,
            tokens: burst as f64,
            refill_per_sec: calls_per_minute as f64 / 60.0,
            last_refill: Instant::now(),
        })
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let calls = std::env::var("LLM_CALLS_PER_MINUTE")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(2);
        let burst = std::env::var("LLM_BURST")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(1);
        Self::per_minute(calls, burst)
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill);
        self.tokens = (self.tokens + elapsed.as_secs_f64() * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;
    }

    pub fn try_acquire(&mut self) -> bool {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    pub fn time_until_available(&self) -> Duration {
        if self.tokens >= 1.0 {
            Duration::ZERO
        } else {
            // Rounded up to whole milliseconds so float residue never yields a zero-length sleep.
            let millis = ((1.0 - self.tokens) / self.refill_per_sec * 1000.0).ceil();
            Duration::from_millis((millis as u64).max(1))
        }
    }

    /// Wait until a token is available and take it. Returns the total time spent waiting.
    pub async fn acquire(&mut self) -> Duration {
        let mut waited = Duration::ZERO;
        loop {
            if self.try_acquire() {
                return waited;
            }
            let wait = self.time_until_available();
            tracing::info!(wait_ms = wait.as_millis() as u64, "waiting for model rate limit");
            tokio::time::sleep(wait).await;
            waited += wait;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_call_is_immediate_then_spaced() {
        let mut limiter = RateLimiter::per_minute(2, 1).unwrap();

        assert_eq!(limiter.acquire().await, Duration::ZERO);

        let start = Instant::now();
        let waited = limiter.acquire().await;
        assert!(waited >= Duration::from_secs(29), "waited {waited:?}");
        assert!(start.elapsed() >= Duration::from_secs(29));
        assert!(start.elapsed() <= Duration::from_secs(31));
    }

    #[tokio::test(start_paused = true)]
    async fn burst_allows_back_to_back_calls() {
        let mut limiter = RateLimiter::per_minute(60, 3).unwrap();
        for _ in 0..3 {
            assert!(limiter.try_acquire());
        }
        assert!(!limiter.try_acquire());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(limiter.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn idle_time_does_not_exceed_capacity() {
        let mut limiter = RateLimiter::per_minute(60, 2).unwrap();
        tokio::time::advance(Duration::from_secs(600)).await;
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[test]
    fn rejects_zero_quota() {
        assert!(RateLimiter::per_minute(0, 1).is_err());
        assert!(RateLimiter::per_minute(2, 0).is_err());
    }
}
