use std::collections::HashMap;
use std::sync::Mutex;

/// A simple token bucket, refilled continuously at `rate_per_minute / 60`
/// tokens per second, capped at `rate_per_minute`.
struct Bucket {
    tokens: f64,
    last_refill_ms: i64,
}

pub struct RateLimiter {
    buckets: Mutex<HashMap<String, Bucket>>,
    rate_per_minute: u32,
}

impl RateLimiter {
    pub fn new(rate_per_minute: u32) -> Self {
        RateLimiter {
            buckets: Mutex::new(HashMap::new()),
            rate_per_minute,
        }
    }

    /// Returns `Ok(())` if a token was available, or `Err(retry_after_ms)`.
    pub fn check(&self, key: &str, now_ms: i64) -> Result<(), u64> {
        let mut buckets = self.buckets.lock().unwrap();
        let capacity = self.rate_per_minute as f64;
        let refill_per_ms = capacity / 60_000.0;

        let bucket = buckets.entry(key.to_string()).or_insert(Bucket {
            tokens: capacity,
            last_refill_ms: now_ms,
        });

        let elapsed = (now_ms - bucket.last_refill_ms).max(0) as f64;
        bucket.tokens = (bucket.tokens + elapsed * refill_per_ms).min(capacity);
        bucket.last_refill_ms = now_ms;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(())
        } else {
            let deficit = 1.0 - bucket.tokens;
            let retry_after_ms = (deficit / refill_per_ms).ceil() as u64;
            Err(retry_after_ms)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_capacity_then_blocks() {
        let limiter = RateLimiter::new(3);
        assert!(limiter.check("a", 0).is_ok());
        assert!(limiter.check("a", 0).is_ok());
        assert!(limiter.check("a", 0).is_ok());
        assert!(limiter.check("a", 0).is_err());
    }

    #[test]
    fn refills_over_time() {
        let limiter = RateLimiter::new(60);
        for _ in 0..60 {
            assert!(limiter.check("a", 0).is_ok());
        }
        assert!(limiter.check("a", 0).is_err());
        // one minute later, fully refilled
        assert!(limiter.check("a", 60_000).is_ok());
    }

    #[test]
    fn buckets_are_independent_per_key() {
        let limiter = RateLimiter::new(1);
        assert!(limiter.check("a", 0).is_ok());
        assert!(limiter.check("b", 0).is_ok());
    }
}
