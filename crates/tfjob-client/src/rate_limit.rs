//! Client side request throttling.
//!
//! Every request issued through a [`RestClient`](crate::RestClient) first
//! takes a token from the client's limiter. Limiters are shared behind an
//! `Arc`, so the sub-clients of one clientset draw from the same bucket.

use std::fmt::Debug;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;
use std::time::Instant;

/// Throughput control applied before each request.
pub trait RateLimiter: Send + Sync + Debug {
    /// Take a token if one is available right now.
    fn try_accept(&self) -> bool;

    /// Take a token, returning how long the caller must wait before using it.
    fn reserve(&self) -> Duration;

    /// Sustained requests per second.
    fn qps(&self) -> f32;

    /// Maximum number of requests admitted in a burst.
    fn burst(&self) -> u32;
}

/// Wait until the limiter admits one request.
pub async fn accept(limiter: &dyn RateLimiter) {
    let wait = limiter.reserve();
    if !wait.is_zero() {
        tracing::trace!(wait_ms = wait.as_millis() as u64, "throttling request");
        tokio::time::sleep(wait).await;
    }
}

/// Token bucket holding up to `burst` tokens, refilled at `qps` tokens per second.
///
/// The bucket starts full. Reservations may drive the token count below zero,
/// which queues later callers behind earlier ones.
#[derive(Debug)]
pub struct TokenBucketRateLimiter {
    qps: f32,
    burst: u32,
    bucket: Mutex<Bucket>,
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucketRateLimiter {
    pub fn new(qps: f32, burst: u32) -> Self {
        Self {
            qps,
            burst,
            bucket: Mutex::new(Bucket {
                tokens: f64::from(burst),
                last_refill: Instant::now(),
            }),
        }
    }

    /// Current number of tokens after refilling, may be negative while
    /// reservations are outstanding.
    pub fn available(&self) -> f64 {
        self.with_bucket(|bucket| bucket.tokens)
    }

    fn with_bucket<T>(&self, f: impl FnOnce(&mut Bucket) -> T) -> T {
        let mut bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        if self.qps > 0.0 {
            bucket.tokens =
                (bucket.tokens + elapsed * f64::from(self.qps)).min(f64::from(self.burst));
        }
        bucket.last_refill = now;
        f(&mut bucket)
    }
}

impl RateLimiter for TokenBucketRateLimiter {
    fn try_accept(&self) -> bool {
        self.with_bucket(|bucket| {
            if bucket.tokens >= 1.0 {
                bucket.tokens -= 1.0;
                true
            } else {
                false
            }
        })
    }

    fn reserve(&self) -> Duration {
        self.with_bucket(|bucket| {
            bucket.tokens -= 1.0;
            if bucket.tokens >= 0.0 {
                Duration::ZERO
            } else if self.qps > 0.0 {
                Duration::try_from_secs_f64(-bucket.tokens / f64::from(self.qps))
                    .unwrap_or(Duration::MAX)
            } else {
                // never refilled
                Duration::MAX
            }
        })
    }

    fn qps(&self) -> f32 {
        self.qps
    }

    fn burst(&self) -> u32 {
        self.burst
    }
}

/// Limiter that admits every request immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct FakeAlwaysRateLimiter;

impl RateLimiter for FakeAlwaysRateLimiter {
    fn try_accept(&self) -> bool {
        true
    }

    fn reserve(&self) -> Duration {
        Duration::ZERO
    }

    fn qps(&self) -> f32 {
        0.0
    }

    fn burst(&self) -> u32 {
        0
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;
    use test_log::test;

    use super::*;

    #[test]
    fn burst_is_admitted_then_denied() {
        // slow refill keeps the test independent of scheduling delays
        let limiter = TokenBucketRateLimiter::new(0.001, 3);

        assert!(limiter.try_accept());
        assert!(limiter.try_accept());
        assert!(limiter.try_accept());
        assert!(!limiter.try_accept());
        assert_eq!(limiter.qps(), 0.001);
        assert_eq!(limiter.burst(), 3);
    }

    #[test]
    fn reserve_returns_wait_once_bucket_is_empty() {
        let limiter = TokenBucketRateLimiter::new(2.0, 1);

        assert_eq!(limiter.reserve(), Duration::ZERO);
        let wait = limiter.reserve();
        assert!(wait > Duration::from_millis(400), "wait was {wait:?}");
        assert!(wait <= Duration::from_millis(500), "wait was {wait:?}");
    }

    #[test]
    fn tiny_qps_saturates_wait() {
        let limiter = TokenBucketRateLimiter::new(1e-20, 0);

        assert_eq!(limiter.reserve(), Duration::MAX);
        assert!(!limiter.try_accept());
    }

    #[test]
    fn tokens_never_exceed_burst() {
        let limiter = TokenBucketRateLimiter::new(1000.0, 2);
        std::thread::sleep(Duration::from_millis(20));

        assert!(limiter.available() <= 2.0);
    }

    #[test]
    fn bucket_refills_at_qps() {
        let limiter = TokenBucketRateLimiter::new(100.0, 1);
        assert!(limiter.try_accept());
        assert!(!limiter.try_accept());

        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.try_accept());
    }

    #[test(tokio::test(start_paused = true))]
    async fn accept_sleeps_for_reserved_duration() {
        let limiter = TokenBucketRateLimiter::new(10.0, 1);
        let start = tokio::time::Instant::now();

        accept(&limiter).await;
        accept(&limiter).await;

        assert!(start.elapsed() >= Duration::from_millis(90));
    }

    #[test]
    fn fake_limiter_always_admits() {
        let limiter = FakeAlwaysRateLimiter;
        for _ in 0..100 {
            assert!(limiter.try_accept());
        }
        assert_eq!(limiter.reserve(), Duration::ZERO);
    }
}
