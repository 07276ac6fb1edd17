//! Token-bucket rate limiter.
//!
//! Each fetch takes one token. When the bucket is empty the caller reserves the
//! next token (the balance goes negative) and sleeps until it has been refilled,
//! so waiters are served in arrival order and the aggregate rate never exceeds
//! `capacity` burst plus `refill_rate` tokens per second.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use log::debug;
use tokio::time::Instant;

const MIN_REFILL_RATE: f64 = 0.001;

/// Point-in-time view of the bucket.
#[derive(Debug, Clone, Copy)]
pub struct RateLimiterState {
    /// Tokens currently available; negative while callers hold reservations.
    pub tokens: f64,
    pub last_refill: Instant,
    pub capacity: f64,
    /// Tokens added per second.
    pub refill_rate: f64,
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket shared by every fetch issued through one executor.
pub struct RateLimiter {
    capacity: f64,
    refill_rate: f64,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// Create a full bucket. `capacity` is raised to at least one token.
    pub fn new(capacity: u32, refill_per_sec: f64) -> Self {
        let capacity = f64::from(capacity.max(1));
        Self {
            capacity,
            refill_rate: refill_per_sec.max(MIN_REFILL_RATE),
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Take one token, suspending until it is available.
    ///
    /// Returns how long the caller waited. A caller dropped while waiting hands
    /// its reserved token back.
    pub async fn acquire(&self) -> Duration {
        let wait = self.reserve();
        if !wait.is_zero() {
            debug!("Rate limiting: waiting {:?} for a token", wait);
            let reservation = Reservation {
                limiter: self,
                redeemed: false,
            };
            tokio::time::sleep(wait).await;
            reservation.redeem();
        }
        wait
    }

    fn release(&self) {
        let mut bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);
        self.refill(&mut bucket, Instant::now());
        bucket.tokens = (bucket.tokens + 1.0).min(self.capacity);
    }

    /// Debit one token and compute the wait; the lock is released before any sleep.
    fn reserve(&self) -> Duration {
        let mut bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);
        self.refill(&mut bucket, Instant::now());

        bucket.tokens -= 1.0;
        if bucket.tokens >= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(-bucket.tokens / self.refill_rate)
        }
    }

    fn refill(&self, bucket: &mut Bucket, now: Instant) {
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_rate).min(self.capacity);
        bucket.last_refill = now;
    }

    pub fn state(&self) -> RateLimiterState {
        let mut bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);
        self.refill(&mut bucket, Instant::now());
        RateLimiterState {
            tokens: bucket.tokens,
            last_refill: bucket.last_refill,
            capacity: self.capacity,
            refill_rate: self.refill_rate,
        }
    }
}

/// A token debited ahead of time; returned to the bucket unless redeemed.
struct Reservation<'a> {
    limiter: &'a RateLimiter,
    redeemed: bool,
}

impl Reservation<'_> {
    fn redeem(mut self) {
        self.redeemed = true;
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.redeemed {
            self.limiter.release();
        }
    }
}
