//! Token-bucket rate limiting of hashing I/O.

use std::time::{Duration, Instant};

use tracing::debug;

use fimscan_core::ScanConfig;

/// A token bucket refilled continuously at a fixed rate.
///
/// [`take`](Self::take) always succeeds and may drive the token count
/// negative; the returned duration is how long the caller must wait until
/// the debt is repaid.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: f64,
    tokens: f64,
    fill_rate: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a full bucket refilling `fill_rate` tokens per second.
    ///
    /// `fill_rate` must be positive.
    pub fn new(fill_rate: f64, capacity: u64) -> Self {
        Self::new_at(fill_rate, capacity, Instant::now())
    }

    /// Like [`new`](Self::new) with an explicit clock reading.
    pub fn new_at(fill_rate: f64, capacity: u64, now: Instant) -> Self {
        Self {
            capacity: capacity as f64,
            tokens: capacity as f64,
            fill_rate,
            last_refill: now,
        }
    }

    /// Remove all available tokens.
    pub fn drain(&mut self) {
        self.tokens = self.tokens.min(0.0);
    }

    /// Take `count` tokens and return the wait before they are available.
    pub fn take(&mut self, count: u64) -> Duration {
        self.take_at(count, Instant::now())
    }

    /// Like [`take`](Self::take) with an explicit clock reading.
    pub fn take_at(&mut self, count: u64, now: Instant) -> Duration {
        self.refill(now);
        self.tokens -= count as f64;
        if self.tokens >= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(-self.tokens / self.fill_rate)
        }
    }

    /// Tokens available at `now`, negative while in debt.
    pub fn available_at(&mut self, now: Instant) -> f64 {
        self.refill(now);
        self.tokens
    }

    pub fn capacity(&self) -> u64 {
        self.capacity as u64
    }

    /// Tokens added per second.
    pub fn fill_rate(&self) -> f64 {
        self.fill_rate
    }

    fn refill(&mut self, now: Instant) {
        if now <= self.last_refill {
            return;
        }
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.fill_rate).min(self.capacity);
        self.last_refill = now;
    }
}

/// Byte-rate limiter for a scan; a no-op when no rate is configured.
#[derive(Debug, Clone, Default)]
pub struct Throttle {
    bucket: Option<TokenBucket>,
}

impl Throttle {
    /// A throttle that never waits.
    pub fn disabled() -> Self {
        Self { bucket: None }
    }

    /// Build the throttle for a scan.
    ///
    /// The bucket fills at half the configured rate, holds at most
    /// `max_file_size` tokens, and starts empty so the first hashed file
    /// already waits.
    pub fn from_config(config: &ScanConfig) -> Self {
        let Some(rate) = config.throttle_rate() else {
            return Self::disabled();
        };
        debug!(
            bytes_per_sec = rate,
            capacity_bytes = config.max_file_size,
            "Creating token bucket"
        );
        let mut bucket = TokenBucket::new(rate as f64 / 2.0, config.max_file_size);
        bucket.drain();
        Self {
            bucket: Some(bucket),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.bucket.is_some()
    }

    /// Account for `bytes` of hashed content and return the wait owed.
    pub fn reserve(&mut self, bytes: u64) -> Duration {
        match self.bucket.as_mut() {
            Some(bucket) => bucket.take(bytes),
            None => Duration::ZERO,
        }
    }
}
