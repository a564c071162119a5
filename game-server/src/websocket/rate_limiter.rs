use std::time::{Duration, Instant};

/// Per-connection token bucket.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    tokens: u32,
    max_tokens: u32,
    refill_rate: Duration, // One token per interval
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new(max_tokens: u32, refill_rate: Duration) -> Self {
        Self {
            tokens: max_tokens,
            max_tokens,
            refill_rate,
            last_refill: Instant::now(),
        }
    }

    pub fn check_rate_limit(&mut self) -> bool {
        self.refill_tokens(Instant::now());

        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    fn refill_tokens(&mut self, now: Instant) {
        let step = self.refill_rate.as_millis().max(1);
        let elapsed = now.duration_since(self.last_refill).as_millis();
        let intervals = elapsed / step;
        if intervals == 0 {
            return;
        }

        if self.tokens >= self.max_tokens {
            self.last_refill = now;
            return;
        }

        let missing = u128::from(self.max_tokens - self.tokens);
        let added = intervals.min(missing) as u32;
        self.tokens += added;
        // Keep the partial interval so slow trickles still earn tokens
        self.last_refill = if self.tokens == self.max_tokens {
            now
        } else {
            self.last_refill + self.refill_rate * added
        };
    }

    pub fn get_remaining_tokens(&mut self) -> u32 {
        self.refill_tokens(Instant::now());
        self.tokens
    }
}
