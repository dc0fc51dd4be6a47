//! Retries and circuit breaking around a [`GenerativeModel`].
//!
//! Each call runs against one deadline, [`RetryPolicy::budget`]. A retry is
//! only started when its backoff still fits inside that deadline, and a
//! provider's `Retry-After` hint is clamped to [`RetryPolicy::max_backoff`].
//! Whatever happens, the caller gets an answer or an [`UpstreamError`] before
//! the budget is spent, so it can still serve fallback content.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use deskhub_core::errors::UpstreamError;
use deskhub_core::provider::{GenerateOptions, GenerativeModel};

#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub max_retries: u32,
    pub base_backoff: Duration,
    /// Ceiling for computed backoff and for server `Retry-After` hints.
    pub max_backoff: Duration,
    /// Backoff is scaled by a random factor in `1 ± jitter`.
    pub jitter: f64,
    /// Wall-clock limit for all attempts and waits of one call.
    pub budget: Duration,
    /// Consecutive failed calls that open the breaker.
    pub trip_after: u32,
    /// How long an open breaker rejects calls before letting one through.
    pub cooldown: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
            jitter: 0.2,
            budget: Duration::from_secs(90),
            trip_after: 5,
            cooldown: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Wait before retry number `attempt + 1`.
    fn backoff(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        if let Some(hint) = hint {
            return hint.min(self.max_backoff);
        }
        let exp = self.base_backoff.saturating_mul(1u32 << attempt.min(16));
        let capped = exp.min(self.max_backoff);
        if self.jitter <= 0.0 {
            return capped;
        }
        let factor = 1.0 + rand::thread_rng().gen_range(-self.jitter..=self.jitter);
        capped.mul_f64(factor.max(0.0))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BreakerState {
    Closed { failures: u32 },
    Open { until: Instant },
    /// Cooldown over; the next call decides whether the breaker closes.
    Trial,
}

#[derive(Debug)]
struct Breaker {
    state: Mutex<BreakerState>,
    trip_after: u32,
    cooldown: Duration,
}

impl Breaker {
    fn new(trip_after: u32, cooldown: Duration) -> Self {
        Self {
            state: Mutex::new(BreakerState::Closed { failures: 0 }),
            trip_after: trip_after.max(1),
            cooldown,
        }
    }

    /// While open, calls fail fast with `ProviderOverloaded`.
    fn admit(&self) -> Result<(), UpstreamError> {
        let mut state = self.state.lock();
        if let BreakerState::Open { until } = *state {
            if Instant::now() < until {
                return Err(UpstreamError::ProviderOverloaded);
            }
            debug!("generation breaker cooldown over, allowing a trial call");
            *state = BreakerState::Trial;
        }
        Ok(())
    }

    fn succeeded(&self) {
        let mut state = self.state.lock();
        if !matches!(*state, BreakerState::Closed { .. }) {
            info!("generation provider recovered, breaker closed");
        }
        *state = BreakerState::Closed { failures: 0 };
    }

    fn failed(&self) {
        let mut state = self.state.lock();
        let failures = match *state {
            BreakerState::Closed { failures } => failures + 1,
            BreakerState::Trial => self.trip_after,
            BreakerState::Open { .. } => return,
        };
        if failures >= self.trip_after {
            warn!(
                failures,
                cooldown_secs = self.cooldown.as_secs(),
                "generation provider keeps failing, serving fallbacks until cooldown ends"
            );
            *state = BreakerState::Open {
                until: Instant::now() + self.cooldown,
            };
        } else {
            *state = BreakerState::Closed { failures };
        }
    }

    #[cfg(test)]
    fn is_open(&self) -> bool {
        matches!(*self.state.lock(), BreakerState::Open { .. })
    }
}

/// A [`GenerativeModel`] that retries transient failures within a fixed
/// budget and stops calling a provider that keeps failing.
pub struct ReliableModel<M: GenerativeModel> {
    inner: M,
    policy: RetryPolicy,
    breaker: Breaker,
}

impl<M: GenerativeModel> ReliableModel<M> {
    pub fn new(inner: M, policy: RetryPolicy) -> Self {
        let breaker = Breaker::new(policy.trip_after, policy.cooldown);
        Self {
            inner,
            policy,
            breaker,
        }
    }

    async fn attempt(
        &self,
        prompt: &str,
        options: &GenerateOptions,
        deadline: Instant,
    ) -> Result<String, UpstreamError> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match tokio::time::timeout(remaining, self.inner.generate(prompt, options)).await {
            Ok(result) => result,
            Err(_) => Err(UpstreamError::Timeout(self.policy.budget)),
        }
    }
}

#[async_trait]
impl<M: GenerativeModel> GenerativeModel for ReliableModel<M> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    fn display_name(&self) -> &str {
        self.inner.display_name()
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<String, UpstreamError> {
        self.breaker.admit()?;
        let deadline = Instant::now() + self.policy.budget;
        let mut retries = 0;

        loop {
            let err = match self.attempt(prompt, options, deadline).await {
                Ok(text) => {
                    self.breaker.succeeded();
                    return Ok(text);
                }
                Err(e) => e,
            };

            let wait = self.policy.backoff(retries, err.suggested_delay());
            let fits = Instant::now() + wait < deadline;
            if !err.is_retryable() || retries >= self.policy.max_retries || !fits {
                if err.is_retryable() && !fits {
                    debug!(
                        provider = self.inner.name(),
                        wait_ms = wait.as_millis() as u64,
                        "no budget left for another attempt"
                    );
                }
                self.breaker.failed();
                return Err(err);
            }

            retries += 1;
            warn!(
                provider = self.inner.name(),
                retry = retries,
                wait_ms = wait.as_millis() as u64,
                error_kind = err.error_kind(),
                error = %err,
                "generation call failed, retrying"
            );
            tokio::time::sleep(wait).await;
            self.breaker.admit()?;
        }
    }
}
