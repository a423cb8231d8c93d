use crate::dns::kernel::Plugin;
use async_trait::async_trait;
use ferrous_resolver_domain::{DomainError, RetryBackoff};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

pub const PLUGIN_NAME: &str = "retry";

/// Details of a retry about to happen, handed to the `on_retry` hook.
#[derive(Debug, Clone)]
pub struct RetryAttempt {
    /// 1 for the first retry.
    pub attempt: u32,
    pub delay: Duration,
    pub error: DomainError,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    retries: u32,
    base_delay: Duration,
    backoff: RetryBackoff,
}

impl RetryPolicy {
    pub fn new(retries: u32, base_delay: Duration, backoff: RetryBackoff) -> Self {
        Self {
            retries,
            base_delay,
            backoff,
        }
    }

    pub fn none() -> Self {
        Self::new(0, Duration::ZERO, RetryBackoff::Constant)
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        match self.backoff {
            RetryBackoff::Constant => self.base_delay,
            RetryBackoff::Linear => self.base_delay.saturating_mul(attempt),
            RetryBackoff::Exponential => {
                let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
                self.base_delay.saturating_mul(factor)
            }
        }
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or the
    /// retry budget is spent. `op` receives the attempt number (0 for the
    /// first try); `on_retry` runs before each backoff sleep.
    pub async fn execute<T, Op, Fut, Hook, HookFut>(
        &self,
        mut op: Op,
        mut on_retry: Hook,
    ) -> Result<T, DomainError>
    where
        Op: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
        Hook: FnMut(RetryAttempt) -> HookFut,
        HookFut: Future<Output = ()>,
    {
        let mut attempt = 0;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    attempt += 1;
                    let delay = self.delay_for(attempt);
                    debug!(attempt, delay_ms = delay.as_millis() as u64, error = %e, "Retrying");
                    on_retry(RetryAttempt {
                        attempt,
                        delay,
                        error: e,
                    })
                    .await;
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Duration::from_millis(100), RetryBackoff::Exponential)
    }
}

#[async_trait]
impl Plugin for RetryPolicy {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn version(&self) -> Option<&str> {
        Some(env!("CARGO_PKG_VERSION"))
    }
}
