use std::sync::Arc;
use std::time::Duration;

use super::identity::ClientIdentity;
use super::store::{CounterStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    pub window_secs: u64,
    pub max: u32,
}

/// Longest window a rule accepts; keeps expiries representable in every store.
pub const MAX_WINDOW_SECS: u64 = 365 * 24 * 60 * 60;

impl RateLimitRule {
    /// Clamps `window_secs` into `1..=MAX_WINDOW_SECS` and `max` to at least 1.
    pub const fn new(window_secs: u64, max: u32) -> Self {
        let window_secs = if window_secs == 0 {
            1
        } else if window_secs > MAX_WINDOW_SECS {
            MAX_WINDOW_SECS
        } else {
            window_secs
        };
        let max = if max == 0 { 1 } else { max };
        Self { window_secs, max }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    /// `retry_after_secs` is always at least 1.
    Denied { retry_after_secs: u64 },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed)
    }
}

pub fn rate_limit_key(bucket: &str, identity: &ClientIdentity) -> String {
    format!("ratelimit:{}:{}", bucket, identity)
}

#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    timeout: Duration,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Counts one request and decides whether it may proceed.
    ///
    /// Store failures and timeouts admit the request.
    pub async fn check(
        &self,
        identity: &ClientIdentity,
        bucket: &str,
        rule: RateLimitRule,
    ) -> RateLimitDecision {
        let key = rate_limit_key(bucket, identity);

        let counted = tokio::time::timeout(self.timeout, self.count(&key, rule));
        match counted.await {
            Ok(Ok(decision)) => {
                if let RateLimitDecision::Denied { retry_after_secs } = decision {
                    tracing::debug!(
                        bucket,
                        identity = %identity,
                        retry_after_secs,
                        "Rate limit exceeded"
                    );
                }
                decision
            }
            Ok(Err(err)) => {
                tracing::warn!(
                    bucket,
                    identity = %identity,
                    "Rate limit store error, allowing request: {}",
                    err
                );
                RateLimitDecision::Allowed
            }
            Err(_) => {
                tracing::warn!(
                    bucket,
                    identity = %identity,
                    "Rate limit store timed out after {:?}, allowing request",
                    self.timeout
                );
                RateLimitDecision::Allowed
            }
        }
    }

    async fn count(&self, key: &str, rule: RateLimitRule) -> Result<RateLimitDecision, StoreError> {
        let count = self.store.incr(key).await?;

        if count == 1 {
            // First hit of the window arms the expiry; later hits leave it alone.
            self.store.expire(key, rule.window_secs).await?;
        }

        if count <= i64::from(rule.max) {
            return Ok(RateLimitDecision::Allowed);
        }

        let ttl = self.store.ttl(key).await?;
        if ttl == -1 {
            // Expiry was lost; without one the key would deny forever.
            self.store.expire(key, rule.window_secs).await?;
        }

        let retry_after_secs = match u64::try_from(ttl) {
            Ok(secs) if secs > 0 => secs,
            _ => rule.window_secs,
        };
        Ok(RateLimitDecision::Denied {
            retry_after_secs: retry_after_secs.max(1),
        })
    }
}
