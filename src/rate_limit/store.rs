use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("malformed counter reply: {0}")]
    Malformed(String),
}

/// Atomic counter with per-key expiry.
///
/// `ttl` follows Redis conventions: `-2` when the key does not exist and `-1`
/// when it exists without an expiry.
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn incr(&self, key: &str) -> Result<i64, StoreError>;

    async fn expire(&self, key: &str, seconds: u64) -> Result<(), StoreError>;

    async fn ttl(&self, key: &str) -> Result<i64, StoreError>;
}
