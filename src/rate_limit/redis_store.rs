use std::sync::Arc;

use async_trait::async_trait;
use redis::{AsyncCommands, Client as RedisClient, Value};

use super::store::{CounterStore, StoreError};

/// Counter store on a shared Redis instance; safe across processes because
/// `INCR` is atomic on the server.
#[derive(Clone)]
pub struct RedisCounterStore {
    redis: Arc<RedisClient>,
}

impl RedisCounterStore {
    pub fn new(redis: Arc<RedisClient>) -> Self {
        Self { redis }
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, StoreError> {
        Ok(self.redis.get_multiplexed_async_connection().await?)
    }
}

fn integer_reply(command: &str, reply: Value) -> Result<i64, StoreError> {
    match reply {
        Value::Int(n) => Ok(n),
        other => Err(StoreError::Malformed(format!("{command} returned {other:?}"))),
    }
}

fn expire_seconds(seconds: u64) -> Result<i64, StoreError> {
    i64::try_from(seconds)
        .map_err(|_| StoreError::Malformed(format!("EXPIRE of {seconds}s is out of range")))
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let mut conn = self.connection().await?;
        let reply: Value = conn.incr(key, 1).await?;
        integer_reply("INCR", reply)
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<(), StoreError> {
        let seconds = expire_seconds(seconds)?;
        let mut conn = self.connection().await?;
        let _: () = conn.expire(key, seconds).await?;
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<i64, StoreError> {
        let mut conn = self.connection().await?;
        let reply: Value = conn.ttl(key).await?;
        integer_reply("TTL", reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_reply_accepts_ints() {
        assert_eq!(integer_reply("INCR", Value::Int(7)).unwrap(), 7);
    }

    #[test]
    fn integer_reply_rejects_other_values() {
        let err = integer_reply("TTL", Value::Nil).unwrap_err();
        assert!(matches!(err, StoreError::Malformed(msg) if msg.starts_with("TTL")));
    }

    #[test]
    fn expire_seconds_rejects_values_beyond_i64() {
        assert_eq!(expire_seconds(60).unwrap(), 60);
        assert_eq!(expire_seconds(i64::MAX as u64).unwrap(), i64::MAX);
        assert!(matches!(
            expire_seconds(u64::MAX),
            Err(StoreError::Malformed(msg)) if msg.starts_with("EXPIRE")
        ));
    }
}
