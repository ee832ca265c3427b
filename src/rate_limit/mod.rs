//! Fixed-window request limiting backed by an atomic counter store.
//!
//! Every hit increments `ratelimit:{bucket}:{identity}`; the first hit of a
//! window arms the key's expiry, and the key disappears when the window ends.
//! A burst straddling two windows can therefore see up to twice `max`.

mod identity;
mod limiter;
mod memory;
mod redis_store;
mod store;

pub use identity::{ClientIdentity, client_identity, secret_hash};
pub use limiter::{RateLimitDecision, RateLimitRule, RateLimiter, rate_limit_key};
pub use memory::MemoryCounterStore;
pub use redis_store::RedisCounterStore;
pub use store::{CounterStore, StoreError};
