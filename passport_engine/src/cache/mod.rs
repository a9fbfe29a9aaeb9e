//! The passport cache layer.
//!
//! [`KeyValueStore`](crate::traits::KeyValueStore) backends live here ([`RedisStore`] for production and
//! [`MemoryStore`] for local development and tests, with [`CacheStore`] choosing between them), along with the key
//! namespace and the cache-aside user store.
mod cache_store;
pub mod codec;
pub mod keys;
mod memory_store;
mod redis_store;
mod user_cache;

pub use cache_store::{CacheStore, MEMORY_STORE_URL};
pub use memory_store::MemoryStore;
pub use redis_store::RedisStore;
pub use user_cache::{
    record_daily_login,
    UserCache,
    LOGIN_USERS_TTL,
    MIS_KEEP_EXTRA,
    MIS_TOKEN_TTL,
    REFRESH_THRESHOLD,
    REFRESH_TTL,
    TOKEN_GRACE,
    USER_TTL,
};
