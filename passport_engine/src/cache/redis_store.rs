//! The production [`KeyValueStore`], backed by Redis through a [`ConnectionManager`].
//!
//! The connection manager multiplexes a single connection and reconnects transparently, so cloning a `RedisStore` is
//! cheap and every request handler can hold its own copy.
use std::{collections::HashMap, fmt::Debug};

use log::*;
use redis::{aio::ConnectionManager, Client, Script};

use crate::traits::{CacheError, KeyValueStore};

const HSET_IF_EXISTS: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
    redis.call('HSET', KEYS[1], ARGV[1], ARGV[2])
    return 1
end
return 0
"#;

#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RedisStore")
    }
}

impl RedisStore {
    /// Opens a managed connection to `url` and checks that the server answers a `PING`.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = Client::open(url)?;
        let mut conn = ConnectionManager::new(client).await?;
        redis::cmd("PING").query_async::<()>(&mut conn).await?;
        info!("🧠️ Connected to Redis");
        Ok(Self { conn })
    }
}

impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: u64) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        redis::cmd("SETEX").arg(key).arg(ttl).arg(value).query_async::<()>(&mut conn).await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        redis::cmd("DEL").arg(key).query_async::<()>(&mut conn).await?;
        Ok(())
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, CacheError> {
        let mut conn = self.conn.clone();
        let map: HashMap<String, String> = redis::cmd("HGETALL").arg(key).query_async(&mut conn).await?;
        Ok(map)
    }

    async fn hmget(&self, key: &str, fields: &[String]) -> Result<HashMap<String, String>, CacheError> {
        if fields.is_empty() {
            return Ok(HashMap::new());
        }
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("HMGET");
        cmd.arg(key);
        for field in fields {
            cmd.arg(field);
        }
        let values: Vec<Option<String>> = cmd.query_async(&mut conn).await?;
        let map = fields
            .iter()
            .zip(values)
            .filter_map(|(field, value)| value.map(|v| (field.clone(), v)))
            .collect();
        Ok(map)
    }

    async fn hset_multiple(&self, key: &str, entries: &[(String, String)]) -> Result<(), CacheError> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("HSET");
        cmd.arg(key);
        for (field, value) in entries {
            cmd.arg(field).arg(value);
        }
        cmd.query_async::<()>(&mut conn).await?;
        Ok(())
    }

    async fn hset_if_exists(&self, key: &str, field: &str, value: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let script = Script::new(HSET_IF_EXISTS);
        let written: i64 = script.key(key).arg(field).arg(value).invoke_async(&mut conn).await?;
        Ok(written == 1)
    }

    async fn expire(&self, key: &str, ttl: i64) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let updated: i64 = redis::cmd("EXPIRE").arg(key).arg(ttl).query_async(&mut conn).await?;
        Ok(updated == 1)
    }

    async fn ttl(&self, key: &str) -> Result<i64, CacheError> {
        let mut conn = self.conn.clone();
        let ttl: i64 = redis::cmd("TTL").arg(key).query_async(&mut conn).await?;
        Ok(ttl)
    }

    async fn sismember(&self, key: &str, member: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let found: i64 = redis::cmd("SISMEMBER").arg(key).arg(member).query_async(&mut conn).await?;
        Ok(found == 1)
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let added: i64 = redis::cmd("SADD").arg(key).arg(member).query_async(&mut conn).await?;
        Ok(added > 0)
    }
}
