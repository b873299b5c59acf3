use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use jobstatus_store::{ChannelSubscription, StoreConfig, StoreError};

use crate::error::map_redis_err;
use crate::subscription::RedisSubscription;

/// Redis-backed store: plain string keys for state, `PUBLISH`/`SUBSCRIBE`
/// for update signals.
///
/// Commands share one multiplexed `ConnectionManager`. Each subscription
/// opens its own dedicated pub/sub connection, since a connection in
/// subscribe mode cannot issue regular commands.
pub struct RedisStatusStore {
    client: redis::Client,
    conn: redis::aio::ConnectionManager,
    closed: AtomicBool,
}

impl RedisStatusStore {
    pub async fn connect(config: StoreConfig) -> Result<Self, StoreError> {
        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        let conn = redis::aio::ConnectionManager::new(client.clone())
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        tracing::debug!(url = %config.url, "connected to redis");
        Ok(Self {
            client,
            conn,
            closed: AtomicBool::new(false),
        })
    }

    fn check_closed(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl jobstatus_store::KvStore for RedisStatusStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check_closed()?;
        let mut conn = self.conn.clone();
        redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(map_redis_err)
    }

    #[allow(clippy::cast_possible_truncation)] // ttl in millis fits in u64
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        self.check_closed()?;
        let mut conn = self.conn.clone();

        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            // PX 0 is rejected by redis
            cmd.arg("PX").arg((ttl.as_millis() as u64).max(1));
        }

        cmd.query_async::<()>(&mut conn)
            .await
            .map_err(map_redis_err)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.check_closed()?;
        let mut conn = self.conn.clone();
        redis::cmd("DEL")
            .arg(key)
            .query_async::<()>(&mut conn)
            .await
            .map_err(map_redis_err)
    }

    async fn ping(&self) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(map_redis_err)?;
        Ok(pong == "PONG")
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[async_trait]
impl jobstatus_store::PubSub for RedisStatusStore {
    async fn publish(&self, channel: &str, message: &str) -> Result<u64, StoreError> {
        self.check_closed()?;
        let mut conn = self.conn.clone();
        redis::cmd("PUBLISH")
            .arg(channel)
            .arg(message)
            .query_async(&mut conn)
            .await
            .map_err(map_redis_err)
    }

    async fn subscribe(&self, channel: &str) -> Result<Box<dyn ChannelSubscription>, StoreError> {
        self.check_closed()?;
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| StoreError::Subscription(e.to_string()))?;
        pubsub
            .subscribe(channel)
            .await
            .map_err(|e| StoreError::Subscription(e.to_string()))?;

        Ok(Box::new(RedisSubscription {
            channel: channel.to_string(),
            pubsub: Some(tokio::sync::Mutex::new(pubsub)),
        }))
    }
}
