use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use jobstatus_store::{ChannelSubscription, StoreError};

use crate::store::{Entry, MemoryData, SharedStore};
use crate::subscription::MemorySubscription;

#[derive(Debug, Clone)]
pub struct MemoryStoreConfig {
    /// Values and messages larger than this are rejected with `ValueTooLarge`.
    pub max_value_size: usize,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            max_value_size: 1_048_576, // 1MB
        }
    }
}

/// In-process key-value store with broadcast pub/sub. Cheap to clone;
/// clones share the same data.
#[derive(Clone)]
pub struct MemoryStatusStore {
    store: SharedStore,
    config: MemoryStoreConfig,
    closed: Arc<AtomicBool>,
    shutdown: CancellationToken,
}

impl MemoryStatusStore {
    #[must_use]
    pub fn new(config: MemoryStoreConfig) -> Self {
        Self {
            store: Arc::new(Mutex::new(MemoryData::new())),
            config,
            closed: Arc::new(AtomicBool::new(false)),
            shutdown: CancellationToken::new(),
        }
    }

    /// Number of live subscriptions on a channel.
    pub async fn subscriber_count(&self, channel: &str) -> usize {
        let store = self.store.lock().await;
        store
            .channels
            .get(channel)
            .map_or(0, tokio::sync::broadcast::Sender::receiver_count)
    }

    fn check_closed(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    fn check_size(&self, value: &str) -> Result<(), StoreError> {
        if value.len() > self.config.max_value_size {
            return Err(StoreError::ValueTooLarge {
                size: value.len(),
                max: self.config.max_value_size,
            });
        }
        Ok(())
    }
}

impl Default for MemoryStatusStore {
    fn default() -> Self {
        Self::new(MemoryStoreConfig::default())
    }
}

#[async_trait]
impl jobstatus_store::KvStore for MemoryStatusStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check_closed()?;
        let mut store = self.store.lock().await;
        Ok(store.live_value(key).map(str::to_string))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        self.check_closed()?;
        self.check_size(value)?;

        let mut store = self.store.lock().await;
        store.values.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.check_closed()?;
        self.store.lock().await.values.remove(key);
        Ok(())
    }

    async fn ping(&self) -> Result<bool, StoreError> {
        Ok(!self.closed.load(Ordering::Acquire))
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::Release);
        self.shutdown.cancel();
        Ok(())
    }
}

#[async_trait]
impl jobstatus_store::PubSub for MemoryStatusStore {
    async fn publish(&self, channel: &str, message: &str) -> Result<u64, StoreError> {
        self.check_closed()?;
        self.check_size(message)?;

        let mut store = self.store.lock().await;
        Ok(store.deliver(channel, message.to_string()))
    }

    async fn subscribe(&self, channel: &str) -> Result<Box<dyn ChannelSubscription>, StoreError> {
        self.check_closed()?;

        let receiver = {
            let mut store = self.store.lock().await;
            store.get_or_create_channel(channel).subscribe()
        };

        Ok(Box::new(MemorySubscription {
            channel: channel.to_string(),
            receiver: Some(receiver),
            token: self.shutdown.child_token(),
        }))
    }
}
