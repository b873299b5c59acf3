use async_trait::async_trait;
use std::time::Duration;

use crate::error::StoreError;

/// String key-value storage. KV carries state; channels carry signals.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Fetch a value. A missing key is `Ok(None)`, never an error.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value, replacing any previous one. `ttl = None` means no expiry.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    // Health
    async fn ping(&self) -> Result<bool, StoreError>;

    async fn close(&self) -> Result<(), StoreError>;
}

/// Fire-and-forget publish/subscribe of string messages on named channels.
///
/// Messages are not retained: a subscriber only sees messages published
/// after its subscription was established.
#[async_trait]
pub trait PubSub: Send + Sync {
    /// Publish a message. Returns how many subscribers received it;
    /// zero subscribers is not an error.
    async fn publish(&self, channel: &str, message: &str) -> Result<u64, StoreError>;

    /// Subscribe to a channel. The subscription is live when this returns.
    async fn subscribe(&self, channel: &str) -> Result<Box<dyn ChannelSubscription>, StoreError>;
}

/// Handle returned by subscribe.
#[async_trait]
pub trait ChannelSubscription: Send + Sync {
    fn channel(&self) -> &str;

    /// Block until exactly one message arrives on the channel.
    async fn receive_one(&mut self) -> Result<String, StoreError>;

    async fn unsubscribe(&mut self) -> Result<(), StoreError>;
}

/// The full collaborator the job status core depends on.
pub trait StatusStore: KvStore + PubSub {}

impl<T: KvStore + PubSub + ?Sized> StatusStore for T {}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Connection URL (e.g. `redis://localhost:6379`).
    pub url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}
