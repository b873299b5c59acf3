use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::Mutex;

use jobstatus_store::StoreError;

use crate::error::map_redis_err;

pub(crate) struct RedisSubscription {
    pub(crate) channel: String,
    /// Dropped on unsubscribe, which closes the dedicated connection.
    /// Never locked: `&mut self` access goes through `Mutex::get_mut`,
    /// the mutex only makes the handle `Sync`.
    pub(crate) pubsub: Option<Mutex<redis::aio::PubSub>>,
}

#[async_trait]
impl jobstatus_store::ChannelSubscription for RedisSubscription {
    fn channel(&self) -> &str {
        &self.channel
    }

    async fn receive_one(&mut self) -> Result<String, StoreError> {
        let Some(pubsub) = self.pubsub.as_mut().map(Mutex::get_mut) else {
            return Err(StoreError::Subscription(format!(
                "not subscribed to {}",
                self.channel
            )));
        };

        let messages = pubsub.on_message();
        tokio::pin!(messages);
        match messages.next().await {
            Some(msg) => msg.get_payload::<String>().map_err(map_redis_err),
            None => Err(StoreError::Connection(format!(
                "pub/sub connection for {} closed",
                self.channel
            ))),
        }
    }

    async fn unsubscribe(&mut self) -> Result<(), StoreError> {
        let Some(pubsub) = self.pubsub.take() else {
            return Ok(());
        };
        let mut pubsub = pubsub.into_inner();
        pubsub
            .unsubscribe(&self.channel)
            .await
            .map_err(map_redis_err)?;
        tracing::debug!(channel = %self.channel, "unsubscribed");
        Ok(())
    }
}
