use async_trait::async_trait;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;

use jobstatus_store::StoreError;

pub(crate) struct MemorySubscription {
    pub(crate) channel: String,
    pub(crate) receiver: Option<broadcast::Receiver<String>>,
    /// Child of the store's shutdown token; cancelled by `close()`.
    pub(crate) token: CancellationToken,
}

#[async_trait]
impl jobstatus_store::ChannelSubscription for MemorySubscription {
    fn channel(&self) -> &str {
        &self.channel
    }

    async fn receive_one(&mut self) -> Result<String, StoreError> {
        let Some(receiver) = self.receiver.as_mut() else {
            return Err(StoreError::Subscription(format!(
                "not subscribed to {}",
                self.channel
            )));
        };

        loop {
            tokio::select! {
                () = self.token.cancelled() => return Err(StoreError::Closed),
                received = receiver.recv() => match received {
                    Ok(message) => return Ok(message),
                    // Messages are signals; skipping stale ones loses nothing
                    // as long as the newest is still delivered.
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(channel = %self.channel, skipped, "subscriber lagged");
                    }
                    Err(RecvError::Closed) => {
                        return Err(StoreError::Subscription(format!(
                            "channel {} closed",
                            self.channel
                        )));
                    }
                },
            }
        }
    }

    async fn unsubscribe(&mut self) -> Result<(), StoreError> {
        self.receiver = None;
        Ok(())
    }
}
