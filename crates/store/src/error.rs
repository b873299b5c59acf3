use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("store is closed")]
    Closed,

    #[error("value exceeds max size ({size} > {max})")]
    ValueTooLarge { size: usize, max: usize },

    #[error("subscription failed: {0}")]
    Subscription(String),

    #[error("{0}")]
    Other(String),
}
