mod error;
mod store;

pub use error::StoreError;
pub use store::{ChannelSubscription, KvStore, PubSub, StatusStore, StoreConfig};
