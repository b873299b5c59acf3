use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tokio::time::Instant;

pub(crate) type SharedStore = Arc<Mutex<MemoryData>>;

/// Buffered messages per channel before a slow subscriber starts lagging.
pub(crate) const CHANNEL_CAPACITY: usize = 64;

pub(crate) struct MemoryData {
    pub values: HashMap<String, Entry>,
    pub channels: HashMap<String, broadcast::Sender<String>>,
}

pub(crate) struct Entry {
    pub value: String,
    /// None means the entry never expires.
    pub expires_at: Option<Instant>,
}

impl MemoryData {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
            channels: HashMap::new(),
        }
    }

    /// Live value for `key`, evicting it first if its TTL has passed.
    pub fn live_value(&mut self, key: &str) -> Option<&str> {
        let expired = self
            .values
            .get(key)
            .and_then(|e| e.expires_at)
            .is_some_and(|at| at <= Instant::now());
        if expired {
            self.values.remove(key);
            return None;
        }
        self.values.get(key).map(|e| e.value.as_str())
    }

    pub fn get_or_create_channel(&mut self, channel: &str) -> &broadcast::Sender<String> {
        self.channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
    }

    /// Deliver to current subscribers. Channels nobody listens on are dropped.
    pub fn deliver(&mut self, channel: &str, message: String) -> u64 {
        let Some(sender) = self.channels.get(channel) else {
            return 0;
        };
        match sender.send(message) {
            Ok(receivers) => receivers as u64,
            Err(_) => {
                self.channels.remove(channel);
                0
            }
        }
    }
}
