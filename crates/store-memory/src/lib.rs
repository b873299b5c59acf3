mod backend;
mod store;
mod subscription;

pub use backend::{MemoryStatusStore, MemoryStoreConfig};
