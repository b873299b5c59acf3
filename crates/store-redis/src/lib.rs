mod error;
mod store;
mod subscription;

pub use store::RedisStatusStore;
