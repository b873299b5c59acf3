pub mod error;
pub mod job;
pub mod keys;
pub mod notifier;
pub mod persistence;
pub mod state;
pub mod status;

pub use error::JobStatusError;
pub use job::Job;
pub use notifier::{NotifyMode, StatusUpdates, UpdateNotifier};
pub use persistence::StatusPersistence;
pub use state::JobState;
pub use status::JobStatus;
