use std::sync::Arc;
use std::time::Duration;

use jobstatus_store::{KvStore, PubSub, StatusStore};

use crate::error::JobStatusError;
use crate::job::Job;
use crate::notifier::UpdateNotifier;
use crate::status::JobStatus;

/// Moves `JobStatus` records to and from the store.
///
/// Cheap to clone; clones share the store handle.
#[derive(Clone)]
pub struct StatusPersistence {
    store: Arc<dyn StatusStore>,
    ttl: Option<Duration>,
}

impl StatusPersistence {
    pub fn new(store: Arc<dyn StatusStore>) -> Self {
        Self { store, ttl: None }
    }

    /// Expire the `state` and `log` keys `ttl` after each write.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn store(&self) -> &Arc<dyn StatusStore> {
        &self.store
    }

    /// Notifier reading through this persistence.
    pub fn notifier(&self) -> UpdateNotifier {
        UpdateNotifier::new(self.clone())
    }

    /// Persist `status` and signal subscribers.
    ///
    /// Writes the state blob, then the log, then publishes the blob on the
    /// job's `updated` channel. Stops at the first failure without rolling
    /// back earlier steps: a failed log write leaves the new state in place
    /// and publishes nothing.
    ///
    /// # Errors
    /// Returns `JobStatusError::Store` if any store call fails, or
    /// `JobStatusError::Serialization` if the state blob cannot be built.
    pub async fn write(&self, status: &JobStatus) -> Result<(), JobStatusError> {
        let job = status.job();
        let blob = status.state_json()?;

        self.store.set(&job.state_key(), &blob, self.ttl).await?;
        self.store.set(&job.log_key(), &status.log, self.ttl).await?;

        let delivered = self.store.publish(&job.updated_channel(), &blob).await?;
        tracing::debug!(job_id = %job, state = %status.state, delivered, "status written");
        Ok(())
    }

    /// Fetch the current status of `job`.
    ///
    /// Missing keys are not errors: a missing state reads as a queued job
    /// with no progress, a missing log as an empty log.
    ///
    /// # Errors
    /// Returns `JobStatusError::Store` on store failure, or
    /// `JobStatusError::Malformed` if the stored state blob cannot be decoded.
    pub async fn read(&self, job: &Job) -> Result<JobStatus, JobStatusError> {
        let mut status = match self.store.get(&job.state_key()).await? {
            Some(json) => JobStatus::from_state_json(job.id(), &json).map_err(|source| {
                JobStatusError::Malformed {
                    job_id: job.id().to_string(),
                    source,
                }
            })?,
            None => JobStatus::new(job.id()),
        };

        status.log = self.store.get(&job.log_key()).await?.unwrap_or_default();
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::JobState;
    use jobstatus_store::StoreError;
    use jobstatus_store_memory::{MemoryStatusStore, MemoryStoreConfig};

    fn setup() -> (MemoryStatusStore, StatusPersistence) {
        let store = MemoryStatusStore::default();
        let persistence = StatusPersistence::new(Arc::new(store.clone()));
        (store, persistence)
    }

    #[tokio::test]
    async fn read_missing_job_returns_defaults() {
        let (_, persistence) = setup();

        let status = persistence.read(&Job::new("X")).await.unwrap();
        assert_eq!(status, JobStatus::new("X"));
        assert_eq!(status.state, JobState::Queued);
    }

    #[tokio::test]
    async fn write_then_read_round_trip() {
        let (_, persistence) = setup();
        let mut status = JobStatus::new("round-trip");
        status.message = "Copying files".to_string();
        status.state = JobState::Started;
        status.complete = 7;
        status.total = 20;
        status.append_log("copied a.txt");
        status.append_log("copied b.txt");

        persistence.write(&status).await.unwrap();

        let back = persistence.read(&status.job()).await.unwrap();
        assert_eq!(back, status);
    }

    #[tokio::test]
    async fn write_stores_blob_and_raw_log() {
        let (store, persistence) = setup();
        let mut status = JobStatus::new("raw");
        status.log = "raw output".to_string();

        persistence.write(&status).await.unwrap();

        let job = Job::new("raw");
        let blob = store.get(&job.state_key()).await.unwrap().unwrap();
        assert_eq!(blob, status.state_json().unwrap());
        let log = store.get(&job.log_key()).await.unwrap();
        assert_eq!(log.as_deref(), Some("raw output"));
    }

    #[tokio::test]
    async fn read_is_idempotent() {
        let (_, persistence) = setup();
        let mut status = JobStatus::new("idem");
        status.message = "stable".to_string();
        persistence.write(&status).await.unwrap();

        let first = persistence.read(&Job::new("idem")).await.unwrap();
        let second = persistence.read(&Job::new("idem")).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn missing_log_reads_as_empty() {
        let (store, persistence) = setup();
        let job = Job::new("no-log");
        store
            .set(
                &job.state_key(),
                r#"{"message":"m","state":"done","complete":1,"total":1}"#,
                None,
            )
            .await
            .unwrap();

        let status = persistence.read(&job).await.unwrap();
        assert_eq!(status.state, JobState::Done);
        assert_eq!(status.log, "");
    }

    #[tokio::test]
    async fn log_without_state_keeps_defaults() {
        let (store, persistence) = setup();
        let job = Job::new("orphan-log");
        store.set(&job.log_key(), "left over", None).await.unwrap();

        let status = persistence.read(&job).await.unwrap();
        assert_eq!(status.state, JobState::Queued);
        assert_eq!(status.log, "left over");
    }

    #[tokio::test]
    async fn malformed_state_is_an_error() {
        let (store, persistence) = setup();
        let job = Job::new("broken");
        store.set(&job.state_key(), "{not json", None).await.unwrap();

        let result = persistence.read(&job).await;
        assert!(matches!(
            result,
            Err(JobStatusError::Malformed { ref job_id, .. }) if job_id == "broken"
        ));
    }

    #[tokio::test]
    async fn write_publishes_state_blob() {
        let (store, persistence) = setup();
        let job = Job::new("published");
        let mut sub = store.subscribe(&job.updated_channel()).await.unwrap();

        let mut status = JobStatus::new("published");
        status.message = "ping".to_string();
        persistence.write(&status).await.unwrap();

        let msg = tokio::time::timeout(Duration::from_secs(1), sub.receive_one())
            .await
            .expect("no publish within timeout")
            .unwrap();
        assert_eq!(msg, status.state_json().unwrap());
    }

    #[tokio::test]
    async fn failed_state_write_stops_everything() {
        let store = MemoryStatusStore::new(MemoryStoreConfig { max_value_size: 128 });
        let persistence = StatusPersistence::new(Arc::new(store.clone()));
        let job = Job::new("too-big");
        let mut sub = store.subscribe(&job.updated_channel()).await.unwrap();

        let mut status = JobStatus::new("too-big");
        status.message = "m".repeat(200);
        status.log = "small".to_string();

        let result = persistence.write(&status).await;
        assert!(matches!(
            result,
            Err(JobStatusError::Store(StoreError::ValueTooLarge { .. }))
        ));
        assert!(store.get(&job.state_key()).await.unwrap().is_none());
        assert!(store.get(&job.log_key()).await.unwrap().is_none());
        assert!(
            tokio::time::timeout(Duration::from_millis(50), sub.receive_one())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn failed_log_write_keeps_state_and_skips_publish() {
        let store = MemoryStatusStore::new(MemoryStoreConfig { max_value_size: 128 });
        let persistence = StatusPersistence::new(Arc::new(store.clone()));
        let job = Job::new("big-log");
        let mut sub = store.subscribe(&job.updated_channel()).await.unwrap();

        let mut status = JobStatus::new("big-log");
        status.message = "new state".to_string();
        status.log = "x".repeat(200);

        let result = persistence.write(&status).await;
        assert!(matches!(
            result,
            Err(JobStatusError::Store(StoreError::ValueTooLarge { .. }))
        ));

        // No rollback: the state blob is already in place.
        let read_back = persistence.read(&job).await.unwrap();
        assert_eq!(read_back.message, "new state");
        assert_eq!(read_back.log, "");
        assert!(
            tokio::time::timeout(Duration::from_millis(50), sub.receive_one())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn store_failure_is_returned() {
        let (store, persistence) = setup();
        store.close().await.unwrap();

        assert!(matches!(
            persistence.read(&Job::new("j")).await,
            Err(JobStatusError::Store(StoreError::Closed))
        ));
        assert!(matches!(
            persistence.write(&JobStatus::new("j")).await,
            Err(JobStatusError::Store(StoreError::Closed))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn ttl_applies_to_state_and_log() {
        let (store, persistence) = setup();
        let persistence = persistence.with_ttl(Duration::from_secs(60));
        let mut status = JobStatus::new("short-lived");
        status.message = "soon gone".to_string();
        status.log = "bye".to_string();
        persistence.write(&status).await.unwrap();

        tokio::time::advance(Duration::from_secs(61)).await;

        let job = status.job();
        assert!(store.get(&job.state_key()).await.unwrap().is_none());
        assert!(store.get(&job.log_key()).await.unwrap().is_none());
        assert_eq!(persistence.read(&job).await.unwrap(), JobStatus::new("short-lived"));
    }

    #[tokio::test]
    async fn job_status_convenience_reads() {
        let (_, persistence) = setup();
        let mut status = JobStatus::new("conv");
        status.message = "via job".to_string();
        persistence.write(&status).await.unwrap();

        let got = Job::new("conv").status(&persistence).await.unwrap();
        assert_eq!(got.message, "via job");
    }
}
