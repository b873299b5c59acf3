use crate::error::JobStatusError;
use crate::keys::{self, suffix};
use crate::persistence::StatusPersistence;
use crate::status::JobStatus;

/// Opaque job identity. Every storage key for a job derives from its id;
/// the id itself is never validated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Job {
    id: String,
}

impl Job {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Root namespace key, `jobstatus-job-{id}`.
    #[must_use]
    pub fn base(&self) -> String {
        keys::base(&self.id)
    }

    /// `{base}-{suffix}`
    #[must_use]
    pub fn key(&self, suffix: &str) -> String {
        keys::key(&self.id, suffix)
    }

    #[must_use]
    pub fn state_key(&self) -> String {
        self.key(suffix::STATE)
    }

    #[must_use]
    pub fn log_key(&self) -> String {
        self.key(suffix::LOG)
    }

    #[must_use]
    pub fn updated_channel(&self) -> String {
        self.key(suffix::UPDATED)
    }

    /// Current status of this job; a job never written reads as queued.
    pub async fn status(
        &self,
        persistence: &StatusPersistence,
    ) -> Result<JobStatus, JobStatusError> {
        persistence.read(self).await
    }
}

impl From<&str> for Job {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for Job {
    fn from(id: String) -> Self {
        Self { id }
    }
}

impl std::fmt::Display for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}

impl AsRef<str> for Job {
    fn as_ref(&self) -> &str {
        &self.id
    }
}
