use crate::job::Job;
use crate::state::JobState;

/// One job's current status: progress counters, state, summary message and
/// accumulated log.
///
/// `complete` and `total` are independent; nothing enforces
/// `complete <= total`, and `total == 0` means the amount of work is unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    job_id: String,
    /// Full log output of the job.
    pub log: String,
    /// Units of work finished.
    pub complete: u64,
    /// Units of work expected.
    pub total: u64,
    /// Human-readable summary of the current status.
    pub message: String,
    pub state: JobState,
}

/// Wire shape of the `state` key. The log is stored separately.
#[derive(serde::Serialize, serde::Deserialize)]
struct StatePayload {
    message: String,
    state: JobState,
    complete: u64,
    total: u64,
}

impl JobStatus {
    /// A queued job with no progress, identical to what a read of a
    /// never-written job returns.
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            log: String::new(),
            complete: 0,
            total: 0,
            message: String::new(),
            state: JobState::Queued,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn job(&self) -> Job {
        Job::new(self.job_id.clone())
    }

    /// Serialize everything except the log into the `state` blob.
    ///
    /// # Errors
    /// Returns a `serde_json::Error` if serialization fails.
    pub fn state_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&StatePayload {
            message: self.message.clone(),
            state: self.state.clone(),
            complete: self.complete,
            total: self.total,
        })
    }

    /// Rebuild a status from a `state` blob. The log starts empty.
    /// Unknown fields are ignored; the four known fields are all required.
    ///
    /// # Errors
    /// Returns a `serde_json::Error` if the blob is not a valid state record.
    pub fn from_state_json(
        job_id: impl Into<String>,
        json: &str,
    ) -> Result<Self, serde_json::Error> {
        let payload: StatePayload = serde_json::from_str(json)?;
        Ok(Self {
            job_id: job_id.into(),
            log: String::new(),
            complete: payload.complete,
            total: payload.total,
            message: payload.message,
            state: payload.state,
        })
    }

    /// Append one line of output to the log.
    pub fn append_log(&mut self, line: &str) {
        self.log.push_str(line);
        self.log.push('\n');
    }

    /// Fraction of work done, `None` while the total is unknown.
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some(self.complete as f64 / self.total as f64)
    }
}
