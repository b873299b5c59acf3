//! Store key builders and field name constants for job status records.
//!
//! Names must match existing data byte-for-byte:
//! `jobstatus-job-{id}-state`, `jobstatus-job-{id}-log`, `jobstatus-job-{id}-updated`.

pub const PREFIX: &str = "jobstatus-job-";

/// Per-job key suffixes.
pub mod suffix {
    /// JSON blob of message/state/complete/total.
    pub const STATE: &str = "state";
    /// Raw log text.
    pub const LOG: &str = "log";
    /// Pub/sub channel; never holds a value.
    pub const UPDATED: &str = "updated";
}

/// Root namespace for a job: `jobstatus-job-{job_id}`
#[must_use]
pub fn base(job_id: &str) -> String {
    format!("{PREFIX}{job_id}")
}

/// Namespaced key: `jobstatus-job-{job_id}-{suffix}`
#[must_use]
pub fn key(job_id: &str, suffix: &str) -> String {
    format!("{PREFIX}{job_id}-{suffix}")
}

/// Field names of the `state` blob.
pub mod fields {
    pub const MESSAGE: &str = "message";
    pub const STATE: &str = "state";
    pub const COMPLETE: &str = "complete";
    pub const TOTAL: &str = "total";
}
