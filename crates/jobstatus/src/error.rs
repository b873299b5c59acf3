use jobstatus_store::StoreError;

/// Errors returned by synchronous status reads and writes.
#[derive(Debug, thiserror::Error)]
pub enum JobStatusError {
    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("malformed status record for job '{job_id}': {source}")]
    Malformed {
        job_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
