/// Conventional job states. Stored as a plain string; values outside the
/// conventional set are kept verbatim in `Other`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobState {
    #[default]
    Queued,
    Started,
    Error,
    Done,
    Other(String),
}

impl JobState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "queued",
            Self::Started => "started",
            Self::Error => "error",
            Self::Done => "done",
            Self::Other(s) => s,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error | Self::Done)
    }
}

impl From<&str> for JobState {
    fn from(s: &str) -> Self {
        match s {
            "queued" => Self::Queued,
            "started" => Self::Started,
            "error" => Self::Error,
            "done" => Self::Done,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for JobState {
    fn from(s: String) -> Self {
        match Self::from(s.as_str()) {
            Self::Other(_) => Self::Other(s),
            known => known,
        }
    }
}

impl From<JobState> for String {
    fn from(state: JobState) -> String {
        match state {
            JobState::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
