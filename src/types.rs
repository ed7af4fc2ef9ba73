//! Core types for datagen-client

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// A single generated record as returned by the preview endpoint
///
/// Records are opaque to the client; they are kept verbatim and in generation order.
pub type PreviewRecord = serde_json::Value;

/// Server-assigned identifier of a job's output artifact (e.g. `sports_consultant_dataset.jsonl`)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileName(String);

impl FileName {
    /// Create a new FileName
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the inner value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FileName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FileName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for FileName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Local job status
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Nothing submitted yet (or a submission is being prepared)
    #[default]
    Idle,
    /// Submitted and being polled
    Running,
    /// Generation finished (terminal)
    Completed,
    /// Submission or polling failed (terminal)
    Error,
}

impl JobStatus {
    /// Whether no further automatic transition can happen from this status
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Idle => "idle",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Status as reported by the `/status` endpoint
///
/// The backend reports failures as free text (`"error: <reason>"`,
/// `"incomplete (40/100)"`), so deserialization classifies the raw string with
/// [`RemoteStatus::classify`] instead of matching exact names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum RemoteStatus {
    /// Generation still in progress
    Running,
    /// Generation finished
    Completed,
    /// Generation failed or stopped short on the server
    Error,
    /// Job not registered yet
    Unknown,
}

impl RemoteStatus {
    /// Map a raw status string onto a variant
    ///
    /// Only `running` and `unknown` (or an empty string) keep a job alive; every other
    /// status ends it.
    pub fn classify(raw: &str) -> Self {
        let status = raw.trim().to_ascii_lowercase();
        match status.as_str() {
            "running" => RemoteStatus::Running,
            "completed" => RemoteStatus::Completed,
            "" | "unknown" => RemoteStatus::Unknown,
            _ => RemoteStatus::Error,
        }
    }
}

impl From<String> for RemoteStatus {
    fn from(raw: String) -> Self {
        RemoteStatus::classify(&raw)
    }
}

/// One answer of the `/status` endpoint, progress as reported (not yet clamped)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusReport {
    /// Reported status
    pub status: RemoteStatus,
    /// Reported progress percentage, may lie outside `0..=100`
    pub progress: i64,
}

/// Parameters of a dataset generation request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Dataset topic (e.g. "sports consultant", "text-to-sql")
    pub domain: String,
    /// Requested number of records
    pub records: u32,
    /// Generation batch granularity
    pub batch_size: u32,
}

impl GenerationRequest {
    /// Create a request with the defaults the web client starts with (100 records, batches of 20)
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            records: 100,
            batch_size: 20,
        }
    }

    /// Set the number of records
    pub fn with_records(mut self, records: u32) -> Self {
        self.records = records;
        self
    }

    /// Set the batch size
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Check the request locally
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when the domain is blank after trimming or when
    /// `records` / `batch_size` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.domain.trim().is_empty() {
            return Err(Error::validation("domain", "please enter a dataset topic"));
        }
        if self.records == 0 {
            return Err(Error::validation("records", "must be a positive number"));
        }
        if self.batch_size == 0 {
            return Err(Error::validation("batch_size", "must be a positive number"));
        }
        Ok(())
    }
}

/// What a successful submission hands back
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    /// Identifier of the job's output artifact
    pub file_name: FileName,
    /// Server-relative download path (e.g. `/download/sports_consultant_dataset.jsonl`)
    pub download_path: String,
}

/// A history row exactly as `/queries/user` returns it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRecord {
    /// The domain the dataset was generated for
    pub query: String,
    /// Artifact identifier
    pub file_name: FileName,
}

/// A previously generated dataset with its resolved download location
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetEntry {
    /// The domain the dataset was generated for
    pub query: String,
    /// Artifact identifier
    pub file_name: FileName,
    /// Absolute download location
    pub download_url: Url,
}

/// Lifecycle stage a failure belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// `/generate/` request
    Submission,
    /// `/status` polling
    Poll,
    /// `/preview` fetch
    Preview,
}

/// Event emitted during the job lifecycle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Submission accepted, polling scheduled
    Submitted {
        /// Artifact identifier
        file_name: FileName,
        /// Resolved absolute download URL
        download_url: Url,
    },

    /// A non-terminal status poll was applied
    Progress {
        /// Artifact identifier
        file_name: FileName,
        /// Clamped, monotonic progress percentage
        progress: u8,
    },

    /// Generation finished; the preview fetch is scheduled
    Completed {
        /// Artifact identifier
        file_name: FileName,
    },

    /// Preview records were stored
    PreviewReady {
        /// Artifact identifier
        file_name: FileName,
        /// Number of records stored
        records: usize,
    },

    /// The preview is empty or could not be fetched (the job stays completed)
    PreviewUnavailable {
        /// Artifact identifier
        file_name: FileName,
        /// Error message when the fetch failed, None when the preview was simply empty
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// The job moved to `error`
    Failed {
        /// Artifact identifier, absent when submission itself failed
        #[serde(skip_serializing_if = "Option::is_none")]
        file_name: Option<FileName>,
        /// Stage that failed
        stage: Stage,
        /// Error message
        error: String,
    },

    /// A newer submission replaced this job; its polling was cancelled
    Superseded {
        /// Artifact identifier of the replaced job
        file_name: FileName,
    },

    /// The owning session ended
    SessionEnded,
}
