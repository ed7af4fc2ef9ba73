//! The Job record, its state machine, and the store that owns the live Job.

use crate::error::{JobError, Result};
use crate::types::{FileName, GenerationRequest, JobHandle, JobStatus, PreviewRecord, RemoteStatus, StatusReport};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use url::Url;

pub(crate) const SUBMIT_FAILED_MESSAGE: &str = "Error starting generation.";
pub(crate) const SESSION_CLOSED_MESSAGE: &str = "Session ended before generation started.";
pub(crate) const POLL_FAILED_MESSAGE: &str = "Could not reach backend.";
pub(crate) const REMOTE_FAILED_MESSAGE: &str = "Dataset generation failed on the server.";
pub(crate) const COMPLETED_MESSAGE: &str = "Generation complete, loading preview...";
pub(crate) const PREVIEW_READY_MESSAGE: &str = "Dataset generation complete!";
pub(crate) const PREVIEW_EMPTY_MESSAGE: &str = "No preview available.";
pub(crate) const PREVIEW_FAILED_MESSAGE: &str =
    "Dataset generation complete, but the preview could not be loaded.";

/// Snapshot of the session's current generation job
///
/// Obtained from [`JobController::snapshot`](super::JobController::snapshot). A new
/// submission replaces the whole record; fields never carry over between jobs.
#[derive(Clone, Debug, Serialize)]
pub struct Job {
    /// Increases with every submission; identifies which submission this record belongs to
    pub generation: u64,
    /// The request this job was created from (None before the first submission)
    pub request: Option<GenerationRequest>,
    /// Server-assigned artifact identifier, set once the job has started running
    pub file_name: Option<FileName>,
    /// Lifecycle status
    pub status: JobStatus,
    /// Progress percentage in `0..=100`, never decreasing, 100 once completed
    pub progress: u8,
    /// Server-relative artifact path
    pub download_path: Option<String>,
    /// Absolute artifact URL
    pub download_url: Option<Url>,
    /// Preview records in generation order, empty until fetched
    pub preview: Vec<PreviewRecord>,
    /// User-facing status text
    pub message: String,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    preview_requested: bool,
}

/// What a status poll did to the job
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PollOutcome {
    /// Still running; keep polling
    Running {
        /// Progress after clamping and the monotonic rule
        progress: u8,
    },
    /// Terminal: completed
    Completed,
    /// Terminal: the server reported failure
    Failed,
}

impl Default for Job {
    fn default() -> Self {
        Self {
            generation: 0,
            request: None,
            file_name: None,
            status: JobStatus::Idle,
            progress: 0,
            download_path: None,
            download_url: None,
            preview: Vec::new(),
            message: String::new(),
            updated_at: Utc::now(),
            preview_requested: false,
        }
    }
}

impl Job {
    /// A clean record for a submission that is about to be sent
    pub(crate) fn fresh(generation: u64, request: GenerationRequest) -> Self {
        let message = format!("Submitting generation request for '{}'...", request.domain);
        Self {
            generation,
            request: Some(request),
            message,
            ..Self::default()
        }
    }

    /// Whether a preview fetch has been started for this job
    pub fn preview_requested(&self) -> bool {
        self.preview_requested
    }

    fn ensure(&self, allowed: &[JobStatus], operation: &'static str) -> Result<()> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(JobError::InvalidState {
                operation,
                current: self.status.to_string(),
            }
            .into())
        }
    }

    /// `idle -> running` after the service accepted the submission
    pub(crate) fn mark_running(&mut self, handle: &JobHandle, download_url: Url) -> Result<()> {
        self.ensure(&[JobStatus::Idle], "start")?;
        if self.file_name.is_some() {
            return Err(JobError::InvalidState {
                operation: "start",
                current: "already assigned a file".to_string(),
            }
            .into());
        }

        let domain = self
            .request
            .as_ref()
            .map(|r| r.domain.as_str())
            .unwrap_or_default();

        self.file_name = Some(handle.file_name.clone());
        self.download_path = Some(handle.download_path.clone());
        self.download_url = Some(download_url);
        self.status = JobStatus::Running;
        self.progress = 0;
        self.preview.clear();
        self.message = format!("Generating dataset for '{domain}'...");
        Ok(())
    }

    /// Apply one `/status` answer
    ///
    /// Progress is clamped into `0..=100` and never moves backwards. Either a progress of
    /// 100 or a `completed` status ends the job as completed; when the two disagree the
    /// job is still forced to `completed` with progress 100.
    pub(crate) fn apply_status(&mut self, report: StatusReport) -> Result<PollOutcome> {
        self.ensure(&[JobStatus::Running], "apply status to")?;

        let reported = clamp_progress(report.progress);
        self.progress = self.progress.max(reported);

        if reported >= 100 || report.status == RemoteStatus::Completed {
            self.progress = 100;
            self.status = JobStatus::Completed;
            self.message = COMPLETED_MESSAGE.to_string();
            return Ok(PollOutcome::Completed);
        }

        if report.status == RemoteStatus::Error {
            self.status = JobStatus::Error;
            self.message = REMOTE_FAILED_MESSAGE.to_string();
            return Ok(PollOutcome::Failed);
        }

        Ok(PollOutcome::Running {
            progress: self.progress,
        })
    }

    /// `idle|running -> error`
    pub(crate) fn mark_failed(&mut self, message: impl Into<String>) -> Result<()> {
        self.ensure(&[JobStatus::Idle, JobStatus::Running], "fail")?;
        self.status = JobStatus::Error;
        self.message = message.into();
        Ok(())
    }

    /// Claim the one preview fetch this job is entitled to
    pub(crate) fn begin_preview(&mut self) -> Result<()> {
        self.ensure(&[JobStatus::Completed], "fetch a preview for")?;
        if self.preview_requested {
            return Err(JobError::InvalidState {
                operation: "fetch a preview for",
                current: "already previewed".to_string(),
            }
            .into());
        }
        self.preview_requested = true;
        Ok(())
    }

    /// Store fetched records verbatim; an empty list is a valid "nothing to show" outcome
    pub(crate) fn attach_preview(&mut self, records: Vec<PreviewRecord>) -> Result<usize> {
        self.ensure(&[JobStatus::Completed], "attach a preview to")?;
        if records.is_empty() {
            self.message = PREVIEW_EMPTY_MESSAGE.to_string();
            return Ok(0);
        }
        let count = records.len();
        self.preview = records;
        self.message = PREVIEW_READY_MESSAGE.to_string();
        Ok(count)
    }

    /// The preview could not be fetched; the job remains completed
    pub(crate) fn mark_preview_failed(&mut self) -> Result<()> {
        self.ensure(&[JobStatus::Completed], "record a preview failure for")?;
        self.message = PREVIEW_FAILED_MESSAGE.to_string();
        Ok(())
    }
}

/// Clamp a reported progress value into `0..=100`
pub(crate) fn clamp_progress(progress: i64) -> u8 {
    progress.clamp(0, 100) as u8
}

/// Single owner of the session's live Job
///
/// Writers identify the job they act for by its generation; once a newer submission has
/// replaced the record, writes on behalf of the old one are dropped.
pub(crate) struct JobStore {
    job: RwLock<Job>,
}

impl JobStore {
    pub(crate) fn new() -> Self {
        Self {
            job: RwLock::new(Job::default()),
        }
    }

    /// Copy of the current record
    pub(crate) async fn snapshot(&self) -> Job {
        self.job.read().await.clone()
    }

    /// Replace the current record with a fresh one and return its generation
    pub(crate) async fn begin(&self, request: GenerationRequest) -> u64 {
        let mut job = self.job.write().await;
        let generation = job.generation + 1;
        *job = Job::fresh(generation, request);
        generation
    }

    /// Run `f` on the record if it still belongs to `generation` and `cancel_token` has not
    /// fired; returns None when the write was discarded as stale
    pub(crate) async fn apply_current<R>(
        &self,
        generation: u64,
        cancel_token: &CancellationToken,
        f: impl FnOnce(&mut Job) -> R,
    ) -> Option<R> {
        let mut job = self.job.write().await;
        if job.generation != generation || cancel_token.is_cancelled() {
            return None;
        }
        let result = f(&mut job);
        job.updated_at = Utc::now();
        Some(result)
    }

    /// Run `f` on the record if it still belongs to `generation`
    pub(crate) async fn apply<R>(&self, generation: u64, f: impl FnOnce(&mut Job) -> R) -> Option<R> {
        let mut job = self.job.write().await;
        if job.generation != generation {
            return None;
        }
        let result = f(&mut job);
        job.updated_at = Utc::now();
        Some(result)
    }

    /// Replace only the message (local validation feedback)
    pub(crate) async fn set_message(&self, message: impl Into<String>) {
        let mut job = self.job.write().await;
        job.message = message.into();
        job.updated_at = Utc::now();
    }
}
