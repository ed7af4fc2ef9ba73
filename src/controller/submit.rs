//! Validation and submission of generation requests.

use super::job::{SESSION_CLOSED_MESSAGE, SUBMIT_FAILED_MESSAGE};
use super::poller::{StatusPollerParams, spawn_status_poller};
use super::{ActiveJob, JobController};
use crate::error::{Error, JobError, Result};
use crate::links;
use crate::retry::with_retry;
use crate::types::{Event, GenerationRequest, JobHandle, Stage};
use std::sync::atomic::{AtomicBool, Ordering};

/// Clears the in-flight flag however `submit` returns
struct SubmittingGuard<'a>(&'a AtomicBool);

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl JobController {
    /// Submit a generation request and start polling it
    ///
    /// The request is checked locally first; an invalid request only updates the current
    /// job's message and never reaches the network. A valid request supersedes whatever job
    /// was live before (its poller is cancelled and a [`Event::Superseded`] is emitted),
    /// then goes to `/generate/`. On success the job is `running` and a status poll is
    /// scheduled one interval later.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if the request is invalid (nothing sent)
    /// - [`Error::SubmissionInProgress`] if another submission has not returned yet
    /// - [`Error::SessionClosed`] after [`shutdown`](Self::shutdown)
    /// - [`Error::Job`] wrapping [`JobError::Submission`] if the service refused the
    ///   request or could not be reached; the job is then in `error`
    pub async fn submit(&self, request: GenerationRequest) -> Result<JobHandle> {
        if self.session_token.is_cancelled() {
            return Err(Error::SessionClosed);
        }

        if let Err(e) = request.validate() {
            tracing::info!(error = %e, "generation request rejected");
            self.store.set_message(e.to_string()).await;
            return Err(e);
        }

        if self
            .submitting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!(domain = %request.domain, "submission already in flight, request ignored");
            return Err(Error::SubmissionInProgress);
        }
        let _guard = SubmittingGuard(&self.submitting);

        let generation = {
            let mut active = self.active.lock().await;
            if let Some(previous) = active.take() {
                previous.cancel_token.cancel();
                if !previous.handle.is_finished() {
                    tracing::info!(
                        file_name = %previous.file_name,
                        generation = previous.generation,
                        "superseding running job"
                    );
                    self.emit_event(Event::Superseded {
                        file_name: previous.file_name,
                    });
                }
            }
            self.store.begin(request.clone()).await
        };

        tracing::info!(
            domain = %request.domain,
            records = request.records,
            batch_size = request.batch_size,
            generation,
            "submitting generation request"
        );

        let accepted = tokio::select! {
            biased;
            _ = self.session_token.cancelled() => Err(Error::SessionClosed),
            result = with_retry(&self.config.retry, || self.service.submit(&request, &self.session)) => result,
        };

        let (handle, download_url) = match accepted.and_then(|handle| {
            let url = links::resolve_download_url(&self.config.service.base_url, &handle.download_path)
                .map_err(|e| Error::UnexpectedResponse {
                    endpoint: "/generate/",
                    reason: format!("unusable download_url '{}': {e}", handle.download_path),
                })?;
            Ok((handle, url))
        }) {
            Ok(accepted) => accepted,
            Err(Error::SessionClosed) => return Err(self.abandon(generation).await),
            Err(e) => {
                tracing::error!(domain = %request.domain, error = %e, "failed to start generation");
                self.store
                    .apply(generation, |job| job.mark_failed(SUBMIT_FAILED_MESSAGE))
                    .await;
                self.emit_event(Event::Failed {
                    file_name: None,
                    stage: Stage::Submission,
                    error: e.to_string(),
                });
                return Err(JobError::Submission {
                    source: Box::new(e),
                }
                .into());
            }
        };

        let mut active = self.active.lock().await;
        let cancel_token = self.session_token.child_token();

        match self
            .store
            .apply_current(generation, &cancel_token, |job| {
                job.mark_running(&handle, download_url.clone())
            })
            .await
        {
            Some(result) => result?,
            None => {
                drop(active);
                return Err(self.abandon(generation).await);
            }
        }

        tracing::info!(
            file_name = %handle.file_name,
            download_url = %download_url,
            "generation started"
        );
        self.emit_event(Event::Submitted {
            file_name: handle.file_name.clone(),
            download_url,
        });

        let task = spawn_status_poller(StatusPollerParams {
            generation,
            file_name: handle.file_name.clone(),
            service: self.service.clone(),
            store: self.store.clone(),
            event_tx: self.event_tx.clone(),
            polling: self.config.polling.clone(),
            retry: self.config.retry.clone(),
            cancel_token: cancel_token.clone(),
        });

        *active = Some(ActiveJob {
            generation,
            file_name: handle.file_name.clone(),
            cancel_token,
            handle: task,
        });

        Ok(handle)
    }

    /// Close out a submission cut short by the end of the session
    async fn abandon(&self, generation: u64) -> Error {
        tracing::info!(generation, "session ended while submitting, job abandoned");
        self.store
            .apply(generation, |job| job.mark_failed(SESSION_CLOSED_MESSAGE))
            .await;
        Error::SessionClosed
    }
}
