//! Background status polling of the running job.

use super::job::{JobStore, POLL_FAILED_MESSAGE, PollOutcome};
use super::preview_fetch::{PreviewFetchParams, fetch_preview};
use crate::config::{PollingConfig, RetryConfig};
use crate::error::JobError;
use crate::retry::with_retry;
use crate::service::DatasetService;
use crate::types::{Event, FileName, Stage};
use std::sync::Arc;

/// Parameters for spawning a status poller background task
pub(crate) struct StatusPollerParams {
    /// Generation of the job being polled
    pub generation: u64,
    /// Artifact identifier sent to `/status`
    pub file_name: FileName,
    /// Generation service
    pub service: Arc<dyn DatasetService>,
    /// Job store to write results into
    pub store: Arc<JobStore>,
    /// Event broadcast sender
    pub event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Poll interval and preview settings
    pub polling: PollingConfig,
    /// Retry policy for each request
    pub retry: RetryConfig,
    /// Cancellation token (fires on supersede and on session end)
    pub cancel_token: tokio_util::sync::CancellationToken,
}

/// Spawn a task that polls `/status` every interval until the job reaches a terminal
/// state, then runs the preview stage for a completed job.
///
/// The first poll happens one full interval after spawning. The task exits at the first
/// of: terminal status, unreachable service, or cancellation. It never restarts itself.
pub(crate) fn spawn_status_poller(params: StatusPollerParams) -> tokio::task::JoinHandle<()> {
    let StatusPollerParams {
        generation,
        file_name,
        service,
        store,
        event_tx,
        polling,
        retry,
        cancel_token,
    } = params;

    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(
            tokio::time::Instant::now() + polling.interval,
            polling.interval,
        );
        // A slow response delays the next poll instead of triggering a burst
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel_token.cancelled() => {
                    tracing::debug!(file_name = %file_name, "status poller cancelled");
                    return;
                }
                _ = interval.tick() => {}
            }

            let result = tokio::select! {
                biased;
                _ = cancel_token.cancelled() => {
                    tracing::debug!(file_name = %file_name, "status poller cancelled mid-request");
                    return;
                }
                result = with_retry(&retry, || service.status(&file_name)) => result,
            };

            match result {
                Ok(report) => {
                    let Some(applied) = store
                        .apply_current(generation, &cancel_token, |job| job.apply_status(report))
                        .await
                    else {
                        tracing::debug!(file_name = %file_name, "discarding status for superseded job");
                        return;
                    };

                    match applied {
                        Ok(PollOutcome::Running { progress }) => {
                            tracing::debug!(file_name = %file_name, progress, status = ?report.status, "status polled");
                            event_tx
                                .send(Event::Progress {
                                    file_name: file_name.clone(),
                                    progress,
                                })
                                .ok();
                        }
                        Ok(PollOutcome::Completed) => {
                            tracing::info!(file_name = %file_name, "generation completed");
                            event_tx
                                .send(Event::Completed {
                                    file_name: file_name.clone(),
                                })
                                .ok();
                            break;
                        }
                        Ok(PollOutcome::Failed) => {
                            tracing::error!(file_name = %file_name, "service reported generation failure");
                            event_tx
                                .send(Event::Failed {
                                    file_name: Some(file_name.clone()),
                                    stage: Stage::Poll,
                                    error: "generation failed on the server".to_string(),
                                })
                                .ok();
                            return;
                        }
                        Err(e) => {
                            tracing::warn!(file_name = %file_name, error = %e, "status not applicable, stopping poller");
                            return;
                        }
                    }
                }
                Err(e) => {
                    let error = JobError::Poll {
                        file_name: file_name.clone(),
                        source: Box::new(e),
                    };
                    tracing::error!(error = %error, "status poll failed, giving up on job");

                    let marked = store
                        .apply_current(generation, &cancel_token, |job| {
                            job.mark_failed(POLL_FAILED_MESSAGE)
                        })
                        .await;
                    if let Some(Ok(())) = marked {
                        event_tx
                            .send(Event::Failed {
                                file_name: Some(file_name.clone()),
                                stage: Stage::Poll,
                                error: error.to_string(),
                            })
                            .ok();
                    }
                    return;
                }
            }
        }

        // Give the service a moment to flush the artifact before reading it back
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                tracing::debug!(file_name = %file_name, "preview cancelled before fetch");
                return;
            }
            _ = tokio::time::sleep(polling.preview_settle_delay) => {}
        }

        fetch_preview(PreviewFetchParams {
            generation,
            file_name,
            service,
            store,
            event_tx,
            lines: polling.preview_lines,
            retry,
            cancel_token,
        })
        .await;
    })
}
