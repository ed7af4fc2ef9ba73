//! One-shot preview retrieval after a job completes.

use super::job::JobStore;
use crate::config::RetryConfig;
use crate::error::JobError;
use crate::retry::with_retry;
use crate::service::DatasetService;
use crate::types::{Event, FileName};
use std::sync::Arc;

/// Parameters for the preview stage of a completed job
pub(crate) struct PreviewFetchParams {
    pub generation: u64,
    pub file_name: FileName,
    pub service: Arc<dyn DatasetService>,
    pub store: Arc<JobStore>,
    pub event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Number of records to request
    pub lines: u32,
    pub retry: RetryConfig,
    pub cancel_token: tokio_util::sync::CancellationToken,
}

/// Fetch and store the preview of a completed job
///
/// Runs at most once per job. A failed fetch leaves the job `completed` with an
/// informational message; the artifact is still downloadable.
pub(crate) async fn fetch_preview(params: PreviewFetchParams) {
    let PreviewFetchParams {
        generation,
        file_name,
        service,
        store,
        event_tx,
        lines,
        retry,
        cancel_token,
    } = params;

    match store
        .apply_current(generation, &cancel_token, |job| job.begin_preview())
        .await
    {
        Some(Ok(())) => {}
        Some(Err(e)) => {
            tracing::warn!(file_name = %file_name, error = %e, "preview skipped");
            return;
        }
        None => return,
    }

    tracing::debug!(file_name = %file_name, lines, "fetching preview");

    let result = tokio::select! {
        biased;
        _ = cancel_token.cancelled() => return,
        result = with_retry(&retry, || service.preview(&file_name, lines)) => result,
    };

    match result {
        Ok(records) => {
            let Some(applied) = store
                .apply_current(generation, &cancel_token, |job| job.attach_preview(records))
                .await
            else {
                return;
            };

            match applied {
                Ok(0) => {
                    tracing::info!(file_name = %file_name, "preview is empty");
                    event_tx
                        .send(Event::PreviewUnavailable {
                            file_name,
                            error: None,
                        })
                        .ok();
                }
                Ok(count) => {
                    tracing::info!(file_name = %file_name, records = count, "preview loaded");
                    event_tx
                        .send(Event::PreviewReady {
                            file_name,
                            records: count,
                        })
                        .ok();
                }
                Err(e) => {
                    tracing::warn!(file_name = %file_name, error = %e, "preview could not be stored");
                }
            }
        }
        Err(e) => {
            let error = JobError::Preview {
                file_name: file_name.clone(),
                source: Box::new(e),
            };
            // Not fatal: the job stays completed and the artifact remains downloadable
            tracing::warn!(error = %error, "preview fetch failed");

            let marked = store
                .apply_current(generation, &cancel_token, |job| job.mark_preview_failed())
                .await;
            if let Some(Ok(())) = marked {
                event_tx
                    .send(Event::PreviewUnavailable {
                        file_name,
                        error: Some(error.to_string()),
                    })
                    .ok();
            }
        }
    }
}
