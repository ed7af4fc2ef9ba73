//! Custom test assertions for integration tests

use datagen_client::{Event, FileName};
use std::time::Duration;
use tokio::sync::broadcast::Receiver;

/// How a job ended, as seen through its events
#[derive(Debug, PartialEq)]
pub enum WaitResult {
    /// Preview stored with this many records
    PreviewReady(usize),
    /// Job completed without a usable preview
    PreviewUnavailable(Option<String>),
    /// Job failed with error
    Failed(String),
    /// Timeout waiting for an outcome
    Timeout,
    /// Channel closed unexpectedly
    ChannelClosed,
}

/// Wait for the job identified by `file_name` to reach its final event
///
/// Subscribe before submitting, otherwise early events are missed.
pub async fn wait_for_outcome(
    events: &mut Receiver<Event>,
    file_name: &FileName,
    timeout: Duration,
) -> WaitResult {
    let result = tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(Event::PreviewReady {
                    file_name: f,
                    records,
                }) if &f == file_name => return WaitResult::PreviewReady(records),
                Ok(Event::PreviewUnavailable { file_name: f, error }) if &f == file_name => {
                    return WaitResult::PreviewUnavailable(error);
                }
                Ok(Event::Failed {
                    file_name: Some(f),
                    error,
                    ..
                }) if &f == file_name => return WaitResult::Failed(error),
                Ok(_) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(_) => return WaitResult::ChannelClosed,
            }
        }
    })
    .await;

    result.unwrap_or(WaitResult::Timeout)
}

/// Collect every progress value reported for `file_name` until the job completes or fails
pub async fn collect_progress(
    events: &mut Receiver<Event>,
    file_name: &FileName,
    timeout: Duration,
) -> Vec<u8> {
    let mut seen = Vec::new();
    let _ = tokio::time::timeout(timeout, async {
        while let Ok(event) = events.recv().await {
            match event {
                Event::Progress {
                    file_name: f,
                    progress,
                } if &f == file_name => seen.push(progress),
                Event::Completed { file_name: f } if &f == file_name => break,
                Event::Failed { .. } => break,
                _ => {}
            }
        }
    })
    .await;
    seen
}
