use super::job::{
    COMPLETED_MESSAGE, POLL_FAILED_MESSAGE, PREVIEW_EMPTY_MESSAGE, PREVIEW_FAILED_MESSAGE,
    PREVIEW_READY_MESSAGE, REMOTE_FAILED_MESSAGE, SESSION_CLOSED_MESSAGE, SUBMIT_FAILED_MESSAGE,
};
use super::test_helpers::*;
use super::*;
use crate::error::{Error, JobError};
use crate::session::Session;
use crate::types::{Event, FileName, GenerationRequest, JobStatus, Stage};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

mod preview;

fn is_preview_outcome(event: &Event) -> bool {
    matches!(
        event,
        Event::PreviewReady { .. } | Event::PreviewUnavailable { .. }
    )
}
