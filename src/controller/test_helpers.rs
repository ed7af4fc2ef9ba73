//! Shared test helpers: a scripted in-memory service and controller construction.

use crate::config::Config;
use crate::controller::JobController;
use crate::error::{Error, Result};
use crate::service::DatasetService;
use crate::session::{Credentials, Session, SignupRequest};
use crate::types::{
    DatasetRecord, Event, FileName, GenerationRequest, JobHandle, PreviewRecord, RemoteStatus,
    StatusReport,
};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

/// Base URL used by every test controller
pub(crate) const TEST_BASE_URL: &str = "http://datagen.test";

/// Number of calls per operation
#[derive(Default)]
pub(crate) struct CallCounts {
    pub submit: AtomicUsize,
    pub status: AtomicUsize,
    pub preview: AtomicUsize,
    pub list: AtomicUsize,
    pub download: AtomicUsize,
    pub login: AtomicUsize,
    pub signup: AtomicUsize,
}

/// [`DatasetService`] answering from per-operation scripts
///
/// Unscripted calls fall back to a benign answer: submissions are accepted under
/// `<domain>_dataset.jsonl`, status reports `running` at 0%, previews are empty.
#[derive(Default)]
pub(crate) struct FakeService {
    submits: Mutex<VecDeque<Result<JobHandle>>>,
    statuses: Mutex<HashMap<FileName, VecDeque<Result<StatusReport>>>>,
    previews: Mutex<HashMap<FileName, VecDeque<Result<Vec<PreviewRecord>>>>>,
    datasets: Mutex<Vec<DatasetRecord>>,
    artifacts: Mutex<HashMap<FileName, Vec<u8>>>,
    submit_delay: Mutex<Duration>,
    status_delay: Mutex<Duration>,
    /// Calls received so far
    pub calls: CallCounts,
    /// Every submission received, in order
    pub submitted: Mutex<Vec<(GenerationRequest, Session)>>,
    /// File names of every status request, in order
    pub polled: Mutex<Vec<FileName>>,
}

impl FakeService {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_submit(self, result: Result<JobHandle>) -> Self {
        self.submits.lock().unwrap().push_back(result);
        self
    }

    pub(crate) fn with_statuses(
        self,
        file_name: &str,
        results: impl IntoIterator<Item = Result<StatusReport>>,
    ) -> Self {
        self.statuses
            .lock()
            .unwrap()
            .entry(FileName::new(file_name))
            .or_default()
            .extend(results);
        self
    }

    pub(crate) fn with_preview(self, file_name: &str, result: Result<Vec<PreviewRecord>>) -> Self {
        self.previews
            .lock()
            .unwrap()
            .entry(FileName::new(file_name))
            .or_default()
            .push_back(result);
        self
    }

    pub(crate) fn with_datasets(self, datasets: Vec<DatasetRecord>) -> Self {
        *self.datasets.lock().unwrap() = datasets;
        self
    }

    pub(crate) fn with_artifact(self, file_name: &str, bytes: &[u8]) -> Self {
        self.artifacts
            .lock()
            .unwrap()
            .insert(FileName::new(file_name), bytes.to_vec());
        self
    }

    /// Every submission takes this long to answer
    pub(crate) fn with_submit_delay(self, delay: Duration) -> Self {
        *self.submit_delay.lock().unwrap() = delay;
        self
    }

    /// Every status request takes this long to answer
    pub(crate) fn with_status_delay(self, delay: Duration) -> Self {
        *self.status_delay.lock().unwrap() = delay;
        self
    }

    pub(crate) fn status_calls(&self) -> usize {
        self.calls.status.load(Ordering::SeqCst)
    }

    pub(crate) fn preview_calls(&self) -> usize {
        self.calls.preview.load(Ordering::SeqCst)
    }

    pub(crate) fn submit_calls(&self) -> usize {
        self.calls.submit.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatasetService for FakeService {
    async fn submit(&self, request: &GenerationRequest, session: &Session) -> Result<JobHandle> {
        self.calls.submit.fetch_add(1, Ordering::SeqCst);
        self.submitted
            .lock()
            .unwrap()
            .push((request.clone(), session.clone()));

        let delay = *self.submit_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.submits.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(handle(&format!("{}_dataset.jsonl", request.domain.replace(' ', "_")))))
    }

    async fn status(&self, file_name: &FileName) -> Result<StatusReport> {
        self.calls.status.fetch_add(1, Ordering::SeqCst);
        self.polled.lock().unwrap().push(file_name.clone());

        let delay = *self.status_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let scripted = self
            .statuses
            .lock()
            .unwrap()
            .get_mut(file_name)
            .and_then(VecDeque::pop_front);
        scripted.unwrap_or(Ok(StatusReport {
            status: RemoteStatus::Running,
            progress: 0,
        }))
    }

    async fn preview(&self, file_name: &FileName, _lines: u32) -> Result<Vec<PreviewRecord>> {
        self.calls.preview.fetch_add(1, Ordering::SeqCst);
        let scripted = self
            .previews
            .lock()
            .unwrap()
            .get_mut(file_name)
            .and_then(VecDeque::pop_front);
        scripted.unwrap_or(Ok(Vec::new()))
    }

    async fn list_datasets(&self, _session: &Session) -> Result<Vec<DatasetRecord>> {
        self.calls.list.fetch_add(1, Ordering::SeqCst);
        Ok(self.datasets.lock().unwrap().clone())
    }

    async fn download(&self, file_name: &FileName) -> Result<Vec<u8>> {
        self.calls.download.fetch_add(1, Ordering::SeqCst);
        self.artifacts
            .lock()
            .unwrap()
            .get(file_name)
            .cloned()
            .ok_or_else(|| Error::Http {
                status: 404,
                message: "File not found".to_string(),
            })
    }

    async fn login(&self, credentials: &Credentials) -> Result<Session> {
        self.calls.login.fetch_add(1, Ordering::SeqCst);
        Ok(Session::new(credentials.email.clone()))
    }

    async fn signup(&self, _request: &SignupRequest) -> Result<()> {
        self.calls.signup.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub(crate) fn handle(file_name: &str) -> JobHandle {
    JobHandle {
        file_name: FileName::new(file_name),
        download_path: format!("/download/{file_name}"),
    }
}

pub(crate) fn running(progress: i64) -> Result<StatusReport> {
    Ok(StatusReport {
        status: RemoteStatus::Running,
        progress,
    })
}

pub(crate) fn completed(progress: i64) -> Result<StatusReport> {
    Ok(StatusReport {
        status: RemoteStatus::Completed,
        progress,
    })
}

/// A status answer carrying the backend's raw status text
pub(crate) fn reported(raw: &str, progress: i64) -> Result<StatusReport> {
    Ok(StatusReport {
        status: RemoteStatus::classify(raw),
        progress,
    })
}

pub(crate) fn remote_error(progress: i64) -> Result<StatusReport> {
    Ok(StatusReport {
        status: RemoteStatus::Error,
        progress,
    })
}

/// A failure that looks like the service being down
pub(crate) fn unreachable() -> Error {
    Error::Io(std::io::Error::new(
        std::io::ErrorKind::ConnectionRefused,
        "connection refused",
    ))
}

/// Config with default timings (3 s polls, 600 ms settle) against [`TEST_BASE_URL`]
pub(crate) fn test_config() -> Config {
    Config::new(Url::parse(TEST_BASE_URL).unwrap())
}

/// Helper to create a test controller for an identified user
pub(crate) fn create_test_controller(service: Arc<FakeService>) -> JobController {
    create_test_controller_with(service, test_config())
}

pub(crate) fn create_test_controller_with(
    service: Arc<FakeService>,
    config: Config,
) -> JobController {
    JobController::with_service(config, Session::new("ana@example.com"), service).unwrap()
}

/// Receive events until one matches `done`; returns everything received, the match last.
///
/// Panics if nothing matches within ten minutes of (usually paused) tokio time.
pub(crate) async fn collect_until(
    rx: &mut tokio::sync::broadcast::Receiver<Event>,
    done: impl Fn(&Event) -> bool,
) -> Vec<Event> {
    let mut events = Vec::new();
    let received = tokio::time::timeout(Duration::from_secs(600), async {
        loop {
            let event = rx.recv().await.unwrap();
            let finished = done(&event);
            events.push(event);
            if finished {
                break;
            }
        }
    })
    .await;
    if received.is_err() {
        panic!("no matching event; received so far: {events:?}");
    }
    events
}
