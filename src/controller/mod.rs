//! Job lifecycle controller split into focused submodules.
//!
//! The `JobController` struct and its methods are organized by domain:
//! - [`job`] - Job record, state machine and the store that owns it
//! - [`submit`] - Validation and submission of generation requests
//! - [`poller`] - Background status polling of the running job
//! - [`preview_fetch`] - One-shot preview retrieval after completion
//! - [`history`] - Previously generated datasets and artifact downloads
//! - [`lifecycle`] - Session teardown

mod history;
mod job;
mod lifecycle;
mod poller;
mod preview_fetch;
mod submit;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use job::Job;

use crate::config::Config;
use crate::error::Result;
use crate::links;
use crate::service::{DatasetService, HttpDatasetClient};
use crate::session::Session;
use crate::types::{Event, FileName};
use job::JobStore;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// The job currently owning the poller slot
pub(crate) struct ActiveJob {
    pub(crate) generation: u64,
    pub(crate) file_name: FileName,
    /// Cancels the poller and its preview stage (child of the session token)
    pub(crate) cancel_token: CancellationToken,
    pub(crate) handle: tokio::task::JoinHandle<()>,
}

/// Drives one session's generation jobs (cloneable - all fields are Arc-wrapped)
///
/// At most one job is live per controller. Submitting a new request supersedes the
/// previous job: its poller is cancelled and any response still in flight for it is
/// discarded.
#[derive(Clone)]
pub struct JobController {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Generation service (trait object so tests can script responses)
    pub(crate) service: Arc<dyn DatasetService>,
    /// Identity attached to every submission
    pub(crate) session: Arc<Session>,
    /// Single source of truth for the live job
    pub(crate) store: Arc<JobStore>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Poller of the current job, if one was started
    pub(crate) active: Arc<tokio::sync::Mutex<Option<ActiveJob>>>,
    /// Set while a `/generate/` request is in flight
    pub(crate) submitting: Arc<AtomicBool>,
    /// Cancelled when the session ends; parent of every poller token
    pub(crate) session_token: CancellationToken,
}

impl JobController {
    /// Create a controller talking HTTP to `config.service.base_url`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the configuration is invalid, or
    /// [`Error::Network`](crate::Error::Network) if the HTTP client cannot be built.
    pub fn new(config: Config, session: Session) -> Result<Self> {
        config.validate()?;
        let client = HttpDatasetClient::new(&config.service)?;
        Self::with_service(config, session, Arc::new(client))
    }

    /// Create a controller on top of any [`DatasetService`] implementation
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the configuration is invalid.
    pub fn with_service(
        config: Config,
        session: Session,
        service: Arc<dyn DatasetService>,
    ) -> Result<Self> {
        config.validate()?;

        let (event_tx, _rx) = tokio::sync::broadcast::channel(EVENT_CHANNEL_CAPACITY);

        tracing::debug!(
            base_url = %config.service.base_url,
            poll_interval_ms = config.polling.interval.as_millis() as u64,
            anonymous = session.is_anonymous(),
            "job controller created"
        );

        Ok(Self {
            config: Arc::new(config),
            service,
            session: Arc::new(session),
            store: Arc::new(JobStore::new()),
            event_tx,
            active: Arc::new(tokio::sync::Mutex::new(None)),
            submitting: Arc::new(AtomicBool::new(false)),
            session_token: CancellationToken::new(),
        })
    }

    /// Subscribe to job events
    ///
    /// Each subscriber receives all events independently. A subscriber that falls more than
    /// 256 events behind gets `RecvError::Lagged`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use datagen_client::{Config, Event, GenerationRequest, JobController, Session};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let config = Config::new("http://localhost:8000".parse()?);
    ///     let controller = JobController::new(config, Session::new("ana@example.com"))?;
    ///
    ///     let mut events = controller.subscribe();
    ///     controller.submit(GenerationRequest::new("sports consultant")).await?;
    ///
    ///     while let Ok(event) = events.recv().await {
    ///         println!("{event:?}");
    ///         if matches!(event, Event::PreviewReady { .. } | Event::Failed { .. }) {
    ///             break;
    ///         }
    ///     }
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Copy of the current job
    pub async fn snapshot(&self) -> Job {
        self.store.snapshot().await
    }

    /// The session this controller acts for
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Resolve a server-relative download path or bare file name against the service root
    ///
    /// # Errors
    ///
    /// See [`links::resolve_download_url`].
    pub fn resolve_download_url(&self, path: &str) -> Result<Url> {
        links::resolve_download_url(&self.config.service.base_url, path)
    }

    /// Send an event to all subscribers; dropped silently when nobody listens
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}
