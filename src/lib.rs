//! # datagen-client
//!
//! Client library for a synthetic dataset generation service.
//!
//! A user names a domain ("sports consultant", "text-to-sql"), the service generates a
//! JSONL dataset in the background, and this crate drives the job from submission to a
//! downloadable artifact with a preview of its first records.
//!
//! ## Design Philosophy
//!
//! - **One live job per session** - a new submission supersedes the previous job, and
//!   late answers for the old job are discarded
//! - **Explicit context** - the service root and the session identity are passed in, never
//!   read from ambient state
//! - **Event-driven** - consumers subscribe to lifecycle events or read snapshots
//! - **Fail fast by default** - every request is tried once unless retries are configured
//!
//! ## Quick Start
//!
//! ```no_run
//! use datagen_client::{Config, Event, GenerationRequest, JobController, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::new("http://localhost:8000".parse()?);
//!     let controller = JobController::new(config, Session::new("ana@example.com"))?;
//!
//!     let mut events = controller.subscribe();
//!     controller
//!         .submit(GenerationRequest::new("sports consultant").with_records(200))
//!         .await?;
//!
//!     while let Ok(event) = events.recv().await {
//!         match event {
//!             Event::Progress { progress, .. } => println!("{progress}%"),
//!             Event::PreviewReady { .. } | Event::PreviewUnavailable { .. } => break,
//!             Event::Failed { error, .. } => return Err(error.into()),
//!             _ => {}
//!         }
//!     }
//!
//!     let job = controller.snapshot().await;
//!     println!("{}", datagen_client::preview::render(&job.preview));
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Job lifecycle controller (decomposed into focused submodules)
pub mod controller;
/// Error types
pub mod error;
/// Download link resolution
pub mod links;
/// Preview rendering
pub mod preview;
/// Retry logic with exponential backoff
pub mod retry;
/// Generation service client
pub mod service;
/// Session identity and authentication
pub mod session;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{Config, FileCollisionAction, PollingConfig, RetryConfig, ServiceConfig};
pub use controller::{Job, JobController};
pub use error::{Error, JobError, Result};
pub use links::resolve_download_url;
pub use service::{DatasetService, HttpDatasetClient};
pub use session::{Credentials, Session, SignupRequest, signup};
pub use types::{
    DatasetEntry, DatasetRecord, Event, FileName, GenerationRequest, JobHandle, JobStatus,
    PreviewRecord, RemoteStatus, Stage, StatusReport,
};

/// Run until the process is asked to stop, then end the controller's session.
///
/// - **Unix:** waits for SIGTERM or SIGINT; if either handler cannot be registered the
///   other one (or `ctrl_c`) is used instead.
/// - **Windows/other:** waits for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use datagen_client::{Config, GenerationRequest, JobController, Session, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::from_env()?;
///     let controller = JobController::new(config, Session::anonymous())?;
///     controller.submit(GenerationRequest::new("text-to-sql")).await?;
///
///     run_with_shutdown(controller).await;
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(controller: JobController) {
    wait_for_signal().await;
    controller.shutdown().await;
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration can fail in restricted environments (containers, tests)
    match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                _ = sigint.recv() => tracing::info!("Received SIGINT signal (Ctrl+C)"),
            }
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("Received SIGTERM signal");
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!("Received SIGINT signal (Ctrl+C)");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C signal"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C signal"),
    }
}
