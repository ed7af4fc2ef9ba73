//! Session teardown.

use super::JobController;
use crate::types::Event;
use std::time::Duration;

/// How long [`JobController::shutdown`] waits for the poller to wind down
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

impl JobController {
    /// End the session
    ///
    /// Cancels the session token (and with it every poller and pending preview fetch),
    /// waits for the active poller to exit, then emits [`Event::SessionEnded`]. Later calls
    /// to [`submit`](Self::submit) fail with [`Error::SessionClosed`](crate::Error::SessionClosed).
    /// Calling this more than once is harmless.
    pub async fn shutdown(&self) {
        if self.session_token.is_cancelled() {
            tracing::debug!("session already closed");
            return;
        }

        tracing::info!("ending session");
        self.session_token.cancel();

        let active = self.active.lock().await.take();
        if let Some(active) = active {
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, active.handle).await {
                Ok(Ok(())) => {
                    tracing::debug!(file_name = %active.file_name, "poller stopped");
                }
                Ok(Err(e)) => {
                    tracing::warn!(file_name = %active.file_name, error = %e, "poller task failed");
                }
                Err(_) => {
                    tracing::warn!(file_name = %active.file_name, "timeout waiting for poller to stop");
                }
            }
        }

        self.emit_event(Event::SessionEnded);
        tracing::info!("session ended");
    }

    /// Whether [`shutdown`](Self::shutdown) has been called
    pub fn is_closed(&self) -> bool {
        self.session_token.is_cancelled()
    }
}
