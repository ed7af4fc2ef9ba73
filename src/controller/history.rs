//! Previously generated datasets and artifact downloads.

use super::JobController;
use crate::error::{Error, JobError, Result};
use crate::links;
use crate::retry::with_retry;
use crate::types::{DatasetEntry, FileName, JobStatus};
use crate::utils::{get_unique_path, local_file_name};
use std::path::PathBuf;

impl JobController {
    /// Datasets the session's user generated before, with resolved download URLs
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an anonymous session (there is no history to
    /// look up), or the service error if the listing fails.
    pub async fn list_datasets(&self) -> Result<Vec<DatasetEntry>> {
        if self.session.is_anonymous() {
            return Err(Error::validation(
                "user_email",
                "sign in to see previously generated datasets",
            ));
        }

        let records = with_retry(&self.config.retry, || {
            self.service.list_datasets(&self.session)
        })
        .await?;
        tracing::debug!(count = records.len(), "dataset history loaded");

        records
            .into_iter()
            .map(|record| -> Result<DatasetEntry> {
                let download_url = links::resolve_download_url(
                    &self.config.service.base_url,
                    record.file_name.as_str(),
                )?;
                Ok(DatasetEntry {
                    query: record.query,
                    file_name: record.file_name,
                    download_url,
                })
            })
            .collect()
    }

    /// Download an artifact into the configured download directory
    ///
    /// Name collisions are handled per [`FileCollisionAction`](crate::config::FileCollisionAction).
    /// Returns the path written.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if the file name is not usable as a local file name
    /// - the service error if the download fails
    /// - [`Error::Io`] if the file cannot be written, or already exists with
    ///   [`FileCollisionAction::Skip`](crate::config::FileCollisionAction::Skip)
    pub async fn download_artifact(&self, file_name: &FileName) -> Result<PathBuf> {
        let local_name = local_file_name(file_name)?;
        let download_dir = &self.config.download.download_dir;

        let bytes = with_retry(&self.config.retry, || self.service.download(file_name)).await?;

        tokio::fs::create_dir_all(download_dir).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create download directory '{}': {}",
                    download_dir.display(),
                    e
                ),
            ))
        })?;

        let destination = get_unique_path(
            &download_dir.join(local_name),
            self.config.download.file_collision,
        )?;
        tokio::fs::write(&destination, &bytes).await?;

        tracing::info!(
            file_name = %file_name,
            path = %destination.display(),
            bytes = bytes.len(),
            "artifact downloaded"
        );
        Ok(destination)
    }

    /// Download the artifact of the current job
    ///
    /// # Errors
    ///
    /// Returns [`JobError::InvalidState`] unless the current job is `completed`, otherwise
    /// the same errors as [`download_artifact`](Self::download_artifact).
    pub async fn download_current(&self) -> Result<PathBuf> {
        let job = self.store.snapshot().await;
        match (job.status, job.file_name) {
            (JobStatus::Completed, Some(file_name)) => self.download_artifact(&file_name).await,
            (status, _) => Err(JobError::InvalidState {
                operation: "download",
                current: status.to_string(),
            }
            .into()),
        }
    }
}
