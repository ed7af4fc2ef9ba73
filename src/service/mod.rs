//! The generation service as seen by the controller
//!
//! [`DatasetService`] is the seam between the job lifecycle logic and the network.
//! [`HttpDatasetClient`] implements it over the service's REST API; tests substitute
//! scripted implementations.

mod http;
mod wire;


pub use http::HttpDatasetClient;

use crate::error::Result;
use crate::session::{Credentials, Session, SignupRequest};
use crate::types::{DatasetRecord, FileName, GenerationRequest, JobHandle, PreviewRecord, StatusReport};
use async_trait::async_trait;

/// Operations offered by the dataset generation service
///
/// Implementations perform exactly one request per call; retries are layered on top by the
/// controller.
#[async_trait]
pub trait DatasetService: Send + Sync {
    /// `POST /generate/` - start a generation job
    ///
    /// A response without a file identifier must be reported as
    /// [`Error::UnexpectedResponse`](crate::Error::UnexpectedResponse).
    async fn submit(&self, request: &GenerationRequest, session: &Session) -> Result<JobHandle>;

    /// `GET /status` - current status and progress of a job
    async fn status(&self, file_name: &FileName) -> Result<StatusReport>;

    /// `GET /preview` - up to `lines` records of a finished job, in generation order
    async fn preview(&self, file_name: &FileName, lines: u32) -> Result<Vec<PreviewRecord>>;

    /// `GET /queries/user` - datasets previously generated by the session's user
    async fn list_datasets(&self, session: &Session) -> Result<Vec<DatasetRecord>>;

    /// `GET /download/<file_name>` - raw artifact bytes
    async fn download(&self, file_name: &FileName) -> Result<Vec<u8>>;

    /// `POST /auth/login` - exchange credentials for a session
    async fn login(&self, credentials: &Credentials) -> Result<Session>;

    /// `POST /auth/signup` - register a new account
    async fn signup(&self, request: &SignupRequest) -> Result<()>;
}
