//! reqwest implementation of [`DatasetService`]

use super::DatasetService;
use super::wire::{
    ErrorBody, GenerateResponse, LoginResponse, PreviewResponse, QueriesResponse, StatusResponse,
};
use crate::config::ServiceConfig;
use crate::error::{Error, Result};
use crate::links;
use crate::session::{Credentials, Session, SignupRequest};
use crate::types::{
    DatasetRecord, FileName, GenerationRequest, JobHandle, PreviewRecord, StatusReport,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use url::Url;

const GENERATE: &str = "/generate/";
const STATUS: &str = "/status";
const PREVIEW: &str = "/preview";
const QUERIES: &str = "/queries/user";
const LOGIN: &str = "/auth/login";
const SIGNUP: &str = "/auth/signup";

/// HTTP client for the generation service
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone, Debug)]
pub struct HttpDatasetClient {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpDatasetClient {
    /// Build a client for the configured service root
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] if the TLS backend cannot be initialised.
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
        })
    }

    /// The service root every request is issued against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url> {
        links::endpoint(&self.base_url, path)
    }
}

#[async_trait]
impl DatasetService for HttpDatasetClient {
    async fn submit(&self, request: &GenerationRequest, session: &Session) -> Result<JobHandle> {
        let records = request.records.to_string();
        let batch_size = request.batch_size.to_string();
        let form = [
            ("domain", request.domain.as_str()),
            ("records", records.as_str()),
            ("batch_size", batch_size.as_str()),
            ("user_email", session.email.as_str()),
        ];

        tracing::debug!(domain = %request.domain, records = request.records, "POST {GENERATE}");
        let response = self.http.post(self.url(GENERATE)?).form(&form).send().await?;
        let body: GenerateResponse = read_json(response, GENERATE).await?;

        let file_name = body
            .file_name
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| Error::UnexpectedResponse {
                endpoint: GENERATE,
                reason: "response has no file_name".to_string(),
            })?;

        let download_path = match body.download_url.filter(|p| !p.trim().is_empty()) {
            Some(path) => path,
            None => {
                tracing::debug!(file_name = %file_name, "no download_url in response, using default path");
                format!("/download/{file_name}")
            }
        };

        if let Some(message) = body.message {
            tracing::debug!(file_name = %file_name, message = %message, "generation accepted");
        }

        Ok(JobHandle {
            file_name: FileName::new(file_name),
            download_path,
        })
    }

    async fn status(&self, file_name: &FileName) -> Result<StatusReport> {
        let response = self
            .http
            .get(self.url(STATUS)?)
            .query(&[("file_name", file_name.as_str())])
            .send()
            .await?;
        let body: StatusResponse = read_json(response, STATUS).await?;

        if !body.progress.is_finite() {
            return Err(Error::UnexpectedResponse {
                endpoint: STATUS,
                reason: format!("progress is not a number: {}", body.progress),
            });
        }

        Ok(StatusReport {
            status: body.status,
            // float-to-int `as` saturates, so absurd values still clamp later
            progress: body.progress.round() as i64,
        })
    }

    async fn preview(&self, file_name: &FileName, lines: u32) -> Result<Vec<PreviewRecord>> {
        let lines = lines.to_string();
        let response = self
            .http
            .get(self.url(PREVIEW)?)
            .query(&[("file_name", file_name.as_str()), ("lines", lines.as_str())])
            .send()
            .await?;
        let body: PreviewResponse = read_json(response, PREVIEW).await?;

        body.preview.ok_or_else(|| Error::UnexpectedResponse {
            endpoint: PREVIEW,
            reason: "response has no preview".to_string(),
        })
    }

    async fn list_datasets(&self, session: &Session) -> Result<Vec<DatasetRecord>> {
        let response = self
            .http
            .get(self.url(QUERIES)?)
            .query(&[("user_email", session.email.as_str())])
            .send()
            .await?;
        let body: QueriesResponse = read_json(response, QUERIES).await?;
        Ok(body.datasets)
    }

    async fn download(&self, file_name: &FileName) -> Result<Vec<u8>> {
        let url = links::download_url_for(&self.base_url, file_name)?;
        tracing::debug!(url = %url, "downloading artifact");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(http_error(status, &body));
        }
        Ok(body.to_vec())
    }

    async fn login(&self, credentials: &Credentials) -> Result<Session> {
        let response = self
            .http
            .post(self.url(LOGIN)?)
            .json(credentials)
            .send()
            .await?;
        let body: LoginResponse = read_json(response, LOGIN).await?;

        Ok(Session {
            email: body.email,
            username: body.username,
        })
    }

    async fn signup(&self, request: &SignupRequest) -> Result<()> {
        let response = self
            .http
            .post(self.url(SIGNUP)?)
            .json(request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await?;
            return Err(http_error(status, &body));
        }
        Ok(())
    }
}

/// Read a JSON body, mapping non-2xx answers to [`Error::Http`] and schema mismatches to
/// [`Error::UnexpectedResponse`]
async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
    endpoint: &'static str,
) -> Result<T> {
    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
        return Err(http_error(status, &body));
    }

    serde_json::from_slice(&body).map_err(|e| Error::UnexpectedResponse {
        endpoint,
        reason: e.to_string(),
    })
}

fn http_error(status: reqwest::StatusCode, body: &[u8]) -> Error {
    let message = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(ErrorBody::into_message)
        .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string());

    let message = if message.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        message
    };

    Error::Http {
        status: status.as_u16(),
        message,
    }
}
