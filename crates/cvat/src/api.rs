//! REST API client for the CVAT HTTP endpoints.
//!
//! Wraps the subset of the CVAT API the engine needs (job and task info,
//! frame metadata, job listings, labels, annotations) using [`reqwest`] with
//! HTTP basic auth.

use std::fmt;
use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use annolink_core::annotation::AnnotationSet;
use annolink_core::error::ServiceError;
use annolink_core::types::RemoteId;

use crate::models::{DataMeta, JobInfo, TaskInfo};

/// Page size requested from paginated listings.
pub const PAGE_SIZE: u32 = 100;

/// Where a CVAT instance lives and who to log in as.
#[derive(Clone)]
pub struct CvatConnection {
    /// Base URL without a trailing slash, e.g. `http://cvat.local:8080`.
    pub url: String,
    pub username: String,
    pub password: String,
}

impl CvatConnection {
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let url = url.into();
        Self {
            url: url.trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for CvatConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CvatConnection")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Per-call timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request: Duration,
    /// Annotation uploads, which the server may take a while to commit.
    pub write: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            request: Duration::from_secs(30),
            write: Duration::from_secs(60),
        }
    }
}

/// Errors from the CVAT REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum CvatApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// CVAT returned a non-2xx status code.
    #[error("CVAT API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The response parsed as JSON but not in any shape this client knows.
    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),
}

impl CvatApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ApiError { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            Self::UnexpectedShape(_) => None,
        }
    }
}

impl From<CvatApiError> for ServiceError {
    fn from(err: CvatApiError) -> Self {
        match err {
            CvatApiError::Request(e) if e.is_timeout() => ServiceError::Timeout(e.to_string()),
            CvatApiError::Request(e) if e.is_decode() => ServiceError::Malformed(e.to_string()),
            CvatApiError::Request(e) => ServiceError::Transport(e.to_string()),
            CvatApiError::ApiError { status, body } => ServiceError::Remote { status, body },
            CvatApiError::UnexpectedShape(msg) => ServiceError::Malformed(msg),
        }
    }
}

/// HTTP client for a single CVAT instance.
pub struct CvatApi {
    client: reqwest::Client,
    connection: CvatConnection,
    timeouts: Timeouts,
}

impl CvatApi {
    pub fn new(connection: CvatConnection, timeouts: Timeouts) -> Self {
        Self::with_client(reqwest::Client::new(), connection, timeouts)
    }

    /// Create an API client reusing an existing [`reqwest::Client`]
    /// (source, target and check instances can share one pool).
    pub fn with_client(
        client: reqwest::Client,
        connection: CvatConnection,
        timeouts: Timeouts,
    ) -> Self {
        Self {
            client,
            connection,
            timeouts,
        }
    }

    pub fn connection(&self) -> &CvatConnection {
        &self.connection
    }

    /// `GET /api/users/self`: succeeds when the credentials are accepted.
    pub async fn check_connection(&self) -> Result<(), CvatApiError> {
        let response = self.get("/api/users/self").send().await?;
        Self::check_status(response).await
    }

    pub async fn get_job(&self, job_id: RemoteId) -> Result<JobInfo, CvatApiError> {
        let response = self.get(&format!("/api/jobs/{job_id}")).send().await?;
        Self::parse_response(response).await
    }

    pub async fn get_task(&self, task_id: RemoteId) -> Result<TaskInfo, CvatApiError> {
        let response = self.get(&format!("/api/tasks/{task_id}")).send().await?;
        Self::parse_response(response).await
    }

    /// Frame metadata of a task, including the original file names.
    pub async fn get_data_meta(&self, task_id: RemoteId) -> Result<DataMeta, CvatApiError> {
        let response = self
            .get(&format!("/api/tasks/{task_id}/data/meta"))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `GET /api/tasks/{id}/jobs`. Newer servers answer with a plain list or a
    /// `{results}` page; older ones do not have the endpoint.
    pub async fn get_task_jobs(&self, task_id: RemoteId) -> Result<Value, CvatApiError> {
        let response = self
            .get(&format!("/api/tasks/{task_id}/jobs"))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// One page of `GET /api/jobs?task_id=`. Pages are 1-based.
    pub async fn list_jobs_page(
        &self,
        task_id: RemoteId,
        page: u32,
    ) -> Result<Value, CvatApiError> {
        let response = self
            .get("/api/jobs")
            .query(&[
                ("task_id", task_id.to_string()),
                ("page", page.to_string()),
                ("page_size", PAGE_SIZE.to_string()),
            ])
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Fetch an absolute URL handed out by the server (label references,
    /// `next` page links).
    pub async fn get_url(&self, url: &str) -> Result<Value, CvatApiError> {
        let response = self
            .authorized(Method::GET, url.to_string(), self.timeouts.request)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    pub async fn get_job_annotations(
        &self,
        job_id: RemoteId,
    ) -> Result<AnnotationSet, CvatApiError> {
        let response = self
            .get(&format!("/api/jobs/{job_id}/annotations"))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    pub async fn get_task_annotations(
        &self,
        task_id: RemoteId,
    ) -> Result<AnnotationSet, CvatApiError> {
        let response = self
            .get(&format!("/api/tasks/{task_id}/annotations"))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Replace the annotations of a job.
    ///
    /// Sends `PUT ?action=create`; if the server rejects it, retries once as
    /// `PATCH` with the same query, which merges instead of replacing.
    pub async fn upload_job_annotations(
        &self,
        job_id: RemoteId,
        payload: &AnnotationSet,
    ) -> Result<(), CvatApiError> {
        let path = format!("/api/jobs/{job_id}/annotations");

        let put = self.send_annotations(Method::PUT, &path, payload).await;
        let put_err = match put {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };
        tracing::warn!(
            job_id,
            error = %put_err,
            "PUT of job annotations failed, retrying as PATCH"
        );

        self.send_annotations(Method::PATCH, &path, payload)
            .await
            .map_err(|patch_err| {
                tracing::error!(
                    job_id,
                    put_error = %put_err,
                    error = %patch_err,
                    "PATCH of job annotations failed"
                );
                patch_err
            })
    }

    /// `PUT /api/tasks/{id}/annotations`.
    pub async fn upload_task_annotations(
        &self,
        task_id: RemoteId,
        payload: &AnnotationSet,
    ) -> Result<(), CvatApiError> {
        let response = self
            .authorized(
                Method::PUT,
                self.url(&format!("/api/tasks/{task_id}/annotations")),
                self.timeouts.write,
            )
            .json(payload)
            .send()
            .await?;
        Self::check_status(response).await
    }

    // ---- private helpers ----

    async fn send_annotations(
        &self,
        method: Method,
        path: &str,
        payload: &AnnotationSet,
    ) -> Result<(), CvatApiError> {
        let response = self
            .authorized(method, self.url(path), self.timeouts.write)
            .query(&[("action", "create")])
            .json(payload)
            .send()
            .await?;
        Self::check_status(response).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.connection.url, path)
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.authorized(Method::GET, self.url(path), self.timeouts.request)
    }

    fn authorized(
        &self,
        method: Method,
        url: String,
        timeout: Duration,
    ) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .basic_auth(&self.connection.username, Some(&self.connection.password))
            .timeout(timeout)
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`CvatApiError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, CvatApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(CvatApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, CvatApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), CvatApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}
