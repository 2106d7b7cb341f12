use std::time::Duration;

use anyhow::{Context, bail};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use taskflow_shared::{
    AuthResponse, DeleteResponse, ErrorBody, LoginRequest, Task, TaskInput, TaskPatch,
};
use tracing::{debug, instrument, warn};

use super::TaskBackend;
use crate::error::BackendError;

/// Talks to a task service over HTTP. Every request is bounded by the
/// configured timeout and never retried.
#[derive(Debug, Clone)]
pub struct RemoteBackend {
    client: Client,
    base_url: String,
    base: Url,
}

impl RemoteBackend {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let base = Url::parse(&base_url)
            .with_context(|| format!("invalid task service url: {base_url}"))?;
        if base.cannot_be_a_base() {
            bail!("task service url cannot carry a path: {base_url}");
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed building HTTP client for the task service")?;

        Ok(Self {
            client,
            base_url,
            base,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `{base}/tasks/{id}` with the id encoded as a single path segment.
    fn task_url(&self, id: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("tasks").push(id);
        }
        url
    }
}

#[async_trait]
impl TaskBackend for RemoteBackend {
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    async fn login(&self, credentials: &LoginRequest) -> Result<AuthResponse, BackendError> {
        let response = self
            .client
            .post(self.url("/login"))
            .json(credentials)
            .send()
            .await?;
        decode(response).await
    }

    #[instrument(skip(self))]
    async fn list_tasks(&self) -> Result<Vec<Task>, BackendError> {
        let response = self.client.get(self.url("/tasks")).send().await?;
        decode(response).await
    }

    #[instrument(skip(self, input))]
    async fn create_task(&self, input: &TaskInput) -> Result<Task, BackendError> {
        let response = self
            .client
            .post(self.url("/tasks"))
            .json(input)
            .send()
            .await?;
        decode(response).await
    }

    #[instrument(skip(self, patch))]
    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<Task, BackendError> {
        let response = self.client.put(self.task_url(id)).json(patch).send().await?;
        decode(response).await
    }

    #[instrument(skip(self))]
    async fn delete_task(&self, id: &str) -> Result<(), BackendError> {
        let response = self.client.delete(self.task_url(id)).send().await?;
        let body: DeleteResponse = decode(response).await?;
        if !body.success {
            warn!("task service answered delete without success");
            return Err(BackendError::Unexpected {
                status: StatusCode::OK.as_u16(),
                message: Some("delete was not acknowledged".to_string()),
            });
        }
        Ok(())
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let status = response.status();
    debug!(status = status.as_u16(), "task service responded");

    if status.is_success() {
        return response.json::<T>().await.map_err(BackendError::from);
    }

    let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.error);

    Err(match status {
        StatusCode::UNAUTHORIZED => BackendError::InvalidCredentials { message },
        StatusCode::NOT_FOUND => BackendError::NotFound { message },
        other => BackendError::Unexpected {
            status: other.as_u16(),
            message,
        },
    })
}
