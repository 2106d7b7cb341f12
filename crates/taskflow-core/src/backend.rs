//! Backing-store port.
//!
//! The client never talks HTTP directly: it goes through [`TaskBackend`],
//! which is either the in-process reference store ([`local::LocalBackend`])
//! or an HTTP service ([`remote::RemoteBackend`]). The implementation is
//! chosen once at startup from the `backend` config key.

pub mod local;
pub mod remote;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use taskflow_shared::{AuthResponse, LoginRequest, Task, TaskInput, TaskPatch};
use tracing::info;

use crate::config::{BackendKind, Config};
use crate::error::BackendError;

#[async_trait]
pub trait TaskBackend: Send + Sync {
    async fn login(&self, credentials: &LoginRequest) -> Result<AuthResponse, BackendError>;

    async fn list_tasks(&self) -> Result<Vec<Task>, BackendError>;

    async fn create_task(&self, input: &TaskInput) -> Result<Task, BackendError>;

    /// Merges `patch` into the task; [`BackendError::NotFound`] when the id
    /// is unknown.
    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<Task, BackendError>;

    async fn delete_task(&self, id: &str) -> Result<(), BackendError>;
}

#[tracing::instrument(skip(cfg, data_dir))]
pub fn from_config(cfg: &Config, data_dir: &Path) -> anyhow::Result<Arc<dyn TaskBackend>> {
    match cfg.backend()? {
        BackendKind::Local => {
            let backend = local::LocalBackend::from_config(cfg, data_dir)
                .context("failed to open local backing store")?;
            info!(data_dir = %data_dir.display(), "using local backing store");
            Ok(Arc::new(backend))
        }
        BackendKind::Remote => {
            let backend = remote::RemoteBackend::new(&cfg.api_url(), cfg.api_timeout()?)
                .context("failed to build remote backing store client")?;
            info!(url = %cfg.api_url(), "using remote backing store");
            Ok(Arc::new(backend))
        }
    }
}
