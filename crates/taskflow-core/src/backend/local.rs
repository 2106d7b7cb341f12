use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use taskflow_shared::{AuthResponse, LoginRequest, Task, TaskInput, TaskPatch, User};
use tracing::{debug, instrument, warn};

use super::TaskBackend;
use crate::config::Config;
use crate::datastore::DataStore;
use crate::error::BackendError;

pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
pub const TASK_NOT_FOUND: &str = "Task not found";

const DEMO_USER_ID: &str = "1";

/// The reference backing store: demo credentials plus the file-backed task
/// list. Also what `taskflow serve` exposes over HTTP.
pub struct LocalBackend {
    store: Mutex<DataStore>,
    username: String,
    password: String,
    latency: Duration,
}

impl LocalBackend {
    pub fn new(store: DataStore, username: String, password: String) -> Self {
        Self {
            store: Mutex::new(store),
            username,
            password,
            latency: Duration::ZERO,
        }
    }

    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        Ok(Self::new(
            DataStore::open(data_dir)?,
            "test".to_string(),
            "test123".to_string(),
        ))
    }

    pub fn from_config(cfg: &Config, data_dir: &Path) -> anyhow::Result<Self> {
        let (username, password) = cfg.credentials();
        let backend =
            Self::new(DataStore::open(data_dir)?, username, password).with_latency(cfg.local_latency()?);
        Ok(backend)
    }

    /// Delays every answer, emulating a network round trip.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            debug!(latency_ms = self.latency.as_millis() as u64, "simulating latency");
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl TaskBackend for LocalBackend {
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    async fn login(&self, credentials: &LoginRequest) -> Result<AuthResponse, BackendError> {
        self.simulate_latency().await;

        if credentials.username == self.username && credentials.password == self.password {
            let token = format!("fake-jwt-token-{}", Utc::now().timestamp_millis());
            debug!("credentials accepted");
            return Ok(AuthResponse {
                token,
                user: User {
                    id: DEMO_USER_ID.to_string(),
                    username: credentials.username.clone(),
                },
            });
        }

        warn!("invalid credentials");
        Err(BackendError::InvalidCredentials {
            message: Some(INVALID_CREDENTIALS.to_string()),
        })
    }

    #[instrument(skip(self))]
    async fn list_tasks(&self) -> Result<Vec<Task>, BackendError> {
        self.simulate_latency().await;
        Ok(self.store.lock().load_tasks()?)
    }

    #[instrument(skip(self, input))]
    async fn create_task(&self, input: &TaskInput) -> Result<Task, BackendError> {
        self.simulate_latency().await;
        Ok(self.store.lock().create(input.clone(), Utc::now())?)
    }

    #[instrument(skip(self, patch))]
    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<Task, BackendError> {
        self.simulate_latency().await;
        self.store
            .lock()
            .update(id, patch.clone(), Utc::now())?
            .ok_or_else(|| BackendError::NotFound {
                message: Some(TASK_NOT_FOUND.to_string()),
            })
    }

    #[instrument(skip(self))]
    async fn delete_task(&self, id: &str) -> Result<(), BackendError> {
        self.simulate_latency().await;
        if self.store.lock().delete(id)? {
            Ok(())
        } else {
            Err(BackendError::NotFound {
                message: Some(TASK_NOT_FOUND.to_string()),
            })
        }
    }
}
