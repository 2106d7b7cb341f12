//! Turns user intents into backing-store calls and applies the results to
//! the session and task state.
//!
//! State is only touched after a fully successful response. Validation runs
//! before dispatch, so a rejected form never reaches the backing store.

use std::sync::Arc;

use taskflow_shared::{LoginRequest, Task, TaskInput, TaskPatch, User};
use tracing::{error, info, instrument, warn};

use crate::backend::TaskBackend;
use crate::dialog::PendingWrite;
use crate::error::ClientError;
use crate::session::SessionState;
use crate::tasks::TaskState;
use crate::validate::{validate_credentials, validate_input};

pub const LOAD_FAILED: &str = "Failed to load tasks";

#[derive(Clone)]
pub struct TaskClient {
    backend: Arc<dyn TaskBackend>,
}

impl TaskClient {
    pub fn new(backend: Arc<dyn TaskBackend>) -> Self {
        Self { backend }
    }

    /// Authenticates and opens the session. On failure the session is left
    /// exactly as it was.
    #[instrument(skip(self, session, password))]
    pub async fn login(
        &self,
        session: &mut SessionState,
        username: &str,
        password: &str,
    ) -> Result<User, ClientError> {
        validate_credentials(username, password)?;

        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let auth = self.backend.login(&request).await.map_err(|err| {
            let err = ClientError::from(err);
            log_failure("login", &err);
            err
        })?;

        let user = auth.user.clone();
        session.login(auth.token, auth.user);
        info!(user = %user.username, "login succeeded");
        Ok(user)
    }

    pub fn logout(&self, session: &mut SessionState) {
        session.logout();
    }

    /// Replaces the collection with the backing store's list. The loading
    /// flag is raised before the call and lowered once the result has been
    /// applied, whichever way it went.
    #[instrument(skip(self, tasks))]
    pub async fn fetch_tasks(&self, tasks: &mut TaskState) -> Result<usize, ClientError> {
        tasks.set_loading(true);
        let result = match self.backend.list_tasks().await {
            Ok(list) => {
                let count = list.len();
                tasks.set_tasks(list);
                tasks.set_error(None);
                info!(count, "tasks fetched");
                Ok(count)
            }
            Err(err) => {
                let err = ClientError::from(err);
                log_failure("fetch_tasks", &err);
                tasks.set_error(Some(LOAD_FAILED.to_string()));
                Err(err)
            }
        };
        tasks.set_loading(false);
        result
    }

    #[instrument(skip(self, tasks, input))]
    pub async fn create_task(
        &self,
        tasks: &mut TaskState,
        input: TaskInput,
    ) -> Result<Task, ClientError> {
        let input = validate_input(&input)?;

        let created = self.backend.create_task(&input).await.map_err(|err| {
            let err = ClientError::from(err);
            log_failure("create_task", &err);
            err
        })?;

        tasks.add_task(created.clone());
        info!(id = %created.id, "task created");
        Ok(created)
    }

    #[instrument(skip(self, tasks, input))]
    pub async fn update_task(
        &self,
        tasks: &mut TaskState,
        id: &str,
        input: TaskInput,
    ) -> Result<Task, ClientError> {
        let input = validate_input(&input)?;

        let updated = self
            .backend
            .update_task(id, &TaskPatch::from(input))
            .await
            .map_err(|err| {
                let err = ClientError::from(err);
                log_failure("update_task", &err);
                err
            })?;

        if !tasks.update_task(updated.clone()) {
            warn!(id = %updated.id, "updated task was not in the local collection");
        }
        info!(id = %updated.id, "task updated");
        Ok(updated)
    }

    #[instrument(skip(self, tasks))]
    pub async fn delete_task(&self, tasks: &mut TaskState, id: &str) -> Result<(), ClientError> {
        self.backend.delete_task(id).await.map_err(|err| {
            let err = ClientError::from(err);
            log_failure("delete_task", &err);
            err
        })?;

        tasks.delete_task(id);
        info!(id, "task deleted");
        Ok(())
    }

    /// Runs the write produced by a task dialog.
    pub async fn commit(
        &self,
        tasks: &mut TaskState,
        write: PendingWrite,
    ) -> Result<Task, ClientError> {
        match write {
            PendingWrite::Create(input) => self.create_task(tasks, input).await,
            PendingWrite::Update { id, input } => self.update_task(tasks, &id, input).await,
        }
    }
}

fn log_failure(operation: &str, err: &ClientError) {
    match err {
        ClientError::Transport { detail } => {
            error!(operation, detail = %detail, "backing store call failed")
        }
        other => warn!(operation, error = %other, "backing store rejected the request"),
    }
}
