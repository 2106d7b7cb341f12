//! Create/edit dialog for a single task.
//!
//! ```text
//! Closed -> Open(create) -- submit --------------------> Submitting
//! Closed -> Open(edit)   -- submit --> PendingConfirm -- confirm --> Submitting
//! Submitting -- finish(ok) --> Closed
//! Submitting -- finish(err) --> Open (with inline error)
//! Open | PendingConfirm -- cancel --> Closed
//! ```
//!
//! Edits need an explicit confirmation of the exact values about to be
//! written; creates do not. While a write is in flight the dialog refuses
//! further submissions.

use taskflow_shared::{Task, TaskInput, TaskStatus};
use thiserror::Error;
use tracing::debug;

use crate::error::ValidationError;
use crate::validate::validate_task_fields;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogMode {
    Create,
    Edit(Task),
}

/// A write the dialog has committed to; hand it to
/// [`TaskClient::commit`](crate::client::TaskClient::commit).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingWrite {
    Create(TaskInput),
    Update { id: String, input: TaskInput },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DialogPhase {
    #[default]
    Closed,
    Open {
        mode: DialogMode,
        error: Option<String>,
    },
    PendingConfirm {
        task: Task,
        changes: TaskInput,
    },
    Submitting {
        mode: DialogMode,
        write: PendingWrite,
    },
}

/// What the caller must do after a successful `submit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitStep {
    /// Show these values and ask the user to confirm.
    Confirm(TaskInput),
    /// Dispatch the write now.
    Dispatch(PendingWrite),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DialogError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("a save is already in progress")]
    Busy,

    #[error("the task dialog is not open")]
    NotOpen,

    #[error("there are no changes waiting for confirmation")]
    NothingToConfirm,
}

#[derive(Debug, Clone, Default)]
pub struct TaskDialog {
    phase: DialogPhase,
}

impl TaskDialog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &DialogPhase {
        &self.phase
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.phase, DialogPhase::Closed)
    }

    /// The submit control is disabled while a write is in flight.
    pub fn is_submit_enabled(&self) -> bool {
        matches!(
            self.phase,
            DialogPhase::Open { .. } | DialogPhase::PendingConfirm { .. }
        )
    }

    pub fn inline_error(&self) -> Option<&str> {
        match &self.phase {
            DialogPhase::Open { error, .. } => error.as_deref(),
            _ => None,
        }
    }

    /// Initial form values: empty with `pending` for a new task, the stored
    /// values when editing.
    pub fn initial_fields(&self) -> Option<(String, String, TaskStatus)> {
        let mode = match &self.phase {
            DialogPhase::Open { mode, .. } | DialogPhase::Submitting { mode, .. } => mode,
            DialogPhase::PendingConfirm { task, .. } => {
                return Some((task.title.clone(), task.description.clone(), task.status));
            }
            DialogPhase::Closed => return None,
        };
        Some(match mode {
            DialogMode::Create => (String::new(), String::new(), TaskStatus::Pending),
            DialogMode::Edit(task) => (task.title.clone(), task.description.clone(), task.status),
        })
    }

    pub fn open_create(&mut self) -> Result<(), DialogError> {
        self.open(DialogMode::Create)
    }

    pub fn open_edit(&mut self, task: Task) -> Result<(), DialogError> {
        self.open(DialogMode::Edit(task))
    }

    fn open(&mut self, mode: DialogMode) -> Result<(), DialogError> {
        if matches!(self.phase, DialogPhase::Submitting { .. }) {
            return Err(DialogError::Busy);
        }
        debug!(editing = matches!(mode, DialogMode::Edit(_)), "task dialog opened");
        self.phase = DialogPhase::Open { mode, error: None };
        Ok(())
    }

    /// Validates the form. A validation failure keeps the dialog open with
    /// the message as inline error.
    pub fn submit(
        &mut self,
        title: &str,
        description: &str,
        status: TaskStatus,
    ) -> Result<SubmitStep, DialogError> {
        let mode = match &self.phase {
            DialogPhase::Open { mode, .. } => mode.clone(),
            DialogPhase::Submitting { .. } => return Err(DialogError::Busy),
            DialogPhase::PendingConfirm { .. } | DialogPhase::Closed => {
                return Err(DialogError::NotOpen);
            }
        };

        let changes = match validate_task_fields(title, description, status) {
            Ok(changes) => changes,
            Err(err) => {
                self.phase = DialogPhase::Open {
                    mode,
                    error: Some(err.to_string()),
                };
                return Err(err.into());
            }
        };

        match mode {
            DialogMode::Create => {
                let write = PendingWrite::Create(changes);
                self.phase = DialogPhase::Submitting {
                    mode: DialogMode::Create,
                    write: write.clone(),
                };
                Ok(SubmitStep::Dispatch(write))
            }
            DialogMode::Edit(task) => {
                self.phase = DialogPhase::PendingConfirm {
                    task,
                    changes: changes.clone(),
                };
                Ok(SubmitStep::Confirm(changes))
            }
        }
    }

    /// Accepts the values shown by the confirmation step.
    pub fn confirm(&mut self) -> Result<PendingWrite, DialogError> {
        match std::mem::take(&mut self.phase) {
            DialogPhase::PendingConfirm { task, changes } => {
                let write = PendingWrite::Update {
                    id: task.id.clone(),
                    input: changes,
                };
                self.phase = DialogPhase::Submitting {
                    mode: DialogMode::Edit(task),
                    write: write.clone(),
                };
                Ok(write)
            }
            other => {
                let err = if matches!(other, DialogPhase::Submitting { .. }) {
                    DialogError::Busy
                } else {
                    DialogError::NothingToConfirm
                };
                self.phase = other;
                Err(err)
            }
        }
    }

    /// Records the outcome of the dispatched write.
    pub fn finish<T, E: std::fmt::Display>(&mut self, result: &Result<T, E>) {
        if !matches!(self.phase, DialogPhase::Submitting { .. }) {
            debug!("finish called without a write in flight");
            return;
        }
        let DialogPhase::Submitting { mode, .. } = std::mem::take(&mut self.phase) else {
            return;
        };
        self.phase = match result {
            Ok(_) => DialogPhase::Closed,
            Err(err) => DialogPhase::Open {
                mode,
                error: Some(err.to_string()),
            },
        };
    }

    /// Closes the dialog without writing. Returns `false` while a write is
    /// in flight, which cannot be cancelled.
    pub fn cancel(&mut self) -> bool {
        if matches!(self.phase, DialogPhase::Submitting { .. }) {
            return false;
        }
        self.phase = DialogPhase::Closed;
        true
    }
}
