//! Error taxonomy shared by the state model, the backing stores and the
//! terminal view.

use thiserror::Error;

pub const TITLE_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 500;

/// Exit codes for the `taskflow` binary.
pub mod exit_codes {
    pub const FAILURE: i32 = 1;
    pub const USER_ERROR: i32 = 2;
}

/// Local form validation. Raised before any backing-store call is made.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter a task title")]
    EmptyTitle,

    #[error("Please enter a task description")]
    EmptyDescription,

    #[error("Task title is too long ({len} characters, at most {max})", max = TITLE_MAX_CHARS)]
    TitleTooLong { len: usize },

    #[error("Task description is too long ({len} characters, at most {max})", max = DESCRIPTION_MAX_CHARS)]
    DescriptionTooLong { len: usize },

    #[error("Please enter both username and password")]
    MissingCredentials,
}

/// What a backing store reports back for a failed operation.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("invalid credentials")]
    InvalidCredentials { message: Option<String> },

    #[error("not found")]
    NotFound { message: Option<String> },

    #[error("unexpected status {status}")]
    Unexpected {
        status: u16,
        message: Option<String>,
    },

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        BackendError::Transport(err.to_string())
    }
}

/// Errors as the view layer sees them. `Display` is the user-facing text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    NotFound(String),

    #[error("An error occurred. Please try again.")]
    Transport { detail: String },
}

impl ClientError {
    pub fn from_backend(err: BackendError) -> Self {
        match err {
            BackendError::InvalidCredentials { message } => ClientError::Authentication(
                message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| "Login failed".to_string()),
            ),
            BackendError::NotFound { message } => ClientError::NotFound(
                message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| "Task not found".to_string()),
            ),
            BackendError::Unexpected { status, message } => ClientError::Transport {
                detail: match message {
                    Some(message) => format!("status {status}: {message}"),
                    None => format!("status {status}"),
                },
            },
            BackendError::Transport(detail) => ClientError::Transport { detail },
            BackendError::Storage(err) => ClientError::Transport {
                detail: format!("{err:#}"),
            },
        }
    }

    /// Whether the failure was caused by the user's input rather than the
    /// system.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, ClientError::Transport { .. })
    }
}

impl From<BackendError> for ClientError {
    fn from(err: BackendError) -> Self {
        ClientError::from_backend(err)
    }
}
