use std::fmt;
use std::str::FromStr;

use serde::{
  Deserialize,
  Serialize
};

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Hash,
  Default,
)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
  #[default]
  Pending,
  InProgress,
  Completed
}

impl TaskStatus {
  pub const ALL: [TaskStatus; 3] = [
    TaskStatus::Pending,
    TaskStatus::InProgress,
    TaskStatus::Completed
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      | TaskStatus::Pending => "pending",
      | TaskStatus::InProgress => {
        "in-progress"
      }
      | TaskStatus::Completed => {
        "completed"
      }
    }
  }

  /// Display label, e.g. `in progress`.
  pub fn label(self) -> &'static str {
    match self {
      | TaskStatus::Pending => "pending",
      | TaskStatus::InProgress => {
        "in progress"
      }
      | TaskStatus::Completed => {
        "completed"
      }
    }
  }
}

impl fmt::Display for TaskStatus {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(
  Debug, Clone, PartialEq, Eq,
)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(
      f,
      "unknown task status `{}` \
       (expected pending, \
       in-progress or completed)",
      self.0
    )
  }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for TaskStatus {
  type Err = UnknownStatus;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "pending" => Ok(Self::Pending),
      | "in-progress"
      | "in_progress"
      | "inprogress" => {
        Ok(Self::InProgress)
      }
      | "completed" | "done" => {
        Ok(Self::Completed)
      }
      | _ => Err(UnknownStatus(
        s.to_string()
      ))
    }
  }
}

/// A user-owned unit of work as stored
/// by the backing store.
///
/// Timestamps are ISO-8601 strings with
/// millisecond precision, so they sort
/// lexicographically.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct Task {
  pub id:          String,
  pub title:       String,
  pub description: String,
  pub status:      TaskStatus,
  pub created_at:  String,
  pub updated_at:  String
}

/// Body of `POST /tasks`.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct TaskInput {
  pub title:       String,
  pub description: String,
  #[serde(default)]
  pub status:      TaskStatus
}

/// Body of `PUT /tasks/{id}`; absent
/// fields keep their stored value.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  Default,
  PartialEq,
  Eq,
)]
pub struct TaskPatch {
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub title:       Option<String>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub description: Option<String>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub status:      Option<TaskStatus>
}

impl From<TaskInput> for TaskPatch {
  fn from(input: TaskInput) -> Self {
    Self {
      title:       Some(input.title),
      description: Some(
        input.description
      ),
      status:      Some(input.status)
    }
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct User {
  pub id:       String,
  pub username: String
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct LoginRequest {
  pub username: String,
  pub password: String
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct AuthResponse {
  pub token: String,
  pub user:  User
}

/// Error body returned with non-2xx
/// statuses.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct ErrorBody {
  #[serde(default)]
  pub error: Option<String>
}

impl ErrorBody {
  pub fn new(
    message: impl Into<String>
  ) -> Self {
    Self {
      error: Some(message.into())
    }
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct DeleteResponse {
  pub success: bool
}
