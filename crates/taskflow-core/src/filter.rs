use std::fmt;
use std::str::FromStr;

use taskflow_shared::{
  Task,
  TaskStatus,
  UnknownStatus
};

/// Status predicate used by task views.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
)]
pub enum TaskFilter {
  #[default]
  All,
  Status(TaskStatus)
}

impl TaskFilter {
  pub fn matches(
    &self,
    task: &Task
  ) -> bool {
    match self {
      | TaskFilter::All => true,
      | TaskFilter::Status(status) => {
        task.status == *status
      }
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      | TaskFilter::All => "all",
      | TaskFilter::Status(status) => {
        status.label()
      }
    }
  }
}

impl From<TaskStatus> for TaskFilter {
  fn from(status: TaskStatus) -> Self {
    TaskFilter::Status(status)
  }
}

impl fmt::Display for TaskFilter {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    match self {
      | TaskFilter::All => {
        f.write_str("all")
      }
      | TaskFilter::Status(status) => {
        write!(f, "{status}")
      }
    }
  }
}

impl FromStr for TaskFilter {
  type Err = UnknownStatus;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    if s.trim().eq_ignore_ascii_case("all")
    {
      return Ok(TaskFilter::All);
    }
    s.parse::<TaskStatus>()
      .map(TaskFilter::Status)
  }
}
