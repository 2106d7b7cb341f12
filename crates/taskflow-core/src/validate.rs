use taskflow_shared::{TaskInput, TaskStatus};

use crate::error::{DESCRIPTION_MAX_CHARS, TITLE_MAX_CHARS, ValidationError};

/// Trims and checks the fields of the task form. The returned input carries
/// the trimmed values and is what gets written to the backing store.
pub fn validate_task_fields(
    title: &str,
    description: &str,
    status: TaskStatus,
) -> Result<TaskInput, ValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }

    let description = description.trim();
    if description.is_empty() {
        return Err(ValidationError::EmptyDescription);
    }

    let title_len = title.chars().count();
    if title_len > TITLE_MAX_CHARS {
        return Err(ValidationError::TitleTooLong { len: title_len });
    }

    let description_len = description.chars().count();
    if description_len > DESCRIPTION_MAX_CHARS {
        return Err(ValidationError::DescriptionTooLong {
            len: description_len,
        });
    }

    Ok(TaskInput {
        title: title.to_string(),
        description: description.to_string(),
        status,
    })
}

pub fn validate_input(input: &TaskInput) -> Result<TaskInput, ValidationError> {
    validate_task_fields(&input.title, &input.description, input.status)
}

pub fn validate_credentials(username: &str, password: &str) -> Result<(), ValidationError> {
    if username.trim().is_empty() || password.trim().is_empty() {
        return Err(ValidationError::MissingCredentials);
    }
    Ok(())
}
