//! Terminal view: reads the session and task state, turns each subcommand
//! into client calls, and reports the outcome.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use taskflow_shared::TaskStatus;
use tracing::{debug, info, instrument};

use crate::backend::{self, local::LocalBackend};
use crate::cli::Command;
use crate::client::TaskClient;
use crate::config::Config;
use crate::dialog::{DialogError, SubmitStep, TaskDialog};
use crate::error::ClientError;
use crate::render::Renderer;
use crate::server;
use crate::session::{FileSessionStorage, SessionState};
use crate::tasks::TaskState;

const NOT_SIGNED_IN: &str = "Not signed in. Run `taskflow login <username>` first.";

/// Everything a view needs for one invocation. Owned here and lent to the
/// client; nothing is global.
pub struct View {
    pub session: SessionState,
    pub tasks: TaskState,
    pub client: TaskClient,
    pub renderer: Renderer,
}

#[instrument(skip(cfg, data_dir))]
pub async fn dispatch(cfg: &Config, data_dir: &Path, command: Command) -> anyhow::Result<()> {
    if let Command::Serve { bind } = command {
        let bind = match bind {
            Some(bind) => bind,
            None => cfg.server_bind()?,
        };
        let backend = LocalBackend::from_config(cfg, data_dir)
            .context("failed to open the task store to serve")?;
        return server::serve(bind, Arc::new(backend)).await;
    }

    let backend = backend::from_config(cfg, data_dir)?;
    let mut view = View {
        session: SessionState::restore(Box::new(FileSessionStorage::new(data_dir))),
        tasks: TaskState::new(),
        client: TaskClient::new(backend),
        renderer: Renderer::new(cfg),
    };

    debug!(?command, "dispatching command");
    run_command(&mut view, command, &mut io::stdin().lock()).await
}

/// Runs one non-server command. Prompts (password, confirmations) are read
/// from `input`.
pub async fn run_command(
    view: &mut View,
    command: Command,
    input: &mut dyn BufRead,
) -> anyhow::Result<()> {
    match command {
        Command::Serve { .. } => {
            anyhow::bail!("serve is handled before a view is built")
        }
        Command::Login { username, password } => {
            let password = match password {
                Some(password) => password,
                None => prompt(input, "Password: ")?,
            };
            view.client
                .login(&mut view.session, &username, &password)
                .await?;
            view.renderer.notify_success("Welcome back!");
            Ok(())
        }
        Command::Logout => {
            view.client.logout(&mut view.session);
            view.renderer.notify_success("Logged out successfully");
            Ok(())
        }
        Command::Whoami => match view.session.user().cloned() {
            Some(user) => view.renderer.print_user(&user),
            None => Err(ClientError::Authentication(NOT_SIGNED_IN.to_string()).into()),
        },
        Command::List { status } => {
            require_session(&view.session)?;
            view.tasks.set_filter(status);
            load_tasks(view).await?;

            let filtered = view.tasks.filtered_tasks();
            if filtered.is_empty() {
                view.renderer.print_empty(view.tasks.filter())
            } else {
                view.renderer.print_task_table(&filtered)
            }
        }
        Command::Add {
            title,
            description,
            status,
        } => {
            require_session(&view.session)?;
            let mut dialog = TaskDialog::new();
            dialog.open_create().map_err(dialog_error)?;
            let step = dialog
                .submit(&title, &description, status)
                .map_err(dialog_error)?;
            let SubmitStep::Dispatch(write) = step else {
                anyhow::bail!("new tasks do not need confirmation");
            };

            let result = view.client.commit(&mut view.tasks, write).await;
            dialog.finish(&result);
            let task = result?;

            view.renderer.notify_success("Task created successfully");
            view.renderer.print_task_info(&task)
        }
        Command::Edit {
            id,
            title,
            description,
            status,
            yes,
        } => {
            require_session(&view.session)?;
            load_tasks(view).await?;
            let current = view
                .tasks
                .get(&id)
                .cloned()
                .ok_or_else(|| ClientError::NotFound("Task not found".to_string()))?;

            let mut dialog = TaskDialog::new();
            dialog.open_edit(current.clone()).map_err(dialog_error)?;
            let title = title.unwrap_or(current.title);
            let description = description.unwrap_or(current.description);
            let status: TaskStatus = status.unwrap_or(current.status);

            let step = dialog
                .submit(&title, &description, status)
                .map_err(dialog_error)?;
            if let SubmitStep::Confirm(changes) = &step {
                view.renderer.print_pending_changes(changes)?;
                if !yes && !confirm(input, "Confirm update? [y/N] ")? {
                    dialog.cancel();
                    info!(id = %id, "update cancelled by user");
                    view.renderer.notify_success("Update cancelled; nothing was changed");
                    return Ok(());
                }
            }

            let write = dialog.confirm().map_err(dialog_error)?;
            let result = view.client.commit(&mut view.tasks, write).await;
            dialog.finish(&result);
            let task = result?;

            view.renderer.notify_success("Task updated successfully");
            view.renderer.print_task_info(&task)
        }
        Command::Delete { id, yes } => {
            require_session(&view.session)?;
            load_tasks(view).await?;

            if !yes {
                view.renderer.print_delete_warning()?;
                if !confirm(input, "Delete task? [y/N] ")? {
                    info!(id = %id, "delete cancelled by user");
                    return Ok(());
                }
            }

            view.client.delete_task(&mut view.tasks, &id).await?;
            view.renderer.notify_success("Task deleted successfully");
            Ok(())
        }
    }
}

async fn load_tasks(view: &mut View) -> anyhow::Result<()> {
    view.renderer.print_loading();
    if let Err(err) = view.client.fetch_tasks(&mut view.tasks).await {
        if let Some(message) = view.tasks.error() {
            view.renderer.notify_error(message);
        }
        return Err(err.into());
    }
    Ok(())
}

fn require_session(session: &SessionState) -> Result<(), ClientError> {
    if session.is_authenticated() {
        Ok(())
    } else {
        Err(ClientError::Authentication(NOT_SIGNED_IN.to_string()))
    }
}

fn dialog_error(err: DialogError) -> anyhow::Error {
    match err {
        DialogError::Validation(err) => ClientError::from(err).into(),
        other => other.into(),
    }
}

fn prompt(input: &mut dyn BufRead, label: &str) -> anyhow::Result<String> {
    eprint!("{label}");
    io::stderr().flush()?;
    let mut line = String::new();
    input.read_line(&mut line).context("failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn confirm(input: &mut dyn BufRead, label: &str) -> anyhow::Result<bool> {
    let answer = prompt(input, label)?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use taskflow_shared::TaskStatus;
    use tempfile::tempdir;

    use super::*;
    use crate::datastore::DataStore;
    use crate::filter::TaskFilter;
    use crate::session::MemorySessionStorage;

    fn view_over(data_dir: &Path, storage: MemorySessionStorage) -> View {
        let backend = LocalBackend::open(data_dir).unwrap();
        View {
            session: SessionState::restore(Box::new(storage)),
            tasks: TaskState::new(),
            client: TaskClient::new(Arc::new(backend)),
            renderer: Renderer::new(&Config::defaults()),
        }
    }

    async fn signed_in(view: &mut View) {
        run_command(
            view,
            Command::Login {
                username: "test".to_string(),
                password: Some("test123".to_string()),
            },
            &mut Cursor::new(""),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn task_commands_require_a_session() {
        let temp = tempdir().unwrap();
        let mut view = view_over(temp.path(), MemorySessionStorage::new());

        let err = run_command(
            &mut view,
            Command::List {
                status: TaskFilter::All,
            },
            &mut Cursor::new(""),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ClientError>(),
            Some(ClientError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn password_prompt_reads_one_line() {
        let temp = tempdir().unwrap();
        let storage = MemorySessionStorage::new();
        let mut view = view_over(temp.path(), storage.clone());

        run_command(
            &mut view,
            Command::Login {
                username: "test".to_string(),
                password: None,
            },
            &mut Cursor::new("test123\n"),
        )
        .await
        .unwrap();
        assert!(view.session.is_authenticated());
        assert!(storage.snapshot().unwrap().state.is_authenticated);
    }

    #[tokio::test]
    async fn add_persists_and_lands_first() {
        let temp = tempdir().unwrap();
        let mut view = view_over(temp.path(), MemorySessionStorage::new());
        signed_in(&mut view).await;

        run_command(
            &mut view,
            Command::Add {
                title: "  Write tests ".to_string(),
                description: "cover the view".to_string(),
                status: TaskStatus::Pending,
            },
            &mut Cursor::new(""),
        )
        .await
        .unwrap();

        assert_eq!(view.tasks.tasks()[0].title, "Write tests");
        let stored = DataStore::open(temp.path()).unwrap().load_tasks().unwrap();
        assert!(stored.iter().any(|t| t.title == "Write tests"));
    }

    #[tokio::test]
    async fn declined_edit_changes_nothing() {
        let temp = tempdir().unwrap();
        let mut view = view_over(temp.path(), MemorySessionStorage::new());
        signed_in(&mut view).await;

        run_command(
            &mut view,
            Command::Edit {
                id: "2".to_string(),
                title: Some("Renamed".to_string()),
                description: None,
                status: None,
                yes: false,
            },
            &mut Cursor::new("n\n"),
        )
        .await
        .unwrap();

        let stored = DataStore::open(temp.path()).unwrap().load_tasks().unwrap();
        let task = stored.iter().find(|t| t.id == "2").unwrap();
        assert_eq!(task.title, "Review pull requests");
    }

    #[tokio::test]
    async fn confirmed_edit_keeps_unspecified_fields() {
        let temp = tempdir().unwrap();
        let mut view = view_over(temp.path(), MemorySessionStorage::new());
        signed_in(&mut view).await;

        run_command(
            &mut view,
            Command::Edit {
                id: "2".to_string(),
                title: None,
                description: None,
                status: Some(TaskStatus::Completed),
                yes: false,
            },
            &mut Cursor::new("y\n"),
        )
        .await
        .unwrap();

        let task = view.tasks.get("2").unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.title, "Review pull requests");
    }

    #[tokio::test]
    async fn deleting_an_unknown_id_is_not_found() {
        let temp = tempdir().unwrap();
        let mut view = view_over(temp.path(), MemorySessionStorage::new());
        signed_in(&mut view).await;

        let err = run_command(
            &mut view,
            Command::Delete {
                id: "missing".to_string(),
                yes: true,
            },
            &mut Cursor::new(""),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ClientError>(),
            Some(ClientError::NotFound(_))
        ));
        assert_eq!(view.tasks.tasks().len(), 2);
    }

    #[tokio::test]
    async fn declined_delete_keeps_the_task() {
        let temp = tempdir().unwrap();
        let mut view = view_over(temp.path(), MemorySessionStorage::new());
        signed_in(&mut view).await;

        run_command(
            &mut view,
            Command::Delete {
                id: "1".to_string(),
                yes: false,
            },
            &mut Cursor::new("n\n"),
        )
        .await
        .unwrap();

        let stored = DataStore::open(temp.path()).unwrap().load_tasks().unwrap();
        assert!(stored.iter().any(|t| t.id == "1"));
        assert!(view.tasks.get("1").is_some());
    }
}
