use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use taskflow_core::backend::local::LocalBackend;
use taskflow_core::backend::remote::RemoteBackend;
use taskflow_core::client::TaskClient;
use taskflow_core::error::ClientError;
use taskflow_core::filter::TaskFilter;
use taskflow_core::server::build_router;
use taskflow_core::session::{MemorySessionStorage, SessionState};
use taskflow_core::tasks::TaskState;
use taskflow_shared::{TaskInput, TaskStatus};
use tempfile::tempdir;
use tokio::net::TcpListener;

async fn spawn_service(data_dir: &Path) -> String {
    let backend = LocalBackend::open(data_dir).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(Arc::new(backend)))
            .await
            .unwrap();
    });
    format!("http://{addr}/api")
}

fn remote_client(base_url: &str) -> TaskClient {
    let backend = RemoteBackend::new(base_url, Duration::from_secs(5)).unwrap();
    TaskClient::new(Arc::new(backend))
}

#[tokio::test]
async fn login_over_http_persists_the_session() {
    let temp = tempdir().unwrap();
    let client = remote_client(&spawn_service(temp.path()).await);
    let storage = MemorySessionStorage::new();
    let mut session = SessionState::restore(Box::new(storage.clone()));

    let user = client
        .login(&mut session, "test", "test123")
        .await
        .unwrap();
    assert_eq!(user.username, "test");
    assert!(session.token().unwrap().starts_with("fake-jwt-token-"));

    let restored = SessionState::restore(Box::new(storage));
    assert!(restored.is_authenticated());
    assert_eq!(restored.user().unwrap().username, "test");
}

#[tokio::test]
async fn wrong_password_leaves_session_signed_out() {
    let temp = tempdir().unwrap();
    let client = remote_client(&spawn_service(temp.path()).await);
    let mut session = SessionState::restore(Box::new(MemorySessionStorage::new()));

    let err = client
        .login(&mut session, "test", "wrong")
        .await
        .unwrap_err();
    assert_eq!(err, ClientError::Authentication("Invalid credentials".to_string()));
    assert!(!session.is_authenticated());
    assert!(session.token().is_none());
}

#[tokio::test]
async fn created_task_comes_back_on_the_next_fetch() {
    let temp = tempdir().unwrap();
    let base_url = spawn_service(temp.path()).await;
    let client = remote_client(&base_url);
    let mut tasks = TaskState::new();

    let created = client
        .create_task(
            &mut tasks,
            TaskInput {
                title: "Plan sprint".to_string(),
                description: "Pick the next stories".to_string(),
                status: TaskStatus::InProgress,
            },
        )
        .await
        .unwrap();
    assert_eq!(tasks.tasks()[0].id, created.id);

    let mut fresh = TaskState::new();
    let count = remote_client(&base_url)
        .fetch_tasks(&mut fresh)
        .await
        .unwrap();
    assert_eq!(count, 3);
    assert_eq!(fresh.get(&created.id), Some(&created));

    fresh.set_filter(TaskFilter::Status(TaskStatus::InProgress));
    let in_progress: Vec<_> = fresh
        .filtered_tasks()
        .into_iter()
        .map(|task| task.id.clone())
        .collect();
    assert_eq!(in_progress.len(), 2);
    assert!(in_progress.contains(&created.id));
}

#[tokio::test]
async fn missing_task_delete_leaves_local_state_alone() {
    let temp = tempdir().unwrap();
    let client = remote_client(&spawn_service(temp.path()).await);
    let mut tasks = TaskState::new();
    client.fetch_tasks(&mut tasks).await.unwrap();
    let before = tasks.tasks().to_vec();

    let err = client
        .delete_task(&mut tasks, "does-not-exist")
        .await
        .unwrap_err();
    assert_eq!(err, ClientError::NotFound("Task not found".to_string()));
    assert_eq!(tasks.tasks(), before.as_slice());
}

#[tokio::test]
async fn edit_round_trip_refreshes_updated_at() {
    let temp = tempdir().unwrap();
    let client = remote_client(&spawn_service(temp.path()).await);
    let mut tasks = TaskState::new();
    client.fetch_tasks(&mut tasks).await.unwrap();
    let original = tasks.get("2").unwrap().clone();

    let updated = client
        .update_task(
            &mut tasks,
            "2",
            TaskInput {
                title: original.title.clone(),
                description: original.description.clone(),
                status: TaskStatus::Completed,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.status, TaskStatus::Completed);
    assert_eq!(updated.created_at, original.created_at);
    assert!(updated.updated_at >= original.updated_at);
    assert_eq!(tasks.get("2"), Some(&updated));
}

#[tokio::test]
async fn unreachable_service_reports_load_failure() {
    let client = remote_client("http://127.0.0.1:9/api");
    let mut tasks = TaskState::new();

    let err = client.fetch_tasks(&mut tasks).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport { .. }));
    assert_eq!(err.to_string(), "An error occurred. Please try again.");
    assert_eq!(tasks.error(), Some("Failed to load tasks"));
    assert!(!tasks.is_loading());
    assert!(tasks.tasks().is_empty());
}
