//! In-memory task collection consumed by views.
//!
//! The collection is rebuilt from the backing store on every application
//! load and is never persisted on its own. All mutations go through
//! [`TaskState::apply`] so a view can record or replay them.

use std::collections::HashSet;

use taskflow_shared::Task;
use tracing::{debug, warn};

use crate::filter::TaskFilter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskAction {
    SetTasks(Vec<Task>),
    AddTask(Task),
    UpdateTask(Task),
    DeleteTask(String),
    SetFilter(TaskFilter),
    SetLoading(bool),
    SetError(Option<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskState {
    tasks: Vec<Task>,
    filter: TaskFilter,
    is_loading: bool,
    error: Option<String>,
    journal: Option<Vec<TaskAction>>,
}

impl TaskState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one action. Returns `false` when the action targeted an id
    /// that is not in the collection (update/delete), `true` otherwise.
    pub fn apply(&mut self, action: TaskAction) -> bool {
        if let Some(journal) = &mut self.journal {
            journal.push(action.clone());
        }
        match action {
            TaskAction::SetTasks(tasks) => {
                self.tasks = dedupe_by_id(tasks);
                debug!(count = self.tasks.len(), "task collection replaced");
                true
            }
            TaskAction::AddTask(task) => {
                let before = self.tasks.len();
                self.tasks.retain(|t| t.id != task.id);
                if self.tasks.len() != before {
                    warn!(id = %task.id, "added task replaced an entry with the same id");
                }
                debug!(id = %task.id, "task prepended");
                self.tasks.insert(0, task);
                true
            }
            TaskAction::UpdateTask(task) => {
                match self.tasks.iter_mut().find(|t| t.id == task.id) {
                    Some(slot) => {
                        debug!(id = %task.id, "task replaced");
                        *slot = task;
                        true
                    }
                    None => {
                        warn!(id = %task.id, "update for a task that is not in the collection");
                        false
                    }
                }
            }
            TaskAction::DeleteTask(id) => {
                let before = self.tasks.len();
                self.tasks.retain(|t| t.id != id);
                let removed = self.tasks.len() != before;
                debug!(id = %id, removed, "task delete applied");
                removed
            }
            TaskAction::SetFilter(filter) => {
                self.filter = filter;
                true
            }
            TaskAction::SetLoading(is_loading) => {
                self.is_loading = is_loading;
                true
            }
            TaskAction::SetError(error) => {
                self.error = error;
                true
            }
        }
    }

    /// Starts keeping a copy of every applied action.
    pub fn record_actions(&mut self) {
        self.journal.get_or_insert_with(Vec::new);
    }

    /// Actions applied since recording started or since the last call.
    pub fn take_recorded(&mut self) -> Vec<TaskAction> {
        self.journal.as_mut().map(std::mem::take).unwrap_or_default()
    }

    pub fn set_tasks(&mut self, tasks: Vec<Task>) {
        self.apply(TaskAction::SetTasks(tasks));
    }

    pub fn add_task(&mut self, task: Task) {
        self.apply(TaskAction::AddTask(task));
    }

    pub fn update_task(&mut self, task: Task) -> bool {
        self.apply(TaskAction::UpdateTask(task))
    }

    pub fn delete_task(&mut self, id: &str) -> bool {
        self.apply(TaskAction::DeleteTask(id.to_string()))
    }

    pub fn set_filter(&mut self, filter: TaskFilter) {
        self.apply(TaskAction::SetFilter(filter));
    }

    pub fn set_loading(&mut self, is_loading: bool) {
        self.apply(TaskAction::SetLoading(is_loading));
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.apply(TaskAction::SetError(error));
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn filter(&self) -> TaskFilter {
        self.filter
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The collection restricted to the active filter, in collection order.
    pub fn filtered_tasks(&self) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|task| self.filter.matches(task))
            .collect()
    }
}

fn dedupe_by_id(tasks: Vec<Task>) -> Vec<Task> {
    let mut seen = HashSet::with_capacity(tasks.len());
    let mut out = Vec::with_capacity(tasks.len());
    for task in tasks {
        if seen.insert(task.id.clone()) {
            out.push(task);
        } else {
            warn!(id = %task.id, "dropping duplicate task id from fetched list");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use taskflow_shared::{Task, TaskStatus};

    use super::*;

    fn task(id: &str, status: TaskStatus) -> Task {
        Task {
            id: id.to_string(),
            title: format!("title {id}"),
            description: format!("description {id}"),
            status,
            created_at: "2026-10-19T08:00:00.000Z".to_string(),
            updated_at: "2026-10-19T08:00:00.000Z".to_string(),
        }
    }

    fn ids(state: &TaskState) -> Vec<&str> {
        state.tasks().iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn journal_keeps_actions_only_while_recording() {
        let mut state = TaskState::new();
        state.set_loading(true);
        assert!(state.take_recorded().is_empty());

        state.record_actions();
        state.delete_task("missing");
        state.set_filter(TaskFilter::Status(TaskStatus::Pending));
        assert_eq!(
            state.take_recorded(),
            vec![
                TaskAction::DeleteTask("missing".to_string()),
                TaskAction::SetFilter(TaskFilter::Status(TaskStatus::Pending)),
            ]
        );
    }

    #[test]
    fn add_prepends_newest_first() {
        let mut state = TaskState::new();
        state.set_tasks(vec![task("1", TaskStatus::Pending), task("2", TaskStatus::Pending)]);
        state.add_task(task("3", TaskStatus::Completed));
        assert_eq!(ids(&state), vec!["3", "1", "2"]);
    }

    #[test]
    fn add_with_existing_id_keeps_ids_unique() {
        let mut state = TaskState::new();
        state.add_task(task("1", TaskStatus::Pending));
        state.add_task(task("2", TaskStatus::Pending));
        state.add_task(task("1", TaskStatus::Completed));
        assert_eq!(ids(&state), vec!["1", "2"]);
        assert_eq!(state.get("1").unwrap().status, TaskStatus::Completed);
    }

    #[test]
    fn update_replaces_only_the_matching_entry() {
        let mut state = TaskState::new();
        state.set_tasks(vec![
            task("a", TaskStatus::Pending),
            task("b", TaskStatus::Pending),
            task("c", TaskStatus::Pending),
        ]);
        let before = state.tasks().to_vec();

        let mut changed = task("b", TaskStatus::InProgress);
        changed.title = "renamed".to_string();
        assert!(state.update_task(changed.clone()));

        assert_eq!(ids(&state), vec!["a", "b", "c"]);
        assert_eq!(state.tasks()[0], before[0]);
        assert_eq!(state.tasks()[1], changed);
        assert_eq!(state.tasks()[2], before[2]);
    }

    #[test]
    fn update_of_unknown_id_leaves_collection_untouched() {
        let mut state = TaskState::new();
        state.set_tasks(vec![task("a", TaskStatus::Pending)]);
        let before = state.clone();
        assert!(!state.update_task(task("zzz", TaskStatus::Completed)));
        assert_eq!(state, before);
    }

    #[test]
    fn delete_is_a_noop_for_absent_ids() {
        let mut state = TaskState::new();
        state.set_tasks(vec![task("a", TaskStatus::Pending), task("b", TaskStatus::Pending)]);
        assert!(!state.delete_task("missing"));
        assert_eq!(ids(&state), vec!["a", "b"]);
        assert!(state.delete_task("a"));
        assert_eq!(ids(&state), vec!["b"]);
    }

    #[test]
    fn mixed_sequence_keeps_one_entry_per_live_id() {
        let mut state = TaskState::new();
        let mut live: Vec<String> = Vec::new();
        let statuses = TaskStatus::ALL;

        for round in 0..40u32 {
            let id = format!("{}", round % 7);
            match round % 4 {
                0 | 1 => {
                    state.add_task(task(&id, statuses[(round % 3) as usize]));
                    live.retain(|x| x != &id);
                    live.push(id);
                }
                2 => {
                    state.update_task(task(&id, TaskStatus::Completed));
                }
                _ => {
                    state.delete_task(&id);
                    live.retain(|x| x != &id);
                }
            }

            let mut got: Vec<String> = state.tasks().iter().map(|t| t.id.clone()).collect();
            let unique: HashSet<String> = got.iter().cloned().collect();
            assert_eq!(unique.len(), got.len(), "duplicate id after round {round}");
            got.sort();
            let mut want = live.clone();
            want.sort();
            assert_eq!(got, want, "live ids diverged after round {round}");
        }
    }

    #[test]
    fn filtered_tasks_is_a_pure_projection() {
        let mut state = TaskState::new();
        state.set_tasks(vec![
            task("1", TaskStatus::Pending),
            task("2", TaskStatus::InProgress),
            task("3", TaskStatus::Pending),
            task("4", TaskStatus::Completed),
        ]);

        assert_eq!(state.filtered_tasks().len(), 4);

        state.set_filter(TaskFilter::Status(TaskStatus::Pending));
        let once: Vec<String> = state.filtered_tasks().iter().map(|t| t.id.clone()).collect();
        state.set_filter(TaskFilter::Status(TaskStatus::Pending));
        let twice: Vec<String> = state.filtered_tasks().iter().map(|t| t.id.clone()).collect();
        assert_eq!(once, vec!["1", "3"]);
        assert_eq!(once, twice);
        assert_eq!(state.tasks().len(), 4);

        state.set_filter(TaskFilter::All);
        assert_eq!(state.filtered_tasks().len(), 4);
    }

    #[test]
    fn set_tasks_drops_duplicate_ids() {
        let mut state = TaskState::new();
        state.set_tasks(vec![
            task("1", TaskStatus::Pending),
            task("1", TaskStatus::Completed),
            task("2", TaskStatus::Pending),
        ]);
        assert_eq!(ids(&state), vec!["1", "2"]);
        assert_eq!(state.get("1").unwrap().status, TaskStatus::Pending);
    }

    #[test]
    fn flags_do_not_touch_the_collection() {
        let mut state = TaskState::new();
        state.set_tasks(vec![task("1", TaskStatus::Pending)]);
        state.set_loading(true);
        state.set_error(Some("Failed to load tasks".to_string()));
        assert!(state.is_loading());
        assert_eq!(state.error(), Some("Failed to load tasks"));
        assert_eq!(ids(&state), vec!["1"]);
        state.set_error(None);
        assert_eq!(state.error(), None);
    }
}
