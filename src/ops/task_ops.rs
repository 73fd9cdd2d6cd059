use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::model::board::TaskBoard;
use crate::model::task::{Task, TaskDraft, TaskGroup};

/// Error type for task operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("{0}")]
    Validation(String),
    #[error("task not found: {0}")]
    NotFound(u64),
}

/// The task board plus the operations that mutate it
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskStore {
    board: TaskBoard,
}

impl TaskStore {
    pub fn new(board: TaskBoard) -> Self {
        TaskStore { board }
    }

    pub fn board(&self) -> &TaskBoard {
        &self.board
    }

    pub fn get(&self, id: u64) -> Option<(TaskGroup, &Task)> {
        self.board.find(id)
    }

    pub fn len(&self) -> usize {
        self.board.len()
    }

    pub fn is_empty(&self) -> bool {
        self.board.is_empty()
    }

    // -----------------------------------------------------------------------
    // CRUD
    // -----------------------------------------------------------------------

    /// Create a task at the top of `todo`. IDs are one past the highest ID
    /// on the whole board.
    pub fn create(&mut self, draft: TaskDraft) -> Result<u64, TaskError> {
        validate(&draft)?;
        let id = self.board.max_id() + 1;
        self.board.todo.insert(0, Task::from_draft(id, draft));
        Ok(id)
    }

    /// Edit a task in place, wherever it is. The task stays in its group.
    /// Returns `false` if no task has this ID.
    pub fn update(&mut self, id: u64, draft: TaskDraft) -> Result<bool, TaskError> {
        validate(&draft)?;
        match self.board.find_mut(id) {
            Some(task) => {
                task.apply_draft(draft);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Mutable access for in-place changes such as progress updates
    pub fn get_mut(&mut self, id: u64) -> Option<&mut Task> {
        self.board.find_mut(id)
    }

    /// Remove every task whose ID is in `ids`, from all groups at once.
    /// Returns the removed tasks; IDs not on the board are ignored.
    pub fn bulk_delete(&mut self, ids: &BTreeSet<u64>) -> Vec<Task> {
        let mut removed = Vec::new();
        for group in TaskGroup::ALL {
            let tasks = self.board.group_mut(group);
            let (gone, kept): (Vec<Task>, Vec<Task>) =
                std::mem::take(tasks).into_iter().partition(|t| ids.contains(&t.id));
            *tasks = kept;
            removed.extend(gone);
        }
        removed
    }

    /// Move a task to the top of another group
    pub fn relocate(&mut self, id: u64, to: TaskGroup) -> Result<(), TaskError> {
        let (from, _) = self.board.find(id).ok_or(TaskError::NotFound(id))?;
        if from == to {
            return Ok(());
        }
        let source = self.board.group_mut(from);
        let idx = source
            .iter()
            .position(|t| t.id == id)
            .ok_or(TaskError::NotFound(id))?;
        let task = source.remove(idx);
        self.board.group_mut(to).insert(0, task);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// Pick the task a progress update is about: among the user's tasks, the
    /// one titled `task_name` if a name is given, otherwise the newest.
    pub fn resolve_target(&self, user: &str, task_name: Option<&str>) -> Option<u64> {
        let mut candidates = self
            .board
            .iter()
            .map(|(_, t)| t)
            .filter(|t| t.user_name == user);
        match task_name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => candidates.find(|t| t.title == name).map(|t| t.id),
            None => candidates.map(|t| t.id).max(),
        }
    }
}

fn validate(draft: &TaskDraft) -> Result<(), TaskError> {
    if draft.title.trim().is_empty() {
        return Err(TaskError::Validation("task title is required".into()));
    }
    if let (Some(start), Some(end)) = (draft.assign_date, draft.expiry_date)
        && end < start
    {
        return Err(TaskError::Validation(format!(
            "expiry date {} is before assign date {}",
            end, start
        )));
    }
    Ok(())
}

/// Days-remaining text for a task's detail view
pub fn due_label(expiry: NaiveDate, today: NaiveDate) -> String {
    let days = (expiry - today).num_days();
    let plural = |n: i64| if n.abs() > 1 { "s" } else { "" };
    match days {
        0 => "Due today".to_string(),
        d if d > 0 => format!("{} day{} left", d, plural(d)),
        d => format!("Overdue by {} day{}", d.abs(), plural(d)),
    }
}
