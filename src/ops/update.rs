//! Progress updates: append a note to a task's log and move its
//! completion percentage, either by a manual value or by a guess from the
//! note's wording.

use chrono::Utc;

use crate::model::task::{Task, UpdateEntry};
use crate::ops::task_ops::TaskStore;

/// Words that mean the work is essentially finished
const COMPLETION_KEYWORDS: [&str; 6] = ["completed", "done", "finished", "ready", "resolved", "fixed"];

/// Words that mean the work is underway
const PROGRESS_KEYWORDS: [&str; 5] = ["working", "progress", "developing", "implementing", "testing"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpdateError {
    #[error("an update needs some text")]
    EmptyText,
    #[error("no task to update: {0}")]
    NoTarget(String),
}

/// Result of applying an update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub task_id: u64,
    pub previous: u8,
    pub completion: u8,
    /// The percentage was set manually rather than estimated
    pub manual: bool,
}

/// A progress update as submitted for a user's task
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdateRequest {
    pub user: String,
    pub task_name: Option<String>,
    pub text: String,
    pub manual_completion: Option<i64>,
}

/// Estimate how many percentage points an update note is worth.
///
/// Keyword checks run before length checks; a completion keyword wins over
/// everything else. Matching is substring-based and case-insensitive.
/// Length is counted in UTF-16 code units, so characters outside the Basic
/// Multilingual Plane count twice.
pub fn classify_update(text: &str) -> u8 {
    if text.trim().is_empty() {
        return 0;
    }
    let lower = text.to_lowercase();
    let len = text.encode_utf16().count();
    if COMPLETION_KEYWORDS.iter().any(|k| lower.contains(k)) {
        90
    } else if PROGRESS_KEYWORDS.iter().any(|k| lower.contains(k)) {
        50
    } else if len > 100 {
        30
    } else if len > 50 {
        20
    } else {
        10
    }
}

/// Append `text` to the task's log and set its new completion.
///
/// A manual value replaces the current percentage (clamped to 0-100);
/// otherwise the estimate from [`classify_update`] is added to it.
pub fn apply_update(
    task: &mut Task,
    text: &str,
    manual_completion: Option<i64>,
) -> Result<UpdateOutcome, UpdateError> {
    if text.trim().is_empty() {
        return Err(UpdateError::EmptyText);
    }
    let previous = task.completion;
    let completion = match manual_completion {
        Some(value) => value.clamp(0, 100) as u8,
        None => (u16::from(previous) + u16::from(classify_update(text))).min(100) as u8,
    };
    task.completion = completion;
    task.updates.push(UpdateEntry {
        text: text.to_string(),
        timestamp: Some(Utc::now()),
    });
    Ok(UpdateOutcome {
        task_id: task.id,
        previous,
        completion,
        manual: manual_completion.is_some(),
    })
}

/// Resolve the user's task on the board and apply the update to it
pub fn submit_update(store: &mut TaskStore, request: &UpdateRequest) -> Result<UpdateOutcome, UpdateError> {
    if request.text.trim().is_empty() {
        return Err(UpdateError::EmptyText);
    }
    let user = request.user.trim();
    if user.is_empty() {
        return Err(UpdateError::NoTarget("no user selected".into()));
    }
    let id = store
        .resolve_target(user, request.task_name.as_deref())
        .ok_or_else(|| match request.task_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => {
                UpdateError::NoTarget(format!("{} has no task named {:?}", user, name))
            }
            _ => UpdateError::NoTarget(format!("no task assigned to {}", user)),
        })?;
    let task = store
        .get_mut(id)
        .ok_or_else(|| UpdateError::NoTarget(format!("task {} disappeared", id)))?;
    apply_update(task, &request.text, request.manual_completion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::board::TaskBoard;
    use crate::model::task::TaskDraft;

    fn task_at(completion: u8) -> Task {
        Task {
            id: 1,
            title: "Customer Database Migration".into(),
            user_name: "Priya Sharma".into(),
            completion,
            ..Default::default()
        }
    }

    #[test]
    fn classify_keyword_precedence() {
        assert_eq!(classify_update("completed the migration"), 90);
        assert_eq!(classify_update("Still TESTING the importer"), 50);
        // Completion beats progress when both appear
        assert_eq!(classify_update("testing done"), 90);
        // Substring match: "already" contains "ready"
        assert_eq!(classify_update("already talked to them"), 90);
    }

    #[test]
    fn classify_length_buckets() {
        assert_eq!(classify_update(""), 0);
        assert_eq!(classify_update("   \n"), 0);
        assert_eq!(classify_update("note"), 10);
        assert_eq!(classify_update(&"x".repeat(50)), 10);
        assert_eq!(classify_update(&"x".repeat(51)), 20);
        assert_eq!(classify_update(&"x".repeat(100)), 20);
        assert_eq!(classify_update(&"x".repeat(120)), 30);
    }

    #[test]
    fn length_counts_utf16_units() {
        // 30 emoji are 60 code units
        assert_eq!(classify_update(&"😀".repeat(30)), 20);
        assert_eq!(classify_update(&"😀".repeat(51)), 30);
        // Accented Latin letters are one unit each
        assert_eq!(classify_update(&"é".repeat(50)), 10);
        assert_eq!(classify_update(&"é".repeat(51)), 20);
    }

    #[test]
    fn estimate_accumulates_and_clamps() {
        let mut task = task_at(70);
        let outcome = apply_update(&mut task, "still testing", None).unwrap();
        assert_eq!(outcome.previous, 70);
        assert_eq!(outcome.completion, 100);
        assert!(!outcome.manual);
        assert_eq!(task.completion, 100);
        assert_eq!(task.updates.len(), 1);
        assert_eq!(task.updates[0].text, "still testing");
        assert!(task.updates[0].timestamp.is_some());
    }

    #[test]
    fn manual_value_replaces() {
        let mut task = task_at(70);
        let outcome = apply_update(&mut task, "note", Some(40)).unwrap();
        assert_eq!(outcome.completion, 40);
        assert!(outcome.manual);
        assert_eq!(task.updates.len(), 1);

        apply_update(&mut task, "note", Some(250)).unwrap();
        assert_eq!(task.completion, 100);
        apply_update(&mut task, "note", Some(-3)).unwrap();
        assert_eq!(task.completion, 0);
        assert_eq!(task.updates.len(), 3);
    }

    #[test]
    fn empty_text_leaves_task_alone() {
        let mut task = task_at(20);
        assert_eq!(apply_update(&mut task, " ", Some(90)), Err(UpdateError::EmptyText));
        assert_eq!(task, task_at(20));
    }

    #[test]
    fn submit_resolves_users_task() {
        let mut store = TaskStore::new(TaskBoard::default());
        let first = store
            .create(TaskDraft {
                title: "API Integration".into(),
                user_name: "Priya Sharma".into(),
                ..Default::default()
            })
            .unwrap();
        let second = store
            .create(TaskDraft {
                title: "Bug Fixes".into(),
                user_name: "Priya Sharma".into(),
                ..Default::default()
            })
            .unwrap();

        let request = UpdateRequest {
            user: "Priya Sharma".into(),
            text: "working on it".into(),
            ..Default::default()
        };
        let outcome = submit_update(&mut store, &request).unwrap();
        assert_eq!(outcome.task_id, second);
        assert_eq!(outcome.completion, 50);

        let named = UpdateRequest {
            task_name: Some("API Integration".into()),
            text: "fixed".into(),
            ..request.clone()
        };
        assert_eq!(submit_update(&mut store, &named).unwrap().task_id, first);
        assert_eq!(store.get(first).unwrap().1.completion, 90);
    }

    #[test]
    fn submit_rejects_missing_target() {
        let mut store = TaskStore::default();
        let request = UpdateRequest {
            user: "Nobody".into(),
            text: "done".into(),
            ..Default::default()
        };
        assert!(matches!(
            submit_update(&mut store, &request),
            Err(UpdateError::NoTarget(_))
        ));
        let no_user = UpdateRequest {
            user: "".into(),
            ..request.clone()
        };
        assert!(matches!(
            submit_update(&mut store, &no_user),
            Err(UpdateError::NoTarget(_))
        ));
        let no_text = UpdateRequest {
            text: "".into(),
            ..request
        };
        assert_eq!(submit_update(&mut store, &no_text), Err(UpdateError::EmptyText));
    }
}
